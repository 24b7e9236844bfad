//! Command line surface and its resolution into a run configuration.

use std::path::PathBuf;

use clap::Parser;
use mirror_engine::Credentials;
use url::Url;

/// Mirror wiki spaces to disk as raw storage markup, then convert every page
/// to Markdown.
#[derive(Parser, Debug)]
#[command(name = "space-mirror", author, version, about, long_about = None)]
pub struct Cli {
    /// Directory the space trees are written into
    pub out_dir: PathBuf,

    /// Base url of the wiki instance, including any context path
    #[arg(long, env = "MIRROR_URL", required_unless_present = "no_fetch")]
    pub url: Option<String>,

    /// API token; sent as a bearer token unless --username is given
    #[arg(
        long,
        env = "MIRROR_TOKEN",
        hide_env_values = true,
        required_unless_present = "no_fetch"
    )]
    pub token: Option<String>,

    /// Account name for basic authentication
    #[arg(long, env = "MIRROR_USERNAME")]
    pub username: Option<String>,

    /// Export only the space with this key
    #[arg(long, value_name = "KEY")]
    pub space: Option<String>,

    /// Skip downloading page attachments
    #[arg(long, default_value_t = false)]
    pub no_attachments: bool,

    /// Skip the export and only convert an existing tree
    #[arg(long, default_value_t = false)]
    pub no_fetch: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Also write the log to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid instance url {url:?}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Where to fetch from and as whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub base_url: String,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub out_dir: PathBuf,
    /// `None` skips the export pass.
    pub fetch: Option<FetchConfig>,
    pub space_filter: Option<String>,
    pub fetch_attachments: bool,
    pub verbose: bool,
    pub log_file: Option<PathBuf>,
}

impl RunConfig {
    pub fn resolve(cli: Cli) -> Result<Self, ConfigError> {
        let fetch = if cli.no_fetch {
            None
        } else {
            Some(resolve_fetch(cli.url, cli.token, cli.username)?)
        };

        let space_filter = match cli.space {
            Some(key) if key.trim().is_empty() => return Err(ConfigError::Empty("--space")),
            other => other,
        };

        Ok(RunConfig {
            out_dir: cli.out_dir,
            fetch,
            space_filter,
            fetch_attachments: !cli.no_attachments,
            verbose: cli.verbose,
            log_file: cli.log_file,
        })
    }
}

fn resolve_fetch(
    url: Option<String>,
    token: Option<String>,
    username: Option<String>,
) -> Result<FetchConfig, ConfigError> {
    let url = url.ok_or(ConfigError::Missing("--url or MIRROR_URL"))?;
    let token = token.ok_or(ConfigError::Missing("--token or MIRROR_TOKEN"))?;
    if token.trim().is_empty() {
        return Err(ConfigError::Empty("token"));
    }

    let parsed = Url::parse(url.trim()).map_err(|err| ConfigError::InvalidUrl {
        url: url.clone(),
        message: err.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            url,
            message: format!("unsupported scheme {}", parsed.scheme()),
        });
    }

    let credentials = match username {
        Some(username) if !username.trim().is_empty() => Credentials::Basic { username, token },
        _ => Credentials::Bearer(token),
    };

    Ok(FetchConfig {
        base_url: url.trim().to_string(),
        credentials,
    })
}
