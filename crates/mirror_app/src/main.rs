mod cli;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mirror_engine::{
    ensure_output_dir, AttachmentFetcher, AttachmentSettings, ClientSettings, ConfluenceClient,
    ExportSummary, PageExporter, SpaceWalker, TreeConverter,
};
use mirror_logging::{mirror_error, mirror_info};

use crate::cli::{Cli, FetchConfig, RunConfig};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.verbose, cli.log_file.as_deref());

    let result = RunConfig::resolve(cli)
        .context("invalid configuration")
        .and_then(|config| run(&config));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            mirror_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &RunConfig) -> anyhow::Result<()> {
    ensure_output_dir(&config.out_dir)
        .with_context(|| format!("cannot use output directory {}", config.out_dir.display()))?;

    if let Some(fetch) = &config.fetch {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start the async runtime")?;
        let summary = runtime.block_on(export(config, fetch))?;
        mirror_info!(
            "Exported {} page(s) from {} space(s); {} attachment(s) saved, {} missing, {} bytes",
            summary.pages,
            summary.spaces,
            summary.attachments_saved,
            summary.attachments_missing,
            summary.bytes_written
        );
    }

    let converted = TreeConverter::new()
        .convert_tree(&config.out_dir)
        .with_context(|| format!("conversion of {} failed", config.out_dir.display()))?;
    mirror_info!(
        "Converted {} document(s), {} embedded image(s) rewritten",
        converted.converted.len(),
        converted.images_rewritten
    );
    Ok(())
}

async fn export(config: &RunConfig, fetch: &FetchConfig) -> anyhow::Result<ExportSummary> {
    let client = Arc::new(
        ConfluenceClient::new(
            &fetch.base_url,
            fetch.credentials.clone(),
            ClientSettings::default(),
        )
        .context("failed to set up the wiki client")?,
    );

    let mut exporter = PageExporter::new(client.clone(), &config.out_dir);
    if config.fetch_attachments {
        exporter = exporter.with_attachments(AttachmentFetcher::new(
            client.clone(),
            client.session().clone(),
            AttachmentSettings::default(),
        ));
    }

    SpaceWalker::new(client, exporter)
        .dump(config.space_filter.as_deref())
        .await
        .with_context(|| format!("export from {} failed", fetch.base_url))
}
