use std::fmt;
use std::time::Duration;

use mirror_core::{Attachment, Page, PageId, Space};
use mirror_logging::mirror_debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::{StoreError, StoreFailure};

/// Read side of the remote content store.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    /// All spaces visible to the caller, optionally narrowed to one key.
    async fn list_spaces(&self, key_filter: Option<&str>) -> Result<Vec<Space>, StoreError>;

    /// One page with its storage body and ordered child ids.
    async fn get_page(&self, id: &PageId) -> Result<Page, StoreError>;

    /// First `limit` attachments of a page.
    async fn list_attachments(
        &self,
        page_id: &PageId,
        limit: usize,
    ) -> Result<Vec<Attachment>, StoreError>;
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { username: String, token: String },
    Bearer(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("token", &"***")
                .finish(),
            Credentials::Bearer(_) => f.debug_tuple("Bearer").field(&"***").finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Connection setup timeout. `None` leaves it to the operating system.
    pub connect_timeout: Option<Duration>,
    /// Whole-request timeout. `None` waits for as long as the server does.
    pub request_timeout: Option<Duration>,
    /// `limit` sent with every paginated listing.
    pub page_size: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            request_timeout: None,
            page_size: 100,
        }
    }
}

/// Authenticated HTTP access rooted at the instance base url.
#[derive(Clone)]
pub struct HttpSession {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpSession {
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        settings: &ClientSettings,
    ) -> Result<Self, StoreError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        Url::parse(trimmed).map_err(|err| StoreError::new(StoreFailure::InvalidUrl, err.to_string()))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| StoreError::new(StoreFailure::Network, err.to_string()))?;

        Ok(Self {
            http,
            base_url: trimmed.to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a store-supplied path onto the base url.
    ///
    /// Plain concatenation rather than `Url::join`, so a context path in the
    /// base url (`https://host/wiki`) is kept.
    pub fn resolve(&self, path: &str) -> Result<Url, StoreError> {
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&joined).map_err(|err| StoreError::new(StoreFailure::InvalidUrl, err.to_string()))
    }

    pub fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self.http.get(url);
        match &self.credentials {
            Credentials::Basic { username, token } => request.basic_auth(username, Some(token)),
            Credentials::Bearer(token) => request.bearer_auth(token),
        }
    }
}

/// [`ContentStore`] over the Confluence REST api.
#[derive(Clone)]
pub struct ConfluenceClient {
    session: HttpSession,
    page_size: usize,
}

impl ConfluenceClient {
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        settings: ClientSettings,
    ) -> Result<Self, StoreError> {
        let session = HttpSession::new(base_url, credentials, &settings)?;
        Ok(Self {
            session,
            page_size: settings.page_size.max(1),
        })
    }

    pub fn session(&self) -> &HttpSession {
        &self.session
    }

    async fn get_json<T: DeserializeOwned + Send>(&self, url: Url) -> Result<T, StoreError> {
        mirror_debug!("GET {}", url);
        let response = self
            .session
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::new(
                StoreFailure::HttpStatus(status.as_u16()),
                format!("{} answered {}", url.path(), status),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| StoreError::new(StoreFailure::Decode, err.to_string()))
    }

    /// Follow `start`/`limit` pagination until the store stops offering a
    /// next page.
    async fn get_all<T: DeserializeOwned + Send>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, StoreError> {
        let mut start = 0usize;
        let mut all = Vec::new();
        loop {
            let mut url = self.session.resolve(path)?;
            url.query_pairs_mut()
                .append_pair("start", &start.to_string())
                .append_pair("limit", &self.page_size.to_string())
                .extend_pairs(params.iter().copied());

            let batch: Listing<T> = self.get_json(url).await?;
            let fetched = batch.results.len();
            all.extend(batch.results);
            if fetched == 0 || batch.links.next.is_none() {
                return Ok(all);
            }
            start += fetched;
        }
    }
}

#[async_trait::async_trait]
impl ContentStore for ConfluenceClient {
    async fn list_spaces(&self, key_filter: Option<&str>) -> Result<Vec<Space>, StoreError> {
        let mut params = vec![("expand", "homepage")];
        if let Some(key) = key_filter {
            params.push(("spaceKey", key));
        }
        let spaces: Vec<SpaceDto> = self.get_all("/rest/api/space", &params).await?;
        Ok(spaces
            .into_iter()
            .map(|s| Space {
                key: s.key,
                homepage: s.homepage.map(|h| PageId::new(h.id)),
            })
            .collect())
    }

    async fn get_page(&self, id: &PageId) -> Result<Page, StoreError> {
        let mut url = self.session.resolve(&format!("/rest/api/content/{id}"))?;
        url.query_pairs_mut().append_pair("expand", "body.storage");
        let content: ContentDto = self.get_json(url).await?;

        let children: Vec<IdDto> = self
            .get_all(&format!("/rest/api/content/{id}/child/page"), &[])
            .await?;

        Ok(Page {
            id: PageId::new(content.id),
            title: content.title,
            children: children.into_iter().map(|c| PageId::new(c.id)).collect(),
            body: content
                .body
                .and_then(|b| b.storage)
                .map(|s| s.value)
                .unwrap_or_default(),
        })
    }

    async fn list_attachments(
        &self,
        page_id: &PageId,
        limit: usize,
    ) -> Result<Vec<Attachment>, StoreError> {
        let mut url = self
            .session
            .resolve(&format!("/rest/api/content/{page_id}/child/attachment"))?;
        url.query_pairs_mut()
            .append_pair("start", "0")
            .append_pair("limit", &limit.to_string());
        let listing: Listing<AttachmentDto> = self.get_json(url).await?;
        Ok(listing
            .results
            .into_iter()
            .map(|a| Attachment {
                title: a.title,
                download: a.links.download,
            })
            .collect())
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        return StoreError::new(StoreFailure::Timeout, err.to_string());
    }
    StoreError::new(StoreFailure::Network, err.to_string())
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(rename = "_links", default)]
    links: ListingLinks,
}

#[derive(Debug, Default, Deserialize)]
struct ListingLinks {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdDto {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpaceDto {
    key: String,
    homepage: Option<IdDto>,
}

#[derive(Debug, Deserialize)]
struct ContentDto {
    id: String,
    title: String,
    body: Option<BodyDto>,
}

#[derive(Debug, Deserialize)]
struct BodyDto {
    storage: Option<StorageDto>,
}

#[derive(Debug, Deserialize)]
struct StorageDto {
    value: String,
}

#[derive(Debug, Deserialize)]
struct AttachmentDto {
    title: String,
    #[serde(rename = "_links")]
    links: AttachmentLinks,
}

#[derive(Debug, Deserialize)]
struct AttachmentLinks {
    download: String,
}
