use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::TryStreamExt;
use mirror_core::{Attachment, PageId, ATTACHMENTS_DIR};
use mirror_logging::{mirror_debug, mirror_info, mirror_warn};
use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;
use url::Url;

use crate::client::{ContentStore, HttpSession};
use crate::export::{sanitize_logged, ExportError};
use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};
use crate::AttachmentReport;

pub const DEFAULT_LIST_LIMIT: usize = 500;
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct AttachmentSettings {
    /// Attachments listed per page; anything beyond is not fetched.
    pub list_limit: usize,
    /// Read buffer for streamed downloads. Bounds memory, nothing else.
    pub chunk_size: usize,
}

impl Default for AttachmentSettings {
    fn default() -> Self {
        Self {
            list_limit: DEFAULT_LIST_LIMIT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

enum Download {
    Saved { path: PathBuf, bytes: u64 },
    Missing,
}

/// Lists a page's attachments and streams each one into
/// `<page dir>/attachments/`.
pub struct AttachmentFetcher {
    store: Arc<dyn ContentStore>,
    session: HttpSession,
    settings: AttachmentSettings,
}

impl AttachmentFetcher {
    pub fn new(
        store: Arc<dyn ContentStore>,
        session: HttpSession,
        settings: AttachmentSettings,
    ) -> Self {
        Self {
            store,
            session,
            settings,
        }
    }

    /// A 404 for a single attachment is logged and skipped; every other
    /// failure aborts.
    pub async fn fetch_attachments(
        &self,
        page_id: &PageId,
        page_dir: &Path,
    ) -> Result<AttachmentReport, ExportError> {
        let attachments = self
            .store
            .list_attachments(page_id, self.settings.list_limit)
            .await?;
        let mut report = AttachmentReport::default();
        if attachments.is_empty() {
            return Ok(report);
        }

        let dir = page_dir.join(ATTACHMENTS_DIR);
        mirror_debug!(
            "Page {} has {} attachment(s), saving to {}",
            page_id,
            attachments.len(),
            dir.display()
        );

        for attachment in attachments {
            let file_name = sanitize_logged(&attachment.title, "attachment title");
            ensure_output_dir(&dir)?;
            let url = self.session.resolve(&attachment.download)?;

            match self.download(&attachment, url, &dir, &file_name).await? {
                Download::Saved { path, bytes } => {
                    mirror_info!("Saved attachment {} ({} bytes)", path.display(), bytes);
                    report.bytes_written += bytes;
                    report.saved.push(path);
                }
                Download::Missing => {
                    mirror_warn!(
                        "Attachment {:?} of page {} not found, skipping",
                        attachment.title,
                        page_id
                    );
                    report.missing.push(attachment.title);
                }
            }
        }

        Ok(report)
    }

    async fn download(
        &self,
        attachment: &Attachment,
        url: Url,
        dir: &Path,
        file_name: &str,
    ) -> Result<Download, ExportError> {
        let fetch_error = |status: Option<u16>, message: String| ExportError::AttachmentFetch {
            title: attachment.title.clone(),
            url: url.to_string(),
            status,
            message,
        };

        let response = self
            .session
            .get(url.clone())
            .send()
            .await
            .map_err(|err| fetch_error(None, err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Download::Missing);
        }
        if !status.is_success() {
            return Err(fetch_error(Some(status.as_u16()), status.to_string()));
        }

        let writer = AtomicFileWriter::new(dir.to_path_buf());
        let mut staged = writer.stage(file_name)?;
        let std_file = staged.file_mut().try_clone().map_err(PersistError::from)?;
        let mut file = tokio::fs::File::from_std(std_file);

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let mut reader = std::pin::pin!(StreamReader::new(body));
        let mut buf = vec![0u8; self.settings.chunk_size.max(1)];
        let mut written = 0u64;
        loop {
            let read = reader
                .read(&mut buf)
                .await
                .map_err(|err| fetch_error(Some(status.as_u16()), err.to_string()))?;
            if read == 0 {
                break;
            }
            file.write_all(&buf[..read]).await.map_err(PersistError::from)?;
            written += read as u64;
        }
        file.flush().await.map_err(PersistError::from)?;
        drop(file);

        let path = staged.commit()?;
        Ok(Download::Saved {
            path,
            bytes: written,
        })
    }
}
