use std::path::{Path, PathBuf};
use std::sync::Arc;

use mirror_core::{document_name, path_segment, ExportPath, PageId, VisitedSet, RAW_EXTENSION};
use mirror_logging::{display_segments, mirror_debug, mirror_error, mirror_info, mirror_warn};

use crate::attachments::AttachmentFetcher;
use crate::client::ContentStore;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::{AttachmentReport, ExportSummary, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("page {0} reached twice: page ids are not unique or the page tree has a cycle")]
    DuplicatePage(PageId),
    #[error("space {0} has no homepage; a root page is required to export it")]
    NoHomepage(String),
    #[error("failed to fetch attachment {title:?} from {url}: {message}")]
    AttachmentFetch {
        title: String,
        url: String,
        status: Option<u16>,
        message: String,
    },
    #[error("content store request failed: {0}")]
    Store(#[from] StoreError),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Sanitize a name for use as a path segment, warning when the source name
/// had to be rewritten.
pub(crate) fn sanitize_logged(raw: &str, what: &str) -> String {
    let sanitized = path_segment(raw);
    if sanitized.reserved {
        mirror_warn!(
            "Dangerous {}: {:?} is not a usable path segment, replaced with \"_\"",
            what,
            raw
        );
    } else if sanitized.was_modified() {
        mirror_warn!(
            "Dangerous {}: {:?}, found {:?}, replaced with \"_\" -> {:?}",
            what,
            raw,
            sanitized.replaced,
            sanitized.name
        );
    }
    sanitized.into_name()
}

/// A page waiting on the traversal stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPage {
    pub id: PageId,
    /// Directory the page's document goes into.
    pub ancestors: ExportPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedPage {
    pub path: PathBuf,
    pub children: Vec<PendingPage>,
    pub attachments: AttachmentReport,
}

/// Writes single pages and walks page trees below a root.
pub struct PageExporter {
    store: Arc<dyn ContentStore>,
    out_dir: PathBuf,
    attachments: Option<AttachmentFetcher>,
}

impl PageExporter {
    pub fn new(store: Arc<dyn ContentStore>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            out_dir: out_dir.into(),
            attachments: None,
        }
    }

    /// Fetch attachments for every exported page. Without a fetcher they are
    /// skipped.
    pub fn with_attachments(mut self, fetcher: AttachmentFetcher) -> Self {
        self.attachments = Some(fetcher);
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Export one page under `ancestors` and return its children, in store
    /// order, as pending work.
    pub async fn export_page(
        &self,
        id: &PageId,
        ancestors: &ExportPath,
        visited: &mut VisitedSet,
    ) -> Result<ExportedPage, ExportError> {
        if visited.contains(id) {
            mirror_error!("Duplicate page id {} found", id);
            return Err(ExportError::DuplicatePage(id.clone()));
        }

        let page = self.store.get_page(id).await?;
        let base_name = document_name(&page.title, page.has_children());
        let file_name = format!(
            "{}.{RAW_EXTENSION}",
            sanitize_logged(&base_name, "page title")
        );

        let ancestors = ancestors.resanitized();
        let dir = ancestors.to_dir(&self.out_dir);
        mirror_info!("Saving to {}", display_segments(&ancestors.with_file(&file_name)));
        let path = AtomicFileWriter::new(dir.clone()).write(&file_name, &page.body)?;

        let attachments = match &self.attachments {
            Some(fetcher) => fetcher.fetch_attachments(&page.id, &dir).await?,
            None => AttachmentReport::default(),
        };

        visited.mark(id.clone());

        let children = if page.has_children() {
            let child_dir = ancestors.child(&sanitize_logged(&page.title, "page title"));
            page.children
                .into_iter()
                .map(|child| PendingPage {
                    id: child,
                    ancestors: child_dir.clone(),
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(ExportedPage {
            path,
            children,
            attachments,
        })
    }

    /// Export `root` and every descendant depth-first, in store order.
    ///
    /// Uses an explicit stack, so tree depth is bounded by memory rather than
    /// by the call stack.
    pub async fn export_tree(
        &self,
        root: PageId,
        root_path: ExportPath,
        visited: &mut VisitedSet,
    ) -> Result<ExportSummary, ExportError> {
        let mut summary = ExportSummary::default();
        let mut stack = vec![PendingPage {
            id: root,
            ancestors: root_path,
        }];

        while let Some(pending) = stack.pop() {
            let exported = self
                .export_page(&pending.id, &pending.ancestors, visited)
                .await?;
            summary.pages += 1;
            summary.record_attachments(&exported.attachments);
            stack.extend(exported.children.into_iter().rev());
        }

        Ok(summary)
    }
}

/// Enumerates spaces and exports each one from its homepage.
pub struct SpaceWalker {
    store: Arc<dyn ContentStore>,
    exporter: PageExporter,
}

impl SpaceWalker {
    pub fn new(store: Arc<dyn ContentStore>, exporter: PageExporter) -> Self {
        Self { store, exporter }
    }

    /// Export every visible space, or only the one whose key equals
    /// `space_filter`.
    ///
    /// A space without a homepage aborts the whole run, not just that space.
    pub async fn dump(&self, space_filter: Option<&str>) -> Result<ExportSummary, ExportError> {
        let spaces = self.store.list_spaces(space_filter).await?;
        let mut summary = ExportSummary::default();
        if spaces.is_empty() {
            mirror_warn!("No spaces returned; check the credentials and the instance url");
            return Ok(summary);
        }

        let mut visited = VisitedSet::new();
        for space in spaces {
            if space_filter.is_some_and(|key| key != space.key) {
                mirror_debug!("Skipping space {}, not selected", space.key);
                continue;
            }

            mirror_info!("Processing space {}", space.key);
            let Some(homepage) = space.homepage else {
                mirror_error!(
                    "Space {} has no homepage; a root page is required for the export",
                    space.key
                );
                return Err(ExportError::NoHomepage(space.key));
            };

            let root = ExportPath::root(&sanitize_logged(&space.key, "space key"));
            let tree = self
                .exporter
                .export_tree(homepage, root, &mut visited)
                .await?;
            summary.absorb(tree);
            summary.spaces += 1;
        }

        if let Some(key) = space_filter {
            if summary.spaces == 0 {
                mirror_warn!("Space {} was not among the returned spaces", key);
            }
        }

        Ok(summary)
    }
}
