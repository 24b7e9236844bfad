#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use mirror_core::{Attachment, Page, PageId, Space};
use mirror_engine::{ContentStore, StoreError};

pub fn init_logging() {
    mirror_logging::initialize_for_tests();
}

/// In-memory content store with a request log.
#[derive(Default)]
pub struct FakeStore {
    spaces: Vec<Space>,
    pages: HashMap<PageId, Page>,
    attachments: HashMap<PageId, Vec<Attachment>>,
    page_requests: Mutex<Vec<PageId>>,
    space_filters: Mutex<Vec<Option<String>>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn space(mut self, key: &str, homepage: Option<&str>) -> Self {
        self.spaces.push(Space {
            key: key.to_string(),
            homepage: homepage.map(PageId::from),
        });
        self
    }

    pub fn page(mut self, id: &str, title: &str, children: &[&str], body: &str) -> Self {
        self.pages.insert(
            PageId::from(id),
            Page {
                id: PageId::from(id),
                title: title.to_string(),
                children: children.iter().map(|c| PageId::from(*c)).collect(),
                body: body.to_string(),
            },
        );
        self
    }

    pub fn attachment(mut self, page: &str, title: &str, download: &str) -> Self {
        self.attachments
            .entry(PageId::from(page))
            .or_default()
            .push(Attachment {
                title: title.to_string(),
                download: download.to_string(),
            });
        self
    }

    pub fn into_shared(self) -> Arc<FakeStore> {
        Arc::new(self)
    }

    pub fn page_requests(&self) -> Vec<String> {
        self.page_requests
            .lock()
            .unwrap()
            .iter()
            .map(|id| id.to_string())
            .collect()
    }

    pub fn space_filters(&self) -> Vec<Option<String>> {
        self.space_filters.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ContentStore for FakeStore {
    async fn list_spaces(&self, key_filter: Option<&str>) -> Result<Vec<Space>, StoreError> {
        self.space_filters
            .lock()
            .unwrap()
            .push(key_filter.map(str::to_string));
        Ok(self.spaces.clone())
    }

    async fn get_page(&self, id: &PageId) -> Result<Page, StoreError> {
        self.page_requests.lock().unwrap().push(id.clone());
        Ok(self
            .pages
            .get(id)
            .cloned()
            .unwrap_or_else(|| panic!("page {id} not in fake store")))
    }

    async fn list_attachments(
        &self,
        page_id: &PageId,
        limit: usize,
    ) -> Result<Vec<Attachment>, StoreError> {
        Ok(self
            .attachments
            .get(page_id)
            .map(|list| list.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

/// Every regular file below `root`, as `/`-joined relative paths, sorted.
pub fn files_under(root: &Path) -> Vec<String> {
    fn walk(dir: &Path, root: &Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path: PathBuf = entry.unwrap().path();
            if path.is_dir() {
                walk(&path, root, out);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                let parts: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                out.push(parts.join("/"));
            }
        }
    }
    let mut out = Vec::new();
    if root.exists() {
        walk(root, root, &mut out);
    }
    out.sort();
    out
}
