use std::path::{Path, PathBuf};

use crate::sanitize::{sanitize_segment, SanitizedName, REPLACEMENT};

/// Extension of documents written by the raw pass.
pub const RAW_EXTENSION: &str = "html";
/// Extension of documents written by the conversion pass.
pub const CONVERTED_EXTENSION: &str = "md";
/// Document base name for pages that have children.
pub const INDEX_NAME: &str = "index";
/// Directory next to a page document that holds its attachments.
pub const ATTACHMENTS_DIR: &str = "attachments";

/// Whole segments the filesystem would collapse into their parent directory.
pub const RESERVED_SEGMENTS: [&str; 2] = ["", "."];

/// Sanitize `raw` for use as exactly one path segment.
///
/// On top of [`sanitize_segment`], a result that is empty or `.` becomes
/// `_`, so distinct pages never share a directory or document.
pub fn path_segment(raw: &str) -> SanitizedName {
    let mut out = sanitize_segment(raw);
    if RESERVED_SEGMENTS.contains(&out.name.as_str()) {
        out.name = REPLACEMENT.to_string();
        out.reserved = true;
    }
    out
}

/// File name of a page's raw document, before sanitization.
///
/// Pages with children are stored as `index` inside the directory named after
/// them, so the document never collides with that directory.
pub fn document_name(title: &str, has_children: bool) -> String {
    if has_children {
        INDEX_NAME.to_string()
    } else {
        title.to_string()
    }
}

/// Sanitized directory segments from the output root down to one page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportPath {
    segments: Vec<String>,
}

impl ExportPath {
    pub fn root(space_key: &str) -> Self {
        Self::default().child(space_key)
    }

    /// Path of a descendant directory named after `raw`.
    pub fn child(&self, raw: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(path_segment(raw).into_name());
        Self { segments }
    }

    /// Same segments, each passed through the sanitizer again.
    pub fn resanitized(&self) -> Self {
        Self {
            segments: self
                .segments
                .iter()
                .map(|s| path_segment(s).into_name())
                .collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Segments of the page document itself: this path plus `file_name`.
    pub fn with_file(&self, file_name: &str) -> Vec<String> {
        let mut all = self.segments.clone();
        all.push(file_name.to_string());
        all
    }

    pub fn to_dir(&self, root: &Path) -> PathBuf {
        self.segments
            .iter()
            .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
    }
}
