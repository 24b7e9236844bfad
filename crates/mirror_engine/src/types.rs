use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StoreError {
    pub kind: StoreFailure,
    pub message: String,
}

impl StoreError {
    pub(crate) fn new(kind: StoreFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFailure {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Decode,
    Network,
}

impl fmt::Display for StoreFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreFailure::InvalidUrl => write!(f, "invalid url"),
            StoreFailure::HttpStatus(code) => write!(f, "http status {code}"),
            StoreFailure::Timeout => write!(f, "timeout"),
            StoreFailure::Decode => write!(f, "malformed response"),
            StoreFailure::Network => write!(f, "network error"),
        }
    }
}

/// Outcome of fetching the attachments of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentReport {
    pub saved: Vec<PathBuf>,
    /// Titles of attachments the store answered 404 for.
    pub missing: Vec<String>,
    pub bytes_written: u64,
}

/// Counters for a raw export run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub spaces: usize,
    pub pages: usize,
    pub attachments_saved: usize,
    pub attachments_missing: usize,
    pub bytes_written: u64,
}

impl ExportSummary {
    pub(crate) fn absorb(&mut self, other: ExportSummary) {
        self.spaces += other.spaces;
        self.pages += other.pages;
        self.attachments_saved += other.attachments_saved;
        self.attachments_missing += other.attachments_missing;
        self.bytes_written += other.bytes_written;
    }

    pub(crate) fn record_attachments(&mut self, report: &AttachmentReport) {
        self.attachments_saved += report.saved.len();
        self.attachments_missing += report.missing.len();
        self.bytes_written += report.bytes_written;
    }
}

/// Counters for a conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertSummary {
    pub converted: Vec<PathBuf>,
    pub images_rewritten: usize,
}
