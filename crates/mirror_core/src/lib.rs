//! Mirror core: pure data model and path rules shared by both passes.
mod model;
mod path;
mod sanitize;
mod visited;

pub use model::{Attachment, Page, PageId, Space};
pub use path::{
    document_name, path_segment, ExportPath, ATTACHMENTS_DIR, CONVERTED_EXTENSION, INDEX_NAME,
    RAW_EXTENSION, RESERVED_SEGMENTS,
};
pub use sanitize::{sanitize_segment, SanitizedName, REPLACEMENT, UNSAFE_SUBSTRINGS};
pub use visited::VisitedSet;
