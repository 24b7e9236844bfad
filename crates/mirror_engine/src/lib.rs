//! Mirror engine: the raw export pass, attachment downloads and the
//! conversion pass.
mod attachments;
mod client;
mod convert;
mod decode;
mod export;
mod normalize;
mod persist;
mod types;

pub use attachments::{AttachmentFetcher, AttachmentSettings, DEFAULT_CHUNK_SIZE, DEFAULT_LIST_LIMIT};
pub use client::{ClientSettings, ConfluenceClient, ContentStore, Credentials, HttpSession};
pub use convert::{find_raw_documents, ConvertError, Converter, Html2MdConverter, TreeConverter};
pub use decode::{decode_document, DecodeError, DecodedDocument};
pub use export::{ExportError, ExportedPage, PageExporter, PendingPage, SpaceWalker};
pub use normalize::{normalize_document, normalize_markup, EMBEDDED_IMAGE_TAG, FILENAME_ATTRIBUTES};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError, StagedFile};
pub use types::{AttachmentReport, ConvertSummary, ExportSummary, StoreError, StoreFailure};
