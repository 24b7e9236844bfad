use std::fs;
use std::path::{Path, PathBuf};

use mirror_core::{CONVERTED_EXTENSION, RAW_EXTENSION};
use mirror_logging::{mirror_debug, mirror_info};
use walkdir::WalkDir;

use crate::decode::{decode_document, DecodeError};
use crate::normalize::normalize_markup;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::ConvertSummary;

pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Html2MdConverter;

impl Converter for Html2MdConverter {
    fn to_markdown(&self, html: &str) -> String {
        html2md::parse_html(html)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("unsupported filesystem entry (neither file nor directory): {0:?}")]
    UnsupportedEntry(PathBuf),
    #[error("failed to walk export tree: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Second pass: turns every raw document under a directory into a Markdown
/// sibling.
pub struct TreeConverter {
    converter: Box<dyn Converter>,
}

impl Default for TreeConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeConverter {
    pub fn new() -> Self {
        Self::with_converter(Box::new(Html2MdConverter))
    }

    pub fn with_converter(converter: Box<dyn Converter>) -> Self {
        Self { converter }
    }

    /// Convert all raw documents below `root`, overwriting existing Markdown
    /// siblings. The tree is fully enumerated before anything is written.
    pub fn convert_tree(&self, root: &Path) -> Result<ConvertSummary, ConvertError> {
        let sources = find_raw_documents(root)?;
        mirror_debug!("Found {} document(s) under {}", sources.len(), root.display());

        let mut summary = ConvertSummary::default();
        for source in sources {
            let (written, images) = self.convert_file(&source)?;
            summary.images_rewritten += images;
            summary.converted.push(written);
        }
        Ok(summary)
    }

    /// Convert one raw document; returns the written path and the number of
    /// embedded images rewritten.
    pub fn convert_file(&self, source: &Path) -> Result<(PathBuf, usize), ConvertError> {
        mirror_info!("Converting {}", source.display());
        let bytes = fs::read(source).map_err(|source_err| ConvertError::Io {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        let decoded = decode_document(&bytes).map_err(|err| ConvertError::Decode {
            path: source.to_path_buf(),
            source: err,
        })?;

        let (normalized, images) = normalize_markup(&decoded.text);
        let markdown = self.converter.to_markdown(&normalized);

        let dir = source.parent().unwrap_or_else(|| Path::new("."));
        let written = AtomicFileWriter::new(dir.to_path_buf())
            .write(&converted_name(source), &markdown)?;
        Ok((written, images))
    }
}

/// Depth-first listing of every raw document below `root`, sorted by name
/// within each directory. Symlinks and special files are rejected.
pub fn find_raw_documents(root: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let suffix = format!(".{RAW_EXTENSION}");
    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            return Err(ConvertError::UnsupportedEntry(entry.into_path()));
        }
        if entry.file_name().to_string_lossy().ends_with(&suffix) {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

fn converted_name(source: &Path) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name
        .strip_suffix(&format!(".{RAW_EXTENSION}"))
        .unwrap_or(name.as_str());
    format!("{stem}.{CONVERTED_EXTENSION}")
}
