use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {path:?} missing or not writable: {message}")]
    OutputDir { path: PathBuf, message: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

fn output_dir_error(dir: &Path, message: impl ToString) -> PersistError {
    PersistError::OutputDir {
        path: dir.to_path_buf(),
        message: message.to_string(),
    }
}

/// Ensure a directory exists, creating it and any missing parents.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| output_dir_error(dir, e))?;
        if !meta.is_dir() {
            return Err(output_dir_error(dir, "path is not a directory"));
        }
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| output_dir_error(dir, e))
}

/// Writes files into `{dir}` through a temp file that is renamed into place,
/// replacing whatever was there before.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        let mut staged = self.stage(filename)?;
        staged.file_mut().write_all(content.as_bytes())?;
        staged.commit()
    }

    /// Open a temp file that becomes `{dir}/{filename}` on [`StagedFile::commit`].
    /// Dropping it without committing removes the temp file.
    pub fn stage(&self, filename: &str) -> Result<StagedFile, PersistError> {
        ensure_output_dir(&self.dir)?;
        let tmp = NamedTempFile::new_in(&self.dir)?;
        Ok(StagedFile {
            tmp,
            target: self.dir.join(filename),
        })
    }
}

pub struct StagedFile {
    tmp: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    pub fn file_mut(&mut self) -> &mut fs::File {
        self.tmp.as_file_mut()
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn commit(mut self) -> Result<PathBuf, PersistError> {
        self.tmp.flush()?;
        self.tmp.as_file_mut().sync_all()?;
        if self.target.exists() {
            fs::remove_file(&self.target)?;
        }
        self.tmp
            .persist(&self.target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(self.target)
    }
}
