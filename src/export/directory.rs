//! Filesystem-backed export target

use super::{ExportKind, ExportTarget};
use crate::utils::paths::available_path;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Exports into public documents / pictures directories
///
/// Existing files are never overwritten: a second export of `name.ext`
/// becomes `name (1).ext`.
#[derive(Debug, Clone)]
pub struct DirectoryExport {
    documents_dir: PathBuf,
    pictures_dir: PathBuf,
}

impl DirectoryExport {
    pub fn new(documents_dir: impl Into<PathBuf>, pictures_dir: impl Into<PathBuf>) -> Self {
        Self {
            documents_dir: documents_dir.into(),
            pictures_dir: pictures_dir.into(),
        }
    }

    /// Directory used for `kind`
    pub fn dir_for(&self, kind: ExportKind) -> &Path {
        match kind {
            ExportKind::Document => &self.documents_dir,
            ExportKind::Picture => &self.pictures_dir,
        }
    }
}

impl ExportTarget for DirectoryExport {
    fn export(&self, file_name: &str, kind: ExportKind, bytes: &[u8]) -> io::Result<PathBuf> {
        let dir = self.dir_for(kind);
        fs::create_dir_all(dir)?;

        let path = available_path(dir, file_name);
        fs::write(&path, bytes)?;

        tracing::debug!(
            "Exported {} ({}, {} bytes) to {:?}",
            file_name,
            kind.mime_type(),
            bytes.len(),
            path
        );
        Ok(path)
    }
}
