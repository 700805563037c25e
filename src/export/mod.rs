//! Export to the shared, user-visible area
//!
//! Finished artifacts are copied out of the private capture sandbox: the
//! session CSV into a public documents folder, triggered captures into a
//! public pictures folder.

pub mod directory;

pub use directory::DirectoryExport;

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;

/// Kind of exported artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    /// Sensor CSV
    Document,
    /// JPEG image
    Picture,
}

impl ExportKind {
    /// MIME type recorded alongside the file
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportKind::Document => "text/csv",
            ExportKind::Picture => "image/jpeg",
        }
    }
}

/// Destination that makes a named file visible outside the sandbox
pub trait ExportTarget: Send + Sync {
    /// Store `bytes` under `file_name`; returns where it ended up
    fn export(&self, file_name: &str, kind: ExportKind, bytes: &[u8]) -> io::Result<PathBuf>;
}
