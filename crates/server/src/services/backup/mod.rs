//! Backup engine.
//!
//! A backup is a ZIP archive holding a `data.json` manifest with every record
//! collection (customer passwords excluded) followed by the uploaded files the
//! records reference, stored under `uploads/<relative path>`.
//!
//! - [`export`] reads the store and writes an archive
//! - [`import`] restores an archive with natural-key matching per collection
//! - [`stats`] reports record counts and upload disk usage

pub mod export;
pub mod import;
pub mod manifest;
pub mod stats;

use thiserror::Error;

use crate::db::RepositoryError;

pub use export::{
    ArchiveSummary, ExportedArchive, archive_chunks, export_archive, export_to, write_archive,
};
pub use import::{CollectionStats, ImportReport, ImportStats, import_archive};
pub use manifest::{Manifest, ManifestData, Metadata, Snapshot};
pub use stats::{BackupStats, FileUsage, RecordCounts, backup_stats, format_bytes};

/// Name of the manifest entry.
pub const MANIFEST_NAME: &str = "data.json";

/// Prefix of archive entries holding uploaded files.
pub const UPLOADS_PREFIX: &str = "uploads/";

/// URL prefix of paths pointing into the upload directory.
pub const UPLOADS_URL_PREFIX: &str = "/uploads/";

/// Errors that can occur while exporting or importing a backup.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The uploaded file is not a readable ZIP archive.
    #[error("invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The archive has no `data.json` entry.
    #[error("archive has no data.json")]
    MissingManifest,

    /// `data.json` is not a valid manifest.
    #[error("invalid manifest: {0}")]
    InvalidManifest(#[source] serde_json::Error),

    /// Writing the outgoing archive failed.
    #[error("archive write failed: {0}")]
    Write(#[source] zip::result::ZipError),

    /// A record could not be encoded into the manifest.
    #[error("manifest encoding failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BackupError {
    /// Whether the error was caused by the uploaded archive itself.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Archive(_) | Self::MissingManifest | Self::InvalidManifest(_)
        )
    }
}

/// Relative path inside the upload directory for an `/uploads/...` reference.
///
/// Returns `None` for paths outside the upload area or trying to leave it.
#[must_use]
pub fn upload_relative_path(path: &str) -> Option<&str> {
    let rel = path.strip_prefix(UPLOADS_URL_PREFIX)?;
    if rel.is_empty()
        || rel.starts_with('/')
        || rel.contains('\\')
        || rel.split('/').any(|part| part.is_empty() || part == "." || part == "..")
    {
        return None;
    }
    Some(rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_relative_path() {
        assert_eq!(
            upload_relative_path("/uploads/covers/a.jpg"),
            Some("covers/a.jpg")
        );
        assert_eq!(upload_relative_path("https://cdn.example/a.jpg"), None);
        assert_eq!(upload_relative_path("/uploads/"), None);
        assert_eq!(upload_relative_path("/uploads/../etc/passwd"), None);
        assert_eq!(upload_relative_path("/uploads/covers//a.jpg"), None);
    }
}
