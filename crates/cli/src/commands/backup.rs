//! Offline backup commands.
//!
//! Same archive format and import rules as the `/api/backup` endpoints, run
//! directly against the database and upload directory.
//!
//! # Usage
//!
//! ```bash
//! mp-cli backup export -o mprecords.zip
//! mp-cli backup import -i mprecords.zip --overwrite
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use mp_records_server::services::backup::{
    BackupError, CollectionStats, export::archive_filename, export_to, import_archive,
};
use thiserror::Error;

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum BackupCommandError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Cannot access {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Backup(#[from] BackupError),
}

fn uploads_dir() -> PathBuf {
    PathBuf::from(std::env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_owned()))
}

/// Write a backup archive to `output`, or to a timestamped file in the
/// current directory.
///
/// # Errors
///
/// Returns `BackupCommandError` if the database, the output file or an
/// upload cannot be accessed.
pub async fn export(output: Option<PathBuf>) -> Result<(), BackupCommandError> {
    let store = connect().await?;
    let path = output.unwrap_or_else(|| PathBuf::from(archive_filename(Utc::now())));

    let file = std::fs::File::create(&path).map_err(|source| BackupCommandError::File {
        path: path.clone(),
        source,
    })?;
    let (_, summary) = export_to(&store, &uploads_dir(), file).await?;

    tracing::info!("Backup written to {}", path.display());
    tracing::info!("  Records: {}", summary.records);
    tracing::info!("  Files: {}", summary.files);
    if summary.missing_files > 0 {
        tracing::warn!("  Missing files skipped: {}", summary.missing_files);
    }
    Ok(())
}

/// Restore records and uploads from the archive at `input`.
///
/// # Errors
///
/// Returns `BackupCommandError` if the archive cannot be read or is not a
/// valid backup.
pub async fn import(input: &Path, overwrite: bool) -> Result<(), BackupCommandError> {
    let archive = tokio::fs::read(input)
        .await
        .map_err(|source| BackupCommandError::File {
            path: input.to_path_buf(),
            source,
        })?;
    let store = connect().await?;

    let report = import_archive(&store, &uploads_dir(), archive, overwrite).await?;

    if let Some(metadata) = &report.metadata {
        tracing::info!(
            "Archive from {} exported {} (format {})",
            metadata.source,
            metadata.export_date,
            metadata.version
        );
    }
    let stats = &report.stats;
    for (name, collection) in [
        ("releases", stats.wydania),
        ("products", stats.produkty),
        ("members", stats.czlonkowie),
        ("messages", stats.wiadomosci),
        ("orders", stats.zamowienia),
        ("settings", stats.ustawienia),
        ("customers", stats.klienci),
    ] {
        log_collection(name, collection);
    }
    tracing::info!("  files: {} written", stats.files);
    Ok(())
}

fn log_collection(name: &str, stats: CollectionStats) {
    tracing::info!(
        "  {name}: {} processed, {} inserted, {} updated, {} skipped, {} failed",
        stats.processed,
        stats.inserted,
        stats.updated,
        stats.skipped,
        stats.failed
    );
}
