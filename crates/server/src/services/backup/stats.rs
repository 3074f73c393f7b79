//! Record counts and upload disk usage shown before taking a backup.

use std::path::Path;

use serde::Serialize;
use walkdir::WalkDir;

use super::BackupError;
use crate::db::Store;

/// Records per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub wydania: u64,
    pub produkty: u64,
    pub czlonkowie: u64,
    pub wiadomosci: u64,
    pub zamowienia: u64,
    pub klienci: u64,
    pub total: u64,
}

/// Files in the upload directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUsage {
    pub count: u64,
    pub size: u64,
    pub size_formatted: String,
}

/// Backup overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupStats {
    pub records: RecordCounts,
    pub files: FileUsage,
}

/// Count records and walk the upload directory.
///
/// A missing upload directory counts as empty, and unreadable entries are left
/// out of the file totals.
///
/// # Errors
///
/// Returns `BackupError` if a count fails.
pub async fn backup_stats(store: &dyn Store, uploads_dir: &Path) -> Result<BackupStats, BackupError> {
    let (wydania, produkty, czlonkowie, wiadomosci, zamowienia, klienci) = tokio::try_join!(
        store.count_releases(),
        store.count_products(),
        store.count_members(),
        store.count_messages(),
        store.count_orders(),
        store.count_customers(),
    )?;
    let records = RecordCounts {
        wydania,
        produkty,
        czlonkowie,
        wiadomosci,
        zamowienia,
        klienci,
        total: wydania + produkty + czlonkowie + wiadomosci + zamowienia + klienci,
    };

    let dir = uploads_dir.to_path_buf();
    let (count, size) = tokio::task::spawn_blocking(move || disk_usage(&dir)).await?;

    Ok(BackupStats {
        records,
        files: FileUsage {
            count,
            size,
            size_formatted: format_bytes(size),
        },
    })
}

/// Number of files and total bytes below `root`.
///
/// Entries that cannot be read are skipped.
fn disk_usage(root: &Path) -> (u64, u64) {
    let (mut count, mut size) = (0, 0);
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable upload entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(metadata) => {
                count += 1;
                size += metadata.len();
            }
            Err(e) => tracing::debug!(error = %e, path = %entry.path().display(), "Skipping upload"),
        }
    }
    (count, size)
}

/// Human-readable size: `0 B`, `512 B`, `1.5 KB`, `2.25 MB`.
///
/// Two decimals with trailing zeros dropped.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_owned();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS.get(unit).unwrap_or(&"GB"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::{MemoryStore, ReleaseStore};
    use crate::models::ReleaseDraft;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_258_291), "1.2 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5 GB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024 * 1024), "3072 GB");
    }

    #[tokio::test]
    async fn test_stats_count_records_and_files() {
        let store = MemoryStore::new();
        let release = ReleaseDraft {
            title: Some("Noc".into()),
            artists: Some("Kaz".into()),
            ..Default::default()
        }
        .into_release(Utc::now())
        .unwrap();
        store.insert_release(&release).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("covers")).unwrap();
        std::fs::write(dir.path().join("covers/a.jpg"), vec![0u8; 1536]).unwrap();
        std::fs::write(dir.path().join("b.mp3"), vec![0u8; 512]).unwrap();

        let stats = backup_stats(&store, dir.path()).await.unwrap();
        assert_eq!(stats.records.wydania, 1);
        assert_eq!(stats.records.total, 1);
        assert_eq!(stats.files.count, 2);
        assert_eq!(stats.files.size, 2048);
        assert_eq!(stats.files.size_formatted, "2 KB");
    }

    #[tokio::test]
    async fn test_missing_upload_dir_is_empty() {
        let store = MemoryStore::new();
        let dir = tempfile::tempdir().unwrap();
        let stats = backup_stats(&store, &dir.path().join("nope")).await.unwrap();
        assert_eq!(stats.files.count, 0);
        assert_eq!(stats.files.size_formatted, "0 B");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_entries_are_skipped() {
        let store = MemoryStore::new();
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("covers")).unwrap();
        std::fs::write(dir.path().join("covers/a.jpg"), vec![0u8; 100]).unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("covers/gone.jpg"),
            dir.path().join("covers/dangling.jpg"),
        )
        .unwrap();

        let stats = backup_stats(&store, dir.path()).await.unwrap();
        assert_eq!(stats.files.count, 1);
        assert_eq!(stats.files.size, 100);
    }
}
