//! Archive export.
//!
//! The store is read with all collections fetched concurrently, then the
//! archive is written synchronously on the blocking pool: the manifest first,
//! then every referenced upload that exists on disk. HTTP exports write into an
//! anonymous temporary file which is streamed back to the client in chunks.

use std::collections::BTreeSet;
use std::io::{Seek, Write};
use std::path::Path;

use async_stream::try_stream;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::Stream;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::instrument;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use super::manifest::{Manifest, Snapshot};
use super::{BackupError, MANIFEST_NAME, UPLOADS_PREFIX, upload_relative_path};
use crate::db::{OrderFilter, ProductFilter, RepositoryError, Store};

const CHUNK_SIZE: u64 = 64 * 1024;

/// What went into an archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub records: usize,
    pub files: usize,
    /// Referenced uploads that were not found on disk.
    pub missing_files: usize,
}

/// A finished export ready to be sent.
#[derive(Debug)]
pub struct ExportedArchive {
    /// Download name, `mprecords-backup-<timestamp>.zip`.
    pub filename: String,
    /// Archive contents, positioned at the start.
    pub file: tokio::fs::File,
    pub size: u64,
    pub summary: ArchiveSummary,
}

/// Read every collection exported in a backup.
///
/// # Errors
///
/// Returns `RepositoryError` if any collection cannot be read.
pub async fn snapshot(store: &dyn Store) -> Result<Snapshot, RepositoryError> {
    let (releases, products, members, messages, orders, settings, customers) = tokio::try_join!(
        store.list_releases(false),
        store.list_products(ProductFilter::default()),
        store.list_members(false),
        store.list_messages(),
        store.list_orders(OrderFilter::default()),
        store.load_settings(),
        store.list_customers(),
    )?;
    Ok(Snapshot {
        releases,
        products,
        members,
        messages,
        orders,
        settings,
        customers,
    })
}

/// Distinct upload paths (relative to the upload directory) referenced by
/// release covers, product images and member photos.
#[must_use]
pub fn referenced_uploads(snapshot: &Snapshot) -> BTreeSet<String> {
    let covers = snapshot.releases.iter().map(|r| r.cover.as_str());
    let images = snapshot
        .products
        .iter()
        .flat_map(|p| p.images.iter().map(String::as_str));
    let photos = snapshot.members.iter().map(|m| m.photo.as_str());

    covers
        .chain(images)
        .chain(photos)
        .filter_map(upload_relative_path)
        .map(str::to_owned)
        .collect()
}

/// Download name for an archive exported at `now`.
#[must_use]
pub fn archive_filename(now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("mprecords-backup-{stamp}.zip")
}

/// Write a complete archive for `snapshot` into `writer`.
///
/// Referenced uploads missing from `uploads_dir` are skipped with a warning.
///
/// # Errors
///
/// Returns `BackupError` if the manifest cannot be encoded or the archive
/// cannot be written.
pub fn write_archive<W: Write + Seek>(
    writer: W,
    snapshot: &Snapshot,
    exported_at: DateTime<Utc>,
    uploads_dir: &Path,
) -> Result<(W, ArchiveSummary), BackupError> {
    let manifest = Manifest::from_snapshot(snapshot, exported_at).map_err(BackupError::Encode)?;
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    let mut zip = ZipWriter::new(writer);
    zip.start_file(MANIFEST_NAME, options)
        .map_err(BackupError::Write)?;
    serde_json::to_writer_pretty(&mut zip, &manifest).map_err(BackupError::Encode)?;

    let mut summary = ArchiveSummary {
        records: snapshot.record_count(),
        ..ArchiveSummary::default()
    };
    for rel in referenced_uploads(snapshot) {
        let path = uploads_dir.join(&rel);
        let mut file = match std::fs::File::open(&path) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "referenced upload missing, skipped");
                summary.missing_files += 1;
                continue;
            }
        };
        zip.start_file(format!("{UPLOADS_PREFIX}{rel}"), options)
            .map_err(BackupError::Write)?;
        std::io::copy(&mut file, &mut zip)?;
        summary.files += 1;
    }

    let writer = zip.finish().map_err(BackupError::Write)?;
    Ok((writer, summary))
}

/// Read the store and write an archive into `writer` on the blocking pool.
///
/// # Errors
///
/// Returns `BackupError` if the store cannot be read or the archive cannot be
/// written.
#[instrument(skip_all, fields(uploads_dir = %uploads_dir.display()))]
pub async fn export_to<W>(
    store: &dyn Store,
    uploads_dir: &Path,
    writer: W,
) -> Result<(W, ArchiveSummary), BackupError>
where
    W: Write + Seek + Send + 'static,
{
    let snapshot = snapshot(store).await?;
    let dir = uploads_dir.to_path_buf();
    let exported_at = Utc::now();
    let (writer, summary) =
        tokio::task::spawn_blocking(move || write_archive(writer, &snapshot, exported_at, &dir))
            .await??;

    tracing::info!(
        records = summary.records,
        files = summary.files,
        missing_files = summary.missing_files,
        "backup archive written"
    );
    Ok((writer, summary))
}

/// Export a backup into an anonymous temporary file.
///
/// # Errors
///
/// Returns `BackupError` if the store cannot be read or the archive cannot be
/// written.
pub async fn export_archive(
    store: &dyn Store,
    uploads_dir: &Path,
) -> Result<ExportedArchive, BackupError> {
    let now = Utc::now();
    let (file, summary) = export_to(store, uploads_dir, tempfile::tempfile()?).await?;

    let mut file = tokio::fs::File::from_std(file);
    let size = file.metadata().await?.len();
    file.rewind().await?;

    Ok(ExportedArchive {
        filename: archive_filename(now),
        file,
        size,
        summary,
    })
}

/// Stream `file` in fixed-size chunks.
pub fn archive_chunks(mut file: tokio::fs::File) -> impl Stream<Item = std::io::Result<Vec<u8>>> {
    try_stream! {
        loop {
            let mut chunk = Vec::new();
            let read = (&mut file).take(CHUNK_SIZE).read_to_end(&mut chunk).await?;
            if read == 0 {
                break;
            }
            yield chunk;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::io::{Cursor, Read};

    use chrono::TimeZone;
    use futures::StreamExt;
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{MemberDraft, ProductDraft, ReleaseDraft};
    use crate::services::backup::ManifestData;

    fn sample_snapshot() -> Snapshot {
        let now = Utc::now();
        Snapshot {
            releases: vec![
                ReleaseDraft {
                    title: Some("Noc".into()),
                    artists: Some("Kaz".into()),
                    cover: Some("/uploads/covers/noc.jpg".into()),
                    ..Default::default()
                }
                .into_release(now)
                .unwrap(),
            ],
            products: vec![
                ProductDraft {
                    name: Some("Koszulka".into()),
                    price: Some(Decimal::new(8900, 2)),
                    images: Some(vec![
                        "/uploads/products/missing.jpg".into(),
                        "/uploads/covers/noc.jpg".into(),
                        "https://cdn.example.com/x.jpg".into(),
                    ]),
                    ..Default::default()
                }
                .into_product(now)
                .unwrap(),
            ],
            members: vec![
                MemberDraft {
                    nickname: Some("Lena".into()),
                    ..Default::default()
                }
                .into_member(now)
                .unwrap(),
            ],
            ..Snapshot::default()
        }
    }

    #[test]
    fn test_filename_from_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            archive_filename(at),
            "mprecords-backup-2024-03-09T14-05-07-000Z.zip"
        );
    }

    #[test]
    fn test_referenced_uploads_distinct_and_local() {
        let files = referenced_uploads(&sample_snapshot());
        let files: Vec<_> = files.iter().map(String::as_str).collect();
        assert_eq!(files, ["covers/noc.jpg", "products/missing.jpg"]);
    }

    #[test]
    fn test_write_archive_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("covers")).unwrap();
        std::fs::write(dir.path().join("covers/noc.jpg"), b"jpeg bytes").unwrap();

        let (cursor, summary) =
            write_archive(Cursor::new(Vec::new()), &sample_snapshot(), Utc::now(), dir.path())
                .unwrap();
        assert_eq!(summary.files, 1);
        assert_eq!(summary.missing_files, 1);
        assert_eq!(summary.records, 3);

        let mut archive = zip::ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.by_index(0).unwrap().name(), "data.json");

        let mut contents = Vec::new();
        archive
            .by_name("uploads/covers/noc.jpg")
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        assert_eq!(contents, b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_empty_store_exports_manifest_only() {
        let store = MemoryStore::new();
        let dir = tempfile::tempdir().unwrap();

        let exported = export_archive(&store, dir.path()).await.unwrap();
        assert!(exported.filename.starts_with("mprecords-backup-"));
        assert_eq!(exported.summary, ArchiveSummary::default());

        let mut bytes = Vec::new();
        let mut chunks = std::pin::pin!(archive_chunks(exported.file));
        while let Some(chunk) = chunks.next().await {
            bytes.extend(chunk.unwrap());
        }
        assert_eq!(u64::try_from(bytes.len()).unwrap(), exported.size);

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
        let manifest: Manifest =
            serde_json::from_reader(archive.by_name("data.json").unwrap()).unwrap();
        assert_eq!(manifest.data, ManifestData::default());
    }
}
