//! Storing uploaded images and audio files.
//!
//! Files land in `<uploads_dir>/<folder>/<millis>-<random><ext>` and are served
//! back under `/uploads/<folder>/<name>`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

/// Most files accepted by one multi-file upload.
pub const MAX_FILES: usize = 10;

/// Request body limit for upload endpoints.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Folder used when the request names none.
pub const DEFAULT_FOLDER: &str = "general";

const IMAGE_EXTENSIONS: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];
const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "wav", "ogg", "m4a", "aac"];

/// Errors from storing an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file uploaded")]
    NoFile,

    #[error("at most 10 files can be uploaded at once")]
    TooManyFiles,

    /// Only images and audio files are accepted.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("invalid upload folder: {0}")]
    InvalidFolder(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Kind of media an upload was accepted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
}

/// A stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub filename: String,
    /// Public path, `/uploads/<folder>/<filename>`.
    pub url: String,
}

/// Lower-case extension of `filename` without the dot.
fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Accept images by extension and `image/*` type, audio by extension or
/// `audio/*` type.
///
/// # Errors
///
/// Returns `UploadError::UnsupportedType` for anything else.
pub fn classify(filename: &str, content_type: Option<&str>) -> Result<MediaKind, UploadError> {
    let ext = extension(filename);
    let ext = ext.as_deref().unwrap_or_default();
    let mime = content_type.unwrap_or_default().to_ascii_lowercase();

    if IMAGE_EXTENSIONS.contains(&ext) && mime.starts_with("image/") {
        return Ok(MediaKind::Image);
    }
    if AUDIO_EXTENSIONS.contains(&ext) || mime.starts_with("audio/") {
        return Ok(MediaKind::Audio);
    }
    Err(UploadError::UnsupportedType(filename.to_owned()))
}

/// Check a folder name: letters, digits, `-` and `_` only.
///
/// # Errors
///
/// Returns `UploadError::InvalidFolder` otherwise.
pub fn validate_folder(folder: &str) -> Result<&str, UploadError> {
    let valid = !folder.is_empty()
        && folder.len() <= 64
        && folder
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(folder)
    } else {
        Err(UploadError::InvalidFolder(folder.to_owned()))
    }
}

/// Generated name keeping the original extension: `<millis>-<random>.<ext>`.
#[must_use]
pub fn stored_name(original: &str, millis: i64, random: u32) -> String {
    let ext = extension(original)
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    format!("{millis}-{random}{ext}")
}

/// Upload directory writer.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store one file below `folder`.
    ///
    /// # Errors
    ///
    /// Returns `UploadError` if the folder or file type is rejected or the
    /// file cannot be written.
    #[instrument(skip(self, contents), fields(size = contents.len()))]
    pub async fn save(
        &self,
        folder: &str,
        original_name: &str,
        content_type: Option<&str>,
        contents: &[u8],
    ) -> Result<StoredFile, UploadError> {
        let folder = validate_folder(folder)?;
        classify(original_name, content_type)?;

        let random = rand::rng().random_range(0..1_000_000_000);
        let filename = stored_name(original_name, Utc::now().timestamp_millis(), random);

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&filename), contents).await?;

        tracing::info!(folder, filename = %filename, "file uploaded");
        Ok(StoredFile {
            url: format!("/uploads/{folder}/{filename}"),
            filename,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_images_need_both_checks() {
        assert_eq!(
            classify("Cover.JPG", Some("image/jpeg")).unwrap(),
            MediaKind::Image
        );
        assert!(classify("cover.jpg", Some("application/octet-stream")).is_err());
        assert!(classify("cover.svg", Some("image/svg+xml")).is_err());
    }

    #[test]
    fn test_classify_audio_needs_either_check() {
        assert_eq!(
            classify("demo.mp3", Some("application/octet-stream")).unwrap(),
            MediaKind::Audio
        );
        assert_eq!(
            classify("demo", Some("audio/flac")).unwrap(),
            MediaKind::Audio
        );
        assert!(classify("notes.txt", Some("text/plain")).is_err());
    }

    #[test]
    fn test_validate_folder() {
        assert!(validate_folder("covers").is_ok());
        assert!(validate_folder("hero_video-2").is_ok());
        assert!(validate_folder("").is_err());
        assert!(validate_folder("../etc").is_err());
        assert!(validate_folder("a/b").is_err());
    }

    #[test]
    fn test_stored_name() {
        assert_eq!(stored_name("Okładka.PNG", 1_700_000, 42), "1700000-42.png");
        assert_eq!(stored_name("noext", 1, 2), "1-2");
    }

    #[tokio::test]
    async fn test_save_writes_below_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let stored = store
            .save("covers", "a.webp", Some("image/webp"), b"webp")
            .await
            .unwrap();
        assert!(stored.filename.ends_with(".webp"));
        assert_eq!(stored.url, format!("/uploads/covers/{}", stored.filename));
        assert_eq!(
            std::fs::read(dir.path().join("covers").join(&stored.filename)).unwrap(),
            b"webp"
        );
    }

    #[tokio::test]
    async fn test_save_rejects_bad_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let err = store
            .save("..", "a.png", Some("image/png"), b"png")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidFolder(_)));
    }
}
