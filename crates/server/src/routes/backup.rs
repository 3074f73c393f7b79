//! Backup route handlers: export, import and stats.
//!
//! All endpoints require the `admin` role.

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireFullAdmin;
use crate::routes::ApiResponse;
use crate::routes::upload::multipart_error;
use crate::services::backup::{archive_chunks, backup_stats, export_archive, import_archive};
use crate::state::AppState;

/// Request body limit for archive imports.
pub const MAX_IMPORT_BYTES: usize = 500 * 1024 * 1024;

const ZIP_CONTENT_TYPES: [&str; 2] = ["application/zip", "application/x-zip-compressed"];

/// Build the backup router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/export", get(export))
        .route(
            "/import",
            post(import).layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES)),
        )
        .route("/stats", get(stats))
}

/// Accept a file as ZIP by content type or `.zip` name.
fn is_zip(file_name: Option<&str>, content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ZIP_CONTENT_TYPES.contains(&ct))
        || file_name.is_some_and(|name| name.to_ascii_lowercase().ends_with(".zip"))
}

/// GET /api/backup/export
///
/// Streams the archive from a temporary file as `application/zip`.
#[instrument(skip_all, fields(admin = %admin.username))]
pub async fn export(
    RequireFullAdmin(admin): RequireFullAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let archive = export_archive(state.store(), state.uploads_dir()).await?;
    add_breadcrumb("backup", "Exported backup", Some(&[("filename", &archive.filename)]));

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", archive.filename),
        ),
        (header::CONTENT_LENGTH, archive.size.to_string()),
    ];
    Ok((headers, Body::from_stream(archive_chunks(archive.file))))
}

/// POST /api/backup/import
///
/// Multipart form: `backup` (the ZIP archive) and `overwrite` (`"true"` to
/// replace records matched by natural key).
#[instrument(skip_all, fields(admin = %admin.username))]
pub async fn import(
    RequireFullAdmin(admin): RequireFullAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut archive = None;
    let mut overwrite = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        match field.name() {
            Some("backup") => {
                if !is_zip(field.file_name(), field.content_type()) {
                    return Err(AppError::BadRequest("Only ZIP files are allowed".to_string()));
                }
                let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
                archive = Some(Vec::from(bytes));
            }
            Some("overwrite") => {
                overwrite = field.text().await.map_err(|e| multipart_error(&e))?.trim() == "true";
            }
            _ => {}
        }
    }

    let archive =
        archive.ok_or_else(|| AppError::BadRequest("No backup file uploaded".to_string()))?;
    let report = import_archive(state.store(), state.uploads_dir(), archive, overwrite).await?;
    state.settings().invalidate().await;
    add_breadcrumb(
        "backup",
        "Imported backup",
        Some(&[("overwrite", if overwrite { "true" } else { "false" })]),
    );

    Ok(Json(json!({
        "success": true,
        "message": "Backup imported",
        "stats": report.stats,
        "metadata": report.metadata,
    })))
}

/// GET /api/backup/stats
pub async fn stats(
    _admin: RequireFullAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let stats = backup_stats(state.store(), state.uploads_dir()).await?;
    Ok(ApiResponse::data(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_zip() {
        assert!(is_zip(Some("backup.ZIP"), Some("application/octet-stream")));
        assert!(is_zip(None, Some("application/x-zip-compressed")));
        assert!(is_zip(Some("backup"), Some("application/zip")));
        assert!(!is_zip(Some("backup.tar.gz"), Some("application/gzip")));
        assert!(!is_zip(None, None));
    }
}
