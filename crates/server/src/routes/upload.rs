//! Media upload route handlers.

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::Path;
use crate::middleware::RequireAdmin;
use crate::routes::ApiResponse;
use crate::services::uploads::{
    DEFAULT_FOLDER, MAX_FILES, MAX_UPLOAD_BYTES, StoredFile, UploadError,
};
use crate::state::AppState;

/// Build the upload router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(upload_single))
        .route("/{folder}", post(upload_to_folder))
        .route("/{folder}/multiple", post(upload_multiple))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// One file part read from the form.
struct FilePart {
    name: String,
    content_type: Option<String>,
    contents: Vec<u8>,
}

/// Parsed upload form.
#[derive(Default)]
struct UploadForm {
    folder: Option<String>,
    files: Vec<FilePart>,
}

pub(crate) fn multipart_error(err: &MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Read every part: `folder` as text, `file`/`files` as uploads.
async fn read_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        match field.name() {
            Some("folder") => {
                let text = field.text().await.map_err(|e| multipart_error(&e))?;
                form.folder = Some(text.trim().to_owned()).filter(|f| !f.is_empty());
            }
            Some("file" | "files") => {
                let name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().map(str::to_owned);
                let contents = field.bytes().await.map_err(|e| multipart_error(&e))?;
                form.files.push(FilePart {
                    name,
                    content_type,
                    contents: contents.to_vec(),
                });
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn save_one(
    state: &AppState,
    folder: &str,
    file: &FilePart,
) -> Result<axum::Json<ApiResponse<StoredFile>>> {
    let stored = state
        .uploads()
        .save(folder, &file.name, file.content_type.as_deref(), &file.contents)
        .await?;
    Ok(ApiResponse::data(stored))
}

/// POST /api/upload
///
/// The target folder comes from the `folder` form field.
#[instrument(skip_all)]
pub async fn upload_single(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = read_form(multipart).await?;
    let folder = form.folder.as_deref().unwrap_or(DEFAULT_FOLDER);
    let file = form.files.first().ok_or(UploadError::NoFile)?;
    save_one(&state, folder, file).await
}

/// POST /api/upload/{folder}
#[instrument(skip_all, fields(folder = %folder))]
pub async fn upload_to_folder(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(folder): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = read_form(multipart).await?;
    let file = form.files.first().ok_or(UploadError::NoFile)?;
    save_one(&state, &folder, file).await
}

/// POST /api/upload/{folder}/multiple
#[instrument(skip_all, fields(folder = %folder))]
pub async fn upload_multiple(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(folder): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = read_form(multipart).await?;
    if form.files.is_empty() {
        return Err(UploadError::NoFile.into());
    }
    if form.files.len() > MAX_FILES {
        return Err(UploadError::TooManyFiles.into());
    }

    let mut stored = Vec::with_capacity(form.files.len());
    for file in &form.files {
        stored.push(
            state
                .uploads()
                .save(&folder, &file.name, file.content_type.as_deref(), &file.contents)
                .await?,
        );
    }
    Ok(ApiResponse::list(stored))
}
