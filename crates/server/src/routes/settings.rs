//! Site settings route handlers.

use axum::{Router, extract::State, response::IntoResponse, routing::get};
use serde_json::Value;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::Json;
use crate::middleware::RequireAdmin;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(show).put(update))
}

/// GET /api/settings
pub async fn show(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let settings = state.settings().get(state.store()).await?;
    Ok(ApiResponse::data(settings))
}

/// PUT /api/settings
///
/// Top-level fields in the body replace the stored ones; the rest are kept.
#[instrument(skip_all, fields(admin = %admin.0.username))]
pub async fn update(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Json(patch): Json<Value>,
) -> Result<impl IntoResponse> {
    if !patch.is_object() {
        return Err(AppError::BadRequest("Settings must be an object".to_string()));
    }
    let settings = state.settings().update(state.store(), patch).await?;
    add_breadcrumb("settings", "Updated settings", None);
    Ok(ApiResponse::data(settings))
}
