//! Release route handlers.

use axum::{
    Router,
    extract::State,
    response::IntoResponse,
    routing::{get, put},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use mp_records_core::ReleaseId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{Json, Path};
use crate::middleware::RequireAdmin;
use crate::models::{Release, ReleaseDraft};
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Build the release router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/admin", get(admin_index))
        .route("/{id}", get(show).put(update).delete(destroy))
        .route("/{id}/move", put(move_release))
}

/// Direction for reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Deserialize)]
pub struct MoveForm {
    pub direction: Direction,
}

/// GET /api/releases
pub async fn index(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let releases = state.store().list_releases(true).await?;
    Ok(ApiResponse::list(releases))
}

/// GET /api/releases/admin
pub async fn admin_index(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let releases = state.store().list_releases(false).await?;
    Ok(ApiResponse::list(releases))
}

/// GET /api/releases/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ReleaseId>,
) -> Result<impl IntoResponse> {
    let release = find(&state, id).await?;
    Ok(ApiResponse::data(release))
}

/// POST /api/releases
#[instrument(skip_all)]
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(draft): Json<ReleaseDraft>,
) -> Result<impl IntoResponse> {
    let release = draft.into_release(Utc::now())?;
    state.store().insert_release(&release).await?;
    tracing::info!(release_id = %release.id, title = %release.title, "release created");
    Ok(ApiResponse::created(release, "Release created"))
}

/// PUT /api/releases/{id}
#[instrument(skip_all, fields(release_id = %id))]
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ReleaseId>,
    Json(draft): Json<ReleaseDraft>,
) -> Result<impl IntoResponse> {
    let mut release = find(&state, id).await?;
    draft.apply_to(&mut release, Utc::now())?;
    state.store().update_release(&release).await?;
    Ok(ApiResponse::data(release))
}

/// DELETE /api/releases/{id}
#[instrument(skip_all, fields(release_id = %id))]
pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ReleaseId>,
) -> Result<impl IntoResponse> {
    state.store().delete_release(id).await?;
    add_breadcrumb("release", "Deleted release", Some(&[("id", &id.to_string())]));
    Ok(ApiResponse::message("Release deleted"))
}

/// PUT /api/releases/{id}/move
///
/// Swaps the release with its neighbour in the admin ordering. Both get the
/// other's index as their new position.
#[instrument(skip_all, fields(release_id = %id))]
pub async fn move_release(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ReleaseId>,
    Json(form): Json<MoveForm>,
) -> Result<impl IntoResponse> {
    let releases = state.store().list_releases(false).await?;
    let index = releases
        .iter()
        .position(|r| r.id == id)
        .ok_or_else(|| AppError::NotFound("Release".to_string()))?;

    let neighbour = match form.direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => index.checked_add(1).filter(|&i| i < releases.len()),
    };
    let Some((neighbour, other)) = neighbour.and_then(|i| releases.get(i).map(|r| (i, r))) else {
        return Err(AppError::BadRequest("Cannot move further".to_string()));
    };

    let positions = [(id, to_position(neighbour)?), (other.id, to_position(index)?)];
    state.store().set_release_positions(&positions).await?;

    let releases = state.store().list_releases(false).await?;
    Ok(ApiResponse::list(releases))
}

fn to_position(index: usize) -> Result<i32> {
    i32::try_from(index).map_err(|_| AppError::Internal("position out of range".to_string()))
}

async fn find(state: &AppState, id: ReleaseId) -> Result<Release> {
    state
        .store()
        .get_release(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Release".to_string()))
}

