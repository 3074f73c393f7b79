//! Label member route handlers.

use axum::{
    Router,
    extract::State,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use tracing::instrument;

use mp_records_core::MemberId;

use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAdmin;
use crate::models::MemberDraft;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Build the member router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/admin", get(admin_index))
        .route("/{id}", get(show).put(update).delete(destroy))
}

/// GET /api/members
pub async fn index(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(ApiResponse::list(state.store().list_members(true).await?))
}

/// GET /api/members/admin
pub async fn admin_index(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    Ok(ApiResponse::list(state.store().list_members(false).await?))
}

/// GET /api/members/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<MemberId>,
) -> Result<impl IntoResponse> {
    let member = state
        .store()
        .get_member(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member".to_string()))?;
    Ok(ApiResponse::data(member))
}

/// POST /api/members
#[instrument(skip_all)]
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(draft): Json<MemberDraft>,
) -> Result<impl IntoResponse> {
    let member = draft.into_member(Utc::now())?;
    state.store().insert_member(&member).await?;
    tracing::info!(member_id = %member.id, nickname = %member.nickname, "member created");
    Ok(ApiResponse::created(member, "Member created"))
}

/// PUT /api/members/{id}
#[instrument(skip_all, fields(member_id = %id))]
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<MemberId>,
    Json(draft): Json<MemberDraft>,
) -> Result<impl IntoResponse> {
    let mut member = state
        .store()
        .get_member(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member".to_string()))?;
    draft.apply_to(&mut member, Utc::now())?;
    state.store().update_member(&member).await?;
    Ok(ApiResponse::data(member))
}

/// DELETE /api/members/{id}
#[instrument(skip_all, fields(member_id = %id))]
pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<MemberId>,
) -> Result<impl IntoResponse> {
    state.store().delete_member(id).await?;
    Ok(ApiResponse::message("Member deleted"))
}
