//! Contact form route handlers.
//!
//! The public form stores a message; the admin panel reads the inbox.

use axum::{
    Router,
    extract::State,
    response::IntoResponse,
    routing::{delete, get, put},
};
use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use mp_records_core::MessageId;

use crate::error::Result;
use crate::extract::{Json, Path};
use crate::middleware::RequireAdmin;
use crate::models::MessageDraft;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Build the contact router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(submit))
        .route("/unread", get(unread))
        .route("/{id}/read", put(mark_read))
        .route("/{id}", delete(destroy))
}

/// POST /api/contact
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    Json(draft): Json<MessageDraft>,
) -> Result<impl IntoResponse> {
    let message = draft.into_message(Utc::now())?;
    state.store().insert_message(&message).await?;
    tracing::info!(message_id = %message.id, "contact message received");
    Ok(ApiResponse::created(message, "Message sent"))
}

/// GET /api/contact
pub async fn index(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    Ok(ApiResponse::list(state.store().list_messages().await?))
}

/// GET /api/contact/unread
pub async fn unread(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let count = state.store().count_unread_messages().await?;
    Ok(Json(json!({ "success": true, "count": count })))
}

/// PUT /api/contact/{id}/read
pub async fn mark_read(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
) -> Result<impl IntoResponse> {
    let message = state.store().mark_message_read(id).await?;
    Ok(ApiResponse::data(message))
}

/// DELETE /api/contact/{id}
#[instrument(skip_all, fields(message_id = %id))]
pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
) -> Result<impl IntoResponse> {
    state.store().delete_message(id).await?;
    Ok(ApiResponse::message("Message deleted"))
}
