//! Release metadata lookup route.

use axum::{
    Router,
    extract::State,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::Query;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Build the lookup router.
pub fn router() -> Router<AppState> {
    Router::new().route("/fetch", get(fetch))
}

#[derive(Debug, Default, Deserialize)]
pub struct FetchQuery {
    pub url: Option<String>,
}

/// GET /api/spotify/fetch?url=
#[instrument(skip_all)]
pub async fn fetch(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Result<impl IntoResponse> {
    let url = query
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Spotify URL is required".to_string()))?;
    let metadata = state.spotify().fetch(url.trim()).await?;
    Ok(ApiResponse::data(metadata))
}
