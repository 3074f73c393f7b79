//! Admin authentication route handlers.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use mp_records_core::AdminRole;

use crate::error::{Result, add_breadcrumb};
use crate::extract::Json;
use crate::middleware::{RequireAdmin, RequireFullAdmin};
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Build the admin auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/verify", get(verify))
        .route("/setup", post(setup))
        .route("/users", post(create_user))
}

/// Admin login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// First-admin setup form. Omitted fields fall back to configured defaults.
#[derive(Debug, Default, Deserialize)]
pub struct SetupForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// New admin account.
#[derive(Debug, Deserialize)]
pub struct CreateUserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: AdminRole,
}

/// POST /api/auth/login
#[instrument(skip_all, fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginForm>,
) -> Result<impl IntoResponse> {
    let (token, user) = state
        .auth()
        .login_admin(&form.username, &form.password)
        .await?;
    Ok(Json(json!({
        "success": true,
        "token": token,
        "user": user,
    })))
}

/// GET /api/auth/verify
pub async fn verify(RequireAdmin(user): RequireAdmin) -> impl IntoResponse {
    Json(json!({ "success": true, "user": user }))
}

/// POST /api/auth/setup
#[instrument(skip_all)]
pub async fn setup(
    State(state): State<AppState>,
    form: Option<Json<SetupForm>>,
) -> Result<impl IntoResponse> {
    let Json(form) = form.unwrap_or_default();
    let user = state
        .auth()
        .setup_admin(
            form.username,
            form.password,
            state.config().bootstrap_admin.as_ref(),
        )
        .await?;
    Ok(ApiResponse::created(user, "Admin account created"))
}

/// POST /api/auth/users
#[instrument(skip_all, fields(admin = %admin.username, username = %form.username))]
pub async fn create_user(
    RequireFullAdmin(admin): RequireFullAdmin,
    State(state): State<AppState>,
    Json(form): Json<CreateUserForm>,
) -> Result<(StatusCode, impl IntoResponse)> {
    let user = state
        .auth()
        .create_admin(&form.username, &form.password, form.role)
        .await?;
    add_breadcrumb(
        "admin",
        "Created admin account",
        Some(&[("username", &user.username), ("role", user.role.as_str())]),
    );
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "user": user }))))
}
