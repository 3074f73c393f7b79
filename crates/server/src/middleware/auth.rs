//! Bearer token extractors.
//!
//! Admin and customer tokens travel in the `Authorization: Bearer <token>`
//! header. Each extractor resolves the token to its account through
//! [`AuthService`](crate::services::auth::AuthService).

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use mp_records_core::AdminRole;

use crate::error::{AppError, set_sentry_user};
use crate::models::{AdminUser, Customer};
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Token from the `Authorization` header, if any.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extractor that requires an admin panel account of any role.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAdmin(user): RequireAdmin) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAdmin(pub AdminUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let user = state.auth().admin_from_token(token).await?;
        set_sentry_user(&user.id, Some(&user.username));
        Ok(Self(user))
    }
}

/// Extractor that requires an admin account with the `admin` role.
///
/// Editors get 403.
pub struct RequireFullAdmin(pub AdminUser);

impl FromRequestParts<AppState> for RequireFullAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAdmin(user) = RequireAdmin::from_request_parts(parts, state).await?;
        if user.role != AdminRole::Admin {
            tracing::warn!(username = %user.username, role = %user.role, "admin role required");
            return Err(AppError::Forbidden("Admin role required".to_string()));
        }
        Ok(Self(user))
    }
}

/// Extractor that requires an active shop customer.
pub struct RequireCustomer(pub Customer);

impl FromRequestParts<AppState> for RequireCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let customer = state.auth().customer_from_token(token).await?;
        set_sentry_user(&customer.id, None);
        Ok(Self(customer))
    }
}

/// Extractor that optionally resolves the current customer.
///
/// A missing, invalid or expired token yields a guest (`None`); only store
/// failures reject the request.
pub struct OptionalCustomer(pub Option<Customer>);

impl FromRequestParts<AppState> for OptionalCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(Self(None));
        };
        match state.auth().customer_from_token(token).await {
            Ok(customer) => {
                set_sentry_user(&customer.id, None);
                Ok(Self(Some(customer)))
            }
            Err(AuthError::Repository(err)) => Err(err.into()),
            Err(err) => {
                tracing::debug!(error = %err, "ignoring customer token");
                Ok(Self(None))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/orders");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
