//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness
//! GET  /health/ready               - Readiness (store reachable)
//! GET  /uploads/...                - Stored media
//!
//! # Admin auth
//! POST /api/auth/login             - Admin login
//! GET  /api/auth/verify            - Current admin (admin)
//! POST /api/auth/setup             - Create the first admin
//!
//! # Catalogue (writes require admin)
//! /api/releases                    - Releases, plus PUT /{id}/move
//! /api/products                    - Products with computed stock
//! /api/members                     - Label members
//!
//! # Site
//! /api/contact                     - Contact form and inbox
//! /api/settings                    - Settings singleton
//! /api/upload                      - Media uploads (admin)
//! GET  /api/spotify/fetch?url=     - Release metadata lookup
//!
//! # Shop
//! /api/customers                   - Registration, login, profile, cart
//! /api/orders                      - Checkout and order management
//!
//! # Backup (admin role)
//! GET  /api/backup/export          - Download a ZIP archive
//! POST /api/backup/import          - Restore from a ZIP archive
//! GET  /api/backup/stats           - Record counts and upload usage
//! ```

pub mod auth;
pub mod backup;
pub mod contact;
pub mod customers;
pub mod members;
pub mod orders;
pub mod products;
pub mod releases;
pub mod settings;
pub mod spotify;
pub mod upload;

use axum::{Json, Router, http::StatusCode};
use serde::Serialize;

use crate::state::AppState;

/// JSON envelope returned by every API endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: None,
            count: None,
        })
    }

    /// `201 Created` with `data` and a message.
    pub fn created(data: T, message: &str) -> (StatusCode, Json<Self>) {
        (
            StatusCode::CREATED,
            Json(Self {
                success: true,
                data: Some(data),
                message: Some(message.to_owned()),
                count: None,
            }),
        )
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// Successful list response with its length in `count`.
    pub fn list(items: Vec<T>) -> Json<Self> {
        Json(Self {
            success: true,
            count: Some(items.len()),
            data: Some(items),
            message: None,
        })
    }
}

impl ApiResponse<()> {
    /// Successful response with only a message.
    pub fn message(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            message: Some(message.to_owned()),
            count: None,
        })
    }
}

/// Create all `/api` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/releases", releases::router())
        .nest("/api/products", products::router())
        .nest("/api/members", members::router())
        .nest("/api/contact", contact::router())
        .nest("/api/customers", customers::router())
        .nest("/api/orders", orders::router())
        .nest("/api/settings", settings::router())
        .nest("/api/upload", upload::router())
        .nest("/api/backup", backup::router())
        .nest("/api/spotify", spotify::router())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_list_envelope_counts_items() {
        let Json(body) = ApiResponse::list(vec![1, 2, 3]);
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"success": true, "data": [1, 2, 3], "count": 3})
        );
    }

    #[test]
    fn test_message_envelope_has_no_data() {
        let Json(body) = ApiResponse::message("Deleted");
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"success": true, "message": "Deleted"})
        );
    }
}
