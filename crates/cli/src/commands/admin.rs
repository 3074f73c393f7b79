//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! mp-cli admin create -u kasia -p 'long password' -r editor
//! ```

use mp_records_core::AdminRole;
use mp_records_server::db::RepositoryError;
use mp_records_server::services::auth::{self, AuthError};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: admin, editor")]
    InvalidRole(String),

    /// Username already taken.
    #[error("Admin user already exists: {0}")]
    UserExists(String),

    #[error(transparent)]
    Auth(AuthError),
}

/// Create a new admin account.
///
/// # Arguments
///
/// * `username` - Login name
/// * `password` - Plain password, hashed before storing
/// * `role` - `admin` or `editor`
///
/// # Errors
///
/// Returns `AdminError` for an unknown role, a taken username, a short
/// password or a database failure.
pub async fn create_user(username: &str, password: &str, role: &str) -> Result<(), AdminError> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;

    let store = connect().await?;

    tracing::info!("Creating admin user: {} ({})", username, role);
    let user = auth::create_admin(&store, username, password, role)
        .await
        .map_err(|e| match e {
            AuthError::Repository(RepositoryError::Conflict(_)) => {
                AdminError::UserExists(username.to_owned())
            }
            other => AdminError::Auth(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Username: {}, Role: {}",
        user.id,
        user.username,
        user.role
    );
    Ok(())
}
