//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] mp_records_core::EmailError),

    /// Registration data failed validation.
    #[error("{0}")]
    Validation(#[from] crate::models::ValidationError),

    /// A required login field was empty.
    #[error("{0}")]
    MissingField(&'static str),

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Customer account was deactivated by an admin.
    #[error("account deactivated")]
    AccountDisabled,

    /// Customer email is already registered.
    #[error("an account with this email already exists")]
    EmailTaken,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Setup was requested after an admin already exists.
    #[error("an admin account already exists")]
    SetupComplete,

    /// No bearer token on a protected request.
    #[error("missing bearer token")]
    MissingToken,

    /// Token is malformed, expired, or of the wrong kind.
    #[error("invalid token")]
    InvalidToken,

    /// Token signing failed.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
