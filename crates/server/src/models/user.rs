//! Admin account domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mp_records_core::{AdminRole, UserId};

/// An admin panel account.
///
/// The password hash is kept out of this type; see `UserStore::user_credentials`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: UserId,
    pub username: String,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
}
