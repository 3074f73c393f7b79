//! `PostgreSQL` admin account repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use mp_records_core::UserId;

use super::{PgStore, RepositoryError, UserStore, conflict_on_unique, count_from, parse_column};
use crate::models::AdminUser;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for AdminUser {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::from_uuid(r.id),
            username: r.username,
            role: parse_column(&r.role)?,
            created_at: r.created_at,
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn count_users(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site.admin_user")
            .fetch_one(self.pool())
            .await?;
        count_from(count)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<AdminUser>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, role, created_at FROM site.admin_user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .map(AdminUser::try_from)
        .transpose()
    }

    async fn user_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(AdminUser, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, username, role, created_at, password_hash
             FROM site.admin_user WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(r) => Ok(Some((AdminUser::try_from(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }

    async fn insert_user(
        &self,
        user: &AdminUser,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO site.admin_user (id, username, password_hash, role, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "username"))?;
        Ok(())
    }
}
