//! `PostgreSQL` member repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use mp_records_core::MemberId;

use super::{MemberStore, PgStore, RepositoryError, count_from};
use crate::models::Member;

const COLUMNS: &str = "id, nickname, role, photo, bio, instagram, spotify, position, active, \
                       created_at, updated_at";

#[derive(sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    nickname: String,
    role: String,
    photo: String,
    bio: String,
    instagram: String,
    spotify: String,
    position: i32,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MemberRow> for Member {
    fn from(r: MemberRow) -> Self {
        Self {
            id: MemberId::from_uuid(r.id),
            nickname: r.nickname,
            role: r.role,
            photo: r.photo,
            bio: r.bio,
            instagram: r.instagram,
            spotify: r.spotify,
            position: r.position,
            active: r.active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[async_trait]
impl MemberStore for PgStore {
    async fn list_members(&self, active_only: bool) -> Result<Vec<Member>, RepositoryError> {
        let rows = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {COLUMNS} FROM site.member
             WHERE active OR NOT $1
             ORDER BY position ASC, created_at ASC"
        ))
        .bind(active_only)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Member::from).collect())
    }

    async fn get_member(&self, id: MemberId) -> Result<Option<Member>, RepositoryError> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {COLUMNS} FROM site.member WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Member::from))
    }

    async fn find_member_by_nickname(
        &self,
        nickname: &str,
    ) -> Result<Option<Member>, RepositoryError> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {COLUMNS} FROM site.member WHERE nickname = $1
             ORDER BY created_at ASC LIMIT 1"
        ))
        .bind(nickname)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Member::from))
    }

    async fn insert_member(&self, member: &Member) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO site.member (
                id, nickname, role, photo, bio, instagram, spotify, position, active,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(member.id)
        .bind(&member.nickname)
        .bind(&member.role)
        .bind(&member.photo)
        .bind(&member.bio)
        .bind(&member.instagram)
        .bind(&member.spotify)
        .bind(member.position)
        .bind(member.active)
        .bind(member.created_at)
        .bind(member.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn update_member(&self, member: &Member) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE site.member
            SET nickname = $2, role = $3, photo = $4, bio = $5, instagram = $6,
                spotify = $7, position = $8, active = $9, created_at = $10, updated_at = $11
            WHERE id = $1
            ",
        )
        .bind(member.id)
        .bind(&member.nickname)
        .bind(&member.role)
        .bind(&member.photo)
        .bind(&member.bio)
        .bind(&member.instagram)
        .bind(&member.spotify)
        .bind(member.position)
        .bind(member.active)
        .bind(member.created_at)
        .bind(member.updated_at)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_member(&self, id: MemberId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM site.member WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn count_members(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site.member")
            .fetch_one(self.pool())
            .await?;
        count_from(count)
    }
}
