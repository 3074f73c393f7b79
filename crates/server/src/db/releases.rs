//! `PostgreSQL` release repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use mp_records_core::ReleaseId;

use super::{PgStore, ReleaseStore, RepositoryError, count_from, parse_column};
use crate::models::Release;

const COLUMNS: &str = "id, title, artists, description, cover, year, spotify_link, \
                       preview_audio, highlight, active, position, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ReleaseRow {
    id: Uuid,
    title: String,
    artists: String,
    description: String,
    cover: String,
    year: i32,
    spotify_link: String,
    preview_audio: String,
    highlight: String,
    active: bool,
    position: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReleaseRow> for Release {
    type Error = RepositoryError;

    fn try_from(r: ReleaseRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ReleaseId::from_uuid(r.id),
            title: r.title,
            artists: r.artists,
            description: r.description,
            cover: r.cover,
            year: r.year,
            spotify_link: r.spotify_link,
            preview_audio: r.preview_audio,
            highlight: parse_column(&r.highlight)?,
            active: r.active,
            position: r.position,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

fn convert(rows: Vec<ReleaseRow>) -> Result<Vec<Release>, RepositoryError> {
    rows.into_iter().map(Release::try_from).collect()
}

#[async_trait]
impl ReleaseStore for PgStore {
    async fn list_releases(&self, active_only: bool) -> Result<Vec<Release>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReleaseRow>(&format!(
            "SELECT {COLUMNS} FROM site.release
             WHERE active OR NOT $1
             ORDER BY position ASC, created_at DESC"
        ))
        .bind(active_only)
        .fetch_all(self.pool())
        .await?;
        convert(rows)
    }

    async fn get_release(&self, id: ReleaseId) -> Result<Option<Release>, RepositoryError> {
        sqlx::query_as::<_, ReleaseRow>(&format!(
            "SELECT {COLUMNS} FROM site.release WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .map(Release::try_from)
        .transpose()
    }

    async fn find_release_by_title(
        &self,
        title: &str,
    ) -> Result<Option<Release>, RepositoryError> {
        sqlx::query_as::<_, ReleaseRow>(&format!(
            "SELECT {COLUMNS} FROM site.release WHERE title = $1
             ORDER BY created_at ASC LIMIT 1"
        ))
        .bind(title)
        .fetch_optional(self.pool())
        .await?
        .map(Release::try_from)
        .transpose()
    }

    async fn insert_release(&self, release: &Release) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO site.release (
                id, title, artists, description, cover, year, spotify_link,
                preview_audio, highlight, active, position, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(release.id)
        .bind(&release.title)
        .bind(&release.artists)
        .bind(&release.description)
        .bind(&release.cover)
        .bind(release.year)
        .bind(&release.spotify_link)
        .bind(&release.preview_audio)
        .bind(release.highlight.as_str())
        .bind(release.active)
        .bind(release.position)
        .bind(release.created_at)
        .bind(release.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn update_release(&self, release: &Release) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE site.release
            SET title = $2, artists = $3, description = $4, cover = $5, year = $6,
                spotify_link = $7, preview_audio = $8, highlight = $9, active = $10,
                position = $11, created_at = $12, updated_at = $13
            WHERE id = $1
            ",
        )
        .bind(release.id)
        .bind(&release.title)
        .bind(&release.artists)
        .bind(&release.description)
        .bind(&release.cover)
        .bind(release.year)
        .bind(&release.spotify_link)
        .bind(&release.preview_audio)
        .bind(release.highlight.as_str())
        .bind(release.active)
        .bind(release.position)
        .bind(release.created_at)
        .bind(release.updated_at)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_release(&self, id: ReleaseId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM site.release WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_release_positions(
        &self,
        positions: &[(ReleaseId, i32)],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool().begin().await?;
        for (id, position) in positions {
            let result = sqlx::query(
                "UPDATE site.release SET position = $2, updated_at = now() WHERE id = $1",
            )
            .bind(*id)
            .bind(*position)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn count_releases(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site.release")
            .fetch_one(self.pool())
            .await?;
        count_from(count)
    }
}
