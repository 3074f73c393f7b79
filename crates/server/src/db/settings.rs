//! `PostgreSQL` settings repository.
//!
//! Settings are a single JSONB document in row `id = 1`.

use async_trait::async_trait;
use sqlx::types::Json;

use super::{PgStore, RepositoryError, SettingsStore};
use crate::models::Settings;

#[async_trait]
impl SettingsStore for PgStore {
    async fn load_settings(&self) -> Result<Option<Settings>, RepositoryError> {
        let body: Option<Json<Settings>> =
            sqlx::query_scalar("SELECT body FROM site.site_settings WHERE id = 1")
                .fetch_optional(self.pool())
                .await?;
        Ok(body.map(|b| b.0))
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO site.site_settings (id, body, updated_at)
            VALUES (1, $1, now())
            ON CONFLICT (id) DO UPDATE SET body = EXCLUDED.body, updated_at = now()
            ",
        )
        .bind(Json(settings))
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
