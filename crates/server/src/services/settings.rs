//! Cached access to the settings singleton.
//!
//! Settings are read on every public page load and change rarely, so the
//! current document is cached with `moka` and dropped whenever it is written
//! (admin update or backup import).

use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::db::{RepositoryError, SettingsStore};
use crate::models::{Settings, ValidationError};

const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Errors from a settings update.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Settings cache with explicit invalidation.
#[derive(Clone)]
pub struct SettingsCache {
    cache: Cache<(), Settings>,
}

impl Default for SettingsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// Current settings, creating and storing the defaults on first read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read or written.
    pub async fn get<S>(&self, store: &S) -> Result<Settings, RepositoryError>
    where
        S: SettingsStore + ?Sized,
    {
        if let Some(settings) = self.cache.get(&()).await {
            debug!("Cache hit for settings");
            return Ok(settings);
        }

        let settings = if let Some(stored) = store.load_settings().await? {
            stored
        } else {
            let defaults = Settings::default();
            store.save_settings(&defaults).await?;
            tracing::info!("default settings created");
            defaults
        };

        self.cache.insert((), settings.clone()).await;
        Ok(settings)
    }

    /// Merge `patch` into the stored settings and save them.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Validation` if the patch does not fit the
    /// settings shape.
    pub async fn update<S>(&self, store: &S, patch: Value) -> Result<Settings, SettingsError>
    where
        S: SettingsStore + ?Sized,
    {
        let current = store.load_settings().await?.unwrap_or_default();
        let merged = current.merged(patch, Utc::now())?;
        store.save_settings(&merged).await?;
        self.invalidate().await;
        Ok(merged)
    }

    /// Drop the cached document so the next read goes to the store.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_first_read_stores_defaults() {
        let store = MemoryStore::new();
        let cache = SettingsCache::new();

        let settings = cache.get(&store).await.unwrap();
        assert_eq!(settings, Settings::default());
        assert!(store.load_settings().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_invalidates_cache() {
        let store = MemoryStore::new();
        let cache = SettingsCache::new();
        cache.get(&store).await.unwrap();

        cache
            .update(&store, json!({"marqueeEnabled": false}))
            .await
            .unwrap();

        let settings = cache.get(&store).await.unwrap();
        assert!(!settings.marquee_enabled);
        assert!(settings.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_external_write_needs_invalidation() {
        let store = MemoryStore::new();
        let cache = SettingsCache::new();
        cache.get(&store).await.unwrap();

        let changed = Settings {
            hero_image: "/uploads/hero/a.jpg".into(),
            ..Settings::default()
        };
        store.save_settings(&changed).await.unwrap();
        assert_eq!(cache.get(&store).await.unwrap().hero_image, "");

        cache.invalidate().await;
        assert_eq!(
            cache.get(&store).await.unwrap().hero_image,
            "/uploads/hero/a.jpg"
        );
    }
}
