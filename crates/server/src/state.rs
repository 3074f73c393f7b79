//! Application state shared across handlers.

use std::path::Path;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::services::auth::{AuthService, TokenKeys};
use crate::services::settings::SettingsCache;
use crate::services::spotify::{SpotifyClient, SpotifyError};
use crate::services::uploads::UploadStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn Store>,
    keys: TokenKeys,
    settings: SettingsCache,
    uploads: UploadStore,
    spotify: SpotifyClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - Backing store for every collection
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP client cannot be built.
    pub fn new(config: ServerConfig, store: Arc<dyn Store>) -> Result<Self, SpotifyError> {
        let keys = TokenKeys::new(&config.jwt);
        let uploads = UploadStore::new(&config.uploads_dir);
        let spotify = SpotifyClient::new()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                keys,
                settings: SettingsCache::new(),
                uploads,
                spotify,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the backing store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get the token signing keys.
    #[must_use]
    pub fn keys(&self) -> &TokenKeys {
        &self.inner.keys
    }

    /// Authentication service bound to this state.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.store(), self.keys())
    }

    /// Get the settings cache.
    #[must_use]
    pub fn settings(&self) -> &SettingsCache {
        &self.inner.settings
    }

    /// Get the upload directory writer.
    #[must_use]
    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }

    #[must_use]
    pub fn uploads_dir(&self) -> &Path {
        self.inner.uploads.root()
    }

    /// Get the release metadata client.
    #[must_use]
    pub fn spotify(&self) -> &SpotifyClient {
        &self.inner.spotify
    }
}
