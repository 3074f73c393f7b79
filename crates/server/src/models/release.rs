//! Release domain types.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use mp_records_core::{ReleaseHighlight, ReleaseId};

use super::{ValidationError, required};

/// A published music release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: ReleaseId,
    pub title: String,
    pub artists: String,
    #[serde(default)]
    pub description: String,
    /// Cover image path, usually under `/uploads/`.
    #[serde(default)]
    pub cover: String,
    pub year: i32,
    #[serde(default)]
    pub spotify_link: String,
    #[serde(default)]
    pub preview_audio: String,
    #[serde(default)]
    pub highlight: ReleaseHighlight,
    pub active: bool,
    /// Display order, ascending.
    #[serde(default)]
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Release {
    /// Check invariants on a record that did not come through a draft.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the title or artists are blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("title is required"));
        }
        if self.artists.trim().is_empty() {
            return Err(ValidationError::new("artists are required"));
        }
        Ok(())
    }
}

/// Release fields accepted by the admin API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDraft {
    pub title: Option<String>,
    pub artists: Option<String>,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub year: Option<i32>,
    pub spotify_link: Option<String>,
    pub preview_audio: Option<String>,
    pub highlight: Option<ReleaseHighlight>,
    pub active: Option<bool>,
    pub position: Option<i32>,
}

impl ReleaseDraft {
    /// Build a new release, filling defaults for omitted fields.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the title or artists are missing.
    pub fn into_release(self, now: DateTime<Utc>) -> Result<Release, ValidationError> {
        Ok(Release {
            id: ReleaseId::new(),
            title: required(self.title, "title")?,
            artists: required(self.artists, "artists")?,
            description: self.description.unwrap_or_default(),
            cover: self.cover.unwrap_or_default(),
            year: self.year.unwrap_or_else(|| now.year()),
            spotify_link: self.spotify_link.unwrap_or_default(),
            preview_audio: self.preview_audio.unwrap_or_default(),
            highlight: self.highlight.unwrap_or_default(),
            active: self.active.unwrap_or(true),
            position: self.position.unwrap_or(0),
            created_at: now,
            updated_at: now,
        })
    }

    /// Merge the provided fields into `release`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if a provided title or artists value is blank.
    pub fn apply_to(self, release: &mut Release, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if let Some(title) = self.title {
            release.title = required(Some(title), "title")?;
        }
        if let Some(artists) = self.artists {
            release.artists = required(Some(artists), "artists")?;
        }
        if let Some(description) = self.description {
            release.description = description;
        }
        if let Some(cover) = self.cover {
            release.cover = cover;
        }
        if let Some(year) = self.year {
            release.year = year;
        }
        if let Some(link) = self.spotify_link {
            release.spotify_link = link;
        }
        if let Some(audio) = self.preview_audio {
            release.preview_audio = audio;
        }
        if let Some(highlight) = self.highlight {
            release.highlight = highlight;
        }
        if let Some(active) = self.active {
            release.active = active;
        }
        if let Some(position) = self.position {
            release.position = position;
        }
        release.updated_at = now;
        Ok(())
    }
}
