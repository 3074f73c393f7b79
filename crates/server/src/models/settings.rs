//! Site-wide settings singleton.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ValidationError;

const DEFAULT_INTERVAL_MS: u32 = 3000;

/// Links shown in the site footer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    pub instagram: String,
    pub youtube: String,
    pub spotify: String,
    pub tiktok: String,
}

/// Rotating headline configuration for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageHeadline {
    pub enabled: bool,
    pub phrases: Vec<String>,
    /// Milliseconds between phrases.
    pub interval: u32,
}

impl Default for PageHeadline {
    fn default() -> Self {
        Self {
            enabled: false,
            phrases: Vec::new(),
            interval: DEFAULT_INTERVAL_MS,
        }
    }
}

/// Site-wide toggles and media.
///
/// Missing fields take their defaults when deserializing, so older stored
/// documents and partial archives stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub social_media: SocialLinks,
    pub hero_video: String,
    pub hero_image: String,
    pub particles_enabled: bool,
    pub custom_cursor_enabled: bool,
    pub mini_player_enabled: bool,
    pub mini_player_track_id: String,
    pub marquee_enabled: bool,
    pub marquee_text: String,
    pub marquee_pages: Vec<String>,
    pub page_headlines: BTreeMap<String, PageHeadline>,
    pub headline_enabled: bool,
    pub headline_phrases: Vec<String>,
    pub headline_interval: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            social_media: SocialLinks::default(),
            hero_video: String::new(),
            hero_image: String::new(),
            particles_enabled: true,
            custom_cursor_enabled: true,
            mini_player_enabled: true,
            mini_player_track_id: String::new(),
            marquee_enabled: true,
            marquee_text: "MP RECORDS • NOWA MUZYKA • SPRAWDŹ WYDANIA •".to_owned(),
            marquee_pages: ["/", "/wydania", "/sklep", "/media", "/czlonkowie"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            page_headlines: BTreeMap::new(),
            headline_enabled: true,
            headline_phrases: ["MP RECORDS", "NOWA ERA", "SŁUCHAJ TERAZ", "DOŁĄCZ DO NAS"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            headline_interval: DEFAULT_INTERVAL_MS,
            updated_at: None,
        }
    }
}

impl Settings {
    /// Overlay the top-level fields of `patch` onto these settings.
    ///
    /// Fields absent from the patch keep their current value; a present field
    /// replaces the whole value (nested objects are not merged).
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the patch is not an object or a field has
    /// the wrong type.
    pub fn merged(&self, patch: Value, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let Value::Object(patch) = patch else {
            return Err(ValidationError::new("settings must be a JSON object"));
        };
        let mut current = serde_json::to_value(self)
            .map_err(|e| ValidationError(format!("settings could not be encoded: {e}")))?;
        if let Value::Object(fields) = &mut current {
            for (key, value) in patch {
                fields.insert(key, value);
            }
        }
        let mut merged: Self = serde_json::from_value(current)
            .map_err(|e| ValidationError(format!("invalid settings: {e}")))?;
        merged.updated_at = Some(now);
        Ok(merged)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.particles_enabled);
        assert_eq!(settings.marquee_pages.len(), 5);
        assert_eq!(settings.headline_phrases.first().unwrap(), "MP RECORDS");
        assert_eq!(settings.headline_interval, 3000);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let settings: Settings = serde_json::from_value(json!({
            "heroVideo": "/uploads/video/hero.mp4",
            "pageHeadlines": {"/sklep": {"enabled": true}}
        }))
        .unwrap();
        assert_eq!(settings.hero_video, "/uploads/video/hero.mp4");
        assert!(settings.marquee_enabled);
        let shop = settings.page_headlines.get("/sklep").unwrap();
        assert!(shop.enabled);
        assert_eq!(shop.interval, 3000);
    }

    #[test]
    fn test_merge_replaces_only_given_fields() {
        let now = Utc::now();
        let merged = Settings::default()
            .merged(json!({"particlesEnabled": false, "marqueeText": "NOWOŚĆ"}), now)
            .unwrap();
        assert!(!merged.particles_enabled);
        assert_eq!(merged.marquee_text, "NOWOŚĆ");
        assert!(merged.custom_cursor_enabled);
        assert_eq!(merged.updated_at, Some(now));
    }

    #[test]
    fn test_merge_rejects_wrong_type() {
        let result = Settings::default().merged(json!({"headlineInterval": "fast"}), Utc::now());
        assert!(result.is_err());
        assert!(Settings::default().merged(json!([1, 2]), Utc::now()).is_err());
    }
}
