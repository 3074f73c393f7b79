//! Label member domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mp_records_core::MemberId;

use super::{ValidationError, required};

/// A label member shown on the team page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub nickname: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub photo: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub instagram: String,
    #[serde(default)]
    pub spotify: String,
    #[serde(default)]
    pub position: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// # Errors
    ///
    /// Returns `ValidationError` if the nickname is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.nickname.trim().is_empty() {
            return Err(ValidationError::new("nickname is required"));
        }
        Ok(())
    }
}

/// Member fields accepted by the admin API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDraft {
    pub nickname: Option<String>,
    pub role: Option<String>,
    pub photo: Option<String>,
    pub bio: Option<String>,
    pub instagram: Option<String>,
    pub spotify: Option<String>,
    pub position: Option<i32>,
    pub active: Option<bool>,
}

impl MemberDraft {
    /// # Errors
    ///
    /// Returns `ValidationError` if the nickname is missing.
    pub fn into_member(self, now: DateTime<Utc>) -> Result<Member, ValidationError> {
        Ok(Member {
            id: MemberId::new(),
            nickname: required(self.nickname, "nickname")?,
            role: self.role.map(|r| r.trim().to_owned()).unwrap_or_default(),
            photo: self.photo.unwrap_or_default(),
            bio: self.bio.unwrap_or_default(),
            instagram: self.instagram.unwrap_or_default(),
            spotify: self.spotify.unwrap_or_default(),
            position: self.position.unwrap_or(0),
            active: self.active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    /// # Errors
    ///
    /// Returns `ValidationError` if a provided nickname is blank.
    pub fn apply_to(self, member: &mut Member, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if let Some(nickname) = self.nickname {
            member.nickname = required(Some(nickname), "nickname")?;
        }
        if let Some(role) = self.role {
            member.role = role.trim().to_owned();
        }
        if let Some(photo) = self.photo {
            member.photo = photo;
        }
        if let Some(bio) = self.bio {
            member.bio = bio;
        }
        if let Some(instagram) = self.instagram {
            member.instagram = instagram;
        }
        if let Some(spotify) = self.spotify {
            member.spotify = spotify;
        }
        if let Some(position) = self.position {
            member.position = position;
        }
        if let Some(active) = self.active {
            member.active = active;
        }
        member.updated_at = now;
        Ok(())
    }
}
