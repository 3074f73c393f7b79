//! Release metadata lookup from public Spotify pages.
//!
//! Given a track, album or playlist link, fetches the oEmbed document (title
//! and cover) and the public page (artists and year from its meta tags)
//! concurrently. No API credentials are involved.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

const BASE_URL: &str = "https://open.spotify.com";

/// Spotify serves the full meta tags only to browser-like clients.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"spotify\.com/(?:intl-[a-z-]+/)?(track|album|playlist)/([a-zA-Z0-9]+)")
        .expect("Invalid regex")
});
static OG_DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+property="og:description"\s+content="([^"]+)""#)
        .expect("Invalid regex")
});
static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+name="description"\s+content="([^"]+)""#).expect("Invalid regex")
});
static SONG_ARTISTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Song\s*·\s*([^·]+)").expect("Invalid regex"));
static TRAILING_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"·\s*(\d{4})\s*$").expect("Invalid regex"));
static YEAR_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*·\s*\d{4}.*$").expect("Invalid regex"));

/// Errors from a metadata lookup.
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// Not a Spotify track, album or playlist link.
    #[error("invalid Spotify link")]
    InvalidLink,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// What a link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Track,
    Album,
    Playlist,
}

impl LinkKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Album => "album",
            Self::Playlist => "playlist",
        }
    }
}

/// A parsed Spotify link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyLink {
    pub kind: LinkKind,
    pub id: String,
}

impl SpotifyLink {
    /// Find a `spotify.com/<kind>/<id>` reference anywhere in `url`.
    #[must_use]
    pub fn parse(url: &str) -> Option<Self> {
        let caps = LINK_RE.captures(url)?;
        let kind = match caps.get(1)?.as_str() {
            "track" => LinkKind::Track,
            "album" => LinkKind::Album,
            _ => LinkKind::Playlist,
        };
        Some(Self {
            kind,
            id: caps.get(2)?.as_str().to_owned(),
        })
    }

    fn page_url(&self) -> String {
        format!("{BASE_URL}/{}/{}", self.kind.as_str(), self.id)
    }
}

/// Release fields prefilled in the admin form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseMetadata {
    pub title: String,
    pub artists: String,
    pub year: Option<i32>,
    pub cover: String,
    pub spotify_link: String,
    #[serde(rename = "type")]
    pub kind: LinkKind,
}

#[derive(Debug, Default, Deserialize)]
struct OEmbed {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

/// Artists and year read from the page's meta descriptions.
///
/// The `description` tag (`... Song · Artist · 2024`) is preferred; the
/// `og:description` tag (`Artist · album · Title · 2024`) is the fallback.
#[must_use]
pub fn parse_page_meta(html: &str) -> (String, Option<i32>) {
    let mut artists = String::new();
    let mut year = None;

    if let Some(desc) = capture(&DESCRIPTION_RE, html) {
        if let Some(found) = capture(&SONG_ARTISTS_RE, desc) {
            artists = YEAR_SUFFIX_RE.replace(found.trim(), "").into_owned();
        }
        year = trailing_year(desc);
    }

    if artists.is_empty()
        && let Some(desc) = capture(&OG_DESCRIPTION_RE, html)
    {
        let first = desc.split(" · ").next().unwrap_or_default().trim();
        if !first.to_lowercase().contains("listen to") {
            artists = first.to_owned();
        }
        if year.is_none() {
            year = trailing_year(desc);
        }
    }

    (artists, year)
}

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn trailing_year(desc: &str) -> Option<i32> {
    capture(&TRAILING_YEAR_RE, desc).and_then(|y| y.parse().ok())
}

/// Client for the public Spotify endpoints.
#[derive(Clone)]
pub struct SpotifyClient {
    client: reqwest::Client,
}

impl SpotifyClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new() -> Result<Self, SpotifyError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }

    /// Look up release metadata for `url`.
    ///
    /// # Errors
    ///
    /// - `SpotifyError::InvalidLink` if `url` is not a Spotify link
    /// - `SpotifyError::Http` if either upstream request fails
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<ReleaseMetadata, SpotifyError> {
        let link = SpotifyLink::parse(url).ok_or(SpotifyError::InvalidLink)?;
        let page_url = link.page_url();

        let oembed_url = Url::parse_with_params(&format!("{BASE_URL}/oembed"), [("url", &page_url)])?;

        let oembed = async {
            let response = self
                .client
                .get(oembed_url)
                .send()
                .await?
                .error_for_status()?;
            response.json::<OEmbed>().await
        };
        let page = async {
            let response = self.client.get(&page_url).send().await?;
            response.text().await
        };
        let (oembed, html) = tokio::try_join!(oembed, page)?;

        let (artists, year) = parse_page_meta(&html);
        tracing::debug!(kind = link.kind.as_str(), id = %link.id, "fetched release metadata");

        Ok(ReleaseMetadata {
            title: oembed.title.unwrap_or_default(),
            artists,
            year,
            cover: oembed.thumbnail_url.unwrap_or_default(),
            spotify_link: url.to_owned(),
            kind: link.kind,
        })
    }
}
