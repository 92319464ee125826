//! Data structures and types for StreamDub
//!
//! Contains all shared models used across the crate organized by domain:
//! - **Requests**: what the caller wants resolved and how
//! - **Streams**: resolution results, audio tracks, subtitles
//! - **Health**: provider observability snapshots
//! - **Catalogue**: TMDB search results and details for the CLI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::ValidationError;

/// Language codes that count as a Portuguese audio track
pub const PORTUGUESE_CODES: &[&str] = &["pt", "pt-BR", "por"];

/// Returns true if a language code is exactly one of [`PORTUGUESE_CODES`]
pub fn is_portuguese(lang: &str) -> bool {
    PORTUGUESE_CODES.contains(&lang)
}

// =============================================================================
// Request Models
// =============================================================================

/// Kind of content being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Movie,
    Series,
}

impl ContentType {
    /// Path segment used by Stremio add-ons and endpoint templates
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Series => "series",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Title identifiers; at least one must be present
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TitleId {
    pub tmdb: Option<String>,
    pub imdb: Option<String>,
}

impl TitleId {
    pub fn imdb(id: impl Into<String>) -> Self {
        Self {
            tmdb: None,
            imdb: Some(id.into()),
        }
    }

    pub fn tmdb(id: impl Into<String>) -> Self {
        Self {
            tmdb: Some(id.into()),
            imdb: None,
        }
    }

    /// Parse a loose identifier: `tt…` is IMDb, anything else is TMDB
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("tt") {
            Self::imdb(raw)
        } else {
            Self::tmdb(raw)
        }
    }

    /// IMDb id if known, otherwise TMDB id
    pub fn primary(&self) -> Option<&str> {
        non_empty(self.imdb.as_deref()).or_else(|| non_empty(self.tmdb.as_deref()))
    }

    pub fn imdb_id(&self) -> Option<&str> {
        non_empty(self.imdb.as_deref())
    }

    pub fn tmdb_id(&self) -> Option<&str> {
        non_empty(self.tmdb.as_deref())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// A request to resolve something playable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamRequest {
    pub title_id: TitleId,
    pub content_type: ContentType,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl StreamRequest {
    /// Request for a movie
    pub fn movie(title_id: TitleId) -> Self {
        Self {
            title_id,
            content_type: ContentType::Movie,
            season: None,
            episode: None,
        }
    }

    /// Request for a single series episode
    pub fn episode(title_id: TitleId, season: u32, episode: u32) -> Self {
        Self {
            title_id,
            content_type: ContentType::Series,
            season: Some(season),
            episode: Some(episode),
        }
    }

    /// Check identifier presence and the season/episode pairing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title_id.primary().is_none() {
            return Err(ValidationError::MissingIdentifier);
        }

        match self.content_type {
            ContentType::Movie => {
                if self.season.is_some() || self.episode.is_some() {
                    return Err(ValidationError::UnexpectedEpisode);
                }
            }
            ContentType::Series => {
                let (season, episode) = self.season_episode()?;
                if season == 0 || episode == 0 {
                    return Err(ValidationError::InvalidEpisodeNumber { season, episode });
                }
            }
        }

        Ok(())
    }

    /// Season and episode, both required for series
    pub fn season_episode(&self) -> Result<(u32, u32), ValidationError> {
        match (self.season, self.episode) {
            (Some(s), Some(e)) => Ok((s, e)),
            _ => Err(ValidationError::MissingEpisode),
        }
    }
}

/// Which audio language the caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LanguagePreference {
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en")]
    En,
    #[default]
    #[serde(rename = "original")]
    Original,
}

impl LanguagePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguagePreference::PtBr => "pt-BR",
            LanguagePreference::En => "en",
            LanguagePreference::Original => "original",
        }
    }

    /// Parse a loose preference string ("pt-br", "PT_BR", "dublado", "en", ...)
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "pt-br" | "pt" | "por" | "dublado" | "dubbed" => Some(LanguagePreference::PtBr),
            "en" | "en-us" | "english" => Some(LanguagePreference::En),
            "original" | "legendado" | "subbed" => Some(LanguagePreference::Original),
            _ => None,
        }
    }

    /// Whether a resolved stream satisfies this preference.
    ///
    /// Only `pt-BR` is selective; every other preference accepts any stream.
    pub fn accepts(&self, stream: &Stream) -> bool {
        match self {
            LanguagePreference::PtBr => stream.is_dubbed || stream.has_portuguese_audio(),
            LanguagePreference::En | LanguagePreference::Original => true,
        }
    }
}

impl fmt::Display for LanguagePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// How a resolution should be performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    pub language_preference: LanguagePreference,
    timeout: Duration,
    pub enable_cache: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            language_preference: LanguagePreference::Original,
            timeout: DEFAULT_TIMEOUT,
            enable_cache: true,
        }
    }
}

impl StreamOptions {
    pub fn with_language(mut self, language_preference: LanguagePreference) -> Self {
        self.language_preference = language_preference;
        self
    }

    /// Per-request timeout, never zero
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Set the per-request timeout; zero falls back to the default
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = if timeout_ms == 0 {
            DEFAULT_TIMEOUT
        } else {
            Duration::from_millis(timeout_ms)
        };
        self
    }

    pub fn with_cache(mut self, enable_cache: bool) -> Self {
        self.enable_cache = enable_cache;
        self
    }
}

// =============================================================================
// Stream Models
// =============================================================================

/// Container/delivery format of a resolved stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    Hls,
    Dash,
    Embed,
    Mp4,
}

impl StreamFormat {
    /// Guess the format of a direct media URL from its suffix
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
        if path.ends_with(".m3u8") {
            StreamFormat::Hls
        } else if path.ends_with(".mpd") {
            StreamFormat::Dash
        } else {
            StreamFormat::Mp4
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamFormat::Hls => write!(f, "HLS"),
            StreamFormat::Dash => write!(f, "DASH"),
            StreamFormat::Embed => write!(f, "embed"),
            StreamFormat::Mp4 => write!(f, "MP4"),
        }
    }
}

/// Audio track identifier: manifests use strings, players use indices
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackId {
    Index(i64),
    Name(String),
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackId::Index(i) => write!(f, "{}", i),
            TrackId::Name(s) => f.write_str(s),
        }
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        TrackId::Name(s.to_string())
    }
}

impl From<i64> for TrackId {
    fn from(i: i64) -> Self {
        TrackId::Index(i)
    }
}

fn undetermined() -> String {
    "und".to_string()
}

/// Audio rendition reported by a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    pub id: TrackId,
    #[serde(default = "undetermined")]
    pub lang: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

impl AudioTrack {
    pub fn is_portuguese(&self) -> bool {
        is_portuguese(&self.lang)
    }
}

impl fmt::Display for AudioTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.lang)?;
        if self.is_default {
            write!(f, " (default)")?;
        }
        Ok(())
    }
}

/// External subtitle reported by a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtitle {
    pub lang: String,
    pub url: String,
    #[serde(default)]
    pub name: String,
}

/// A resolved stream, produced by exactly one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub url: String,
    pub format: StreamFormat,
    #[serde(default)]
    pub audio_tracks: Vec<AudioTrack>,
    #[serde(default)]
    pub subtitles: Vec<Subtitle>,
    pub is_dubbed: bool,
    pub source_name: String,
}

impl Stream {
    /// An embed page with no programmatic audio control
    pub fn embed(url: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: StreamFormat::Embed,
            audio_tracks: Vec::new(),
            subtitles: Vec::new(),
            is_dubbed: false,
            source_name: source_name.into(),
        }
    }

    pub fn has_portuguese_audio(&self) -> bool {
        self.audio_tracks.iter().any(AudioTrack::is_portuguese)
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dub = if self.is_dubbed { "dubbed" } else { "original" };
        write!(
            f,
            "[{}] {} via {} ({}, {} audio tracks)",
            self.format,
            self.url,
            self.source_name,
            dub,
            self.audio_tracks.len()
        )
    }
}

// =============================================================================
// Health Models
// =============================================================================

/// Connectivity snapshot written by the health-check loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub name: String,
    pub is_online: bool,
    pub latency_ms: u64,
    pub last_check_at: DateTime<Utc>,
}

impl ProviderHealth {
    /// Snapshot assumed before the first probe runs
    pub fn initial(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_online: true,
            latency_ms: 0,
            last_check_at: Utc::now(),
        }
    }
}

// =============================================================================
// Catalogue Models (TMDB)
// =============================================================================

/// Media type discriminator for catalogue results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn content_type(&self) -> ContentType {
        match self {
            MediaType::Movie => ContentType::Movie,
            MediaType::Tv => ContentType::Series,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Movie => write!(f, "Movie"),
            MediaType::Tv => write!(f, "TV Show"),
        }
    }
}

/// Listing entry from TMDB search or trending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: u64,
    pub media_type: MediaType,
    pub title: String,
    pub year: Option<u16>,
    pub overview: String,
    pub poster_path: Option<String>,
    pub vote_average: f32,
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year_str = self.year.map(|y| format!(" ({})", y)).unwrap_or_default();
        write!(f, "{}{} [{}]", self.title, year_str, self.media_type)
    }
}

/// Title details with the external IMDb id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleDetail {
    pub id: u64,
    pub media_type: MediaType,
    pub imdb_id: Option<String>,
    pub title: String,
    pub year: Option<u16>,
    pub overview: String,
}

impl TitleDetail {
    /// Identifiers usable in a StreamRequest
    pub fn title_id(&self) -> TitleId {
        TitleId {
            tmdb: Some(self.id.to_string()),
            imdb: self.imdb_id.clone().filter(|id| !id.is_empty()),
        }
    }
}
