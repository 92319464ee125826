//! Error types for stream resolution
//!
//! Validation errors reach the caller. Provider errors stop at the
//! registry, where they count against the provider's circuit breaker.

use std::time::Duration;
use thiserror::Error;

/// Problems with the request itself; never retried
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("request has neither a TMDB nor an IMDb identifier")]
    MissingIdentifier,

    #[error("series requests need both season and episode")]
    MissingEpisode,

    #[error("season and episode must be positive (got S{season}E{episode})")]
    InvalidEpisodeNumber { season: u32, episode: u32 },

    #[error("season/episode given for a movie request")]
    UnexpectedEpisode,
}

/// Failure of a single provider attempt
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed manifest: {0}")]
    Manifest(String),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("{0} is unreachable")]
    Unreachable(String),

    #[error("provider has no endpoints configured")]
    NotConfigured,
}

impl ProviderError {
    pub(crate) fn status(status: reqwest::StatusCode, url: &str) -> Self {
        ProviderError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        }
    }
}
