//! TMDB (The Movie Database) API client
//!
//! Provides the browsable catalogue (search, trending) and the IMDb id
//! lookup needed to build stream requests.
//! API docs: https://developer.themoviedb.org/docs

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::{MediaType, SearchResult, TitleDetail};

/// TMDB API error types
#[derive(Error, Debug)]
pub enum TmdbError {
    #[error("Resource not found (404)")]
    NotFound,

    #[error("Rate limited (429), retries exhausted")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, TmdbError>;

/// TMDB API client
pub struct TmdbClient {
    api_key: String,
    base_url: String,
    language: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl TmdbClient {
    /// Create a new TMDB client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.themoviedb.org/3")
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            language: "pt-BR".to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            max_retries: 3,
        }
    }

    /// GET an endpoint, retrying on rate limits
    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut retries = 0;

        loop {
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("api_key", self.api_key.as_str()),
                    ("language", self.language.as_str()),
                ])
                .query(query)
                .header("Accept", "application/json")
                .send()
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await?;
                    return serde_json::from_str(&body).map_err(|e| {
                        TmdbError::InvalidResponse(format!("JSON parse error: {}", e))
                    });
                }
                StatusCode::NOT_FOUND => return Err(TmdbError::NotFound),
                StatusCode::TOO_MANY_REQUESTS => {
                    retries += 1;
                    if retries >= self.max_retries {
                        return Err(TmdbError::RateLimited);
                    }

                    let wait_secs = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(2u64.pow(retries));

                    tracing::debug!(wait_secs, retries, "TMDB rate limited, backing off");
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                }
                status => return Err(TmdbError::ServerError(status.as_u16())),
            }
        }
    }

    /// Search for movies and TV shows
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let response: SearchResponse = self
            .get("/search/multi", &[("query", query), ("page", "1")])
            .await?;
        Ok(response.into_results(None))
    }

    /// Trending titles for a window ("day" or "week")
    pub async fn trending(&self, window: &str) -> Result<Vec<SearchResult>> {
        let endpoint = format!("/trending/all/{}", window);
        let response: SearchResponse = self.get(&endpoint, &[]).await?;
        Ok(response.into_results(None))
    }

    /// Popular movies, the default landing listing
    pub async fn popular_movies(&self) -> Result<Vec<SearchResult>> {
        let response: SearchResponse = self.get("/movie/popular", &[("page", "1")]).await?;
        Ok(response.into_results(Some(MediaType::Movie)))
    }

    /// Movie details including the IMDb id
    pub async fn movie_detail(&self, id: u64) -> Result<TitleDetail> {
        let endpoint = format!("/movie/{}", id);
        let response: DetailResponse = self
            .get(&endpoint, &[("append_to_response", "external_ids")])
            .await?;
        Ok(response.into_detail(MediaType::Movie))
    }

    /// TV show details including the IMDb id
    pub async fn tv_detail(&self, id: u64) -> Result<TitleDetail> {
        let endpoint = format!("/tv/{}", id);
        let response: DetailResponse = self
            .get(&endpoint, &[("append_to_response", "external_ids")])
            .await?;
        Ok(response.into_detail(MediaType::Tv))
    }
}

// =============================================================================
// Response Structures (internal deserialization)
// =============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResultRaw>,
}

impl SearchResponse {
    /// `implied` fills in the type for endpoints that omit `media_type`
    fn into_results(self, implied: Option<MediaType>) -> Vec<SearchResult> {
        self.results
            .into_iter()
            .filter_map(|r| r.into_search_result(implied))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResultRaw {
    id: u64,
    media_type: Option<String>,
    // Movies use "title", TV uses "name"
    title: Option<String>,
    name: Option<String>,
    // Movies use "release_date", TV uses "first_air_date"
    release_date: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    vote_average: Option<f32>,
}

impl SearchResultRaw {
    fn into_search_result(self, implied: Option<MediaType>) -> Option<SearchResult> {
        let media_type = match self.media_type.as_deref() {
            Some("movie") => MediaType::Movie,
            Some("tv") => MediaType::Tv,
            None => implied?,
            _ => return None, // people and other types
        };

        let title = self.title.or(self.name).unwrap_or_default();
        let year = self
            .release_date
            .or(self.first_air_date)
            .and_then(|d| extract_year(&d));

        Some(SearchResult {
            id: self.id,
            media_type,
            title,
            year,
            overview: self.overview.unwrap_or_default(),
            poster_path: self.poster_path,
            vote_average: self.vote_average.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    id: u64,
    imdb_id: Option<String>,
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    external_ids: Option<ExternalIds>,
}

impl DetailResponse {
    fn into_detail(self, media_type: MediaType) -> TitleDetail {
        // movies carry imdb_id at the top level, shows only in external_ids
        let imdb_id = self
            .imdb_id
            .or(self.external_ids.and_then(|e| e.imdb_id))
            .filter(|id| !id.is_empty());

        TitleDetail {
            id: self.id,
            media_type,
            imdb_id,
            title: self.title.or(self.name).unwrap_or_default(),
            year: self
                .release_date
                .or(self.first_air_date)
                .and_then(|d| extract_year(&d)),
            overview: self.overview.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

/// Extract year from a date string like "2022-03-04"
fn extract_year(date: &str) -> Option<u16> {
    date.get(..4).and_then(|y| y.parse().ok())
}
