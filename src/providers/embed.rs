//! Subtitled embed provider
//!
//! Walks a fixed list of embed hosts and returns the first page that
//! answers. Embeds carry original audio with subtitles, so results are
//! never marked as dubbed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{http_client, StreamProvider, PROBE_TIMEOUT, PROBE_TITLE_ID};
use crate::error::{ProviderError, ValidationError};
use crate::models::{ContentType, Stream, StreamOptions, StreamRequest};

pub const EMBED_PROVIDER_NAME: &str = "LegendadoEmbed";
pub const EMBED_PROVIDER_PRIORITY: i32 = 100;

/// Embed hosts, tried in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedSources {
    /// Movie bases; the title id is appended
    pub movie: Vec<String>,
    /// Series bases; `{id}/{season}/{episode}` is appended
    pub series: Vec<String>,
    /// Extra movie base tried with the IMDb id when every movie base fails
    pub imdb_fallback: Option<String>,
}

impl Default for EmbedSources {
    fn default() -> Self {
        Self {
            movie: vec![
                "https://vidsrc.me/embed/movie/".to_string(),
                "https://2embed.cc/embed/movie/".to_string(),
                "https://embed.su/embed/movie/".to_string(),
                "https://www.2embed.cc/embed/movie/".to_string(),
                "https://v2.vidsrc.me/embed/movie/".to_string(),
            ],
            series: vec![
                "https://vidsrc.me/embed/tv/".to_string(),
                "https://2embed.cc/embed/tv/".to_string(),
                "https://embed.su/embed/tv/".to_string(),
                "https://vidsrc.to/embed/tv/".to_string(),
            ],
            imdb_fallback: Some("https://vidsrc.to/embed/movie/".to_string()),
        }
    }
}

/// Fallback provider serving subtitled embed pages
pub struct SubtitledEmbedProvider {
    client: reqwest::Client,
    sources: EmbedSources,
}

impl SubtitledEmbedProvider {
    pub fn new() -> Self {
        Self::with_sources(EmbedSources::default())
    }

    /// Create a provider with custom hosts (for testing and config overrides)
    pub fn with_sources(sources: EmbedSources) -> Self {
        Self {
            client: http_client(),
            sources,
        }
    }

    pub fn sources(&self) -> &EmbedSources {
        &self.sources
    }

    /// Candidate URLs for a request, in attempt order
    fn candidate_urls(&self, request: &StreamRequest) -> Result<Vec<String>, ProviderError> {
        let id = request
            .title_id
            .primary()
            .ok_or(ValidationError::MissingIdentifier)?;

        let urls = match request.content_type {
            ContentType::Series => {
                let (season, episode) = request.season_episode()?;
                self.sources
                    .series
                    .iter()
                    .map(|base| format!("{}{}/{}/{}", base, id, season, episode))
                    .collect()
            }
            ContentType::Movie => {
                let mut urls: Vec<String> = self
                    .sources
                    .movie
                    .iter()
                    .map(|base| format!("{}{}", base, id))
                    .collect();

                if let (Some(fallback), Some(imdb)) =
                    (&self.sources.imdb_fallback, request.title_id.imdb_id())
                {
                    urls.push(format!("{}{}", fallback, imdb));
                }
                urls
            }
        };

        Ok(urls)
    }

    /// Best-effort reachability probe.
    ///
    /// Any HTTP answer counts as reachable, whatever its status. Only
    /// transport failures and timeouts count as unreachable.
    async fn is_reachable(&self, url: &str, timeout: Duration) -> bool {
        match self.client.head(url).timeout(timeout).send().await {
            Ok(response) => {
                tracing::debug!(url, status = response.status().as_u16(), "embed source answered");
                true
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "embed source unreachable");
                false
            }
        }
    }
}

impl Default for SubtitledEmbedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamProvider for SubtitledEmbedProvider {
    fn name(&self) -> &str {
        EMBED_PROVIDER_NAME
    }

    fn priority(&self) -> i32 {
        EMBED_PROVIDER_PRIORITY
    }

    fn supports(&self, request: &StreamRequest) -> bool {
        matches!(
            request.content_type,
            ContentType::Movie | ContentType::Series
        )
    }

    fn source_count(&self, request: &StreamRequest) -> u32 {
        self.candidate_urls(request)
            .map(|urls| urls.len().max(1) as u32)
            .unwrap_or(1)
    }

    async fn get_stream(
        &self,
        request: &StreamRequest,
        options: &StreamOptions,
    ) -> Result<Option<Stream>, ProviderError> {
        for url in self.candidate_urls(request)? {
            if self.is_reachable(&url, options.timeout()).await {
                return Ok(Some(Stream::embed(url, self.name())));
            }
        }

        tracing::debug!(provider = self.name(), "no embed source reachable");
        Ok(None)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let base = self
            .sources
            .movie
            .first()
            .ok_or(ProviderError::NotConfigured)?;
        let url = format!("{}{}", base, PROBE_TITLE_ID);

        if self.is_reachable(&url, PROBE_TIMEOUT).await {
            Ok(())
        } else {
            Err(ProviderError::Unreachable(url))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TitleId;

    fn provider() -> SubtitledEmbedProvider {
        SubtitledEmbedProvider::with_sources(EmbedSources {
            movie: vec!["https://a/movie/".into(), "https://b/movie/".into()],
            series: vec!["https://a/tv/".into()],
            imdb_fallback: Some("https://fallback/movie/".into()),
        })
    }

    #[test]
    fn test_movie_urls_with_imdb_fallback() {
        let urls = provider()
            .candidate_urls(&StreamRequest::movie(TitleId::imdb("tt1234567")))
            .unwrap();
        assert_eq!(
            urls,
            vec![
                "https://a/movie/tt1234567",
                "https://b/movie/tt1234567",
                "https://fallback/movie/tt1234567",
            ]
        );
    }

    #[test]
    fn test_tmdb_only_skips_imdb_fallback() {
        let urls = provider()
            .candidate_urls(&StreamRequest::movie(TitleId::tmdb("603")))
            .unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls.iter().all(|u| u.ends_with("/603")));
    }

    #[test]
    fn test_series_urls() {
        let urls = provider()
            .candidate_urls(&StreamRequest::episode(TitleId::imdb("tt0903747"), 2, 5))
            .unwrap();
        assert_eq!(urls, vec!["https://a/tv/tt0903747/2/5"]);
    }

    #[test]
    fn test_series_without_episode_is_invalid() {
        let mut request = StreamRequest::episode(TitleId::imdb("tt0903747"), 2, 5);
        request.season = None;
        let err = provider().candidate_urls(&request).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::InvalidRequest(ValidationError::MissingEpisode)
        ));
    }

    #[test]
    fn test_missing_id_is_invalid() {
        let err = provider()
            .candidate_urls(&StreamRequest::movie(TitleId::default()))
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::InvalidRequest(ValidationError::MissingIdentifier)
        ));
    }

    #[test]
    fn test_default_sources() {
        let sources = EmbedSources::default();
        assert_eq!(sources.movie.len(), 5);
        assert_eq!(sources.series.len(), 4);
        assert!(sources.imdb_fallback.is_some());
    }
}
