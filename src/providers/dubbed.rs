//! PT-BR dubbed stream provider
//!
//! Disabled until endpoint templates are configured. Once enabled it tries
//! HLS, then DASH, then a custom JSON API, and inspects manifests for
//! Portuguese audio renditions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;

use super::{fetch_text, http_client, map_request_error, StreamProvider, PROBE_TIMEOUT, PROBE_TITLE_ID};
use crate::error::{ProviderError, ValidationError};
use crate::manifest::{parse_dash_audio_tracks, parse_hls_audio_tracks};
use crate::models::{
    AudioTrack, ContentType, Stream, StreamFormat, StreamOptions, StreamRequest, Subtitle, TitleId,
};

pub const DUBBED_PROVIDER_NAME: &str = "DubladoProvider";
pub const DUBBED_PROVIDER_PRIORITY: i32 = 10;

/// URL templates for the dubbed endpoints.
///
/// Placeholders: `{id}`, `{tmdbId}`, `{imdbId}`, `{type}`, `{season}`, `{episode}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointTemplates {
    pub hls: Option<String>,
    pub dash: Option<String>,
    pub api: Option<String>,
}

impl EndpointTemplates {
    /// Overlay the templates set in `other`, keeping the rest
    pub fn merge(&mut self, other: &EndpointTemplates) {
        if other.hls.is_some() {
            self.hls = other.hls.clone();
        }
        if other.dash.is_some() {
            self.dash = other.dash.clone();
        }
        if other.api.is_some() {
            self.api = other.api.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hls.is_none() && self.dash.is_none() && self.api.is_none()
    }
}

/// Fill a template's placeholders from a request
pub fn expand_template(template: &str, request: &StreamRequest) -> String {
    let ids = &request.title_id;
    let primary = ids.primary().unwrap_or_default();
    let season = request.season.map(|s| s.to_string()).unwrap_or_default();
    let episode = request.episode.map(|e| e.to_string()).unwrap_or_default();

    template
        .replace("{tmdbId}", ids.tmdb_id().unwrap_or(primary))
        .replace("{imdbId}", ids.imdb_id().unwrap_or(primary))
        .replace("{id}", primary)
        .replace("{type}", request.content_type.as_str())
        .replace("{season}", &season)
        .replace("{episode}", &episode)
}

#[derive(Debug, Clone, Default)]
struct DubbedState {
    enabled: bool,
    endpoints: EndpointTemplates,
}

/// Body expected from the custom API endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiStreamBody {
    url: Option<String>,
    format: Option<StreamFormat>,
    #[serde(default)]
    audio_tracks: Vec<AudioTrack>,
    #[serde(default)]
    subtitles: Vec<Subtitle>,
    is_dubbed: Option<bool>,
}

/// Highest-priority provider for Portuguese-dubbed streams
pub struct DubbedStreamProvider {
    client: reqwest::Client,
    state: RwLock<DubbedState>,
}

impl DubbedStreamProvider {
    /// A disabled provider with no endpoints
    pub fn new() -> Self {
        Self {
            client: http_client(),
            state: RwLock::new(DubbedState::default()),
        }
    }

    /// A provider enabled with the given templates
    pub fn with_endpoints(endpoints: EndpointTemplates) -> Self {
        let provider = Self::new();
        provider.set_endpoints(&endpoints);
        provider
    }

    /// Merge templates and enable the provider. Idempotent.
    pub fn set_endpoints(&self, endpoints: &EndpointTemplates) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.endpoints.merge(endpoints);
        state.enabled = true;
        tracing::info!(
            hls = state.endpoints.hls.is_some(),
            dash = state.endpoints.dash.is_some(),
            api = state.endpoints.api.is_some(),
            "dubbed provider enabled"
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.snapshot().enabled
    }

    pub fn endpoints(&self) -> EndpointTemplates {
        self.snapshot().endpoints
    }

    fn snapshot(&self) -> DubbedState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn hls_stream(&self, url: String, timeout: Duration) -> Result<Stream, ProviderError> {
        let manifest = fetch_text(&self.client, &url, timeout).await?;
        let audio_tracks = parse_hls_audio_tracks(&manifest)?;
        Ok(self.manifest_stream(url, StreamFormat::Hls, audio_tracks))
    }

    async fn dash_stream(&self, url: String, timeout: Duration) -> Result<Stream, ProviderError> {
        let manifest = fetch_text(&self.client, &url, timeout).await?;
        let audio_tracks = parse_dash_audio_tracks(&manifest)?;
        Ok(self.manifest_stream(url, StreamFormat::Dash, audio_tracks))
    }

    fn manifest_stream(&self, url: String, format: StreamFormat, audio_tracks: Vec<AudioTrack>) -> Stream {
        let is_dubbed = audio_tracks.iter().any(AudioTrack::is_portuguese);
        Stream {
            url,
            format,
            audio_tracks,
            subtitles: Vec::new(),
            is_dubbed,
            source_name: self.name().to_string(),
        }
    }

    async fn api_stream(&self, url: String, timeout: Duration) -> Result<Stream, ProviderError> {
        let body = fetch_text(&self.client, &url, timeout).await?;
        let data: ApiStreamBody = serde_json::from_str(&body)?;
        let stream_url = data
            .url
            .filter(|u| !u.is_empty())
            .ok_or(ProviderError::MissingField("url"))?;

        Ok(Stream {
            url: stream_url,
            format: data.format.unwrap_or(StreamFormat::Hls),
            audio_tracks: data.audio_tracks,
            subtitles: data.subtitles,
            // the endpoint is dub-specific unless it says otherwise
            is_dubbed: data.is_dubbed != Some(false),
            source_name: self.name().to_string(),
        })
    }
}

impl Default for DubbedStreamProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamProvider for DubbedStreamProvider {
    fn name(&self) -> &str {
        DUBBED_PROVIDER_NAME
    }

    fn priority(&self) -> i32 {
        DUBBED_PROVIDER_PRIORITY
    }

    fn supports(&self, request: &StreamRequest) -> bool {
        self.is_enabled()
            && matches!(
                request.content_type,
                ContentType::Movie | ContentType::Series
            )
    }

    fn source_count(&self, _request: &StreamRequest) -> u32 {
        let endpoints = self.endpoints();
        let configured = [&endpoints.hls, &endpoints.dash, &endpoints.api]
            .iter()
            .filter(|t| t.is_some())
            .count();
        configured.max(1) as u32
    }

    async fn get_stream(
        &self,
        request: &StreamRequest,
        options: &StreamOptions,
    ) -> Result<Option<Stream>, ProviderError> {
        if request.title_id.primary().is_none() {
            return Err(ValidationError::MissingIdentifier.into());
        }

        let state = self.snapshot();
        if !state.enabled {
            tracing::info!("dubbed provider is disabled; configure endpoints to enable it");
            return Ok(None);
        }

        let timeout = options.timeout();
        let endpoints = state.endpoints;

        if let Some(template) = &endpoints.hls {
            match self.hls_stream(expand_template(template, request), timeout).await {
                Ok(stream) => return Ok(Some(stream)),
                Err(e) => tracing::warn!(error = %e, "dubbed HLS endpoint failed"),
            }
        }

        if let Some(template) = &endpoints.dash {
            match self.dash_stream(expand_template(template, request), timeout).await {
                Ok(stream) => return Ok(Some(stream)),
                Err(e) => tracing::warn!(error = %e, "dubbed DASH endpoint failed"),
            }
        }

        if let Some(template) = &endpoints.api {
            match self.api_stream(expand_template(template, request), timeout).await {
                Ok(stream) => return Ok(Some(stream)),
                Err(e) => tracing::warn!(error = %e, "dubbed API endpoint failed"),
            }
        }

        Ok(None)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let state = self.snapshot();
        if !state.enabled {
            return Err(ProviderError::NotConfigured);
        }

        let endpoints = state.endpoints;
        let Some(template) = endpoints
            .hls
            .as_ref()
            .or(endpoints.dash.as_ref())
            .or(endpoints.api.as_ref())
        else {
            return Err(ProviderError::NotConfigured);
        };

        let probe = StreamRequest::movie(TitleId::imdb(PROBE_TITLE_ID));
        let url = expand_template(template, &probe);
        let response = self
            .client
            .head(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| map_request_error(e, PROBE_TIMEOUT))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::status(response.status(), &url))
        }
    }

    fn configure(&self, endpoints: &EndpointTemplates) -> bool {
        self.set_endpoints(endpoints);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_template_movie() {
        let request = StreamRequest::movie(TitleId {
            tmdb: Some("603".into()),
            imdb: Some("tt0133093".into()),
        });
        assert_eq!(
            expand_template("https://cdn/{type}/{tmdbId}/{imdbId}/{id}.m3u8", &request),
            "https://cdn/movie/603/tt0133093/tt0133093.m3u8"
        );
    }

    #[test]
    fn test_expand_template_series_and_missing_ids() {
        let request = StreamRequest::episode(TitleId::imdb("tt0903747"), 1, 3);
        assert_eq!(
            expand_template("https://cdn/{tmdbId}/{season}x{episode}/{season}", &request),
            "https://cdn/tt0903747/1x3/1"
        );

        let movie = StreamRequest::movie(TitleId::imdb("tt1"));
        assert_eq!(
            expand_template("https://cdn/{id}/{season}{episode}", &movie),
            "https://cdn/tt1/"
        );
    }

    #[test]
    fn test_merge_keeps_existing() {
        let mut base = EndpointTemplates {
            hls: Some("h".into()),
            dash: None,
            api: Some("a".into()),
        };
        base.merge(&EndpointTemplates {
            hls: None,
            dash: Some("d".into()),
            api: Some("a2".into()),
        });
        assert_eq!(base.hls.as_deref(), Some("h"));
        assert_eq!(base.dash.as_deref(), Some("d"));
        assert_eq!(base.api.as_deref(), Some("a2"));
    }

    #[test]
    fn test_disabled_until_configured() {
        let provider = DubbedStreamProvider::new();
        let request = StreamRequest::movie(TitleId::imdb("tt1"));
        assert!(!provider.is_enabled());
        assert!(!provider.supports(&request));

        assert!(provider.configure(&EndpointTemplates {
            hls: Some("https://cdn/{id}.m3u8".into()),
            ..Default::default()
        }));
        assert!(provider.supports(&request));

        // configuring again merges rather than replaces
        provider.configure(&EndpointTemplates {
            api: Some("https://api/{id}".into()),
            ..Default::default()
        });
        let endpoints = provider.endpoints();
        assert!(endpoints.hls.is_some());
        assert!(endpoints.api.is_some());
    }

    #[tokio::test]
    async fn test_disabled_returns_none() {
        let provider = DubbedStreamProvider::new();
        let request = StreamRequest::movie(TitleId::imdb("tt1"));
        let result = provider
            .get_stream(&request, &StreamOptions::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_missing_id_fails_even_when_disabled() {
        let provider = DubbedStreamProvider::new();
        let request = StreamRequest::movie(TitleId::default());
        let err = provider
            .get_stream(&request, &StreamOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::InvalidRequest(ValidationError::MissingIdentifier)
        ));
    }

    #[tokio::test]
    async fn test_health_offline_while_disabled() {
        let health = DubbedStreamProvider::new().check_health().await;
        assert_eq!(health.name, DUBBED_PROVIDER_NAME);
        assert!(!health.is_online);
    }
}
