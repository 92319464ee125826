//! Stremio add-on dub resolver
//!
//! Queries a Brazilian add-on first and a torrent-index add-on second,
//! keeping only listings that advertise Portuguese (or Latin) dubbing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{fetch_text, http_client, StreamProvider, PROBE_TIMEOUT};
use crate::error::{ProviderError, ValidationError};
use crate::manifest::{extract_quality, mentions_dub_marker};
use crate::models::{ContentType, Stream, StreamFormat, StreamOptions, StreamRequest, Subtitle};

pub const ADDON_PROVIDER_NAME: &str = "StremioDubAddon";
pub const ADDON_PROVIDER_PRIORITY: i32 = 50;

/// Add-on base URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddonCatalogs {
    /// Regional add-on, first match wins
    pub primary: String,
    /// Generic torrent index, best quality wins
    pub fallback: String,
}

impl Default for AddonCatalogs {
    fn default() -> Self {
        Self {
            primary: "https://27a5b2bfe3c0-stremio-brazilian-addon.baby-beamup.club".to_string(),
            fallback: "https://torrentio.strem.fun".to_string(),
        }
    }
}

/// Add-on stream listing
#[derive(Debug, Deserialize)]
struct AddonResponse {
    #[serde(default)]
    streams: Vec<AddonStream>,
}

#[derive(Debug, Clone, Deserialize)]
struct AddonStream {
    name: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(default)]
    subtitles: Vec<AddonSubtitle>,
}

#[derive(Debug, Clone, Deserialize)]
struct AddonSubtitle {
    url: String,
    lang: String,
    id: Option<String>,
}

impl AddonStream {
    fn is_dubbed(&self) -> bool {
        [&self.title, &self.name, &self.description]
            .into_iter()
            .flatten()
            .any(|text| mentions_dub_marker(text))
    }

    fn playable_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    fn quality(&self) -> u32 {
        self.description.as_deref().map(extract_quality).unwrap_or(0)
    }

    fn into_stream(self, source_name: &str) -> Option<Stream> {
        let url = self.url.filter(|u| !u.is_empty())?;
        let format = match StreamFormat::from_url(&url) {
            StreamFormat::Hls => StreamFormat::Hls,
            _ => StreamFormat::Mp4,
        };
        let subtitles = self
            .subtitles
            .into_iter()
            .map(|s| Subtitle {
                name: s.id.unwrap_or_else(|| s.lang.clone()),
                lang: s.lang,
                url: s.url,
            })
            .collect();

        Some(Stream {
            url,
            format,
            audio_tracks: Vec::new(),
            subtitles,
            is_dubbed: true,
            source_name: source_name.to_string(),
        })
    }
}

/// Resolver over Stremio-style add-on catalogs
pub struct DubAddonResolver {
    client: reqwest::Client,
    catalogs: AddonCatalogs,
}

impl DubAddonResolver {
    pub fn new() -> Self {
        Self::with_catalogs(AddonCatalogs::default())
    }

    /// Create a resolver with custom add-on URLs (for testing)
    pub fn with_catalogs(catalogs: AddonCatalogs) -> Self {
        Self {
            client: http_client(),
            catalogs,
        }
    }

    /// Stremio stream id: `tt…` for movies, `tt…:season:episode` for series
    fn stremio_id(request: &StreamRequest) -> Result<String, ProviderError> {
        let id = request
            .title_id
            .primary()
            .ok_or(ValidationError::MissingIdentifier)?;

        Ok(match request.content_type {
            ContentType::Movie => id.to_string(),
            ContentType::Series => {
                let (season, episode) = request.season_episode()?;
                format!("{}:{}:{}", id, season, episode)
            }
        })
    }

    async fn fetch_streams(
        &self,
        base: &str,
        request: &StreamRequest,
        timeout: Duration,
    ) -> Result<Vec<AddonStream>, ProviderError> {
        let url = format!(
            "{}/stream/{}/{}.json",
            base.trim_end_matches('/'),
            request.content_type.as_str(),
            Self::stremio_id(request)?
        );
        tracing::debug!(url, "querying add-on");

        let body = fetch_text(&self.client, &url, timeout).await?;
        let data: AddonResponse = serde_json::from_str(&body)?;
        Ok(data.streams)
    }

    /// First dubbed listing with a URL
    fn pick_first(streams: Vec<AddonStream>) -> Option<AddonStream> {
        streams
            .into_iter()
            .find(|s| s.is_dubbed() && s.playable_url().is_some())
    }

    /// Highest-quality dubbed listing with a URL; ties keep listing order
    fn pick_best(streams: Vec<AddonStream>) -> Option<AddonStream> {
        let mut dubbed: Vec<AddonStream> = streams
            .into_iter()
            .filter(|s| s.is_dubbed() && s.playable_url().is_some())
            .collect();
        dubbed.sort_by_key(|s| std::cmp::Reverse(s.quality()));
        dubbed.into_iter().next()
    }
}

impl Default for DubAddonResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamProvider for DubAddonResolver {
    fn name(&self) -> &str {
        ADDON_PROVIDER_NAME
    }

    fn priority(&self) -> i32 {
        ADDON_PROVIDER_PRIORITY
    }

    fn supports(&self, request: &StreamRequest) -> bool {
        request.title_id.primary().is_some()
    }

    fn source_count(&self, _request: &StreamRequest) -> u32 {
        2
    }

    async fn get_stream(
        &self,
        request: &StreamRequest,
        options: &StreamOptions,
    ) -> Result<Option<Stream>, ProviderError> {
        // reject bad requests before touching the network
        Self::stremio_id(request)?;

        match self
            .fetch_streams(&self.catalogs.primary, request, options.timeout())
            .await
        {
            Ok(streams) => {
                if let Some(stream) = Self::pick_first(streams).and_then(|s| s.into_stream(self.name())) {
                    tracing::info!(url = %stream.url, "dubbed stream found on regional add-on");
                    return Ok(Some(stream));
                }
            }
            Err(e) => tracing::warn!(error = %e, "regional add-on failed"),
        }

        match self
            .fetch_streams(&self.catalogs.fallback, request, options.timeout())
            .await
        {
            Ok(streams) => {
                if let Some(stream) = Self::pick_best(streams).and_then(|s| s.into_stream(self.name())) {
                    tracing::info!(url = %stream.url, "dubbed stream found on fallback add-on");
                    return Ok(Some(stream));
                }
            }
            Err(e) => tracing::warn!(error = %e, "fallback add-on failed"),
        }

        Ok(None)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/manifest.json", self.catalogs.primary.trim_end_matches('/'));
        fetch_text(&self.client, &url, PROBE_TIMEOUT).await.map(|_| ())
    }
}
