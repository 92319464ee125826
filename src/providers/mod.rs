//! Stream providers
//!
//! A [`StreamProvider`] turns a [`StreamRequest`] into a playable
//! [`Stream`] using one family of third-party sources:
//!
//! - `dubbed`: configurable HLS/DASH/API endpoints with PT-BR audio detection
//! - `addon`: Stremio add-on catalogs filtered by dub markers
//! - `embed`: subtitled embed pages, the fallback of last resort

pub mod addon;
pub mod dubbed;
pub mod embed;

pub use addon::{AddonCatalogs, DubAddonResolver, ADDON_PROVIDER_NAME};
pub use dubbed::{expand_template, DubbedStreamProvider, EndpointTemplates, DUBBED_PROVIDER_NAME};
pub use embed::{EmbedSources, SubtitledEmbedProvider, EMBED_PROVIDER_NAME};

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::ProviderError;
use crate::models::{ProviderHealth, Stream, StreamOptions, StreamRequest};

/// Identifier used by health probes that need some title to ask for
pub const PROBE_TITLE_ID: &str = "tt1234567";

/// Timeout for health probes
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Capability shared by every stream source.
///
/// Providers are registered once and shared across concurrent resolutions,
/// so they must not keep per-request mutable state.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Unique provider name (e.g., `"LegendadoEmbed"`)
    fn name(&self) -> &str;

    /// Ordering key; ascending values are attempted first
    fn priority(&self) -> i32;

    /// Cheap, side-effect-free check whether this provider can try `request`
    fn supports(&self, request: &StreamRequest) -> bool;

    /// Try to resolve `request`.
    ///
    /// `Ok(None)` means the provider legitimately has nothing; `Err` is
    /// reserved for failures (network, malformed response, bad request).
    async fn get_stream(
        &self,
        request: &StreamRequest,
        options: &StreamOptions,
    ) -> Result<Option<Stream>, ProviderError>;

    /// Lightweight connectivity probe used by [`StreamProvider::check_health`]
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Accept endpoint templates at runtime. Returns false for providers
    /// that have nothing to configure.
    fn configure(&self, endpoints: &EndpointTemplates) -> bool {
        let _ = endpoints;
        false
    }

    /// Most upstream requests one `get_stream` call makes for `request`,
    /// one after another. The registry allows `options.timeout()` for each.
    fn source_count(&self, request: &StreamRequest) -> u32 {
        let _ = request;
        1
    }

    /// Probe connectivity; failures are reported as `is_online = false`
    async fn check_health(&self) -> ProviderHealth {
        let start = Instant::now();
        let result = self.test_connection().await;
        let latency_ms = start.elapsed().as_millis() as u64;

        if let Err(e) = &result {
            tracing::debug!(provider = self.name(), error = %e, "health probe failed");
        }

        ProviderHealth {
            name: self.name().to_string(),
            is_online: result.is_ok(),
            latency_ms,
            last_check_at: Utc::now(),
        }
    }
}

/// HTTP client shared by the bundled providers
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("streamdub/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// GET `url` and return the body of a 2xx response
pub(crate) async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<String, ProviderError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| map_request_error(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::status(status, url));
    }

    response
        .text()
        .await
        .map_err(|e| map_request_error(e, timeout))
}

pub(crate) fn map_request_error(e: reqwest::Error, timeout: Duration) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::Request(e)
    }
}
