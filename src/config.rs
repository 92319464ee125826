//! Configuration management for streamdub
//!
//! Handles config file loading, environment overrides and building
//! the default provider registry.
//! Config is stored at ~/.config/streamdub/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::{LanguagePreference, StreamOptions, DEFAULT_TIMEOUT};
use crate::providers::{
    AddonCatalogs, DubAddonResolver, DubbedStreamProvider, EmbedSources, EndpointTemplates,
    SubtitledEmbedProvider, DUBBED_PROVIDER_NAME,
};
use crate::registry::ProviderRegistry;

/// Shared public TMDB key, used when none is configured
const BUNDLED_TMDB_KEY: &str = "5e9c09b2dfc1eefb09a2f01dc39d54d9";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TMDB API key
    pub tmdb_api_key: Option<String>,
    /// Default language preference for resolution
    pub language: LanguagePreference,
    /// Per-attempt provider timeout
    pub timeout_ms: u64,
    pub enable_cache: bool,
    /// Dubbed provider endpoint templates; the provider stays disabled
    /// while all are unset
    pub dubbed: EndpointTemplates,
    pub addon: AddonCatalogs,
    pub embed: EmbedSources,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            language: LanguagePreference::Original,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            enable_cache: true,
            dubbed: EndpointTemplates::default(),
            addon: AddonCatalogs::default(),
            embed: EmbedSources::default(),
        }
    }
}

impl Config {
    /// Default config file path (~/.config/streamdub/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("streamdub").join("config.toml"))
    }

    /// Load config from `path` (or the default location), then apply
    /// environment overrides. A missing or unreadable file yields defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).or_else(Self::path);
        let mut config = path.map(|p| Self::load_from(&p)).unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Parse a config file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        let Ok(raw) = std::fs::read_to_string(path) else {
            return Self::default();
        };

        match toml::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid config file, using defaults");
                Self::default()
            }
        }
    }

    /// Overlay environment variables read through `var`
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("TMDB_API_KEY") {
            self.tmdb_api_key = Some(key);
        }

        self.dubbed.merge(&EndpointTemplates {
            hls: non_empty("STREAMDUB_DUB_HLS"),
            dash: non_empty("STREAMDUB_DUB_DASH"),
            api: non_empty("STREAMDUB_DUB_API"),
        });
    }

    /// TMDB API key: configured value, else the bundled shared key
    pub fn tmdb_api_key(&self) -> String {
        self.tmdb_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| BUNDLED_TMDB_KEY.to_string())
    }

    /// Resolution options from the configured defaults
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions::default()
            .with_language(self.language)
            .with_timeout_ms(self.timeout_ms)
            .with_cache(self.enable_cache)
    }

    /// Registry with the three standard providers.
    ///
    /// The dubbed provider is always registered and only enabled when at
    /// least one endpoint template is configured.
    pub fn build_registry(&self) -> ProviderRegistry {
        let registry = ProviderRegistry::new();
        registry.register_provider(Arc::new(SubtitledEmbedProvider::with_sources(
            self.embed.clone(),
        )));
        registry.register_provider(Arc::new(DubAddonResolver::with_catalogs(self.addon.clone())));
        registry.register_provider(Arc::new(DubbedStreamProvider::new()));

        if !self.dubbed.is_empty() {
            registry.configure_provider(DUBBED_PROVIDER_NAME, &self.dubbed);
        }
        registry
    }
}
