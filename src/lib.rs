//! streamdub - stream resolution with Brazilian Portuguese dub preference
//!
//! Turns a title identifier (IMDb or TMDB) into a playable stream by asking
//! a prioritized set of providers: dubbed HLS/DASH/API endpoints first,
//! dub-tagged Stremio add-on listings second, subtitled embed pages last.
//!
//! # Modules
//!
//! - `models` - Requests, options, streams, audio tracks, catalogue records
//! - `providers` - The `StreamProvider` trait and the three provider families
//! - `registry` - Orchestrator with caching, circuit breakers and health checks
//! - `manifest` - HLS/DASH audio track parsing
//! - `audio` - Audio track selection for players
//! - `api` - TMDB catalogue client
//! - `config`, `cli`, `commands` - Configuration and the command line surface

pub mod api;
pub mod audio;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod health;
pub mod manifest;
pub mod models;
pub mod providers;
pub mod registry;

// Re-export commonly used types
pub use models::{
    AudioTrack, ContentType, LanguagePreference, ProviderHealth, Stream, StreamFormat,
    StreamOptions, StreamRequest, Subtitle, TitleId, TrackId,
};

pub use api::TmdbClient;
pub use audio::AudioTrackSelector;
pub use config::Config;
pub use error::{ProviderError, ValidationError};
pub use providers::{DubAddonResolver, DubbedStreamProvider, StreamProvider, SubtitledEmbedProvider};
pub use registry::{ProviderRegistry, ProviderStatus};
