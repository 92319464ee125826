//! CLI Command Handlers
//!
//! Implements all CLI commands on top of the provider registry and the
//! TMDB client. Each handler takes CLI args and Output, returns ExitCode.

use serde::Serialize;

use crate::api::{TmdbClient, TmdbError};
use crate::audio::AudioTrackSelector;
use crate::cli::{
    validate_title_id, ExitCode, MediaTypeFilter, Output, PopularCmd, ProvidersCmd, ResolveCmd,
    SearchCmd, TrendingCmd, WatchCmd,
};
use crate::config::Config;
use crate::models::{
    AudioTrack, LanguagePreference, MediaType, SearchResult, Stream, StreamOptions,
    StreamRequest, TitleId,
};
use crate::registry::ProviderRegistry;

/// Search page opened when no stream can be resolved
const FALLBACK_SEARCH_URL: &str = "https://vizer.hair/buscar?q=";

/// Search-page URL for a title
pub fn fallback_search_url(title: &str) -> String {
    format!("{}{}", FALLBACK_SEARCH_URL, urlencoding::encode(title))
}

// =============================================================================
// Resolve Command
// =============================================================================

/// Resolved stream plus the audio track a player would start on
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub stream: Stream,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_audio: Option<AudioTrack>,
}

impl From<Stream> for ResolveResponse {
    fn from(stream: Stream) -> Self {
        let selected_audio = AudioTrackSelector::from_stream(&stream).current();
        Self {
            stream,
            selected_audio,
        }
    }
}

/// Build the request described by the arguments
pub fn build_request(cmd: &ResolveCmd) -> Result<StreamRequest, &'static str> {
    let id = validate_title_id(&cmd.id)?;
    Ok(StreamRequest {
        title_id: TitleId::parse(id),
        content_type: cmd.effective_type(),
        season: cmd.season,
        episode: cmd.episode,
    })
}

/// Configured options with the per-invocation overrides applied
pub fn build_options(cmd: &ResolveCmd, config: &Config) -> StreamOptions {
    let mut options = config.stream_options();
    if let Some(lang) = cmd.lang {
        options = options.with_language(lang);
    }
    if let Some(timeout_ms) = cmd.timeout_ms {
        options = options.with_timeout_ms(timeout_ms);
    }
    if cmd.no_cache {
        options = options.with_cache(false);
    }
    options
}

pub async fn resolve_cmd(cmd: ResolveCmd, config: &Config, output: &Output) -> ExitCode {
    let request = match build_request(&cmd) {
        Ok(request) => request,
        Err(e) => return output.error(e, ExitCode::InvalidArgs),
    };
    let options = build_options(&cmd, config);
    let registry = config.build_registry();

    output.info(format!(
        "Resolving {} {} ({})...",
        request.content_type, cmd.id, options.language_preference
    ));

    match registry.resolve_stream(&request, &options).await {
        Ok(Some(stream)) => {
            if let Err(e) = output.print(ResolveResponse::from(stream)) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Ok(None) => output.error(
            format!(
                "No stream found for {}; try {}",
                cmd.id,
                fallback_search_url(&cmd.id)
            ),
            ExitCode::NoStreams,
        ),
        Err(e) => output.error(format!("Invalid request: {}", e), ExitCode::InvalidArgs),
    }
}

// =============================================================================
// Watch Command
// =============================================================================

/// What to open for a title
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchTarget {
    pub title: String,
    pub url: String,
    /// `stream` when resolved, `search` for the fallback page
    pub kind: WatchKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<Stream>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchKind {
    Stream,
    Search,
}

/// Look a title up and resolve it; a title without streams yields the
/// fallback search page. Only the lookup can fail.
///
/// `episode` switches the lookup from a movie to a TV show episode.
pub async fn watch_target(
    tmdb: &TmdbClient,
    registry: &ProviderRegistry,
    tmdb_id: u64,
    episode: Option<(u32, u32)>,
    options: &StreamOptions,
) -> Result<WatchTarget, TmdbError> {
    let (detail, request) = match episode {
        None => {
            let detail = tmdb.movie_detail(tmdb_id).await?;
            let request = StreamRequest::movie(detail.title_id());
            (detail, request)
        }
        Some((season, number)) => {
            let detail = tmdb.tv_detail(tmdb_id).await?;
            let request = StreamRequest::episode(detail.title_id(), season, number);
            (detail, request)
        }
    };

    match registry.resolve_stream(&request, options).await {
        Ok(Some(stream)) => Ok(WatchTarget {
            title: detail.title,
            url: stream.url.clone(),
            kind: WatchKind::Stream,
            stream: Some(stream),
        }),
        Ok(None) | Err(_) => Ok(WatchTarget {
            url: fallback_search_url(&detail.title),
            title: detail.title,
            kind: WatchKind::Search,
            stream: None,
        }),
    }
}

pub async fn watch_cmd(cmd: WatchCmd, config: &Config, output: &Output) -> ExitCode {
    let tmdb = TmdbClient::new(config.tmdb_api_key());
    let registry = config.build_registry();
    let language = if cmd.dubbed {
        LanguagePreference::PtBr
    } else {
        LanguagePreference::Original
    };
    let options = config.stream_options().with_language(language);

    output.info(format!("Looking up TMDB title {}...", cmd.tmdb_id));

    match watch_target(&tmdb, &registry, cmd.tmdb_id, cmd.episode(), &options).await {
        Ok(target) => {
            if target.kind == WatchKind::Search {
                output.info(format!("No stream found for {}, opening search", target.title));
            }
            if let Err(e) = output.print(&target) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(TmdbError::NotFound) => output.error(
            format!("TMDB title {} not found", cmd.tmdb_id),
            ExitCode::InvalidArgs,
        ),
        Err(e) => output.error(format!("Lookup failed: {}", e), ExitCode::NetworkError),
    }
}

// =============================================================================
// Search / Trending Commands
// =============================================================================

fn filter_listing(
    mut results: Vec<SearchResult>,
    media_type: Option<MediaTypeFilter>,
    limit: usize,
) -> Vec<SearchResult> {
    if let Some(filter) = media_type {
        results.retain(|r| match filter {
            MediaTypeFilter::Movie => r.media_type == MediaType::Movie,
            MediaTypeFilter::Tv => r.media_type == MediaType::Tv,
        });
    }
    results.truncate(limit);
    results
}

pub async fn search_cmd(cmd: SearchCmd, config: &Config, output: &Output) -> ExitCode {
    let client = TmdbClient::new(config.tmdb_api_key());

    output.info(format!("Searching for: {}", cmd.query));

    match client.search(&cmd.query).await {
        Ok(results) => {
            let results = filter_listing(results, cmd.media_type, cmd.limit);
            if let Err(e) = output.print(&results) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => output.error(format!("Search failed: {}", e), ExitCode::NetworkError),
    }
}

pub async fn trending_cmd(cmd: TrendingCmd, config: &Config, output: &Output) -> ExitCode {
    let client = TmdbClient::new(config.tmdb_api_key());

    output.info(format!("Fetching trending ({})...", cmd.window.as_str()));

    match client.trending(cmd.window.as_str()).await {
        Ok(results) => {
            let results = filter_listing(results, cmd.media_type, cmd.limit);
            if let Err(e) = output.print(&results) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => output.error(
            format!("Trending fetch failed: {}", e),
            ExitCode::NetworkError,
        ),
    }
}

pub async fn popular_cmd(cmd: PopularCmd, config: &Config, output: &Output) -> ExitCode {
    let client = TmdbClient::new(config.tmdb_api_key());

    output.info("Fetching popular movies...");

    match client.popular_movies().await {
        Ok(mut results) => {
            results.truncate(cmd.limit);
            if let Err(e) = output.print(&results) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => output.error(format!("Popular fetch failed: {}", e), ExitCode::NetworkError),
    }
}

// =============================================================================
// Providers Command
// =============================================================================

pub async fn providers_cmd(cmd: ProvidersCmd, config: &Config, output: &Output) -> ExitCode {
    let registry = config.build_registry();

    if !cmd.no_probe {
        output.info("Probing providers...");
        registry.run_health_checks().await;
    }

    if let Err(e) = output.print(registry.providers_status()) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}
