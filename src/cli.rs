//! CLI - Command Line Interface for streamdub
//!
//! Every command is scriptable and all output is JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Resolve a dubbed stream for a movie
//! streamdub resolve tt0133093 --lang pt-br
//!
//! # Resolve an episode
//! streamdub resolve tt0903747 -s 1 -e 2
//!
//! # Look a TMDB title up and get something to open
//! streamdub watch 603 --dubbed
//!
//! # Provider health
//! streamdub providers --json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::models::{ContentType, LanguagePreference};

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// No streams available
    NoStreams = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// streamdub - find a playable stream, Brazilian Portuguese dub first
#[derive(Parser, Debug)]
#[command(
    name = "streamdub",
    version,
    about = "Resolve playable streams with PT-BR dubbed audio",
    long_about = "Resolves a movie or episode to a playable stream by trying \
                  dubbed sources first, then dub-tagged add-on listings, \
                  then subtitled embeds.",
    after_help = "EXAMPLES:\n\
                  streamdub resolve tt0133093 --lang pt-br   Dubbed movie stream\n\
                  streamdub resolve tt0903747 -s 1 -e 2      Series episode\n\
                  streamdub watch 603 --dubbed               TMDB title to URL\n\
                  streamdub providers --json                 Provider health"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a title to a playable stream
    #[command(visible_alias = "r")]
    Resolve(ResolveCmd),

    /// Look a TMDB title up and print what to open
    #[command(visible_alias = "w")]
    Watch(WatchCmd),

    /// Search for movies and TV shows
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// Get trending content
    #[command(visible_alias = "tr")]
    Trending(TrendingCmd),

    /// Popular movies, the landing listing
    #[command(visible_alias = "pop")]
    Popular(PopularCmd),

    /// Show provider priority, health and circuit breaker state
    #[command(visible_alias = "p")]
    Providers(ProvidersCmd),
}

// =============================================================================
// Resolve Command
// =============================================================================

/// Resolve a movie or episode to a stream
#[derive(Args, Debug)]
pub struct ResolveCmd {
    /// IMDB ID (e.g., tt0133093) or numeric TMDB ID
    #[arg(required = true)]
    pub id: String,

    /// Content type (default: series when --season/--episode is given)
    #[arg(long = "type", short = 't', value_enum)]
    pub content_type: Option<ContentTypeArg>,

    /// Season number (series only)
    #[arg(long, short = 's')]
    pub season: Option<u32>,

    /// Episode number (series only)
    #[arg(long, short = 'e')]
    pub episode: Option<u32>,

    /// Audio preference: pt-br, en or original
    #[arg(long, short = 'l', value_parser = parse_language)]
    pub lang: Option<LanguagePreference>,

    /// Per-provider timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Skip the result cache lookup
    #[arg(long)]
    pub no_cache: bool,
}

impl ResolveCmd {
    /// Explicit type, else inferred from the presence of season/episode
    pub fn effective_type(&self) -> ContentType {
        match self.content_type {
            Some(ContentTypeArg::Movie) => ContentType::Movie,
            Some(ContentTypeArg::Series) => ContentType::Series,
            None if self.season.is_some() || self.episode.is_some() => ContentType::Series,
            None => ContentType::Movie,
        }
    }
}

/// Content type argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentTypeArg {
    Movie,
    #[value(alias = "tv")]
    Series,
}

/// Parse a language preference argument
fn parse_language(s: &str) -> Result<LanguagePreference, String> {
    LanguagePreference::from_str_loose(s)
        .ok_or_else(|| format!("unknown language '{}' (expected pt-br, en or original)", s))
}

// =============================================================================
// Watch Command
// =============================================================================

/// Resolve a TMDB title, falling back to a search page
#[derive(Args, Debug)]
pub struct WatchCmd {
    /// TMDB movie ID, or TV show ID together with --season/--episode
    #[arg(required = true)]
    pub tmdb_id: u64,

    /// Season number (makes the ID a TV show)
    #[arg(long, short = 's', requires = "episode")]
    pub season: Option<u32>,

    /// Episode number
    #[arg(long, short = 'e', requires = "season")]
    pub episode: Option<u32>,

    /// Require PT-BR dubbed audio
    #[arg(long, short = 'd')]
    pub dubbed: bool,
}

impl WatchCmd {
    /// Season and episode when watching a TV show
    pub fn episode(&self) -> Option<(u32, u32)> {
        self.season.zip(self.episode)
    }
}

// =============================================================================
// Search Command
// =============================================================================

/// Search for movies and TV shows by query
#[derive(Args, Debug)]
pub struct SearchCmd {
    /// Search query (title, keywords)
    #[arg(required = true)]
    pub query: String,

    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,

    /// Filter by media type
    #[arg(long, short = 't', value_enum)]
    pub media_type: Option<MediaTypeFilter>,
}

/// Media type filter for listings
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTypeFilter {
    /// Movies only
    Movie,
    /// TV shows only
    Tv,
}

// =============================================================================
// Popular Command
// =============================================================================

/// List popular movies
#[derive(Args, Debug)]
pub struct PopularCmd {
    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,
}

// =============================================================================
// Trending Command
// =============================================================================

/// Get trending movies and TV shows
#[derive(Args, Debug)]
pub struct TrendingCmd {
    /// Time window for trending
    #[arg(long, short = 'w', value_enum, default_value = "day")]
    pub window: TrendingWindow,

    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,

    /// Filter by media type
    #[arg(long, short = 't', value_enum)]
    pub media_type: Option<MediaTypeFilter>,
}

/// Time window for trending content
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendingWindow {
    /// Today's trending
    #[default]
    Day,
    /// This week's trending
    Week,
}

impl TrendingWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendingWindow::Day => "day",
            TrendingWindow::Week => "week",
        }
    }
}

// =============================================================================
// Providers Command
// =============================================================================

/// Show provider status
#[derive(Args, Debug)]
pub struct ProvidersCmd {
    /// Report without running a health probe first
    #[arg(long)]
    pub no_probe: bool,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// ID Validation
// =============================================================================

/// Validate IMDB ID format (tt followed by digits)
pub fn validate_imdb_id(id: &str) -> Result<&str, &'static str> {
    if id.starts_with("tt") && id.len() >= 9 && id[2..].chars().all(|c| c.is_ascii_digit()) {
        Ok(id)
    } else {
        Err("Invalid IMDB ID format (expected tt followed by 7+ digits)")
    }
}

/// Validate a title id argument: an IMDb id or a numeric TMDB id
pub fn validate_title_id(id: &str) -> Result<&str, &'static str> {
    let id = id.trim();
    if id.starts_with("tt") {
        validate_imdb_id(id)
    } else if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Ok(id)
    } else {
        Err("Invalid ID (expected an IMDB ID like tt0133093 or a numeric TMDB ID)")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_resolve_movie_defaults() {
        let cli = Cli::parse_from(["streamdub", "resolve", "tt0133093"]);
        match cli.command {
            Command::Resolve(cmd) => {
                assert_eq!(cmd.id, "tt0133093");
                assert_eq!(cmd.effective_type(), ContentType::Movie);
                assert!(cmd.lang.is_none());
                assert!(!cmd.no_cache);
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_resolve_episode_infers_series() {
        let cli = Cli::parse_from([
            "streamdub", "resolve", "tt0903747", "-s", "1", "-e", "2", "--lang", "pt-br",
        ]);
        match cli.command {
            Command::Resolve(cmd) => {
                assert_eq!(cmd.effective_type(), ContentType::Series);
                assert_eq!(cmd.season, Some(1));
                assert_eq!(cmd.episode, Some(2));
                assert_eq!(cmd.lang, Some(LanguagePreference::PtBr));
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_resolve_rejects_unknown_language() {
        let result = Cli::try_parse_from(["streamdub", "resolve", "tt0133093", "--lang", "xx"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["streamdub", "--json", "-v", "--quiet", "providers"]);
        assert!(cli.json);
        assert!(cli.verbose);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Command::Providers(_)));
    }

    #[test]
    fn test_watch_command() {
        let cli = Cli::parse_from(["streamdub", "watch", "603", "--dubbed"]);
        match cli.command {
            Command::Watch(cmd) => {
                assert_eq!(cmd.tmdb_id, 603);
                assert!(cmd.dubbed);
                assert_eq!(cmd.episode(), None);
            }
            _ => panic!("Expected Watch command"),
        }
    }

    #[test]
    fn test_watch_episode_needs_both_numbers() {
        let cli = Cli::parse_from(["streamdub", "watch", "1396", "-s", "1", "-e", "2"]);
        match cli.command {
            Command::Watch(cmd) => assert_eq!(cmd.episode(), Some((1, 2))),
            _ => panic!("Expected Watch command"),
        }

        assert!(Cli::try_parse_from(["streamdub", "watch", "1396", "-s", "1"]).is_err());
        assert!(Cli::try_parse_from(["streamdub", "watch", "1396", "-e", "2"]).is_err());
    }

    #[test]
    fn test_popular_command() {
        let cli = Cli::parse_from(["streamdub", "pop", "--limit", "5"]);
        match cli.command {
            Command::Popular(cmd) => assert_eq!(cmd.limit, 5),
            _ => panic!("Expected Popular command"),
        }
    }

    #[test]
    fn test_validate_title_id() {
        assert!(validate_title_id("tt0133093").is_ok());
        assert!(validate_title_id("603").is_ok());
        assert!(validate_title_id("tt123").is_err());
        assert!(validate_title_id("matrix").is_err());
        assert!(validate_title_id("").is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::Error), 1);
        assert_eq!(i32::from(ExitCode::InvalidArgs), 2);
        assert_eq!(i32::from(ExitCode::NetworkError), 3);
        assert_eq!(i32::from(ExitCode::NoStreams), 5);
    }
}
