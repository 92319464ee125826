//! streamdub - resolve playable streams, PT-BR dub first
//!
//! # Usage
//!
//! ```bash
//! streamdub resolve tt0133093 --lang pt-br
//! streamdub resolve tt0903747 -s 1 -e 2 --json
//! streamdub watch 603 --dubbed
//! streamdub providers
//! ```

use clap::Parser;
use tracing_subscriber::EnvFilter;

use streamdub::cli::{Cli, Command, ExitCode, Output};
use streamdub::commands;
use streamdub::config::Config;

/// Log to stderr so stdout stays machine-readable
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "streamdub=debug"
    } else {
        "streamdub=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref());
    let output = Output::new(&cli);

    let code: ExitCode = match cli.command {
        Command::Resolve(cmd) => commands::resolve_cmd(cmd, &config, &output).await,
        Command::Watch(cmd) => commands::watch_cmd(cmd, &config, &output).await,
        Command::Search(cmd) => commands::search_cmd(cmd, &config, &output).await,
        Command::Trending(cmd) => commands::trending_cmd(cmd, &config, &output).await,
        Command::Popular(cmd) => commands::popular_cmd(cmd, &config, &output).await,
        Command::Providers(cmd) => commands::providers_cmd(cmd, &config, &output).await,
    };

    code.into()
}
