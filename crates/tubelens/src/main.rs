//! tubelens - topic extraction and comment matching for YouTube videos
//!
//! Main entry point for the tubelens CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tubelens_config::TubelensConfig;

mod commands;

use commands::{config, matches, run};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// tubelens - topic extraction and comment matching for YouTube videos
#[derive(Parser)]
#[command(name = "tubelens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline for a video
    Run(run::RunArgs),

    /// Print stored topic to comment rankings as JSON
    Matches(matches::MatchesArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = tubelens_config::load_config(None)?;
    let _guard = init_tracing(cli.verbose, &loaded.config);

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        config: loaded.config.clone(),
        sources: loaded.loaded_from().iter().map(|p| p.to_path_buf()).collect(),
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Run(args) => run::run(args, &ctx).await,
        Commands::Matches(args) => matches::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

/// Console (human-readable) plus daily-rolling JSON file.
///
/// The file layer is skipped when `[logging].file = false` or no log
/// directory can be determined.
fn init_tracing(verbose: bool, config: &TubelensConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if verbose {
        "tubelens=debug,tubelens_flow=debug,tubelens_llm=debug,tubelens_store=debug,tubelens_config=debug,info"
    } else {
        "tubelens=info,tubelens_flow=info,tubelens_llm=info,tubelens_store=info,warn"
    };

    let file_enabled = config
        .logging
        .as_ref()
        .and_then(|l| l.file)
        .unwrap_or(true);
    let log_dir = config.log_dir().ok().filter(|_| file_enabled);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(&dir, "tubelens.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new(
                    "tubelens=trace,tubelens_flow=trace,tubelens_llm=trace,tubelens_store=trace,tubelens_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::new(filter)),
        )
        .with(file_layer)
        .init();

    guard
}
