//! Pixelveil CLI - Image metadata, web optimization and scrambling.
//!
//! Pixelveil adds, strips or merges EXIF provenance, removes GPS data,
//! resizes and recompresses images for the web, and obfuscates pixels with
//! watermarks, block shuffles, blurs, color shifts or noise.
//!
//! # Usage
//!
//! ```bash
//! # Stamp a copyright and optimize for the web
//! pixelveil process photo.jpg --action add --copyright "© 2024 Acme" --max-width 800
//!
//! # Strip metadata from a directory, JSONL report to a file
//! pixelveil process ./photos/ --action strip --format jsonl --report report.jsonl
//!
//! # Watermark with a reproducible seed
//! pixelveil process ./drafts/ --scramble-type watermark --watermark-text DRAFT --seed 7
//!
//! # Show EXIF of an image
//! pixelveil inspect photo.jpg
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Pixelveil - Image metadata, web optimization and scrambling.
#[derive(Parser, Debug)]
#[command(name = "pixelveil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "PIXELVEIL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply metadata, optimization or scramble actions to images
    Process(cli::process::ProcessArgs),

    /// Print an image's format and EXIF summary
    Inspect(cli::inspect::InspectArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(pixelveil_core::Config::default_path);
    let config = if config_path.exists() {
        match pixelveil_core::Config::load_from(&config_path) {
            Ok(config) => config,
            Err(e) if cli.config.is_some() => {
                anyhow::bail!("Failed to load config {:?}: {e}", config_path)
            }
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `pixelveil config validate`."
                );
                pixelveil_core::Config::default()
            }
        }
    } else {
        pixelveil_core::Config::default()
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("pixelveil v{}", pixelveil_core::VERSION);

    match cli.command {
        Commands::Process(args) => cli::process::execute(args, config).await,
        Commands::Inspect(args) => cli::inspect::execute(args).await,
        Commands::Config(args) => cli::config::execute(args, config, config_path).await,
    }
}
