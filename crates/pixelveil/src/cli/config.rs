//! The `pixelveil config` command for configuration management.

use clap::{Args, Subcommand};
use pixelveil_core::Config;
use std::path::{Path, PathBuf};

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Check a config file for parse and range errors
    Validate,
}

/// Execute the config command.
///
/// `config` is the effective configuration; `path` is the file it was (or
/// would be) loaded from.
pub async fn execute(args: ConfigArgs, config: Config, path: PathBuf) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            println!("# {}", path.display());
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            println!("{}", path.display());
        }

        ConfigCommand::Init { force } => {
            init(&path, force)?;
            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }

        ConfigCommand::Validate => {
            if !path.exists() {
                anyhow::bail!(
                    "No config file at {}\n  Hint: run `pixelveil config init` to create one.",
                    path.display()
                );
            }
            Config::load_from(&path)?;
            println!("{} is valid", path.display());
        }
    }

    Ok(())
}

/// Write the default configuration to `path`.
fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, Config::default().to_toml()?)?;
    Ok(())
}
