//! The `pixelveil process` command for processing images.

mod batch;
mod setup;
pub mod types;

pub use types::{ActionArg, OutputFormat, PositionArg, ScrambleArg};

use clap::Args;
use pixelveil_core::{Config, OutputFormat as CoreOutputFormat, ProcessOptions};
use std::path::PathBuf;

use batch::run_batch;
use setup::setup_processor;

/// Arguments for the `process` command.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Image file or directory to process
    #[arg(required = true)]
    pub input: PathBuf,

    /// Directory for processed images (defaults to `[output] dir`)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Write the result report to a file instead of stdout
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report format (defaults to `[output] format`)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print the JSON report (or set `[output] pretty`)
    #[arg(long)]
    pub pretty: bool,

    /// JSON options file (camelCase keys); flags override its values
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Metadata action
    #[arg(short, long, value_enum)]
    pub action: Option<ActionArg>,

    // === Provenance ===
    /// Copyright notice
    #[arg(long)]
    pub copyright: Option<String>,

    /// Author, written as Artist
    #[arg(long)]
    pub author: Option<String>,

    /// Image description
    #[arg(long)]
    pub description: Option<String>,

    /// Camera make
    #[arg(long)]
    pub make: Option<String>,

    /// Camera model
    #[arg(long)]
    pub model: Option<String>,

    /// Software tag
    #[arg(long)]
    pub software: Option<String>,

    /// Host computer tag
    #[arg(long)]
    pub host_computer: Option<String>,

    /// Remove GPS location data
    #[arg(long)]
    pub remove_gps: bool,

    // === Optimization ===
    /// Resize and recompress for web delivery
    #[arg(long)]
    pub optimize: bool,

    /// Maximum output width in pixels (never upscales)
    #[arg(long)]
    pub max_width: Option<u32>,

    /// Encoder quality, 1-100
    #[arg(short, long)]
    pub quality: Option<u8>,

    /// Keep the source ICC color profile
    #[arg(long)]
    pub keep_color_profile: bool,

    // === Scramble ===
    /// Scramble algorithm (implies --action scramble)
    #[arg(long, value_enum)]
    pub scramble_type: Option<ScrambleArg>,

    /// Scramble intensity, 0-100
    #[arg(long)]
    pub intensity: Option<i64>,

    /// Watermark text
    #[arg(long)]
    pub watermark_text: Option<String>,

    /// Watermark anchor
    #[arg(long, value_enum)]
    pub watermark_position: Option<PositionArg>,

    /// Seed for reproducible scrambles
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of parallel workers (defaults to `[processing] parallel_workers`)
    #[arg(short, long)]
    pub parallel: Option<usize>,
}

impl Default for ProcessArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_dir: None,
            report: None,
            format: None,
            pretty: false,
            options: None,
            action: None,
            copyright: None,
            author: None,
            description: None,
            make: None,
            model: None,
            software: None,
            host_computer: None,
            remove_gps: false,
            optimize: false,
            max_width: None,
            quality: None,
            keep_color_profile: false,
            scramble_type: None,
            intensity: None,
            watermark_text: None,
            watermark_position: None,
            seed: None,
            parallel: None,
        }
    }
}

/// Processing context assembled by setup_processor().
pub(crate) struct ProcessContext {
    pub config: Config,
    pub options: ProcessOptions,
    pub output_dir: PathBuf,
    pub report_format: CoreOutputFormat,
    pub pretty: bool,
}

/// Execute the process command.
pub async fn execute(args: ProcessArgs, config: Config) -> anyhow::Result<()> {
    let ctx = setup_processor(&args, config)?;

    let files = pixelveil_core::pipeline::FileDiscovery::new(ctx.config.processing.clone())
        .discover(&args.input);
    if files.is_empty() {
        tracing::warn!("No supported image files found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!(
        "Found {} image(s) to process ({} action)",
        files.len(),
        ctx.options.action
    );

    run_batch(ctx, &args, files).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_args_default_format_comes_from_config() {
        let args = ProcessArgs::default();
        assert!(args.format.is_none());
        assert!(!args.pretty);
    }

    #[test]
    fn process_args_default_bool_flags_are_false() {
        let args = ProcessArgs::default();
        assert!(!args.remove_gps);
        assert!(!args.optimize);
        assert!(!args.keep_color_profile);
    }

    #[test]
    fn process_args_default_option_fields_are_none() {
        let args = ProcessArgs::default();
        assert!(args.output_dir.is_none());
        assert!(args.action.is_none());
        assert!(args.scramble_type.is_none());
        assert!(args.seed.is_none());
        assert!(args.parallel.is_none());
    }
}
