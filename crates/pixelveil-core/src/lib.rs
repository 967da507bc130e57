//! Pixelveil Core - Embeddable image metadata, optimization and scrambling.
//!
//! Pixelveil takes encoded images (JPEG, PNG, WebP) and returns re-encoded
//! images: EXIF added, stripped or merged, GPS removed, resized and
//! recompressed for delivery, or deliberately obfuscated.
//!
//! # Architecture
//!
//! Each image runs through a fixed stage plan resolved from its options:
//!
//! ```text
//! Bytes → Validate → Decode → [Scramble] → [Optimize | Re-encode] → Embed metadata
//! ```
//!
//! The metadata stage is planned from the untouched source and applied to
//! whatever container the final encode produced. Metadata and optimization
//! failures are recovered as warnings; decode and scramble failures fail the
//! image. The batch coordinator runs many images with bounded parallelism.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pixelveil_core::{Action, Config, Pixelveil, ProcessOptions};
//!
//! let pixelveil = Pixelveil::new(Config::load()?);
//! let mut options = ProcessOptions::for_action(Action::Add);
//! options.copyright = Some("© 2024 Acme".into());
//! options.optimize = true;
//! options.max_width = Some(800);
//!
//! let processed = pixelveil.process(std::fs::read("photo.jpg")?, &options)?;
//! std::fs::write("photo-web.jpg", processed.image.bytes())?;
//! ```

// Module declarations
pub mod batch;
pub mod config;
pub mod error;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod scramble;
pub mod sources;
pub mod types;

// Re-exports for convenient access
pub use batch::{BatchCoordinator, BatchInput, BatchItem, BatchOptions, CancelHandle};
pub use config::Config;
pub use error::{ConfigError, PipelineError, PipelineResult, PixelveilError, Result};
pub use options::{Action, ProcessOptions, ScrambleType, WatermarkPosition};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{read_metadata, ImageBuffer, ImageProcessor};
pub use sources::{FsSink, FsSource, ImageSink, ImageSource};
pub use types::{BatchSummary, ExifSummary, ImageStatus, ProcessResult, ProcessedImage};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pixelveil processor - the main entry point for single images and batches.
pub struct Pixelveil {
    config: Config,
}

impl Pixelveil {
    pub fn new(config: Config) -> Self {
        tracing::debug!("Initializing pixelveil v{}", VERSION);
        Self { config }
    }

    /// Create an instance from the config file (or defaults).
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(Config::load()?))
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A processor built from this configuration.
    pub fn processor(&self) -> ImageProcessor {
        ImageProcessor::new(&self.config)
    }

    /// Validate, decode and process one encoded image.
    pub fn process(&self, bytes: Vec<u8>, options: &ProcessOptions) -> PipelineResult<ProcessedImage> {
        let processor = self.processor();
        let image = processor.load(bytes)?;
        processor.process(image, options)
    }

    /// A batch coordinator sized from `[processing]` and `[limits]`.
    pub fn coordinator(&self) -> BatchCoordinator {
        BatchCoordinator::new(self.processor(), BatchOptions::from_config(&self.config))
    }
}
