//! Error types for the pixelveil image pipeline.
//!
//! Errors are organized by stage. Decode and scramble failures are fatal for
//! the image they occur on; metadata-encode and optimization failures are
//! recovered inside the pipeline and surface only as warnings.

use thiserror::Error;

/// Top-level error type for pixelveil operations.
#[derive(Error, Debug)]
pub enum PixelveilError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input bytes are not a valid or recognizable raster image
    #[error("Decode error: {0}")]
    Decode(String),

    /// EXIF could not be written into the output container
    #[error("Metadata encode failed: {0}")]
    MetadataEncode(String),

    /// A scramble algorithm failed on the raster
    #[error("Scramble ({kind}) failed: {message}")]
    Scramble { kind: String, message: String },

    /// Resize or re-encode failed
    #[error("Optimization failed: {0}")]
    Optimization(String),

    /// The options record is inconsistent (e.g. scramble without a type)
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Input byte size exceeds the configured limit
    #[error("Input too large: {size_mb}MB > {max_mb}MB")]
    InputTooLarge { size_mb: u64, max_mb: u64 },

    /// Image dimensions exceed the configured limit
    #[error("Image too large: {width}x{height} > {max_dim}")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Format recognized but not supported by the pipeline
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Per-image processing exceeded its time budget
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    /// Source collaborator failed to deliver bytes
    #[error("Fetch failed for {location}: {message}")]
    Fetch { location: String, message: String },

    /// Destination collaborator failed to store the result
    #[error("Store failed for {id}: {message}")]
    Store { id: String, message: String },

    /// The batch was cancelled before this image started
    #[error("Batch cancelled before processing started")]
    Cancelled,
}

impl PipelineError {
    /// Build a scramble error for the given algorithm.
    pub fn scramble(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scramble {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Whether the pipeline recovers from this error without failing the image.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MetadataEncode(_) | Self::Optimization(_))
    }
}

/// Convenience type alias for pixelveil results.
pub type Result<T> = std::result::Result<T, PixelveilError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
