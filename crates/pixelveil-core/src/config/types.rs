//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of images transformed concurrently
    pub parallel_workers: usize,

    /// Supported input extensions (used by directory discovery)
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "gif".to_string(),
                "bmp".to_string(),
                "tif".to_string(),
                "tiff".to_string(),
            ],
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum input size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Per-image processing timeout in milliseconds
    pub process_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 20000,
            process_timeout_ms: 60000,
        }
    }
}

/// Fallback values used when a `ProcessOptions` record leaves a field unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Encode quality (1-100)
    pub quality: u8,

    /// Scramble intensity (0-100)
    pub scramble_intensity: u8,

    /// Watermark text when `watermarkText` is not supplied
    pub watermark_text: String,

    /// Written to EXIF Software on `add` unless the caller supplies one
    pub software_stamp: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            quality: 85,
            scramble_intensity: 50,
            watermark_text: "CONFIDENTIAL".to_string(),
            software_stamp: format!("pixelveil {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Result report format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON reports
    pub pretty: bool,

    /// Directory processed images are written to (supports `~`)
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
            dir: "./pixelveil-out".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
