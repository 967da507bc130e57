//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.process_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.process_timeout_ms must be > 0".into(),
            ));
        }
        if self.defaults.quality == 0 || self.defaults.quality > 100 {
            return Err(ConfigError::ValidationError(
                "defaults.quality must be between 1 and 100".into(),
            ));
        }
        if self.defaults.scramble_intensity > 100 {
            return Err(ConfigError::ValidationError(
                "defaults.scramble_intensity must be between 0 and 100".into(),
            ));
        }
        if let Err(e) = crate::scramble::check_watermark_text(&self.defaults.watermark_text) {
            return Err(ConfigError::ValidationError(format!(
                "defaults.watermark_text: {}",
                e
            )));
        }
        if !matches!(self.output.format.as_str(), "json" | "jsonl") {
            return Err(ConfigError::ValidationError(
                "output.format must be \"json\" or \"jsonl\"".into(),
            ));
        }
        Ok(())
    }
}
