//! Input validation before processing.

use crate::config::LimitsConfig;
use crate::error::PipelineError;

use super::decode::ImageBuffer;

/// Validates inputs against the configured limits.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Perform quick validation before probing.
    ///
    /// Checks:
    /// - Input size is within limits
    /// - Input has valid image magic bytes
    pub fn validate_bytes(&self, bytes: &[u8]) -> Result<(), PipelineError> {
        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if bytes.len() as u64 > max_bytes {
            return Err(PipelineError::InputTooLarge {
                size_mb: bytes.len() as u64 / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        if bytes.len() < 4 {
            return Err(PipelineError::Decode(
                "Input too small to be a valid image".to_string(),
            ));
        }

        if let Some(name) = Self::unsupported_container(bytes) {
            return Err(PipelineError::UnsupportedFormat(name.to_string()));
        }

        if !Self::is_valid_image_header(bytes) {
            return Err(PipelineError::Decode(
                "Unrecognized image format (invalid magic bytes)".to_string(),
            ));
        }

        Ok(())
    }

    /// Check probed dimensions against the configured maximum.
    pub fn validate_dimensions(&self, image: &ImageBuffer) -> Result<(), PipelineError> {
        let max_dim = self.limits.max_image_dimension;
        if image.width() > max_dim || image.height() > max_dim {
            return Err(PipelineError::ImageTooLarge {
                width: image.width(),
                height: image.height(),
                max_dim,
            });
        }
        Ok(())
    }

    /// Name of a recognized container the pipeline cannot process.
    fn unsupported_container(header: &[u8]) -> Option<&'static str> {
        if header.len() >= 12 && &header[4..8] == b"ftyp" {
            return match &header[8..12] {
                b"avif" | b"avis" => Some("AVIF"),
                b"heic" | b"heix" | b"mif1" | b"msf1" => Some("HEIF"),
                _ => None,
            };
        }
        if header.starts_with(b"8BPS") {
            return Some("PSD");
        }
        if header.starts_with(b"qoif") {
            return Some("QOI");
        }
        if header.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
            return Some("ICO");
        }
        None
    }

    /// Check if the header bytes match known image formats.
    fn is_valid_image_header(header: &[u8]) -> bool {
        if header.len() < 4 {
            return false;
        }

        // JPEG: FF D8 FF
        if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return true;
        }

        // PNG: 89 50 4E 47
        if header.starts_with(&[0x89, b'P', b'N', b'G']) {
            return true;
        }

        // GIF: GIF8
        if header.starts_with(b"GIF8") {
            return true;
        }

        // WebP: RIFF....WEBP
        if header.starts_with(b"RIFF") {
            if header.len() >= 12 {
                return &header[8..12] == b"WEBP";
            }
            return false;
        }

        // BMP: BM
        if header.starts_with(b"BM") {
            return true;
        }

        // TIFF: II (little-endian) or MM (big-endian) followed by version 42
        header.starts_with(&[b'I', b'I', 0x2A, 0x00]) || header.starts_with(&[b'M', b'M', 0x00, 0x2A])
    }
}
