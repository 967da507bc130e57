//! Core data types for the pixelveil pipeline.
//!
//! These types describe per-image outcomes and batch aggregates. Results
//! serialize in camelCase to match the options record.

use serde::{Deserialize, Serialize};

use crate::pipeline::ImageBuffer;

/// Per-image processing state.
///
/// `Pending → Downloading → Transforming → Uploading → Success | Failed`.
/// `Transforming` covers the whole pipeline and is never observed half-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    #[default]
    Pending,
    Downloading,
    Transforming,
    Uploading,
    Success,
    Failed,
}

impl ImageStatus {
    /// Whether the image has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImageStatus::Success | ImageStatus::Failed)
    }
}

impl std::fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ImageStatus::Pending => "pending",
            ImageStatus::Downloading => "downloading",
            ImageStatus::Transforming => "transforming",
            ImageStatus::Uploading => "uploading",
            ImageStatus::Success => "success",
            ImageStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Output of a single pipeline run.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// The final encoded image
    pub image: ImageBuffer,

    /// Non-fatal problems recovered during processing
    pub warnings: Vec<String>,
}

/// Per-image outcome recorded by the batch coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
    /// Caller-supplied identifier
    pub image_id: String,

    pub success: bool,

    pub status: ImageStatus,

    /// Human-readable summary, including recovered warnings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Error text when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Location reported by the destination collaborator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_url: Option<String>,

    /// The processed image; travels with the result but is never serialized
    #[serde(skip)]
    pub output: Option<ImageBuffer>,
}

impl ProcessResult {
    /// A successful outcome carrying the processed image.
    pub fn succeeded(image_id: impl Into<String>, processed: ProcessedImage) -> Self {
        let message = if processed.warnings.is_empty() {
            "Processed".to_string()
        } else {
            format!("Processed with warnings: {}", processed.warnings.join("; "))
        };
        Self {
            image_id: image_id.into(),
            success: true,
            status: ImageStatus::Success,
            message: Some(message),
            error: None,
            new_url: None,
            output: Some(processed.image),
        }
    }

    /// A failed outcome with the error text.
    pub fn failed(image_id: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            image_id: image_id.into(),
            success: false,
            status: ImageStatus::Failed,
            message: None,
            error: Some(error.to_string()),
            new_url: None,
            output: None,
        }
    }
}

/// EXIF fields surfaced by `inspect`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExifSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_description: Option<String>,

    /// Camera manufacturer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,

    /// Camera model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_computer: Option<String>,

    /// IFD0 modification timestamp ("YYYY:MM:DD HH:MM:SS")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,

    /// Image orientation (1-8 per EXIF spec)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u32>,

    /// GPS latitude (decimal degrees)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_latitude: Option<f64>,

    /// GPS longitude (decimal degrees)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_longitude: Option<f64>,

    /// Number of GPS IFD fields present
    pub gps_field_count: usize,

    /// Total number of fields across all IFDs
    pub field_count: usize,
}

/// Processing statistics for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Total images processed successfully
    pub succeeded: usize,

    /// Total images that failed
    pub failed: usize,

    /// Total processing time in seconds
    pub total_seconds: f64,

    /// Processing rate in images per second
    pub images_per_second: f64,
}

impl BatchSummary {
    /// Aggregate a finished batch.
    pub fn from_results(results: &[ProcessResult], elapsed: std::time::Duration) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        let total_seconds = elapsed.as_secs_f64();
        Self {
            succeeded,
            failed: results.len() - succeeded,
            total_seconds,
            images_per_second: if total_seconds > 0.0 {
                results.len() as f64 / total_seconds
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_failed_result_serializes_camel_case() {
        let result = ProcessResult::failed("img-7", "Decode error: bad header");
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"imageId\":\"img-7\""));
        assert!(json.contains("\"status\":\"failed\""));
        assert!(json.contains("\"success\":false"));
        assert!(json.contains("\"error\":\"Decode error: bad header\""));
        assert!(!json.contains("newUrl"));
        assert!(!json.contains("output"));
    }

    #[test]
    fn test_result_roundtrip_drops_output() {
        let mut result = ProcessResult::failed("a", "boom");
        result.new_url = Some("file:///tmp/a.jpg".into());
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"newUrl\":\"file:///tmp/a.jpg\""));
        let parsed: ProcessResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.image_id, "a");
        assert!(parsed.output.is_none());
    }

    #[test]
    fn test_status_terminal() {
        assert!(ImageStatus::Success.is_terminal());
        assert!(ImageStatus::Failed.is_terminal());
        assert!(!ImageStatus::Transforming.is_terminal());
        assert_eq!(ImageStatus::Uploading.to_string(), "uploading");
    }

    #[test]
    fn test_batch_summary_from_results() {
        let results = vec![
            ProcessResult::failed("a", "x"),
            ProcessResult::failed("b", "y"),
        ];
        let summary = BatchSummary::from_results(&results, Duration::from_secs(2));
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 2);
        assert!((summary.images_per_second - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exif_summary_skips_empty_fields() {
        let summary = ExifSummary {
            orientation: Some(6),
            ..Default::default()
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"orientation\":6"));
        assert!(!json.contains("copyright"));
    }
}
