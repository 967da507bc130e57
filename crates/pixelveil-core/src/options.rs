//! The per-image processing options record.
//!
//! Field names serialize in camelCase so option files written by web
//! front-ends (`{"action":"add","removeGPS":true,...}`) load unchanged.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Requested metadata (or scramble) branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Fresh EXIF record from the supplied provenance fields
    Add,
    /// Remove everything except orientation
    Strip,
    /// Merge supplied fields over the existing IFD0
    Update,
    /// Run a scramble algorithm, then strip or stamp metadata
    Scramble,
    /// Leave metadata as in the source; only optimization may apply
    #[default]
    Optimize,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Add => write!(f, "add"),
            Action::Strip => write!(f, "strip"),
            Action::Update => write!(f, "update"),
            Action::Scramble => write!(f, "scramble"),
            Action::Optimize => write!(f, "optimize"),
        }
    }
}

/// Pixel obfuscation algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrambleType {
    PixelShift,
    Watermark,
    BlurRegions,
    ColorShift,
    Noise,
}

impl ScrambleType {
    /// Stable kebab-case name, as used in options files and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrambleType::PixelShift => "pixel-shift",
            ScrambleType::Watermark => "watermark",
            ScrambleType::BlurRegions => "blur-regions",
            ScrambleType::ColorShift => "color-shift",
            ScrambleType::Noise => "noise",
        }
    }
}

impl std::fmt::Display for ScrambleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anchor for the watermark text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Options for a single pipeline invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessOptions {
    pub action: Action,

    // === Provenance fields (IFD0) ===
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_computer: Option<String>,

    /// Clear the GPS IFD after the primary metadata operation
    #[serde(rename = "removeGPS")]
    pub remove_gps: bool,

    // === Optimization ===
    pub optimize: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    /// 1-100; the configured default (85) applies when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    pub keep_color_profile: bool,

    // === Scramble ===
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scramble_type: Option<ScrambleType>,
    /// Raw intensity as supplied; see [`ProcessOptions::intensity`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scramble_intensity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_text: Option<String>,
    pub watermark_position: WatermarkPosition,
}

impl ProcessOptions {
    /// Options for a given action with everything else defaulted.
    pub fn for_action(action: Action) -> Self {
        Self {
            action,
            ..Self::default()
        }
    }

    /// Scramble intensity clamped into [0, 100], or `default` when unset.
    pub fn intensity(&self, default: u8) -> u8 {
        self.scramble_intensity
            .map(|v| v.clamp(0, 100) as u8)
            .unwrap_or(default.min(100))
    }

    /// Encode quality clamped into [1, 100], or `default` when unset.
    pub fn quality_or(&self, default: u8) -> u8 {
        self.quality.unwrap_or(default).clamp(1, 100)
    }

    /// Whether any provenance field carries a non-empty value.
    pub fn has_provenance(&self) -> bool {
        self.provenance().iter().any(|(_, v)| v.is_some())
    }

    /// Provenance fields by EXIF name, with empty strings treated as unset.
    pub fn provenance(&self) -> [(&'static str, Option<&str>); 7] {
        fn non_empty(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.trim().is_empty())
        }
        [
            ("Copyright", non_empty(&self.copyright)),
            ("Artist", non_empty(&self.author)),
            ("ImageDescription", non_empty(&self.image_description)),
            ("Make", non_empty(&self.make)),
            ("Model", non_empty(&self.model)),
            ("Software", non_empty(&self.software)),
            ("HostComputer", non_empty(&self.host_computer)),
        ]
    }

    /// Reject option combinations that can never succeed.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.action == Action::Scramble && self.scramble_type.is_none() {
            return Err(PipelineError::InvalidOptions(
                "scrambleType is required when action is scramble".into(),
            ));
        }
        if let (Action::Scramble, Some(ScrambleType::Watermark), Some(text)) = (
            self.action,
            self.scramble_type,
            self.watermark_text.as_deref(),
        ) {
            crate::scramble::check_watermark_text(text)?;
        }
        if self.max_width == Some(0) {
            return Err(PipelineError::InvalidOptions(
                "maxWidth must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case_record() {
        let json = r#"{
            "action": "scramble",
            "scrambleType": "blur-regions",
            "scrambleIntensity": 70,
            "removeGPS": true,
            "maxWidth": 800,
            "keepColorProfile": true,
            "watermarkPosition": "top-left",
            "hostComputer": "build-01"
        }"#;
        let options: ProcessOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.action, Action::Scramble);
        assert_eq!(options.scramble_type, Some(ScrambleType::BlurRegions));
        assert_eq!(options.scramble_intensity, Some(70));
        assert!(options.remove_gps);
        assert_eq!(options.max_width, Some(800));
        assert!(options.keep_color_profile);
        assert_eq!(options.watermark_position, WatermarkPosition::TopLeft);
        assert_eq!(options.host_computer.as_deref(), Some("build-01"));
    }

    #[test]
    fn test_default_action_is_optimize_only() {
        let options: ProcessOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.action, Action::Optimize);
        assert_eq!(options.watermark_position, WatermarkPosition::Center);
    }

    #[test]
    fn test_intensity_is_clamped() {
        let mut options = ProcessOptions::default();
        assert_eq!(options.intensity(50), 50);
        options.scramble_intensity = Some(250);
        assert_eq!(options.intensity(50), 100);
        options.scramble_intensity = Some(-5);
        assert_eq!(options.intensity(50), 0);
    }

    #[test]
    fn test_quality_is_clamped() {
        let mut options = ProcessOptions::default();
        assert_eq!(options.quality_or(85), 85);
        options.quality = Some(0);
        assert_eq!(options.quality_or(85), 1);
        options.quality = Some(200);
        assert_eq!(options.quality_or(85), 100);
    }

    #[test]
    fn test_empty_provenance_counts_as_unset() {
        let mut options = ProcessOptions::for_action(Action::Add);
        options.copyright = Some("   ".into());
        assert!(!options.has_provenance());
        options.author = Some("Jane".into());
        assert!(options.has_provenance());
    }

    #[test]
    fn test_provenance_values_are_written_verbatim() {
        let mut options = ProcessOptions::for_action(Action::Add);
        options.image_description = Some("  indented caption\n".into());
        let provenance = options.provenance();
        assert_eq!(provenance[2], ("ImageDescription", Some("  indented caption\n")));
    }

    #[test]
    fn test_scramble_requires_type() {
        let options = ProcessOptions::for_action(Action::Scramble);
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("scrambleType"));
    }

    #[test]
    fn test_watermark_text_without_glyphs_is_rejected() {
        let mut options = ProcessOptions::for_action(Action::Scramble);
        options.scramble_type = Some(ScrambleType::Watermark);
        options.watermark_text = Some("機密".into());
        let err = options.validate().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidOptions(_)));
        assert!(err.to_string().contains("'機', '密'"));

        options.watermark_text = Some("Draft 2".into());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_scramble_type_names() {
        let t: ScrambleType = serde_json::from_str("\"color-shift\"").unwrap();
        assert_eq!(t, ScrambleType::ColorShift);
        assert_eq!(ScrambleType::PixelShift.to_string(), "pixel-shift");
    }
}
