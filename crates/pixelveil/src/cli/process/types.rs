//! CLI enum types for the process command: output format, action, scramble
//! algorithm, watermark anchor.

use clap::ValueEnum;
use pixelveil_core::{Action, OutputFormat as CoreOutputFormat, ScrambleType, WatermarkPosition};

/// Supported report formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Single report document
    Json,
    /// One result per line, then a summary line
    Jsonl,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Metadata (or scramble) branch.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ActionArg {
    /// Write a fresh EXIF record from the provenance flags
    Add,
    /// Remove all metadata except orientation
    Strip,
    /// Merge provenance flags over existing EXIF
    Update,
    /// Obfuscate pixels (requires --scramble-type)
    Scramble,
    /// Keep metadata; only optimize
    Optimize,
}

impl From<ActionArg> for Action {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Add => Action::Add,
            ActionArg::Strip => Action::Strip,
            ActionArg::Update => Action::Update,
            ActionArg::Scramble => Action::Scramble,
            ActionArg::Optimize => Action::Optimize,
        }
    }
}

/// Scramble algorithms.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ScrambleArg {
    /// Swap random pairs of square blocks
    PixelShift,
    /// Diagonal semi-transparent text
    Watermark,
    /// Gaussian-blur random rectangles
    BlurRegions,
    /// Hue, saturation, lightness and tint shift
    ColorShift,
    /// Overlay-blended luminance noise
    Noise,
}

impl From<ScrambleArg> for ScrambleType {
    fn from(kind: ScrambleArg) -> Self {
        match kind {
            ScrambleArg::PixelShift => ScrambleType::PixelShift,
            ScrambleArg::Watermark => ScrambleType::Watermark,
            ScrambleArg::BlurRegions => ScrambleType::BlurRegions,
            ScrambleArg::ColorShift => ScrambleType::ColorShift,
            ScrambleArg::Noise => ScrambleType::Noise,
        }
    }
}

/// Watermark anchors.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PositionArg {
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl From<PositionArg> for WatermarkPosition {
    fn from(position: PositionArg) -> Self {
        match position {
            PositionArg::Center => WatermarkPosition::Center,
            PositionArg::TopLeft => WatermarkPosition::TopLeft,
            PositionArg::TopRight => WatermarkPosition::TopRight,
            PositionArg::BottomLeft => WatermarkPosition::BottomLeft,
            PositionArg::BottomRight => WatermarkPosition::BottomRight,
        }
    }
}
