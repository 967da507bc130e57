//! Pixel obfuscation algorithms.
//!
//! Each algorithm takes a decoded raster and a random source and returns a
//! new raster with the same dimensions and alpha presence. These transforms
//! deter casual reuse; they are not encryption.

mod blur;
mod color;
mod glyphs;
mod noise;
mod pixel_shift;
mod watermark;

pub use blur::BlurRegions;
pub use color::ColorShift;
pub use noise::Noise;
pub use pixel_shift::PixelShift;
pub use watermark::Watermark;

use image::{DynamicImage, RgbaImage};
use rand::RngCore;

use crate::error::PipelineResult;
use crate::options::{ScrambleType, WatermarkPosition};

/// A pixel obfuscation algorithm.
pub trait Scrambler: Send + Sync {
    /// Algorithm name, as used in options and error messages.
    fn kind(&self) -> ScrambleType;

    /// Produce the obfuscated raster.
    fn scramble(&self, image: &DynamicImage, rng: &mut dyn RngCore) -> PipelineResult<DynamicImage>;
}

/// Everything needed to build a scrambler.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrambleSpec {
    pub kind: ScrambleType,
    /// 0-100
    pub intensity: u8,
    pub watermark_text: String,
    pub watermark_position: WatermarkPosition,
}

/// Reject watermark text the built-in font cannot draw.
pub fn check_watermark_text(text: &str) -> PipelineResult<()> {
    glyphs::check(text)
}

/// Build the scrambler for a spec.
pub fn scrambler_for(spec: &ScrambleSpec) -> Box<dyn Scrambler> {
    match spec.kind {
        ScrambleType::PixelShift => Box::new(PixelShift::new(spec.intensity)),
        ScrambleType::Watermark => Box::new(Watermark::new(
            spec.watermark_text.clone(),
            spec.watermark_position,
        )),
        ScrambleType::BlurRegions => Box::new(BlurRegions::new(spec.intensity)),
        ScrambleType::ColorShift => Box::new(ColorShift::new(spec.intensity)),
        ScrambleType::Noise => Box::new(Noise::new(spec.intensity)),
    }
}

/// Run the scrambler for `spec` over `image`.
///
/// Intensity 0 leaves the raster untouched for every algorithm that uses
/// intensity.
pub fn scramble(
    image: &DynamicImage,
    spec: &ScrambleSpec,
    rng: &mut dyn RngCore,
) -> PipelineResult<DynamicImage> {
    if spec.intensity == 0 && spec.kind != ScrambleType::Watermark {
        return Ok(image.clone());
    }
    scrambler_for(spec).scramble(image, rng)
}

/// Wrap an RGBA working buffer back into the source's alpha layout.
pub(crate) fn restore_layout(source: &DynamicImage, rgba: RgbaImage) -> DynamicImage {
    let rgba = DynamicImage::ImageRgba8(rgba);
    if source.color().has_alpha() {
        rgba
    } else {
        DynamicImage::ImageRgb8(rgba.to_rgb8())
    }
}
