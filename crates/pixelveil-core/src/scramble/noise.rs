//! Luminance noise composited with an overlay blend.

use image::DynamicImage;
use rand::{Rng, RngCore};

use crate::error::PipelineResult;
use crate::options::ScrambleType;

use super::{restore_layout, Scrambler};

/// Opacity of the noise layer.
const NOISE_OPACITY: f32 = 0.5;

/// Overlays a mid-gray noise field whose per-pixel offset is bounded by
/// `intensity / 100 * 50` levels. Alpha is left untouched.
pub struct Noise {
    intensity: u8,
}

impl Noise {
    pub fn new(intensity: u8) -> Self {
        Self {
            intensity: intensity.min(100),
        }
    }

    /// Maximum offset from mid-gray, in 0-255 levels.
    pub fn amplitude(&self) -> f32 {
        self.intensity as f32 / 100.0 * 50.0
    }
}

/// Overlay blend of base `b` with layer `s`, both in [0, 1].
fn overlay(b: f32, s: f32) -> f32 {
    if b < 0.5 {
        2.0 * b * s
    } else {
        1.0 - 2.0 * (1.0 - b) * (1.0 - s)
    }
}

/// Blend one channel with a noise sample at the layer opacity.
fn blend(channel: u8, sample: f32) -> u8 {
    let b = channel as f32 / 255.0;
    let mixed = b * (1.0 - NOISE_OPACITY) + overlay(b, sample) * NOISE_OPACITY;
    (mixed * 255.0).round().clamp(0.0, 255.0) as u8
}

impl Scrambler for Noise {
    fn kind(&self) -> ScrambleType {
        ScrambleType::Noise
    }

    fn scramble(&self, image: &DynamicImage, rng: &mut dyn RngCore) -> PipelineResult<DynamicImage> {
        let amplitude = self.amplitude();
        let mut rgba = image.to_rgba8();
        for pixel in rgba.pixels_mut() {
            let offset = if amplitude > 0.0 {
                rng.gen_range(-amplitude..=amplitude)
            } else {
                0.0
            };
            let sample = 0.5 + offset / 255.0;
            for c in 0..3 {
                pixel[c] = blend(pixel[c], sample);
            }
        }
        Ok(restore_layout(image, rgba))
    }
}
