//! Randomly placed gaussian-blurred rectangles.

use image::{imageops, DynamicImage, GenericImageView};
use rand::{Rng, RngCore};

use crate::error::PipelineResult;
use crate::options::ScrambleType;

use super::{restore_layout, Scrambler};

const BLUR_SIGMA: f32 = 20.0;

/// A rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Blurs `intensity / 10` rectangles, each 10-30% of each dimension.
pub struct BlurRegions {
    intensity: u8,
}

impl BlurRegions {
    pub fn new(intensity: u8) -> Self {
        Self {
            intensity: intensity.min(100),
        }
    }

    pub fn region_count(&self) -> usize {
        (self.intensity / 10) as usize
    }

    /// Pick the rectangles to blur. All lie fully inside the image.
    pub fn pick_regions(&self, width: u32, height: u32, rng: &mut dyn RngCore) -> Vec<Region> {
        (0..self.region_count())
            .map(|_| {
                let rw = span(width, rng);
                let rh = span(height, rng);
                Region {
                    x: rng.gen_range(0..=width - rw),
                    y: rng.gen_range(0..=height - rh),
                    width: rw,
                    height: rh,
                }
            })
            .collect()
    }
}

/// A random length between 10% and 30% of `extent`, at least one pixel.
fn span(extent: u32, rng: &mut dyn RngCore) -> u32 {
    let lo = (extent / 10).max(1);
    let hi = (extent * 3 / 10).max(lo);
    rng.gen_range(lo..=hi).min(extent)
}

impl Scrambler for BlurRegions {
    fn kind(&self) -> ScrambleType {
        ScrambleType::BlurRegions
    }

    fn scramble(&self, image: &DynamicImage, rng: &mut dyn RngCore) -> PipelineResult<DynamicImage> {
        let (width, height) = image.dimensions();
        let mut rgba = image.to_rgba8();

        for region in self.pick_regions(width, height, rng) {
            let patch = imageops::crop_imm(&rgba, region.x, region.y, region.width, region.height).to_image();
            let blurred = imageops::blur(&patch, BLUR_SIGMA);
            imageops::replace(&mut rgba, &blurred, region.x as i64, region.y as i64);
        }

        Ok(restore_layout(image, rgba))
    }
}
