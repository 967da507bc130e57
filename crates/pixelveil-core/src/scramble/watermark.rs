//! Diagonal text watermark.

use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use rand::RngCore;
use std::f32::consts::FRAC_PI_4;

use crate::error::{PipelineError, PipelineResult};
use crate::options::{ScrambleType, WatermarkPosition};

use super::glyphs::{self, GLYPH_ADVANCE, GLYPH_HEIGHT};
use super::{restore_layout, Scrambler};

/// Semi-transparent red.
const INK: Rgba<u8> = Rgba([255, 0, 0, 128]);

/// Fully transparent red, so interpolated edges only fade in alpha.
const CLEAR: Rgba<u8> = Rgba([255, 0, 0, 0]);

/// Distance kept from the image edge for corner positions.
const EDGE_MARGIN: i64 = 10;

/// Stamps text rotated by -45 degrees at a fixed anchor.
pub struct Watermark {
    text: String,
    position: WatermarkPosition,
}

impl Watermark {
    pub fn new(text: impl Into<String>, position: WatermarkPosition) -> Self {
        Self {
            text: text.into(),
            position,
        }
    }

    /// Glyph scale for an image: text height is roughly a tenth of the
    /// shorter side.
    pub fn scale_for(width: u32, height: u32) -> u32 {
        (width.min(height) / 10 / GLYPH_HEIGHT).max(1)
    }

    /// Render the text onto a transparent square canvas large enough to
    /// hold it at any rotation, then rotate it.
    fn render(&self, scale: u32) -> (RgbaImage, f64) {
        let text_w = glyphs::text_width(&self.text, scale);
        let text_h = GLYPH_HEIGHT * scale;
        let side = ((text_w as f64).hypot(text_h as f64).ceil() as u32).max(1) + 2;

        let mut canvas = RgbaImage::from_pixel(side, side, CLEAR);
        let x0 = (side - text_w) / 2;
        let y0 = (side - text_h) / 2;

        for (i, c) in self.text.chars().enumerate() {
            let Some(rows) = glyphs::glyph(c) else {
                continue;
            };
            let gx = x0 + i as u32 * GLYPH_ADVANCE * scale;
            for gy in 0..GLYPH_HEIGHT {
                for gxi in 0..glyphs::GLYPH_WIDTH {
                    if !glyphs::is_set(&rows, gxi, gy) {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let px = gx + gxi * scale + dx;
                            let py = y0 + gy * scale + dy;
                            if px < side && py < side {
                                canvas.put_pixel(px, py, INK);
                            }
                        }
                    }
                }
            }
        }

        let rotated = rotate_about_center(&canvas, -FRAC_PI_4, Interpolation::Bilinear, CLEAR);
        // Both sides of the rotated text's bounding box
        let extent = (text_w + text_h) as f64 / std::f64::consts::SQRT_2;
        (rotated, extent)
    }

    /// Top-left corner of the canvas so the visible text lands at the anchor.
    fn origin(&self, width: u32, height: u32, side: u32, extent: f64) -> (i64, i64) {
        let (w, h, side) = (width as i64, height as i64, side as i64);
        let extent = extent.ceil() as i64;
        let padding = (side - extent) / 2;

        let near = EDGE_MARGIN - padding;
        let far_x = w - EDGE_MARGIN - extent - padding;
        let far_y = h - EDGE_MARGIN - extent - padding;

        match self.position {
            WatermarkPosition::Center => ((w - side) / 2, (h - side) / 2),
            WatermarkPosition::TopLeft => (near, near),
            WatermarkPosition::TopRight => (far_x, near),
            WatermarkPosition::BottomLeft => (near, far_y),
            WatermarkPosition::BottomRight => (far_x, far_y),
        }
    }
}

impl Scrambler for Watermark {
    fn kind(&self) -> ScrambleType {
        ScrambleType::Watermark
    }

    fn scramble(&self, image: &DynamicImage, _rng: &mut dyn RngCore) -> PipelineResult<DynamicImage> {
        if self.text.trim().is_empty() {
            return Err(PipelineError::scramble(self.kind().as_str(), "watermark text is empty"));
        }
        glyphs::check(&self.text)?;
        let (width, height) = image.dimensions();
        let (layer, extent) = self.render(Self::scale_for(width, height));
        let (x, y) = self.origin(width, height, layer.width(), extent);

        let mut base = image.to_rgba8();
        imageops::overlay(&mut base, &layer, x, y);
        Ok(restore_layout(image, base))
    }
}
