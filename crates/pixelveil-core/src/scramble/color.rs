//! Hue rotation, saturation and lightness scaling, and channel tint.

use image::DynamicImage;
use rand::{Rng, RngCore};

use crate::error::PipelineResult;
use crate::options::ScrambleType;

use super::{restore_layout, Scrambler};

/// Per-image color adjustments derived from intensity and the random source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAdjust {
    /// Degrees
    pub hue_shift: f32,
    pub saturation: f32,
    pub lightness: f32,
    pub tint: [i16; 3],
}

impl ColorAdjust {
    pub fn identity() -> Self {
        Self {
            hue_shift: 0.0,
            saturation: 1.0,
            lightness: 1.0,
            tint: [0; 3],
        }
    }

    /// Adjust one RGB triple.
    pub fn apply(&self, rgb: [u8; 3]) -> [u8; 3] {
        let (h, s, l) = rgb_to_hsl(rgb);
        let h = (h + self.hue_shift).rem_euclid(360.0);
        let s = (s * self.saturation).clamp(0.0, 1.0);
        let l = (l * self.lightness).clamp(0.0, 1.0);
        let shifted = hsl_to_rgb(h, s, l);

        let mut out = [0u8; 3];
        for c in 0..3 {
            out[c] = (shifted[c] as i16 + self.tint[c]).clamp(0, 255) as u8;
        }
        out
    }
}

/// Hue rotate by `intensity / 100 * 180` degrees, scale saturation by
/// `1 ± intensity / 100` and lightness by `1 ± intensity / 200`, then add a
/// per-channel tint within `±intensity`.
pub struct ColorShift {
    intensity: u8,
}

impl ColorShift {
    pub fn new(intensity: u8) -> Self {
        Self {
            intensity: intensity.min(100),
        }
    }

    pub fn adjustment(&self, rng: &mut dyn RngCore) -> ColorAdjust {
        let i = self.intensity as f32;
        let mut sign = || if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let saturation = 1.0 + sign() * i / 100.0;
        let lightness = 1.0 + sign() * i / 200.0;
        let bound = self.intensity as i16;
        ColorAdjust {
            hue_shift: i / 100.0 * 180.0,
            saturation,
            lightness,
            tint: [
                rng.gen_range(-bound..=bound),
                rng.gen_range(-bound..=bound),
                rng.gen_range(-bound..=bound),
            ],
        }
    }
}

impl Scrambler for ColorShift {
    fn kind(&self) -> ScrambleType {
        ScrambleType::ColorShift
    }

    fn scramble(&self, image: &DynamicImage, rng: &mut dyn RngCore) -> PipelineResult<DynamicImage> {
        let adjust = self.adjustment(rng);
        let mut rgba = image.to_rgba8();
        for pixel in rgba.pixels_mut() {
            let [r, g, b] = adjust.apply([pixel[0], pixel[1], pixel[2]]);
            pixel[0] = r;
            pixel[1] = g;
            pixel[2] = b;
        }
        Ok(restore_layout(image, rgba))
    }
}

/// RGB to (hue degrees, saturation, lightness).
fn rgb_to_hsl([r, g, b]: [u8; 3]) -> (f32, f32, f32) {
    let (r, g, b) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let d = max - min;
    if d == 0.0 {
        return (0.0, 0.0, l);
    }
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (h * 60.0, s, l)
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [u8; 3] {
    if s == 0.0 {
        let v = (l * 255.0).round() as u8;
        return [v, v, v];
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h = h / 360.0;
    let channel = |t: f32| {
        let t = t.rem_euclid(1.0);
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };
    [channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0)]
}
