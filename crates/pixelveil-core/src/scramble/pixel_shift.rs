//! Block-swap scrambling.

use image::{DynamicImage, RgbaImage};
use rand::{Rng, RngCore};

use crate::error::PipelineResult;
use crate::options::ScrambleType;

use super::{restore_layout, Scrambler};

/// Swaps square blocks with randomly chosen partners.
///
/// The grid uses blocks of `max(4, min(w, h) / 20)` pixels; partial blocks
/// on the right and bottom edges never move. Every full block initiates a
/// swap with probability `intensity / 100`. Swaps run in sequence, so at
/// intensity 100 every block is exchanged at least once but a later swap
/// can carry one back to its starting cell.
pub struct PixelShift {
    intensity: u8,
}

impl PixelShift {
    pub fn new(intensity: u8) -> Self {
        Self {
            intensity: intensity.min(100),
        }
    }

    pub fn block_size(width: u32, height: u32) -> u32 {
        (width.min(height) / 20).max(4)
    }

    /// Shuffle blocks in place, returning the number of swaps performed.
    pub fn shuffle(&self, image: &mut RgbaImage, rng: &mut dyn RngCore) -> usize {
        let (width, height) = image.dimensions();
        let block = Self::block_size(width, height);
        let cols = (width / block) as usize;
        let rows = (height / block) as usize;
        let count = cols * rows;
        if count < 2 {
            return 0;
        }

        let probability = self.intensity as f64 / 100.0;
        let row_len = block as usize * 4;
        let stride = width as usize * 4;
        let mut tmp = vec![0u8; row_len];
        let buf: &mut [u8] = image;
        let mut swaps = 0;

        for i in 0..count {
            if !rng.gen_bool(probability) {
                continue;
            }
            let mut j = rng.gen_range(0..count - 1);
            if j >= i {
                j += 1;
            }

            let origin = |index: usize| {
                let (bx, by) = (index % cols, index / cols);
                by * block as usize * stride + bx * row_len
            };
            let (a, b) = (origin(i), origin(j));
            for line in 0..block as usize {
                let ra = a + line * stride;
                let rb = b + line * stride;
                tmp.copy_from_slice(&buf[ra..ra + row_len]);
                buf.copy_within(rb..rb + row_len, ra);
                buf[rb..rb + row_len].copy_from_slice(&tmp);
            }
            swaps += 1;
        }
        swaps
    }
}

impl Scrambler for PixelShift {
    fn kind(&self) -> ScrambleType {
        ScrambleType::PixelShift
    }

    fn scramble(&self, image: &DynamicImage, rng: &mut dyn RngCore) -> PipelineResult<DynamicImage> {
        let mut rgba = image.to_rgba8();
        let swaps = self.shuffle(&mut rgba, rng);
        tracing::trace!("  Pixel shift: {} block swaps", swaps);
        Ok(restore_layout(image, rgba))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Each 4x4 block filled with a distinct color.
    fn tiles(cols: u32, rows: u32) -> RgbaImage {
        RgbaImage::from_fn(cols * 4, rows * 4, |x, y| {
            let id = (y / 4) * cols + x / 4;
            Rgba([id as u8, (id * 3) as u8, (id * 7) as u8, 255])
        })
    }

    #[test]
    fn test_block_size() {
        assert_eq!(PixelShift::block_size(40, 40), 4);
        assert_eq!(PixelShift::block_size(1920, 1080), 54);
        assert_eq!(PixelShift::block_size(3, 3), 4);
    }

    #[test]
    fn test_zero_intensity_moves_nothing() {
        let mut image = tiles(8, 8);
        let original = image.clone();
        let swaps = PixelShift::new(0).shuffle(&mut image, &mut StdRng::seed_from_u64(3));
        assert_eq!(swaps, 0);
        assert_eq!(image, original);
    }

    #[test]
    fn test_full_intensity_every_block_swaps() {
        let mut image = tiles(8, 8);
        let swaps = PixelShift::new(100).shuffle(&mut image, &mut StdRng::seed_from_u64(3));
        assert_eq!(swaps, 64);
    }

    #[test]
    fn test_full_intensity_displaces_nearly_every_block() {
        let original = tiles(8, 8);
        let mut image = original.clone();
        PixelShift::new(100).shuffle(&mut image, &mut StdRng::seed_from_u64(3));

        let moved = (0..8u32)
            .flat_map(|by| (0..8u32).map(move |bx| (bx * 4, by * 4)))
            .filter(|&(x, y)| image.get_pixel(x, y) != original.get_pixel(x, y))
            .count();
        assert!(moved >= 48, "only {moved} of 64 blocks left their cell");
    }

    #[test]
    fn test_swaps_preserve_pixel_multiset() {
        let mut image = tiles(6, 5);
        let mut before: Vec<_> = image.pixels().map(|p| p.0).collect();
        PixelShift::new(70).shuffle(&mut image, &mut StdRng::seed_from_u64(11));
        let mut after: Vec<_> = image.pixels().map(|p| p.0).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn test_partial_edge_blocks_stay_put() {
        // 8x8 grid of 4px blocks plus a 2px strip on the right
        let mut image = RgbaImage::from_fn(34, 32, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let original = image.clone();
        PixelShift::new(100).shuffle(&mut image, &mut StdRng::seed_from_u64(5));
        for y in 0..32 {
            for x in 32..34 {
                assert_eq!(image.get_pixel(x, y), original.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn test_single_block_is_noop() {
        let mut image = tiles(1, 1);
        assert_eq!(PixelShift::new(100).shuffle(&mut image, &mut StdRng::seed_from_u64(0)), 0);
    }
}
