//! Resize and re-encode for delivery.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::error::{PipelineError, PipelineResult};

use super::decode::{ImageBuffer, RasterInfo};
use super::encode;

/// PNGs denser than this (DPI) are treated as photographs and become JPEG.
const PHOTO_DENSITY_DPI: f64 = 72.0;

/// Resize and codec settings for one optimization run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizeSettings {
    pub max_width: Option<u32>,
    pub quality: u8,
    pub keep_color_profile: bool,
}

/// Downscales and re-encodes rasters.
pub struct Optimizer;

impl Optimizer {
    /// Optimize `raster`, choosing the codec from the source container.
    ///
    /// The result carries no EXIF. The source ICC profile is re-embedded
    /// only with `keep_color_profile`.
    pub fn optimize(
        raster: &DynamicImage,
        source: &RasterInfo,
        settings: &OptimizeSettings,
    ) -> PipelineResult<ImageBuffer> {
        let resized = Self::resize_to_width(raster, settings.max_width);
        let target = Self::select_format(source.format, resized.color().has_alpha(), source.density);

        tracing::trace!(
            "  Optimize: {:?} -> {:?} at {}x{}, q{}",
            source.format,
            target,
            resized.width(),
            resized.height(),
            settings.quality
        );

        let mut bytes = encode::encode_as(&resized, target, settings.quality)?;

        if settings.keep_color_profile {
            if let Some(icc) = &source.icc_profile {
                bytes = encode::embed_icc(&bytes, target, icc)?;
            }
        }

        ImageBuffer::from_bytes(bytes).map_err(|e| PipelineError::Optimization(e.to_string()))
    }

    /// Downscale to `max_width` preserving aspect ratio. Never upscales.
    pub fn resize_to_width(raster: &DynamicImage, max_width: Option<u32>) -> DynamicImage {
        let (width, height) = raster.dimensions();
        match max_width {
            Some(max) if max > 0 && width > max => {
                let new_height = ((height as f64 * max as f64 / width as f64).round() as u32).max(1);
                raster.resize_exact(max, new_height, FilterType::Lanczos3)
            }
            _ => raster.clone(),
        }
    }

    /// Output container for a source container.
    ///
    /// - PNG without alpha and density above 72 DPI: JPEG
    /// - PNG otherwise: PNG
    /// - WebP: WebP
    /// - anything else: JPEG
    pub fn select_format(source: ImageFormat, has_alpha: bool, density: Option<f64>) -> ImageFormat {
        match source {
            ImageFormat::Png => {
                let photographic = density.is_some_and(|d| d > PHOTO_DENSITY_DPI);
                if !has_alpha && photographic {
                    ImageFormat::Jpeg
                } else {
                    ImageFormat::Png
                }
            }
            ImageFormat::WebP => ImageFormat::WebP,
            _ => ImageFormat::Jpeg,
        }
    }
}
