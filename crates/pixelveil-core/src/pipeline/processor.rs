//! Pipeline orchestration - wires together all processing stages.

use image::{DynamicImage, ImageFormat};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::config::{Config, DefaultsConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::options::{Action, ProcessOptions};
use crate::scramble::{self, ScrambleSpec};
use crate::types::ProcessedImage;

use super::decode::ImageBuffer;
use super::encode;
use super::metadata::MetadataEditor;
use super::optimize::{OptimizeSettings, Optimizer};
use super::validate::Validator;

/// Stages selected for one invocation, resolved once from the options.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelinePlan {
    pub action: Action,
    pub scramble: Option<ScrambleSpec>,
    pub optimize: Option<OptimizeSettings>,
    /// Quality used when a scrambled raster is re-encoded without optimization
    pub quality: u8,
}

/// The main image processor that orchestrates the full pipeline.
///
/// Holds no per-image state: one processor may serve any number of
/// concurrent invocations.
pub struct ImageProcessor {
    validator: Validator,
    metadata: MetadataEditor,
    defaults: DefaultsConfig,
}

impl ImageProcessor {
    /// Create a new image processor with the given configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            validator: Validator::new(config.limits.clone()),
            metadata: MetadataEditor::new(config.defaults.software_stamp.clone()),
            defaults: config.defaults.clone(),
        }
    }

    /// Validate and probe raw input bytes.
    pub fn load(&self, bytes: Vec<u8>) -> PipelineResult<ImageBuffer> {
        self.validator.validate_bytes(&bytes)?;
        let image = ImageBuffer::from_bytes(bytes)?;
        self.validator.validate_dimensions(&image)?;
        Ok(image)
    }

    /// Resolve options into the stages to run.
    pub fn plan(&self, options: &ProcessOptions) -> PipelineResult<PipelinePlan> {
        options.validate()?;

        let quality = options.quality_or(self.defaults.quality);
        let scramble = match (options.action, options.scramble_type) {
            (Action::Scramble, Some(kind)) => Some(ScrambleSpec {
                kind,
                intensity: options.intensity(self.defaults.scramble_intensity),
                watermark_text: options
                    .watermark_text
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .unwrap_or(&self.defaults.watermark_text)
                    .to_string(),
                watermark_position: options.watermark_position,
            }),
            _ => None,
        };
        let optimize = options.optimize.then(|| OptimizeSettings {
            max_width: options.max_width,
            quality,
            keep_color_profile: options.keep_color_profile,
        });

        Ok(PipelinePlan {
            action: options.action,
            scramble,
            optimize,
            quality,
        })
    }

    /// Process one image with a fresh entropy-seeded random source.
    pub fn process(
        &self,
        image: ImageBuffer,
        options: &ProcessOptions,
    ) -> PipelineResult<ProcessedImage> {
        let mut rng = StdRng::from_entropy();
        self.process_with_rng(image, options, &mut rng)
    }

    /// Process one image: scramble, metadata, then optimization.
    ///
    /// Fails only on undecodable input, invalid options or a scramble
    /// failure. Metadata-encode and optimization failures are recovered
    /// and reported in `warnings`.
    pub fn process_with_rng(
        &self,
        source: ImageBuffer,
        options: &ProcessOptions,
        rng: &mut dyn RngCore,
    ) -> PipelineResult<ProcessedImage> {
        let start = std::time::Instant::now();
        let plan = self.plan(options)?;
        let mut warnings = Vec::new();

        // Decode
        let decode_start = std::time::Instant::now();
        let mut raster = source.decode()?;
        tracing::trace!("  Decode: {:?}", decode_start.elapsed());

        // Metadata plan comes from the untouched source
        let metadata_plan = self.metadata.plan(&source, options, &mut warnings);

        // Scramble
        let scrambled = match &plan.scramble {
            Some(spec) => {
                let scramble_start = std::time::Instant::now();
                raster = scramble::scramble(&raster, spec, rng)?;
                tracing::trace!("  Scramble ({}): {:?}", spec.kind, scramble_start.elapsed());
                true
            }
            None => false,
        };

        // Optimize, or re-encode a scrambled raster in its source format
        let optimize_start = std::time::Instant::now();
        let (output, reencoded) = match &plan.optimize {
            Some(settings) => match Optimizer::optimize(&raster, source.info(), settings) {
                Ok(optimized) => (optimized, true),
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Optimization failed, keeping unoptimized image: {}", e);
                    warnings.push(e.to_string());
                    if scrambled {
                        (self.reencode(&raster, &source, plan.quality)?, true)
                    } else {
                        (source.clone(), false)
                    }
                }
                Err(e) => return Err(e),
            },
            None if scrambled => (self.reencode(&raster, &source, plan.quality)?, true),
            None => (source.clone(), false),
        };
        tracing::trace!("  Encode: {:?}", optimize_start.elapsed());

        // Embed metadata into the final container
        let image = if metadata_plan.is_passthrough() && !reencoded {
            output
        } else {
            match self.metadata.apply(&output, &metadata_plan) {
                Ok(with_metadata) => with_metadata,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Metadata not embedded: {}", e);
                    warnings.push(e.to_string());
                    output
                }
                Err(e) => return Err(e),
            }
        };

        tracing::debug!(
            "Processed {} ({}x{} -> {}x{}, {} -> {} bytes) in {:?}",
            plan.action,
            source.width(),
            source.height(),
            image.width(),
            image.height(),
            source.len(),
            image.len(),
            start.elapsed()
        );

        Ok(ProcessedImage { image, warnings })
    }

    /// Validate, probe and process raw bytes.
    pub fn process_bytes(
        &self,
        bytes: Vec<u8>,
        options: &ProcessOptions,
        rng: &mut dyn RngCore,
    ) -> PipelineResult<ProcessedImage> {
        let image = self.load(bytes)?;
        self.process_with_rng(image, options, rng)
    }

    /// Encode a scrambled raster in the source container, falling back to PNG.
    fn reencode(
        &self,
        raster: &DynamicImage,
        source: &ImageBuffer,
        quality: u8,
    ) -> PipelineResult<ImageBuffer> {
        let bytes = encode::encode_as(raster, source.format(), quality)
            .or_else(|e| {
                tracing::debug!("Re-encode as {:?} failed ({}), using PNG", source.format(), e);
                encode::encode_as(raster, ImageFormat::Png, quality)
            })
            .map_err(|e| PipelineError::scramble("encode", e.to_string()))?;
        ImageBuffer::from_bytes(bytes)
    }
}
