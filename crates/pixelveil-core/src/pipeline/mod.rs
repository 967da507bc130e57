//! Image processing pipeline components.
//!
//! This module contains all the stages of the image processing pipeline:
//! - **decode**: Probe encoded bytes into an `ImageBuffer`
//! - **validate**: Size, magic-byte and dimension checks
//! - **metadata**: Plan and embed EXIF records
//! - **optimize**: Resize and pick the delivery codec
//! - **encode**: mozjpeg, libwebp and PNG encoders, ICC embedding
//! - **discovery**: Find image files in directories
//! - **processor**: Orchestrates the full pipeline

pub mod decode;
pub mod discovery;
pub mod encode;
pub mod metadata;
pub mod optimize;
pub mod processor;
pub mod validate;

// Re-exports for convenient access
pub use decode::{format_to_string, ImageBuffer, RasterInfo};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use metadata::{read_metadata, MetadataEditor, MetadataPlan};
pub use optimize::{OptimizeSettings, Optimizer};
pub use processor::{ImageProcessor, PipelinePlan};
pub use validate::Validator;
