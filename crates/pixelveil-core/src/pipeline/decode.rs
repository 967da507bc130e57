//! Image buffers: encoded bytes plus the raster facts probed from them.

use image::{DynamicImage, ImageDecoder, ImageFormat};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::{Bytes, DynImage, ImageEXIF, ImageICC};
use std::io::Cursor;

use crate::error::{PipelineError, PipelineResult};

/// Raster facts probed from an encoded image without a full decode.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    /// Detected container format
    pub format: ImageFormat,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Channel count of the stored color type (alpha included)
    pub channels: u8,
    /// Whether the stored color type carries an alpha channel
    pub has_alpha: bool,
    /// Pixel density in DPI, when the container declares a physical unit
    pub density: Option<f64>,
    /// Raw TIFF-structured EXIF blob, if embedded
    pub exif: Option<Vec<u8>>,
    /// Embedded ICC profile, if any
    pub icc_profile: Option<Vec<u8>>,
}

/// An encoded image and its probed raster facts.
///
/// Immutable: every pipeline stage produces a new `ImageBuffer`.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    bytes: Vec<u8>,
    info: RasterInfo,
}

impl ImageBuffer {
    /// Probe an encoded image.
    ///
    /// Reads the header for format, dimensions and color type, and the
    /// container for EXIF, ICC and density. Fails with `Decode` when the
    /// format is unrecognizable or the raster is zero-sized.
    pub fn from_bytes(bytes: Vec<u8>) -> PipelineResult<Self> {
        let (format, width, height, color) = {
            let reader = image::ImageReader::new(Cursor::new(bytes.as_slice()))
                .with_guessed_format()
                .map_err(|e| PipelineError::Decode(format!("Cannot read image header: {}", e)))?;
            let format = reader
                .format()
                .ok_or_else(|| PipelineError::Decode("Cannot detect image format".to_string()))?;
            let decoder = reader
                .into_decoder()
                .map_err(|e| PipelineError::Decode(e.to_string()))?;
            let (width, height) = decoder.dimensions();
            (format, width, height, decoder.color_type())
        };

        if width == 0 || height == 0 {
            return Err(PipelineError::Decode(format!(
                "Image has no usable dimensions ({}x{})",
                width, height
            )));
        }

        let (exif, icc_profile) = probe_container(&bytes);
        let density = probe_density(&bytes, format);

        Ok(Self {
            info: RasterInfo {
                format,
                width,
                height,
                channels: color.channel_count(),
                has_alpha: color.has_alpha(),
                density,
                exif,
                icc_profile,
            },
            bytes,
        })
    }

    /// Fully decode the raster.
    pub fn decode(&self) -> PipelineResult<DynamicImage> {
        image::load_from_memory_with_format(&self.bytes, self.info.format)
            .map_err(|e| PipelineError::Decode(e.to_string()))
    }

    /// Encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the buffer, returning the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Probed raster facts.
    pub fn info(&self) -> &RasterInfo {
        &self.info
    }

    pub fn format(&self) -> ImageFormat {
        self.info.format
    }

    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    pub fn has_alpha(&self) -> bool {
        self.info.has_alpha
    }

    /// Encoded size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Content-type hint for upload collaborators.
    pub fn mime_type(&self) -> &'static str {
        self.info.format.to_mime_type()
    }

    /// Preferred file extension for the detected format.
    pub fn extension(&self) -> &'static str {
        self.info
            .format
            .extensions_str()
            .first()
            .copied()
            .unwrap_or("bin")
    }
}

/// Extract EXIF and ICC blobs from JPEG/PNG/WebP containers.
fn probe_container(bytes: &[u8]) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
    match DynImage::from_bytes(Bytes::copy_from_slice(bytes)) {
        Ok(Some(image)) => (
            image.exif().map(|b| b.to_vec()),
            image.icc_profile().map(|b| b.to_vec()),
        ),
        _ => (None, None),
    }
}

/// Read declared pixel density (PNG pHYs, JPEG JFIF) and convert to DPI.
fn probe_density(bytes: &[u8], format: ImageFormat) -> Option<f64> {
    match format {
        ImageFormat::Png => {
            let png = Png::from_bytes(Bytes::copy_from_slice(bytes)).ok()?;
            let chunk = png.chunks().iter().find(|c| c.kind() == *b"pHYs")?;
            png_phys_dpi(chunk.contents())
        }
        ImageFormat::Jpeg => {
            let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(bytes)).ok()?;
            let app0 = jpeg
                .segments()
                .iter()
                .find(|s| s.marker() == 0xE0 && s.contents().starts_with(b"JFIF\0"))?;
            jfif_dpi(app0.contents())
        }
        _ => None,
    }
}

/// pHYs: x ppu (u32 BE), y ppu (u32 BE), unit (1 = metre).
fn png_phys_dpi(contents: &[u8]) -> Option<f64> {
    if contents.len() < 9 || contents[8] != 1 {
        return None;
    }
    let ppu = u32::from_be_bytes([contents[0], contents[1], contents[2], contents[3]]);
    Some(ppu as f64 * 0.0254)
}

/// JFIF APP0: "JFIF\0", version (2), units (1), Xdensity (u16 BE), Ydensity.
fn jfif_dpi(contents: &[u8]) -> Option<f64> {
    if contents.len() < 12 {
        return None;
    }
    let x = u16::from_be_bytes([contents[8], contents[9]]) as f64;
    match contents[7] {
        1 => Some(x),
        2 => Some(x * 2.54),
        _ => None,
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_format_to_string() {
        assert_eq!(format_to_string(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_to_string(ImageFormat::Png), "png");
        assert_eq!(format_to_string(ImageFormat::WebP), "webp");
    }

    #[test]
    fn test_probe_png_with_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 30, Rgba([1, 2, 3, 128])));
        let buffer = ImageBuffer::from_bytes(encode(&img, ImageFormat::Png)).unwrap();
        assert_eq!(buffer.format(), ImageFormat::Png);
        assert_eq!((buffer.width(), buffer.height()), (40, 30));
        assert_eq!(buffer.info().channels, 4);
        assert!(buffer.has_alpha());
        assert_eq!(buffer.info().density, None);
        assert_eq!(buffer.mime_type(), "image/png");
    }

    #[test]
    fn test_probe_jpeg_reads_jfif_density() {
        use image::codecs::jpeg::{JpegEncoder, PixelDensity};

        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([200, 10, 10])));
        let mut bytes = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, 90);
        encoder.set_pixel_density(PixelDensity::dpi(300));
        img.write_with_encoder(encoder).unwrap();

        let buffer = ImageBuffer::from_bytes(bytes).unwrap();
        assert_eq!(buffer.format(), ImageFormat::Jpeg);
        assert!(!buffer.has_alpha());
        assert_eq!(buffer.extension(), "jpg");
        assert_eq!(buffer.info().density, Some(300.0));
        assert!(buffer.decode().is_ok());

        // Aspect-ratio-only JFIF declares no physical density
        let plain = ImageBuffer::from_bytes(encode(&img, ImageFormat::Jpeg)).unwrap();
        assert_eq!(plain.info().density, None);
    }

    #[test]
    fn test_format_detected_by_content() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        let buffer = ImageBuffer::from_bytes(encode(&img, ImageFormat::Png)).unwrap();
        assert_eq!(buffer.format(), ImageFormat::Png);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = ImageBuffer::from_bytes(b"definitely not an image".to_vec()).unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn test_truncated_png_fails_full_decode() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([9, 9, 9])));
        let mut bytes = encode(&img, ImageFormat::Png);
        bytes.truncate(bytes.len() / 2);
        let result = ImageBuffer::from_bytes(bytes).and_then(|b| b.decode());
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_png_phys_dpi() {
        // 11811 px/m ≈ 300 DPI
        let mut contents = Vec::new();
        contents.extend_from_slice(&11811u32.to_be_bytes());
        contents.extend_from_slice(&11811u32.to_be_bytes());
        contents.push(1);
        let dpi = png_phys_dpi(&contents).unwrap();
        assert!((dpi - 300.0).abs() < 0.1);

        contents[8] = 0;
        assert_eq!(png_phys_dpi(&contents), None);
    }

    #[test]
    fn test_jfif_dpi_units() {
        let mut contents = b"JFIF\0".to_vec();
        contents.extend_from_slice(&[1, 1, 1]);
        contents.extend_from_slice(&96u16.to_be_bytes());
        contents.extend_from_slice(&96u16.to_be_bytes());
        contents.extend_from_slice(&[0, 0]);
        assert_eq!(jfif_dpi(&contents), Some(96.0));

        contents[7] = 0;
        assert_eq!(jfif_dpi(&contents), None);
    }
}
