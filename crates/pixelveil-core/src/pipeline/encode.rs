//! Codec wrappers: mozjpeg, libwebp and the image crate's PNG encoder.
//!
//! Every encoder emits 8-bit output without metadata; EXIF and ICC are
//! embedded afterwards by the container-level helpers.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, GenericImageView, ImageFormat};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageICC};
use std::io::Cursor;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::{PipelineError, PipelineResult};

/// Progressive JPEG via mozjpeg with optimized Huffman tables.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> PipelineResult<Vec<u8>> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    // mozjpeg reports libjpeg errors by unwinding
    let result = catch_unwind(AssertUnwindSafe(|| -> std::io::Result<Vec<u8>> {
        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(rgb.as_raw())?;
        comp.finish()
    }));

    match result {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(PipelineError::Optimization(format!("JPEG encode: {}", e))),
        Err(_) => Err(PipelineError::Optimization(
            "JPEG encoder aborted".to_string(),
        )),
    }
}

/// PNG at best compression with adaptive filtering, after lossless
/// color-type reduction.
pub fn encode_png(image: &DynamicImage) -> PipelineResult<Vec<u8>> {
    let reduced = reduce_color_type(image);
    let mut buffer = Vec::new();
    let encoder = PngEncoder::new_with_quality(
        Cursor::new(&mut buffer),
        CompressionType::Best,
        FilterType::Adaptive,
    );
    reduced
        .write_with_encoder(encoder)
        .map_err(|e| PipelineError::Optimization(format!("PNG encode: {}", e)))?;
    Ok(buffer)
}

/// Lossy WebP via libwebp at its default effort.
pub fn encode_webp(image: &DynamicImage, quality: u8) -> PipelineResult<Vec<u8>> {
    let (width, height) = image.dimensions();
    let data = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(&rgba, width, height)
            .encode(quality as f32)
            .to_vec()
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(&rgb, width, height)
            .encode(quality as f32)
            .to_vec()
    };
    if data.is_empty() {
        return Err(PipelineError::Optimization(
            "WebP encoder produced no output".to_string(),
        ));
    }
    Ok(data)
}

/// Re-encode a raster in the given container format.
///
/// Formats the pipeline has a dedicated encoder for use it; the rest go
/// through the image crate.
pub fn encode_as(image: &DynamicImage, format: ImageFormat, quality: u8) -> PipelineResult<Vec<u8>> {
    match format {
        ImageFormat::Jpeg => encode_jpeg(image, quality),
        ImageFormat::Png => encode_png(image),
        ImageFormat::WebP => encode_webp(image, quality),
        other => {
            let mut cursor = Cursor::new(Vec::new());
            image
                .write_to(&mut cursor, other)
                .map_err(|e| PipelineError::Optimization(format!("{:?} encode: {}", other, e)))?;
            Ok(cursor.into_inner())
        }
    }
}

/// Embed an ICC profile into a JPEG, PNG or WebP container.
pub fn embed_icc(bytes: &[u8], format: ImageFormat, icc: &[u8]) -> PipelineResult<Vec<u8>> {
    let data = Bytes::copy_from_slice(bytes);
    let profile = Some(Bytes::copy_from_slice(icc));
    let output = match format {
        ImageFormat::Jpeg => {
            let mut jpeg = Jpeg::from_bytes(data).map_err(icc_error)?;
            jpeg.set_icc_profile(profile);
            jpeg.encoder().bytes()
        }
        ImageFormat::Png => {
            let mut png = Png::from_bytes(data).map_err(icc_error)?;
            png.set_icc_profile(profile);
            png.encoder().bytes()
        }
        ImageFormat::WebP => {
            let mut webp = WebP::from_bytes(data).map_err(icc_error)?;
            webp.set_icc_profile(profile);
            webp.encoder().bytes()
        }
        other => {
            return Err(PipelineError::Optimization(format!(
                "Cannot embed ICC profile in {:?} container",
                other
            )))
        }
    };
    Ok(output.to_vec())
}

/// Drop channels that carry no information: opaque alpha, equal RGB.
pub fn reduce_color_type(image: &DynamicImage) -> DynamicImage {
    let rgba = image.to_rgba8();
    let opaque = rgba.pixels().all(|p| p[3] == u8::MAX);
    let gray = rgba.pixels().all(|p| p[0] == p[1] && p[1] == p[2]);

    match (opaque, gray) {
        (true, true) => DynamicImage::ImageLuma8(image.to_luma8()),
        (true, false) => DynamicImage::ImageRgb8(image.to_rgb8()),
        (false, true) => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        (false, false) => DynamicImage::ImageRgba8(rgba),
    }
}

fn icc_error(e: img_parts::Error) -> PipelineError {
    PipelineError::Optimization(format!("ICC embed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ImageBuffer;
    use image::{ColorType, Rgb, RgbImage, Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn test_encode_jpeg_is_decodable() {
        let bytes = encode_jpeg(&gradient(64, 48), 80).unwrap();
        let buffer = ImageBuffer::from_bytes(bytes).unwrap();
        assert_eq!(buffer.format(), ImageFormat::Jpeg);
        assert_eq!((buffer.width(), buffer.height()), (64, 48));
    }

    #[test]
    fn test_encode_webp_is_decodable() {
        let bytes = encode_webp(&gradient(40, 40), 75).unwrap();
        let buffer = ImageBuffer::from_bytes(bytes).unwrap();
        assert_eq!(buffer.format(), ImageFormat::WebP);
        assert_eq!(buffer.width(), 40);
    }

    #[test]
    fn test_reduce_color_type() {
        let opaque = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255])));
        assert_eq!(reduce_color_type(&opaque).color(), ColorType::Rgb8);

        let gray = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([77, 77, 77])));
        let reduced = reduce_color_type(&gray);
        assert_eq!(reduced.color(), ColorType::L8);
        assert_eq!(reduced.to_luma8().get_pixel(0, 0)[0], 77);

        let translucent = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 100])));
        assert_eq!(reduce_color_type(&translucent).color(), ColorType::Rgba8);
    }

    #[test]
    fn test_encode_png_keeps_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([200, 0, 0, 64])));
        let buffer = ImageBuffer::from_bytes(encode_png(&img).unwrap()).unwrap();
        assert_eq!(buffer.format(), ImageFormat::Png);
        assert!(buffer.has_alpha());
    }

    #[test]
    fn test_embed_icc_roundtrip() {
        let profile = vec![0u8; 128];
        let jpeg = encode_jpeg(&gradient(8, 8), 85).unwrap();
        let with_icc = embed_icc(&jpeg, ImageFormat::Jpeg, &profile).unwrap();
        let buffer = ImageBuffer::from_bytes(with_icc).unwrap();
        assert_eq!(buffer.info().icc_profile.as_deref(), Some(profile.as_slice()));
    }

    #[test]
    fn test_encode_as_falls_through_to_image_crate() {
        let bytes = encode_as(&gradient(8, 8), ImageFormat::Bmp, 85).unwrap();
        assert!(bytes.starts_with(b"BM"));
    }
}
