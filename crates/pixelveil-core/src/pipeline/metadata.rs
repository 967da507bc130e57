//! EXIF planning and container embedding.
//!
//! The metadata stage works in two steps. [`MetadataEditor::plan`] decides,
//! from the source image and the options, which EXIF record the output must
//! carry. [`MetadataEditor::apply`] writes that record into whatever
//! container the pipeline finally produced, so re-encoding never loses it.

use exif::experimental::Writer;
use exif::{Context, Field, In, Reader, Tag, Value};
use image::ImageFormat;
use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::png::Png;
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF};
use std::io::Cursor;

use crate::error::{PipelineError, PipelineResult};
use crate::options::{Action, ProcessOptions};
use crate::types::ExifSummary;

use super::decode::ImageBuffer;

/// IFD0 HostComputer; not among the named tags of the exif crate.
const HOST_COMPUTER: Tag = Tag(Context::Tiff, 0x013c);

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Largest EXIF blob an APP1 segment holds: the 16-bit segment length
/// covers itself (2) and the `Exif\0\0` prefix (6).
const MAX_JPEG_EXIF_LEN: usize = u16::MAX as usize - 2 - 6;

const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const XMP_EXTENSION_HEADER: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";

/// The EXIF record an output image must carry.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataPlan {
    /// Carry the source EXIF blob unchanged
    Keep(Option<Vec<u8>>),

    /// Replace EXIF with a new blob (`None` removes it). With
    /// `strip_auxiliary`, XMP, IPTC, comments and text chunks go too.
    Replace {
        exif: Option<Vec<u8>>,
        strip_auxiliary: bool,
    },
}

impl MetadataPlan {
    /// Whether applying this plan to the untouched source is a no-op.
    pub fn is_passthrough(&self) -> bool {
        matches!(self, MetadataPlan::Keep(_))
    }
}

/// Builds and embeds EXIF records.
pub struct MetadataEditor {
    software_stamp: String,
}

impl MetadataEditor {
    /// Create an editor that stamps `software_stamp` on fresh records.
    pub fn new(software_stamp: impl Into<String>) -> Self {
        Self {
            software_stamp: software_stamp.into(),
        }
    }

    /// Decide the output EXIF for `source` under `options`.
    ///
    /// Never fails: unreadable source EXIF is reported through `warnings`
    /// and treated as absent.
    pub fn plan(
        &self,
        source: &ImageBuffer,
        options: &ProcessOptions,
        warnings: &mut Vec<String>,
    ) -> MetadataPlan {
        let existing = source.info().exif.as_deref();

        let fields = match options.action {
            Action::Add => self.fresh_record(existing, options),
            Action::Strip => {
                return replace(orientation_only(existing), true, warnings);
            }
            Action::Update => match existing.map(read_fields) {
                Some(Ok(fields)) => merge_supplied(fields, options),
                Some(Err(e)) => {
                    tracing::warn!("Existing EXIF unreadable, writing supplied fields only: {}", e);
                    warnings.push(format!("Existing EXIF discarded: {}", e));
                    self.fresh_record(None, options)
                }
                None => merge_supplied(Vec::new(), options),
            },
            Action::Scramble if options.has_provenance() => self.fresh_record(existing, options),
            Action::Scramble => {
                return replace(orientation_only(existing), true, warnings);
            }
            Action::Optimize => {
                if !options.remove_gps {
                    return MetadataPlan::Keep(existing.map(<[u8]>::to_vec));
                }
                match existing.map(read_fields) {
                    None => return MetadataPlan::Keep(None),
                    Some(Ok(fields)) => fields,
                    Some(Err(e)) => {
                        tracing::warn!("EXIF unreadable, dropping it to honour removeGPS: {}", e);
                        warnings.push(format!("Existing EXIF discarded: {}", e));
                        Vec::new()
                    }
                }
            }
        };

        let fields = if options.remove_gps {
            without_gps(fields)
        } else {
            fields
        };
        replace(fields, false, warnings)
    }

    /// Embed `plan` into the container of `image`.
    ///
    /// JPEG, PNG and WebP are supported. Other containers only accept plans
    /// that leave them without EXIF; anything else is a `MetadataEncode`
    /// error the caller recovers from.
    pub fn apply(&self, image: &ImageBuffer, plan: &MetadataPlan) -> PipelineResult<ImageBuffer> {
        let (exif, strip_auxiliary) = match plan {
            MetadataPlan::Keep(exif) => (exif.clone(), false),
            MetadataPlan::Replace {
                exif,
                strip_auxiliary,
            } => (exif.clone(), *strip_auxiliary),
        };
        let exif = exif.map(Bytes::from);
        let bytes = Bytes::copy_from_slice(image.bytes());

        let output = match image.format() {
            ImageFormat::Jpeg => {
                if let Some(blob) = exif.as_ref().filter(|b| b.len() > MAX_JPEG_EXIF_LEN) {
                    return Err(PipelineError::MetadataEncode(format!(
                        "EXIF record of {} bytes exceeds the JPEG APP1 limit of {} bytes",
                        blob.len(),
                        MAX_JPEG_EXIF_LEN
                    )));
                }
                let mut jpeg = Jpeg::from_bytes(bytes).map_err(encode_error)?;
                if strip_auxiliary {
                    jpeg.segments_mut().retain(|s| !is_auxiliary_segment(s));
                }
                jpeg.set_exif(exif);
                jpeg.encoder().bytes()
            }
            ImageFormat::Png => {
                let mut png = Png::from_bytes(bytes).map_err(encode_error)?;
                if strip_auxiliary {
                    png.chunks_mut()
                        .retain(|c| !matches!(&c.kind(), b"tEXt" | b"zTXt" | b"iTXt" | b"tIME"));
                }
                png.set_exif(exif);
                png.encoder().bytes()
            }
            ImageFormat::WebP => {
                let mut webp = WebP::from_bytes(bytes).map_err(encode_error)?;
                if strip_auxiliary {
                    webp.chunks_mut().retain(|c| c.id() != *b"XMP ");
                }
                webp.set_exif(exif);
                webp.encoder().bytes()
            }
            other => {
                if exif.is_none() && image.info().exif.is_none() {
                    return Ok(image.clone());
                }
                return Err(PipelineError::MetadataEncode(format!(
                    "Cannot embed EXIF in {:?} container",
                    other
                )));
            }
        };

        ImageBuffer::from_bytes(output.to_vec())
            .map_err(|e| PipelineError::MetadataEncode(e.to_string()))
    }

    /// IFD0 record for `add`: supplied fields, DateTime, Software stamp,
    /// the source orientation and the source GPS block.
    fn fresh_record(&self, existing: Option<&[u8]>, options: &ProcessOptions) -> Vec<Field> {
        let mut fields = carried_fields(existing);
        let now = chrono::Local::now()
            .format(EXIF_DATETIME_FORMAT)
            .to_string();
        upsert(&mut fields, ascii_field(Tag::DateTime, &now));
        upsert(&mut fields, ascii_field(Tag::Software, &self.software_stamp));
        for (name, value) in options.provenance() {
            if let (Some(tag), Some(value)) = (provenance_tag(name), value) {
                upsert(&mut fields, ascii_field(tag, value));
            }
        }
        fields
    }
}

/// Read EXIF from any supported container into a summary.
///
/// Returns `Ok(None)` when the image carries no EXIF.
pub fn read_metadata(image: &ImageBuffer) -> PipelineResult<Option<ExifSummary>> {
    let Some(blob) = image.info().exif.as_deref() else {
        return Ok(None);
    };
    let fields = read_fields(blob)?;

    let text = |tag: Tag| {
        fields
            .iter()
            .find(|f| f.tag == tag && f.ifd_num == In::PRIMARY)
            .and_then(ascii_value)
    };

    Ok(Some(ExifSummary {
        copyright: text(Tag::Copyright),
        artist: text(Tag::Artist),
        image_description: text(Tag::ImageDescription),
        make: text(Tag::Make),
        model: text(Tag::Model),
        software: text(Tag::Software),
        host_computer: text(HOST_COMPUTER),
        date_time: text(Tag::DateTime),
        orientation: orientation_of(&fields),
        gps_latitude: gps_coord(&fields, Tag::GPSLatitude, Tag::GPSLatitudeRef),
        gps_longitude: gps_coord(&fields, Tag::GPSLongitude, Tag::GPSLongitudeRef),
        gps_field_count: fields
            .iter()
            .filter(|f| f.tag.context() == Context::Gps)
            .count(),
        field_count: fields.len(),
    }))
}

/// Parse a raw TIFF-structured blob into rewritable primary-image fields.
///
/// Structural tags (IFD pointers, strip and thumbnail offsets) are dropped;
/// the writer regenerates whatever it needs.
pub(crate) fn read_fields(blob: &[u8]) -> PipelineResult<Vec<Field>> {
    let exif = Reader::new()
        .read_raw(blob.to_vec())
        .map_err(|e| PipelineError::MetadataEncode(format!("Unreadable EXIF: {}", e)))?;
    Ok(exif
        .fields()
        .filter(|f| f.ifd_num == In::PRIMARY && is_rewritable(f))
        .cloned()
        .collect())
}

/// Serialize fields to a little-endian TIFF blob.
pub(crate) fn write_fields(fields: &[Field]) -> PipelineResult<Vec<u8>> {
    let mut sorted: Vec<&Field> = fields.iter().collect();
    sorted.sort_by_key(|f| f.tag.number());

    let mut writer = Writer::new();
    for field in sorted {
        writer.push_field(field);
    }
    let mut cursor = Cursor::new(Vec::new());
    writer
        .write(&mut cursor, true)
        .map_err(|e| PipelineError::MetadataEncode(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Build a `Replace` plan, degrading to "no EXIF" if the record won't serialize.
fn replace(fields: Vec<Field>, strip_auxiliary: bool, warnings: &mut Vec<String>) -> MetadataPlan {
    let exif = if fields.is_empty() {
        None
    } else {
        match write_fields(&fields) {
            Ok(blob) => Some(blob),
            Err(e) => {
                tracing::warn!("EXIF record could not be serialized: {}", e);
                warnings.push(e.to_string());
                None
            }
        }
    };
    MetadataPlan::Replace {
        exif,
        strip_auxiliary,
    }
}

/// Existing fields with every supplied provenance value written over IFD0.
fn merge_supplied(mut fields: Vec<Field>, options: &ProcessOptions) -> Vec<Field> {
    for (name, value) in options.provenance() {
        if let (Some(tag), Some(value)) = (provenance_tag(name), value) {
            upsert(&mut fields, ascii_field(tag, value));
        }
    }
    fields
}

/// Just the orientation field of a blob, if it parses and has one.
fn orientation_only(existing: Option<&[u8]>) -> Vec<Field> {
    existing
        .and_then(|blob| read_fields(blob).ok())
        .and_then(|fields| {
            orientation_of(&fields).map(|o| Field {
                tag: Tag::Orientation,
                ifd_num: In::PRIMARY,
                value: Value::Short(vec![o as u16]),
            })
        })
        .into_iter()
        .collect()
}

/// Orientation plus every GPS field of a blob, if it parses.
fn carried_fields(existing: Option<&[u8]>) -> Vec<Field> {
    let mut fields = orientation_only(existing);
    if let Some(Ok(source)) = existing.map(read_fields) {
        fields.extend(
            source
                .into_iter()
                .filter(|f| f.tag.context() == Context::Gps),
        );
    }
    fields
}

fn without_gps(fields: Vec<Field>) -> Vec<Field> {
    fields
        .into_iter()
        .filter(|f| f.tag.context() != Context::Gps)
        .collect()
}

fn upsert(fields: &mut Vec<Field>, field: Field) {
    match fields
        .iter_mut()
        .find(|f| f.tag == field.tag && f.ifd_num == field.ifd_num)
    {
        Some(existing) => *existing = field,
        None => fields.push(field),
    }
}

fn ascii_field(tag: Tag, value: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![value.as_bytes().to_vec()]),
    }
}

/// ASCII field contents, decoded leniently as UTF-8.
fn ascii_value(field: &Field) -> Option<String> {
    match &field.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()),
        _ => None,
    }
}

fn provenance_tag(name: &str) -> Option<Tag> {
    match name {
        "Copyright" => Some(Tag::Copyright),
        "Artist" => Some(Tag::Artist),
        "ImageDescription" => Some(Tag::ImageDescription),
        "Make" => Some(Tag::Make),
        "Model" => Some(Tag::Model),
        "Software" => Some(Tag::Software),
        "HostComputer" => Some(HOST_COMPUTER),
        _ => None,
    }
}

fn orientation_of(fields: &[Field]) -> Option<u32> {
    fields
        .iter()
        .find(|f| f.tag == Tag::Orientation)
        .and_then(|f| f.value.get_uint(0))
}

fn is_rewritable(field: &Field) -> bool {
    if matches!(field.value, Value::Unknown(..)) {
        return false;
    }
    !matches!(
        field.tag,
        Tag::ExifIFDPointer
            | Tag::GPSInfoIFDPointer
            | Tag::InteropIFDPointer
            | Tag::JPEGInterchangeFormat
            | Tag::JPEGInterchangeFormatLength
            | Tag::StripOffsets
            | Tag::StripByteCounts
            | Tag::TileOffsets
            | Tag::TileByteCounts
    )
}

fn is_auxiliary_segment(segment: &JpegSegment) -> bool {
    match segment.marker() {
        // APP1 XMP (standard and extended)
        0xE1 => {
            segment.contents().starts_with(XMP_HEADER)
                || segment.contents().starts_with(XMP_EXTENSION_HEADER)
        }
        // APP13 Photoshop/IPTC, COM
        0xED | 0xFE => true,
        _ => false,
    }
}

/// Get GPS coordinate, converting from degrees/minutes/seconds to decimal.
fn gps_coord(fields: &[Field], coord_tag: Tag, ref_tag: Tag) -> Option<f64> {
    let coord = fields.iter().find(|f| f.tag == coord_tag)?;
    let reference = fields.iter().find(|f| f.tag == ref_tag).and_then(ascii_value)?;

    let degrees = match &coord.value {
        Value::Rational(r) if r.len() >= 3 => {
            r[0].to_f64() + r[1].to_f64() / 60.0 + r[2].to_f64() / 3600.0
        }
        _ => return None,
    };

    // Apply sign based on reference (N/S for lat, E/W for lon)
    let sign = if reference.contains('S') || reference.contains('W') {
        -1.0
    } else {
        1.0
    };
    Some(sign * degrees)
}

fn encode_error(e: img_parts::Error) -> PipelineError {
    PipelineError::MetadataEncode(e.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use exif::Rational;
    use image::{DynamicImage, Rgb, RgbImage};

    fn editor() -> MetadataEditor {
        MetadataEditor::new("pixelveil test")
    }

    /// Fields found in a typical phone capture.
    pub(crate) fn camera_fields() -> Vec<Field> {
        vec![
            ascii_field(Tag::Make, "Acme"),
            ascii_field(Tag::Model, "Phone 9"),
            ascii_field(Tag::Artist, "Original Artist"),
            Field {
                tag: Tag::Orientation,
                ifd_num: In::PRIMARY,
                value: Value::Short(vec![6]),
            },
            Field {
                tag: Tag::ExposureTime,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![Rational { num: 1, denom: 250 }]),
            },
            Field {
                tag: Tag::GPSLatitudeRef,
                ifd_num: In::PRIMARY,
                value: Value::Ascii(vec![b"N".to_vec()]),
            },
            Field {
                tag: Tag::GPSLatitude,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![
                    Rational { num: 48, denom: 1 },
                    Rational { num: 51, denom: 1 },
                    Rational { num: 0, denom: 1 },
                ]),
            },
        ]
    }

    /// A JPEG carrying `fields` as EXIF plus an XMP packet and a comment.
    pub(crate) fn jpeg_with_exif(fields: &[Field]) -> ImageBuffer {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb([90, 120, 200])));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Jpeg).unwrap();

        let mut jpeg = Jpeg::from_bytes(Bytes::from(cursor.into_inner())).unwrap();
        let mut xmp = XMP_HEADER.to_vec();
        xmp.extend_from_slice(b"<x:xmpmeta/>");
        jpeg.segments_mut()
            .insert(1, JpegSegment::new_with_contents(0xE1, Bytes::from(xmp)));
        jpeg.segments_mut().insert(
            1,
            JpegSegment::new_with_contents(0xFE, Bytes::from_static(b"shot on holiday")),
        );
        if !fields.is_empty() {
            jpeg.set_exif(Some(Bytes::from(write_fields(fields).unwrap())));
        }
        ImageBuffer::from_bytes(jpeg.encoder().bytes().to_vec()).unwrap()
    }

    fn run(source: &ImageBuffer, options: &ProcessOptions) -> (ImageBuffer, Vec<String>) {
        let mut warnings = Vec::new();
        let plan = editor().plan(source, options, &mut warnings);
        (editor().apply(source, &plan).unwrap(), warnings)
    }

    fn fields_of(image: &ImageBuffer) -> Vec<Field> {
        read_fields(image.info().exif.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn test_strip_keeps_only_orientation() {
        let source = jpeg_with_exif(&camera_fields());
        let (output, warnings) = run(&source, &ProcessOptions::for_action(Action::Strip));
        assert!(warnings.is_empty());

        let fields = fields_of(&output);
        assert_eq!(fields.len(), 1);
        assert_eq!(orientation_of(&fields), Some(6));

        let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(output.bytes())).unwrap();
        assert!(!jpeg.segments().iter().any(is_auxiliary_segment));
    }

    #[test]
    fn test_strip_without_orientation_removes_exif() {
        let source = jpeg_with_exif(&[ascii_field(Tag::Make, "Acme")]);
        let (output, _) = run(&source, &ProcessOptions::for_action(Action::Strip));
        assert!(output.info().exif.is_none());
    }

    #[test]
    fn test_add_writes_supplied_fields_and_stamps() {
        let source = jpeg_with_exif(&camera_fields());
        let mut options = ProcessOptions::for_action(Action::Add);
        options.copyright = Some("© 2024 Acme".into());
        options.host_computer = Some("render-farm".into());

        let (output, _) = run(&source, &options);
        let summary = read_metadata(&output).unwrap().unwrap();
        assert_eq!(summary.copyright.as_deref(), Some("© 2024 Acme"));
        assert_eq!(summary.host_computer.as_deref(), Some("render-farm"));
        assert_eq!(summary.software.as_deref(), Some("pixelveil test"));
        assert_eq!(summary.orientation, Some(6));
        assert!(summary.date_time.is_some());
        // Camera fields are dropped, location is carried
        assert_eq!(summary.make, None);
        assert_eq!(summary.artist, None);
        assert_eq!(summary.gps_field_count, 2);
        assert!((summary.gps_latitude.unwrap() - 48.85).abs() < 1e-9);
    }

    #[test]
    fn test_add_with_remove_gps_clears_location() {
        let source = jpeg_with_exif(&camera_fields());
        let mut options = ProcessOptions::for_action(Action::Add);
        options.copyright = Some("C".into());
        options.remove_gps = true;

        let (output, _) = run(&source, &options);
        let summary = read_metadata(&output).unwrap().unwrap();
        assert_eq!(summary.copyright.as_deref(), Some("C"));
        assert_eq!(summary.gps_field_count, 0);
        assert_eq!(summary.orientation, Some(6));
    }

    #[test]
    fn test_gps_untouched_without_remove_gps() {
        let source = jpeg_with_exif(&camera_fields());
        let before = read_metadata(&source).unwrap().unwrap().gps_field_count;
        assert_eq!(before, 2);

        let mut add = ProcessOptions::for_action(Action::Add);
        add.copyright = Some("C".into());
        let mut update = ProcessOptions::for_action(Action::Update);
        update.author = Some("A".into());
        let mut scramble = ProcessOptions::for_action(Action::Scramble);
        scramble.scramble_type = Some(crate::options::ScrambleType::Noise);
        scramble.copyright = Some("C".into());

        for options in [add, update, scramble] {
            let (output, _) = run(&source, &options);
            let summary = read_metadata(&output).unwrap().unwrap();
            assert_eq!(summary.gps_field_count, before, "{} dropped GPS", options.action);
            assert!((summary.gps_latitude.unwrap() - 48.85).abs() < 1e-9);
        }
    }

    #[test]
    fn test_oversized_jpeg_exif_is_a_metadata_encode_error() {
        let source = jpeg_with_exif(&camera_fields());
        let mut options = ProcessOptions::for_action(Action::Add);
        options.image_description = Some("x".repeat(70_000));

        let mut warnings = Vec::new();
        let plan = editor().plan(&source, &options, &mut warnings);
        let err = editor().apply(&source, &plan).unwrap_err();
        assert!(matches!(err, PipelineError::MetadataEncode(_)));
    }

    #[test]
    fn test_add_caller_software_wins() {
        let source = jpeg_with_exif(&[]);
        let mut options = ProcessOptions::for_action(Action::Add);
        options.software = Some("Darkroom 3".into());
        let (output, _) = run(&source, &options);
        let summary = read_metadata(&output).unwrap().unwrap();
        assert_eq!(summary.software.as_deref(), Some("Darkroom 3"));
    }

    #[test]
    fn test_update_merges_supplied_over_existing() {
        let source = jpeg_with_exif(&camera_fields());
        let mut options = ProcessOptions::for_action(Action::Update);
        options.author = Some("New Artist".into());
        options.copyright = Some("CC-BY".into());

        let (output, warnings) = run(&source, &options);
        assert!(warnings.is_empty());
        let summary = read_metadata(&output).unwrap().unwrap();
        assert_eq!(summary.artist.as_deref(), Some("New Artist"));
        assert_eq!(summary.copyright.as_deref(), Some("CC-BY"));
        assert_eq!(summary.make.as_deref(), Some("Acme"));
        assert_eq!(summary.model.as_deref(), Some("Phone 9"));
        assert_eq!(summary.orientation, Some(6));
        assert!(summary.gps_field_count > 0);
        assert!(summary.date_time.is_none());
    }

    #[test]
    fn test_update_with_unreadable_exif_falls_back_to_add() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Jpeg).unwrap();
        let mut jpeg = Jpeg::from_bytes(Bytes::from(cursor.into_inner())).unwrap();
        jpeg.set_exif(Some(Bytes::from_static(b"II*\0garbage")));
        let source = ImageBuffer::from_bytes(jpeg.encoder().bytes().to_vec()).unwrap();

        let mut options = ProcessOptions::for_action(Action::Update);
        options.make = Some("Fallback".into());
        let (output, warnings) = run(&source, &options);
        assert_eq!(warnings.len(), 1);
        let summary = read_metadata(&output).unwrap().unwrap();
        assert_eq!(summary.make.as_deref(), Some("Fallback"));
    }

    #[test]
    fn test_remove_gps_on_optimize_keeps_other_fields() {
        let source = jpeg_with_exif(&camera_fields());
        let mut options = ProcessOptions::for_action(Action::Optimize);
        options.remove_gps = true;
        let (output, _) = run(&source, &options);
        let summary = read_metadata(&output).unwrap().unwrap();
        assert_eq!(summary.gps_field_count, 0);
        assert_eq!(summary.gps_latitude, None);
        assert_eq!(summary.make.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_optimize_without_remove_gps_keeps_blob() {
        let source = jpeg_with_exif(&camera_fields());
        let mut warnings = Vec::new();
        let plan = editor().plan(&source, &ProcessOptions::default(), &mut warnings);
        assert!(plan.is_passthrough());
        assert_eq!(plan, MetadataPlan::Keep(source.info().exif.clone()));
    }

    #[test]
    fn test_scramble_without_provenance_strips() {
        let source = jpeg_with_exif(&camera_fields());
        let mut warnings = Vec::new();
        let options = ProcessOptions::for_action(Action::Scramble);
        let plan = editor().plan(&source, &options, &mut warnings);
        assert!(matches!(
            plan,
            MetadataPlan::Replace {
                strip_auxiliary: true,
                ..
            }
        ));
    }

    #[test]
    fn test_read_metadata_gps_coordinates() {
        let source = jpeg_with_exif(&camera_fields());
        let summary = read_metadata(&source).unwrap().unwrap();
        let lat = summary.gps_latitude.unwrap();
        assert!((lat - 48.85).abs() < 1e-9);
    }

    #[test]
    fn test_apply_to_png() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        let source = ImageBuffer::from_bytes(cursor.into_inner()).unwrap();

        let mut options = ProcessOptions::for_action(Action::Add);
        options.author = Some("Jane".into());
        let (output, _) = run(&source, &options);
        assert_eq!(output.format(), ImageFormat::Png);
        let summary = read_metadata(&output).unwrap().unwrap();
        assert_eq!(summary.artist.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_apply_to_bmp_fails_with_metadata_encode() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Bmp).unwrap();
        let source = ImageBuffer::from_bytes(cursor.into_inner()).unwrap();

        let mut warnings = Vec::new();
        let mut options = ProcessOptions::for_action(Action::Add);
        options.author = Some("Jane".into());
        let plan = editor().plan(&source, &options, &mut warnings);
        let err = editor().apply(&source, &plan).unwrap_err();
        assert!(matches!(err, PipelineError::MetadataEncode(_)));

        // Nothing to embed and nothing to remove is fine
        let strip = editor().plan(&source, &ProcessOptions::for_action(Action::Strip), &mut warnings);
        assert!(editor().apply(&source, &strip).is_ok());
    }
}
