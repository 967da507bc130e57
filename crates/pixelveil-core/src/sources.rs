//! Source and destination collaborators for the batch coordinator.
//!
//! The coordinator only knows how to turn a location into bytes and how to
//! hand a finished image to a destination. Local-filesystem implementations
//! back the CLI; other transports plug in behind the same traits.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::ImageBuffer;

/// Delivers the encoded bytes for a location. Never retried.
pub trait ImageSource: Send + Sync {
    fn fetch(&self, location: &str) -> PipelineResult<Vec<u8>>;
}

/// Persists a processed image and returns where it can be found.
pub trait ImageSink: Send + Sync {
    fn store(&self, id: &str, image: &ImageBuffer) -> PipelineResult<String>;
}

impl<T: ImageSource + ?Sized> ImageSource for Arc<T> {
    fn fetch(&self, location: &str) -> PipelineResult<Vec<u8>> {
        (**self).fetch(location)
    }
}

impl<T: ImageSink + ?Sized> ImageSink for Arc<T> {
    fn store(&self, id: &str, image: &ImageBuffer) -> PipelineResult<String> {
        (**self).store(id, image)
    }
}

/// Reads images from the local filesystem, optionally under a root.
#[derive(Debug, Clone, Default)]
pub struct FsSource {
    root: Option<PathBuf>,
}

impl FsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative locations against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ImageSource for FsSource {
    fn fetch(&self, location: &str) -> PipelineResult<Vec<u8>> {
        let path = self.resolve(location);
        std::fs::read(&path).map_err(|e| PipelineError::Fetch {
            location: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Writes processed images under an output directory.
///
/// The stored file keeps the id's relative layout. The id's extension is
/// kept when it already names the output container and replaced otherwise,
/// so a PNG optimized to JPEG lands as `name.jpg`. Existing files are never
/// overwritten: a taken name gets a `-1`, `-2`, ... suffix.
#[derive(Debug, Clone)]
pub struct FsSink {
    dir: PathBuf,
}

/// Suffixes tried before a store gives up on finding a free name.
const MAX_NAME_ATTEMPTS: usize = 1000;

impl FsSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Preferred output path for an id and image.
    ///
    /// Fails when the id has no usable path components.
    pub fn path_for(&self, id: &str, image: &ImageBuffer) -> PipelineResult<PathBuf> {
        let relative: PathBuf = id
            .split(['/', '\\'])
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .collect();
        if relative.as_os_str().is_empty() {
            return Err(PipelineError::Store {
                id: id.to_string(),
                message: "id has no usable path components".to_string(),
            });
        }

        let keeps_extension = relative
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                image
                    .format()
                    .extensions_str()
                    .contains(&ext.to_ascii_lowercase().as_str())
            });
        if keeps_extension {
            Ok(self.dir.join(relative))
        } else {
            Ok(self.dir.join(relative).with_extension(image.extension()))
        }
    }
}

/// `photo.jpg` -> `photo-2.jpg`.
fn numbered(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}-{}", stem, n),
    };
    path.with_file_name(name)
}

impl ImageSink for FsSink {
    fn store(&self, id: &str, image: &ImageBuffer) -> PipelineResult<String> {
        let store_error = |e: std::io::Error| PipelineError::Store {
            id: id.to_string(),
            message: e.to_string(),
        };

        let preferred = self.path_for(id, image)?;
        if let Some(parent) = preferred.parent() {
            std::fs::create_dir_all(parent).map_err(store_error)?;
        }

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = if attempt == 0 {
                preferred.clone()
            } else {
                numbered(&preferred, attempt)
            };
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(store_error(e)),
            };
            file.write_all(image.bytes()).map_err(store_error)?;

            tracing::debug!("Stored {} ({} bytes) at {:?}", id, image.len(), path);
            return Ok(format!("file://{}", path.display()));
        }

        Err(PipelineError::Store {
            id: id.to_string(),
            message: format!("no free file name near {:?}", preferred),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_buffer() -> ImageBuffer {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])));
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageFormat::Png).unwrap();
        ImageBuffer::from_bytes(cursor.into_inner()).unwrap()
    }

    fn jpeg_buffer(color: [u8; 3]) -> ImageBuffer {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb(color)));
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageFormat::Jpeg).unwrap();
        ImageBuffer::from_bytes(cursor.into_inner()).unwrap()
    }

    #[test]
    fn test_fs_source_reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"bytes").unwrap();

        let source = FsSource::with_root(dir.path());
        assert_eq!(source.fetch("a.jpg").unwrap(), b"bytes");
    }

    #[test]
    fn test_fs_source_missing_file_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsSource::with_root(dir.path()).fetch("missing.png").unwrap_err();
        assert!(matches!(err, PipelineError::Fetch { .. }));
    }

    #[test]
    fn test_fs_sink_writes_with_output_extension() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());
        let image = png_buffer();

        let url = sink.store("nested/photo.jpg", &image).unwrap();
        let expected = dir.path().join("nested/photo.png");
        assert!(expected.exists());
        assert!(url.starts_with("file://"));
        assert_eq!(std::fs::read(expected).unwrap(), image.bytes());
    }

    #[test]
    fn test_fs_sink_ignores_parent_components() {
        let sink = FsSink::new("/out");
        let path = sink.path_for("../../etc/x.jpg", &png_buffer()).unwrap();
        assert_eq!(path, PathBuf::from("/out/etc/x.png"));
    }

    #[test]
    fn test_fs_sink_rejects_ids_without_components() {
        let sink = FsSink::new("/out");
        for id in ["", "..", "./..", "/"] {
            let err = sink.path_for(id, &png_buffer()).unwrap_err();
            assert!(matches!(err, PipelineError::Store { .. }), "{id:?}");
        }
    }

    #[test]
    fn test_fs_sink_keeps_matching_extension() {
        let sink = FsSink::new("/out");
        let image = jpeg_buffer([200, 0, 0]);
        assert_eq!(
            sink.path_for("photo.jpeg", &image).unwrap(),
            PathBuf::from("/out/photo.jpeg")
        );
        assert_eq!(
            sink.path_for("photo.JPG", &image).unwrap(),
            PathBuf::from("/out/photo.JPG")
        );
        assert_eq!(
            sink.path_for("photo.png", &image).unwrap(),
            PathBuf::from("/out/photo.jpg")
        );
    }

    #[test]
    fn test_fs_sink_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());
        let red = jpeg_buffer([200, 0, 0]);
        let blue = jpeg_buffer([0, 0, 200]);
        let green = jpeg_buffer([0, 200, 0]);

        let url_a = sink.store("photo.jpg", &red).unwrap();
        let url_b = sink.store("photo.jpeg", &blue).unwrap();
        // A PNG re-encoded as JPEG next to an existing photo.jpg
        let url_c = sink.store("photo.png", &green).unwrap();

        assert_ne!(url_a, url_b);
        assert!(url_c.ends_with("photo-1.jpg"));
        assert_eq!(std::fs::read(dir.path().join("photo.jpg")).unwrap(), red.bytes());
        assert_eq!(std::fs::read(dir.path().join("photo.jpeg")).unwrap(), blue.bytes());
        assert_eq!(std::fs::read(dir.path().join("photo-1.jpg")).unwrap(), green.bytes());
    }
}
