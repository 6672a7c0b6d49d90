//! Output Writer
//!
//! PNG keeps per-pixel alpha. JPEG is opaque: alpha is flattened over white
//! before encoding.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {format:?} output: {source}")]
    Encode {
        format: OutputFormat,
        #[source]
        source: image::ImageError,
    },

    #[error("Unsupported output format for {0}")]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Infer from the file extension (`png`, `jpg`, `jpeg`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Explicit format; `None` means infer from the path
    pub format: Option<OutputFormat>,
    /// JPEG quality, 0..=100
    pub jpeg_quality: u8,
    pub create_dirs: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            format: None,
            jpeg_quality: 100,
            create_dirs: true,
        }
    }
}

/// Encode `image` to `path`. Returns the format actually written.
///
/// On failure after the file was created, the file is removed.
pub fn write(image: &RgbaImage, path: &Path, options: &WriteOptions) -> Result<OutputFormat, WriteError> {
    let format = options
        .format
        .or_else(|| OutputFormat::from_path(path))
        .ok_or_else(|| WriteError::UnsupportedFormat(path.to_path_buf()))?;

    if options.create_dirs {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| WriteError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let file = File::create(path).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    let encoded = match format {
        OutputFormat::Png => PngEncoder::new(&mut writer).write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        ),
        OutputFormat::Jpeg => {
            // encoder quality floor is 1
            let flat = flatten(image);
            JpegEncoder::new_with_quality(&mut writer, options.jpeg_quality.max(1)).write_image(
                flat.as_raw(),
                flat.width(),
                flat.height(),
                ExtendedColorType::Rgb8,
            )
        }
    };
    let result = encoded
        .map_err(|source| WriteError::Encode { format, source })
        .and_then(|()| {
            writer.into_inner().map(drop).map_err(|e| WriteError::Io {
                path: path.to_path_buf(),
                source: e.into_error(),
            })
        });

    if result.is_err() {
        // no partial output left behind
        let _ = fs::remove_file(path);
    }
    result.map(|()| format)
}

/// Alpha-over onto opaque white.
pub fn flatten(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let over = |c: u8| ((c as u32 * a as u32 + 255 * (255 - a as u32) + 127) / 255) as u8;
        image::Rgb([over(r), over(g), over(b)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker(size: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 0, 0, 0])
            }
        })
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(OutputFormat::from_path(Path::new("a/b.PNG")), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_path(Path::new("b.jpg")), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_path(Path::new("b.JPEG")), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_path(Path::new("b.gif")), None);
        assert_eq!(OutputFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_flatten_over_white() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        assert_eq!(flatten(&img).get_pixel(0, 0), &image::Rgb([255, 255, 255]));

        let img = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255]));
        assert_eq!(flatten(&img).get_pixel(0, 0), &image::Rgb([10, 20, 30]));
    }

    #[test]
    fn test_png_preserves_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let img = checker(32);
        let format = write(&img, &path, &WriteOptions::default()).unwrap();
        assert_eq!(format, OutputFormat::Png);
        assert_eq!(image::open(&path).unwrap().to_rgba8(), img);
    }

    #[test]
    fn test_jpeg_is_opaque() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep/out.jpg");
        let format = write(&checker(32), &path, &WriteOptions::default()).unwrap();
        assert_eq!(format, OutputFormat::Jpeg);

        let decoded = image::open(&path).unwrap();
        assert!(!decoded.color().has_alpha());
        assert_eq!(decoded.width(), 32);
    }

    #[test]
    fn test_explicit_format_overrides_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let options = WriteOptions {
            format: Some(OutputFormat::Png),
            ..WriteOptions::default()
        };
        write(&checker(8), &path, &options).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }

    #[test]
    fn test_failed_encode_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        let err = write(&RgbaImage::new(0, 0), &path, &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, WriteError::Encode { format: OutputFormat::Png, .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let err = write(&checker(8), &dir.path().join("out.gif"), &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, WriteError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_dir_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let options = WriteOptions {
            create_dirs: false,
            ..WriteOptions::default()
        };
        let err = write(&checker(8), &dir.path().join("nope/out.png"), &options).unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
    }
}
