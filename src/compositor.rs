//! Image Compositor
//!
//! Places a logo over the QR raster. Two policies:
//! - `ClearAndFill`: white square in the center, logo resized into it
//! - `DirectOverlay`: logo at natural size, centered, no protective fill
//!
//! Compositing never fails on geometry. Pixels landing outside the canvas are
//! discarded.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use image::imageops::{self, FilterType};
use image::error::{ImageFormatHint, UnsupportedError, UnsupportedErrorKind};
use image::{DynamicImage, ImageError, ImageFormat, ImageReader, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("Failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum CompositingPolicy {
    #[default]
    ClearAndFill,
    DirectOverlay,
}

/// How the logo fills the cleared region under `ClearAndFill`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Scale to exactly the region, ignoring aspect ratio
    #[default]
    Stretch,
    /// Preserve aspect ratio, centered inside the region
    Fit,
}

#[derive(Debug, Clone, Copy)]
pub struct CompositeOptions {
    pub policy: CompositingPolicy,
    pub region_size: u32,
    pub resize_mode: ResizeMode,
}

/// Rectangle in canvas coordinates. The origin may be negative when the
/// placed content is larger than the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRegion {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl PlacementRegion {
    /// Offset is `(canvas - size) / 2` per axis, truncated toward zero.
    pub fn centered(canvas_width: u32, canvas_height: u32, width: u32, height: u32) -> Self {
        Self {
            x: (canvas_width as i64 - width as i64) / 2,
            y: (canvas_height as i64 - height as i64) / 2,
            width,
            height,
        }
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x
            && y >= self.y
            && x < self.x + self.width as i64
            && y < self.y + self.height as i64
    }
}

pub struct Composite {
    pub image: RgbaImage,
    pub region: PlacementRegion,
}

/// Open and decode a PNG or JPEG image, format guessed from content.
pub fn load_image(path: &Path) -> Result<DynamicImage, CompositeError> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|source| CompositeError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    match reader.format() {
        Some(ImageFormat::Png | ImageFormat::Jpeg) => {}
        other => {
            let hint = other.map_or(ImageFormatHint::Unknown, ImageFormatHint::Exact);
            return Err(CompositeError::Decode {
                path: path.to_path_buf(),
                source: ImageError::Unsupported(UnsupportedError::from_format_and_kind(
                    hint.clone(),
                    UnsupportedErrorKind::Format(hint),
                )),
            });
        }
    }

    reader.decode().map_err(|source| CompositeError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

pub fn composite(qr: &DynamicImage, logo: &DynamicImage, options: &CompositeOptions) -> Composite {
    let mut canvas = qr.to_rgba8();
    let (width, height) = canvas.dimensions();

    let region = match options.policy {
        CompositingPolicy::ClearAndFill => {
            let size = options.region_size;
            let region = PlacementRegion::centered(width, height, size, size);
            fill_region(&mut canvas, &region, FILL);
            if size > 0 && logo.width() > 0 && logo.height() > 0 {
                let (resized, dx, dy) = fit_logo(logo, size, options.resize_mode);
                imageops::overlay(&mut canvas, &resized, region.x + dx, region.y + dy);
            }
            region
        }
        CompositingPolicy::DirectOverlay => {
            let region = PlacementRegion::centered(width, height, logo.width(), logo.height());
            imageops::overlay(&mut canvas, &logo.to_rgba8(), region.x, region.y);
            region
        }
    };

    debug!(
        policy = ?options.policy,
        x = region.x,
        y = region.y,
        width = region.width,
        height = region.height,
        "logo placed"
    );

    Composite { image: canvas, region }
}

/// Resized logo plus its offset inside the region.
fn fit_logo(logo: &DynamicImage, size: u32, mode: ResizeMode) -> (RgbaImage, i64, i64) {
    match mode {
        ResizeMode::Stretch => (
            imageops::resize(&logo.to_rgba8(), size, size, FilterType::CatmullRom),
            0,
            0,
        ),
        ResizeMode::Fit => {
            let resized = logo.resize(size, size, FilterType::CatmullRom).to_rgba8();
            let dx = (size - resized.width()) as i64 / 2;
            let dy = (size - resized.height()) as i64 / 2;
            (resized, dx, dy)
        }
    }
}

/// Opaque fill, clipped to the canvas.
fn fill_region(canvas: &mut RgbaImage, region: &PlacementRegion, color: Rgba<u8>) {
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);
    let x0 = region.x.clamp(0, w) as u32;
    let y0 = region.y.clamp(0, h) as u32;
    let x1 = (region.x + region.width as i64).clamp(0, w) as u32;
    let y1 = (region.y + region.height as i64).clamp(0, h) as u32;

    for y in y0..y1 {
        for x in x0..x1 {
            canvas.put_pixel(x, y, color);
        }
    }
}
