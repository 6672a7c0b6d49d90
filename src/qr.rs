//! QR Renderer
//!
//! Encodes text into an exact `pixel_size` square raster and persists it as
//! an intermediate PNG.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use image::{GrayImage, ImageFormat, Luma};
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Light modules around the symbol, in modules.
pub const QUIET_ZONE: u32 = 4;

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Payload of {len} bytes exceeds QR capacity at {level:?} error correction")]
    Capacity { len: usize, level: ErrorCorrection },

    #[error("QR encoding failed: {0}")]
    Encode(String),

    #[error("Pixel size {pixel_size} is too small for a {modules}x{modules} module symbol")]
    TooSmall { pixel_size: u32, modules: u32 },

    #[error("Failed to create directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write QR image {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCorrection {
    /// ~7% recovery
    Low,
    /// ~15% recovery
    Medium,
    /// ~25% recovery
    Quartile,
    /// ~30% recovery, tolerates a logo over the center
    #[default]
    Highest,
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::Low => EcLevel::L,
            ErrorCorrection::Medium => EcLevel::M,
            ErrorCorrection::Quartile => EcLevel::Q,
            ErrorCorrection::Highest => EcLevel::H,
        }
    }
}

/// Encode `text` and rasterise it to exactly `pixel_size` x `pixel_size`.
///
/// Each module is drawn as a whole number of pixels; leftover pixels become
/// extra light border, split evenly (floor on the top/left side).
pub fn render_raster(
    text: &str,
    level: ErrorCorrection,
    pixel_size: u32,
) -> Result<GrayImage, RenderError> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), level.into()).map_err(|e| {
        match e {
            QrError::DataTooLong => RenderError::Capacity { len: text.len(), level },
            other => RenderError::Encode(other.to_string()),
        }
    })?;

    let modules = code.width() as u32;
    let total = modules + 2 * QUIET_ZONE;
    let scale = pixel_size / total;
    if scale == 0 {
        return Err(RenderError::TooSmall { pixel_size, modules });
    }
    let origin = (pixel_size - total * scale) / 2 + QUIET_ZONE * scale;
    let extent = modules * scale;

    debug!(modules, scale, origin, pixel_size, "rasterising QR symbol");

    Ok(GrayImage::from_fn(pixel_size, pixel_size, |x, y| {
        if x < origin || y < origin || x >= origin + extent || y >= origin + extent {
            return LIGHT;
        }
        let mx = ((x - origin) / scale) as usize;
        let my = ((y - origin) / scale) as usize;
        if code[(mx, my)] == Color::Dark {
            DARK
        } else {
            LIGHT
        }
    }))
}

/// Render and persist the raster as PNG at `dest`.
pub fn render(
    text: &str,
    level: ErrorCorrection,
    pixel_size: u32,
    dest: &Path,
    create_dirs: bool,
) -> Result<GrayImage, RenderError> {
    let raster = render_raster(text, level, pixel_size)?;

    if create_dirs {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    raster
        .save_with_format(dest, ImageFormat::Png)
        .map_err(|source| RenderError::Write {
            path: dest.to_path_buf(),
            source,
        })?;

    Ok(raster)
}
