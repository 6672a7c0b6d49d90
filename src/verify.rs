//! Scannability Check
//!
//! Re-decodes a raster and compares the content with what was encoded.

use image::{imageops, GrayImage, RgbaImage};
use thiserror::Error;

use crate::output::flatten;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("No QR code detected in composite")]
    NotDetected,

    #[error("QR code detected but unreadable: {0}")]
    Unreadable(String),

    #[error("Decoded content differs from payload ({actual_len} bytes decoded, {expected_len} expected)")]
    Mismatch { expected_len: usize, actual_len: usize },
}

/// Decode the first QR code found in `image`.
pub fn decode_text(image: &GrayImage) -> Result<String, VerifyError> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        image.width() as usize,
        image.height() as usize,
        |x, y| image.get_pixel(x as u32, y as u32)[0],
    );
    let grids = prepared.detect_grids();
    let grid = grids.first().ok_or(VerifyError::NotDetected)?;
    let (_meta, content) = grid
        .decode()
        .map_err(|e| VerifyError::Unreadable(e.to_string()))?;
    Ok(content)
}

/// Transparent pixels are read as white.
pub fn decode_composite(image: &RgbaImage) -> Result<String, VerifyError> {
    decode_text(&imageops::grayscale(&flatten(image)))
}

pub fn verify_composite(image: &RgbaImage, expected: &str) -> Result<(), VerifyError> {
    let actual = decode_composite(image)?;
    if actual != expected {
        return Err(VerifyError::Mismatch {
            expected_len: expected.len(),
            actual_len: actual.len(),
        });
    }
    Ok(())
}
