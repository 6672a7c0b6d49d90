//! Pipeline Configuration - Explicit Inputs
//!
//! Every tunable lives here with a documented default. Paths have no default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::compositor::{CompositeOptions, CompositingPolicy, ResizeMode};
use crate::output::{OutputFormat, WriteOptions};
use crate::qr::ErrorCorrection;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Intermediate QR raster, always PNG
    pub qr_path: PathBuf,
    pub logo_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(default)]
    pub error_correction: ErrorCorrection,
    /// Side of the square QR raster in pixels
    #[serde(default = "default_pixel_size")]
    pub pixel_size: u32,
    /// Side of the cleared center square (ClearAndFill only)
    #[serde(default = "default_region_size")]
    pub region_size: u32,
    #[serde(default)]
    pub policy: CompositingPolicy,
    #[serde(default)]
    pub resize_mode: ResizeMode,
    /// Inferred from `output_path` when absent
    #[serde(default)]
    pub output_format: Option<OutputFormat>,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_true")]
    pub create_dirs: bool,
    /// Re-decode the composite before writing it
    #[serde(default = "default_true")]
    pub verify: bool,
}

fn default_true() -> bool { true }
fn default_pixel_size() -> u32 { 2048 }
fn default_region_size() -> u32 { 500 }
fn default_jpeg_quality() -> u8 { 100 }

impl PipelineConfig {
    /// Defaults for everything except the three paths.
    pub fn new(
        qr_path: impl Into<PathBuf>,
        logo_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            qr_path: qr_path.into(),
            logo_path: logo_path.into(),
            output_path: output_path.into(),
            error_correction: ErrorCorrection::default(),
            pixel_size: default_pixel_size(),
            region_size: default_region_size(),
            policy: CompositingPolicy::default(),
            resize_mode: ResizeMode::default(),
            output_format: None,
            jpeg_quality: default_jpeg_quality(),
            create_dirs: default_true(),
            verify: default_true(),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Explicit format, else inferred from the output path.
    pub fn resolved_format(&self) -> Option<OutputFormat> {
        self.output_format
            .or_else(|| OutputFormat::from_path(&self.output_path))
    }

    pub fn composite_options(&self) -> CompositeOptions {
        CompositeOptions {
            policy: self.policy,
            region_size: self.region_size,
            resize_mode: self.resize_mode,
        }
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            format: self.output_format,
            jpeg_quality: self.jpeg_quality,
            create_dirs: self.create_dirs,
        }
    }
}
