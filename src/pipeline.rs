//! QR-with-Logo Pipeline - Single Entry Point
//!
//! payload -> JSON -> QR raster -> composite -> (verify) -> output file
//!
//! `run` always validates the configuration first. The first failing stage
//! aborts the run; nothing is retried.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::compositor::{self, CompositeError, PlacementRegion};
use crate::config::{ConfigError, PipelineConfig};
use crate::hashing::{compute_manifest_hash, raster_hash, sha256_hex};
use crate::output::{self, OutputFormat, WriteError};
use crate::payload::{PayloadError, PayloadRecord};
use crate::qr::{self, RenderError};
use crate::validation::{ConfigValidator, ConfigViolation, ValidationReport};
use crate::verify::{self, VerifyError};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] PayloadError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Verification failed: {0}")]
    Verification(#[from] VerifyError),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "config",
            Self::Serialization(_) => "payload",
            Self::Render(_) => "render",
            Self::Decode(_) => "decode",
            Self::Io(_) => "io",
            Self::Encode(_) => "encode",
            Self::Verification(_) => "verify",
        }
    }

    /// Process exit code; 0 is success, 1 is left to panics and unknown failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidConfig(_) => 2,
            Self::Serialization(_) => 3,
            Self::Render(_) => 4,
            Self::Decode(_) => 5,
            Self::Io(_) => 6,
            Self::Encode(_) => 7,
            Self::Verification(_) => 8,
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        Self::InvalidConfig(e.to_string())
    }
}

impl From<CompositeError> for PipelineError {
    fn from(e: CompositeError) -> Self {
        match &e {
            CompositeError::Open { .. } => Self::Io(e.to_string()),
            CompositeError::Decode { .. } => Self::Decode(e.to_string()),
        }
    }
}

impl From<WriteError> for PipelineError {
    fn from(e: WriteError) -> Self {
        match &e {
            WriteError::Io { .. } => Self::Io(e.to_string()),
            WriteError::Encode { .. } | WriteError::UnsupportedFormat(_) => Self::Encode(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub payload_json: String,
    pub payload_hash: String,
    pub qr_path: PathBuf,
    pub output_path: PathBuf,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub region: PlacementRegion,
    pub verified: bool,
    pub raster_hash: String,
    /// Hash of the deterministic part of the report (excludes run id and time)
    pub manifest_hash: String,
    pub warnings: Vec<ConfigViolation>,
}

pub struct QrLogoPipeline {
    config: PipelineConfig,
    validator: ConfigValidator,
}

impl QrLogoPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            validator: ConfigValidator::new(),
        }
    }

    pub fn validate(&self) -> ValidationReport {
        self.validator.validate(&self.config)
    }

    pub fn run(&self, payload: &PayloadRecord) -> Result<RunReport, PipelineError> {
        let config = &self.config;

        let validation = self.validate();
        for w in validation.warnings() {
            warn!(rule = %w.rule, actual = ?w.actual, "{}", w.message);
        }
        if !validation.valid {
            return Err(PipelineError::InvalidConfig(validation.error_summary()));
        }

        let payload_json = payload.encode()?;
        info!(bytes = payload_json.len(), "payload encoded");

        let raster = qr::render(
            &payload_json,
            config.error_correction,
            config.pixel_size,
            &config.qr_path,
            config.create_dirs,
        )?;
        info!(path = %config.qr_path.display(), size = config.pixel_size, "QR raster written");

        let logo = compositor::load_image(&config.logo_path)?;
        info!(
            path = %config.logo_path.display(),
            width = logo.width(),
            height = logo.height(),
            "logo loaded"
        );

        let composite = compositor::composite(
            &DynamicImage::ImageLuma8(raster),
            &logo,
            &config.composite_options(),
        );

        if config.verify {
            verify::verify_composite(&composite.image, &payload_json)?;
            info!("composite decodes to payload");
        }

        let format = output::write(&composite.image, &config.output_path, &config.write_options())?;
        info!(path = %config.output_path.display(), format = ?format, "output written");

        let payload_hash = sha256_hex(payload_json.as_bytes());
        let raster_hash = raster_hash(&composite.image);
        let (width, height) = composite.image.dimensions();
        let manifest_hash = compute_manifest_hash(&json!({
            "payload_hash": payload_hash,
            "raster_hash": raster_hash,
            "format": format,
            "width": width,
            "height": height,
            "region": composite.region,
        }))
        .map_err(|e| PipelineError::Serialization(PayloadError::Encode(e)))?;

        Ok(RunReport {
            run_id: Uuid::new_v4().to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            payload_json,
            payload_hash,
            qr_path: config.qr_path.clone(),
            output_path: config.output_path.clone(),
            format,
            width,
            height,
            region: composite.region,
            verified: config.verify,
            raster_hash,
            manifest_hash,
            warnings: validation.warnings().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_exit_codes_distinct() {
        let errors = [
            PipelineError::InvalidConfig(String::new()),
            PipelineError::Serialization(PayloadError::Decode(
                serde_json::from_str::<u8>("x").unwrap_err(),
            )),
            PipelineError::Render(RenderError::Encode(String::new())),
            PipelineError::Decode(String::new()),
            PipelineError::Io(String::new()),
            PipelineError::Encode(String::new()),
            PipelineError::Verification(VerifyError::NotDetected),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.exit_code()).collect();
        assert!(codes.iter().all(|c| *c > 1));
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_composite_error_mapping() {
        let missing = compositor::load_image(Path::new("/no/such/logo.png")).unwrap_err();
        assert_eq!(PipelineError::from(missing).stage(), "io");
    }

    #[test]
    fn test_write_error_mapping() {
        let err = WriteError::UnsupportedFormat(PathBuf::from("x.gif"));
        assert_eq!(PipelineError::from(err).exit_code(), 7);
    }

    #[test]
    fn test_invalid_config_blocks_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let qr_path = dir.path().join("qr.png");
        let mut config = PipelineConfig::new(&qr_path, dir.path().join("missing.png"), dir.path().join("out.png"));
        config.pixel_size = 0;

        let err = QrLogoPipeline::new(config)
            .run(&PayloadRecord::builder().build())
            .unwrap_err();
        assert_eq!(err.stage(), "config");
        assert!(err.to_string().contains("pixel_size"));
        assert!(!qr_path.exists());
    }
}
