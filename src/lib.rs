//! QrLogo Core - QR Code Compositor
//!
//! # Pipeline
//! 1. Payload record is encoded as compact JSON
//! 2. JSON is rendered as an exact-size QR raster (intermediate PNG)
//! 3. Logo is composited over the raster (clear-and-fill or direct overlay)
//! 4. Composite is optionally re-decoded to prove it still scans
//! 5. Composite is written as PNG or JPEG

pub mod payload;
pub mod qr;
pub mod compositor;
pub mod output;
pub mod config;
pub mod validation;
pub mod verify;
pub mod hashing;
pub mod pipeline;

pub use payload::{PayloadBuilder, PayloadRecord};
pub use qr::ErrorCorrection;
pub use compositor::{CompositingPolicy, PlacementRegion, ResizeMode};
pub use output::OutputFormat;
pub use config::PipelineConfig;
pub use validation::{ConfigValidator, ValidationReport, ConfigViolation, ViolationSeverity};
pub use pipeline::{PipelineError, QrLogoPipeline, RunReport};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
