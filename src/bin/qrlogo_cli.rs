//! QrLogo CLI
//!
//! Builds a payload, renders it as a QR code with a logo, writes the result.
//! Outputs a JSON report to stdout, logs to stderr.
//! Exit code identifies the failing stage (see `PipelineError::exit_code`).

use chrono::{DateTime, Utc};
use clap::Parser;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use qrlogo_core::{
    CompositingPolicy, ErrorCorrection, OutputFormat, PayloadRecord, PipelineConfig,
    PipelineError, QrLogoPipeline, ResizeMode,
};

#[derive(Parser)]
#[command(name = "qrlogo-cli")]
#[command(about = "QrLogo CLI - QR code with embedded logo")]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where the intermediate QR PNG is written
    #[arg(long)]
    qr_path: Option<PathBuf>,

    /// Logo image (PNG or JPEG)
    #[arg(short, long)]
    logo: Option<PathBuf>,

    /// Final composite image
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum)]
    policy: Option<CompositingPolicy>,

    #[arg(long, value_enum)]
    resize: Option<ResizeMode>,

    /// Output format; inferred from the output extension when omitted
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// JPEG quality
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: Option<u8>,

    #[arg(long)]
    pixel_size: Option<u32>,

    #[arg(long)]
    region_size: Option<u32>,

    /// Error correction level
    #[arg(long, value_enum)]
    ec: Option<ErrorCorrection>,

    /// Skip re-decoding the composite
    #[arg(long)]
    no_verify: bool,

    /// Fail instead of creating missing output directories
    #[arg(long)]
    no_create_dirs: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,

    #[arg(long, default_value = "123456")]
    ai: String,

    #[arg(long, default_value = "MINT123")]
    minting_id: String,

    #[arg(long, default_value = "Sample QR")]
    name: String,

    #[arg(long, default_value = "This is a sample QR code")]
    description: String,

    /// RFC 3339 instant to embed; defaults to now
    #[arg(long)]
    timestamp: Option<DateTime<Utc>>,
}

impl Cli {
    fn build_config(&self) -> Result<PipelineConfig, PipelineError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load_from_file(path)?,
            None => match (&self.qr_path, &self.logo, &self.output) {
                (Some(qr), Some(logo), Some(output)) => PipelineConfig::new(qr, logo, output),
                _ => {
                    return Err(PipelineError::InvalidConfig(
                        "--qr-path, --logo and --output are required without --config".into(),
                    ))
                }
            },
        };

        if let Some(p) = &self.qr_path { config.qr_path = p.clone(); }
        if let Some(p) = &self.logo { config.logo_path = p.clone(); }
        if let Some(p) = &self.output { config.output_path = p.clone(); }
        if let Some(v) = self.policy { config.policy = v; }
        if let Some(v) = self.resize { config.resize_mode = v; }
        if let Some(v) = self.format { config.output_format = Some(v); }
        if let Some(v) = self.quality { config.jpeg_quality = v; }
        if let Some(v) = self.pixel_size { config.pixel_size = v; }
        if let Some(v) = self.region_size { config.region_size = v; }
        if let Some(v) = self.ec { config.error_correction = v; }
        if self.no_verify { config.verify = false; }
        if self.no_create_dirs { config.create_dirs = false; }

        Ok(config)
    }

    fn payload(&self) -> PayloadRecord {
        let builder = PayloadRecord::builder()
            .ai(&self.ai)
            .minting_id(&self.minting_id)
            .name(&self.name)
            .description(&self.description);
        match self.timestamp {
            Some(ts) => builder.at(ts).build(),
            None => builder.build(),
        }
    }
}

fn failure(e: &PipelineError) -> ExitCode {
    tracing::error!(stage = e.stage(), "{}", e);
    let output = json!({
        "success": false,
        "stage": e.stage(),
        "error": e.to_string(),
    });
    println!("{}", output);
    ExitCode::from(e.exit_code())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.build_config() {
        Ok(c) => c,
        Err(e) => return failure(&e),
    };

    let pipeline = QrLogoPipeline::new(config);

    if cli.check {
        let report = pipeline.validate();
        let valid = report.valid;
        match serde_json::to_value(&report) {
            Ok(v) => println!("{:#}", v),
            Err(e) => return failure(&PipelineError::InvalidConfig(e.to_string())),
        }
        return if valid { ExitCode::SUCCESS } else { ExitCode::from(2) };
    }

    match pipeline.run(&cli.payload()) {
        Ok(report) => {
            let asset = serde_json::to_value(&report).unwrap_or(Value::Null);
            let output = json!({
                "success": true,
                "report": asset,
            });
            println!("{:#}", output);
            ExitCode::SUCCESS
        }
        Err(e) => failure(&e),
    }
}
