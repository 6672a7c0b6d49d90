//! Configuration Validation - Rule/Severity Separation
//!
//! Rules produce structured violations.
//! Errors stop the pipeline before any file is touched; warnings are reported.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::compositor::CompositingPolicy;
use crate::config::PipelineConfig;

/// Fraction of the raster area above which a cleared region is flagged.
pub const MAX_REGION_COVERAGE: f64 = 0.30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub violations: Vec<ConfigViolation>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ConfigViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ConfigViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Warning)
    }

    /// `rule: message` pairs of every error, joined
    pub fn error_summary(&self) -> String {
        self.errors()
            .map(|v| format!("{}: {}", v.rule, v.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

pub trait ConfigRule {
    fn name(&self) -> &'static str;
    fn check(&self, config: &PipelineConfig) -> Vec<ConfigViolation>;
}

fn violation(
    rule: &dyn ConfigRule,
    severity: ViolationSeverity,
    message: impl Into<String>,
    expected: impl Into<String>,
    actual: impl Into<String>,
) -> ConfigViolation {
    ConfigViolation {
        rule: rule.name().to_string(),
        severity,
        message: message.into(),
        expected: Some(expected.into()),
        actual: Some(actual.into()),
    }
}

// --- Concrete Rules ---

pub struct PixelSizeRule;

impl ConfigRule for PixelSizeRule {
    fn name(&self) -> &'static str { "pixel_size" }

    fn check(&self, config: &PipelineConfig) -> Vec<ConfigViolation> {
        if config.pixel_size == 0 {
            vec![violation(self, ViolationSeverity::Error, "Pixel size must be positive", "> 0", "0")]
        } else {
            vec![]
        }
    }
}

pub struct RegionSizeRule;

impl ConfigRule for RegionSizeRule {
    fn name(&self) -> &'static str { "region_size" }

    fn check(&self, config: &PipelineConfig) -> Vec<ConfigViolation> {
        if config.policy != CompositingPolicy::ClearAndFill {
            return vec![];
        }

        let region = config.region_size;
        if region == 0 || region >= config.pixel_size {
            return vec![violation(
                self,
                ViolationSeverity::Error,
                "Region must be non-empty and smaller than the QR raster",
                format!("1..{}", config.pixel_size),
                region.to_string(),
            )];
        }

        let coverage = (region as f64 / config.pixel_size as f64).powi(2);
        if coverage > MAX_REGION_COVERAGE {
            vec![violation(
                self,
                ViolationSeverity::Warning,
                "Cleared region may exceed error correction capacity",
                format!("<= {:.0}% of raster area", MAX_REGION_COVERAGE * 100.0),
                format!("{:.1}%", coverage * 100.0),
            )]
        } else {
            vec![]
        }
    }
}

pub struct JpegQualityRule;

impl ConfigRule for JpegQualityRule {
    fn name(&self) -> &'static str { "jpeg_quality" }

    fn check(&self, config: &PipelineConfig) -> Vec<ConfigViolation> {
        if config.jpeg_quality > 100 {
            vec![violation(
                self,
                ViolationSeverity::Error,
                "JPEG quality out of range",
                "0..=100",
                config.jpeg_quality.to_string(),
            )]
        } else {
            vec![]
        }
    }
}

/// Canonical form when the file or its directory exists, else the path as given.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
            fs::canonicalize(parent)
                .map(|p| p.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    !a.as_os_str().is_empty() && !b.as_os_str().is_empty() && resolve(a) == resolve(b)
}

pub struct PathsRule;

impl ConfigRule for PathsRule {
    fn name(&self) -> &'static str { "paths" }

    fn check(&self, config: &PipelineConfig) -> Vec<ConfigViolation> {
        let mut violations = vec![];

        for (label, path) in [
            ("qrPath", &config.qr_path),
            ("logoPath", &config.logo_path),
            ("outputPath", &config.output_path),
        ] {
            if path.as_os_str().is_empty() {
                violations.push(violation(
                    self,
                    ViolationSeverity::Error,
                    format!("{} is empty", label),
                    "a file path",
                    "\"\"",
                ));
            }
        }

        for (written, other, message) in [
            (&config.qr_path, &config.output_path, "Output would overwrite the intermediate QR image"),
            (&config.qr_path, &config.logo_path, "Intermediate QR image would overwrite the logo"),
            (&config.output_path, &config.logo_path, "Output would overwrite the logo"),
        ] {
            if same_file(written, other) {
                violations.push(violation(
                    self,
                    ViolationSeverity::Error,
                    message,
                    "distinct paths",
                    written.display().to_string(),
                ));
            }
        }

        if !config.logo_path.as_os_str().is_empty() && !config.logo_path.is_file() {
            violations.push(violation(
                self,
                ViolationSeverity::Error,
                "Logo file not found",
                "an existing file",
                config.logo_path.display().to_string(),
            ));
        }

        violations
    }
}

pub struct OutputFormatRule;

impl ConfigRule for OutputFormatRule {
    fn name(&self) -> &'static str { "output_format" }

    fn check(&self, config: &PipelineConfig) -> Vec<ConfigViolation> {
        if config.resolved_format().is_none() {
            vec![violation(
                self,
                ViolationSeverity::Error,
                "Output format not set and not inferable from extension",
                "png, jpg or jpeg",
                config.output_path.display().to_string(),
            )]
        } else {
            vec![]
        }
    }
}

/// Runs every rule; valid iff no error-severity violation.
pub struct ConfigValidator {
    rules: Vec<Box<dyn ConfigRule>>,
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(PixelSizeRule),
                Box::new(RegionSizeRule),
                Box::new(JpegQualityRule),
                Box::new(PathsRule),
                Box::new(OutputFormatRule),
            ],
        }
    }

    pub fn validate(&self, config: &PipelineConfig) -> ValidationReport {
        let violations: Vec<_> = self
            .rules
            .iter()
            .flat_map(|rule| rule.check(config))
            .collect();

        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);
        ValidationReport { valid, violations }
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
