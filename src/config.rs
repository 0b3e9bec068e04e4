//! Exporter configuration
//!
//! The export chains are plain ordered lists of [`CaptureProfile`]s so they
//! can be tuned from a JSON file without touching the orchestrator.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::capture::CaptureProfile;
use crate::{Error, Result};

pub const DEFAULT_PNG_FILENAME: &str = "business-card.png";
pub const DEFAULT_PDF_FILENAME: &str = "business-card.pdf";
pub const DEFAULT_BASE_NAME: &str = "business-card";

/// Configuration for a [`CardExporter`](crate::CardExporter)
///
/// # Examples
///
/// ```
/// let cfg = cardexport::ExporterConfig::default();
/// assert_eq!(cfg.png_tiers.len(), 3);
/// assert_eq!(cfg.settle_delay_ms, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Wait between style isolation and capture, in milliseconds
    pub settle_delay_ms: u64,
    /// Pause between the PNG and PDF halves of a multi-format export
    pub multi_format_pause_ms: u64,
    /// Reject captures whose pixels are all identical
    pub reject_blank_captures: bool,
    /// Raster chain, tried in order
    pub png_tiers: Vec<CaptureProfile>,
    /// Document chain, tried in order
    pub pdf_tiers: Vec<CaptureProfile>,
    /// Profile used by `export_fallback` on its own
    pub fallback_tier: CaptureProfile,
    /// Profile used for data URL previews
    pub preview_tier: CaptureProfile,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 200,
            multi_format_pause_ms: 500,
            reject_blank_captures: false,
            png_tiers: vec![
                CaptureProfile::simple(),
                CaptureProfile::advanced(),
                CaptureProfile::fallback(),
            ],
            pdf_tiers: vec![
                CaptureProfile::simple(),
                CaptureProfile::advanced().opaque(),
            ],
            fallback_tier: CaptureProfile::fallback(),
            preview_tier: CaptureProfile::preview(),
        }
    }
}

impl ExporterConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let cfg: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.png_tiers.is_empty() {
            return Err(Error::Config("png_tiers must not be empty".into()));
        }
        if self.pdf_tiers.is_empty() {
            return Err(Error::Config("pdf_tiers must not be empty".into()));
        }
        self.png_tiers
            .iter()
            .chain(&self.pdf_tiers)
            .chain([&self.fallback_tier, &self.preview_tier])
            .try_for_each(CaptureProfile::validate)
    }
}
