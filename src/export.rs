//! Export orchestration
//!
//! [`CardExporter`] is the entry point the UI layer calls. Every export walks
//! an ordered list of capture profiles ("tiers"); a tier failure moves on to
//! the next tier and only exhaustion of the whole chain is reported. At most
//! one export runs per exporter at a time.

use std::fmt;
use std::slice;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capture::{validate_target, BitmapCapturer, CaptureProfile, Rasterizer};
use crate::config::{ExporterConfig, DEFAULT_PDF_FILENAME, DEFAULT_PNG_FILENAME};
use crate::document::{BuiltinDocumentLoader, DocumentComposer, DocumentLoader};
use crate::download::DownloadSink;
use crate::encode::{data_url, PreviewFormat, RasterEncoder};
use crate::rendering::paint::{Color, PaintCommand};
use crate::rendering::raster::SoftwareRasterizer;
use crate::surface::{CardElement, CardSurface};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Pdf,
}

impl ExportFormat {
    pub fn default_filename(self) -> &'static str {
        match self {
            ExportFormat::Png => DEFAULT_PNG_FILENAME,
            ExportFormat::Pdf => DEFAULT_PDF_FILENAME,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Outcome of one export call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResult {
    pub success: bool,
    pub format: ExportFormat,
    /// Name of the tier that produced the file
    pub method: Option<String>,
    pub filename: String,
    pub bytes_written: usize,
    pub error: Option<String>,
}

impl ExportResult {
    fn succeeded(format: ExportFormat, method: &str, filename: &str, bytes_written: usize) -> Self {
        Self {
            success: true,
            format,
            method: Some(method.to_string()),
            filename: filename.to_string(),
            bytes_written,
            error: None,
        }
    }

    fn failed(format: ExportFormat, filename: &str, err: &Error) -> Self {
        Self {
            success: false,
            format,
            method: None,
            filename: filename.to_string(),
            bytes_written: 0,
            error: Some(err.to_string()),
        }
    }
}

/// Per-format outcomes of [`CardExporter::export_multiple_formats`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiFormatReport {
    pub png: ExportResult,
    pub pdf: ExportResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Exporting,
}

/// Holds the exporter's in-flight flag for the duration of one export.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::ExportInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CardExporter {
    config: ExporterConfig,
    capturer: BitmapCapturer,
    encoder: RasterEncoder,
    composer: DocumentComposer,
    sink: Arc<dyn DownloadSink>,
    exporting: AtomicBool,
}

impl CardExporter {
    /// Exporter with the software rasterizer and the built-in PDF backend.
    pub fn new(config: ExporterConfig, sink: Arc<dyn DownloadSink>) -> Result<Self> {
        config.validate()?;
        let capturer = Self::capturer_for(&config, Arc::new(SoftwareRasterizer::new()));
        Ok(Self {
            config,
            capturer,
            encoder: RasterEncoder::new(),
            composer: DocumentComposer::new(Arc::new(BuiltinDocumentLoader)),
            sink,
            exporting: AtomicBool::new(false),
        })
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.capturer = Self::capturer_for(&self.config, rasterizer);
        self
    }

    pub fn with_document_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.composer = DocumentComposer::new(loader);
        self
    }

    fn capturer_for(config: &ExporterConfig, rasterizer: Arc<dyn Rasterizer>) -> BitmapCapturer {
        BitmapCapturer::new(rasterizer)
            .with_settle_delay(Duration::from_millis(config.settle_delay_ms))
            .with_reject_blank(config.reject_blank_captures)
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    pub fn state(&self) -> ExportState {
        if self.exporting.load(Ordering::Acquire) {
            ExportState::Exporting
        } else {
            ExportState::Idle
        }
    }

    /// Fails with [`Error::InvalidTarget`] when the surface cannot be captured.
    pub fn validate_target(&self, target: &dyn CardSurface) -> Result<()> {
        validate_target(target).map(|_| ())
    }

    /// Export as PNG through the raster chain.
    pub async fn export_png(&self, target: &dyn CardSurface, filename: &str) -> Result<ExportResult> {
        let _in_flight = InFlight::enter(&self.exporting)?;
        validate_target(target)?;
        log::info!("Starting PNG export to {}", filename);
        self.run_chain(target, ExportFormat::Png, &self.config.png_tiers, filename)
            .await
    }

    /// Export as a 3.5in x 2in PDF through the document chain.
    pub async fn export_pdf(&self, target: &dyn CardSurface, filename: &str) -> Result<ExportResult> {
        let _in_flight = InFlight::enter(&self.exporting)?;
        validate_target(target)?;
        log::info!("Starting PDF export to {}", filename);
        self.run_chain(target, ExportFormat::Pdf, &self.config.pdf_tiers, filename)
            .await
    }

    /// Export as PNG using only the most defensive tier.
    pub async fn export_fallback(
        &self,
        target: &dyn CardSurface,
        filename: &str,
    ) -> Result<ExportResult> {
        let _in_flight = InFlight::enter(&self.exporting)?;
        validate_target(target)?;
        log::info!("Using fallback export method for {}", filename);
        let tier = slice::from_ref(&self.config.fallback_tier);
        self.run_chain(target, ExportFormat::Png, tier, filename).await
    }

    /// Settled variant: never fails, errors are reported in the result.
    pub async fn export(
        &self,
        target: &dyn CardSurface,
        format: ExportFormat,
        filename: Option<&str>,
    ) -> ExportResult {
        let filename = filename.unwrap_or(format.default_filename());
        let res = match format {
            ExportFormat::Png => self.export_png(target, filename).await,
            ExportFormat::Pdf => self.export_pdf(target, filename).await,
        };
        res.unwrap_or_else(|e| ExportResult::failed(format, filename, &e))
    }

    /// PNG then PDF under `base_name`, each settled on its own.
    pub async fn export_multiple_formats(
        &self,
        target: &dyn CardSurface,
        base_name: &str,
    ) -> MultiFormatReport {
        let png_name = format!("{}.png", base_name);
        let pdf_name = format!("{}.pdf", base_name);

        let png = self.export(target, ExportFormat::Png, Some(&png_name)).await;
        tokio::time::sleep(Duration::from_millis(self.config.multi_format_pause_ms)).await;
        let pdf = self.export(target, ExportFormat::Pdf, Some(&pdf_name)).await;

        MultiFormatReport { png, pdf }
    }

    /// Low resolution `data:` URL of the card. Nothing is downloaded.
    pub async fn preview(
        &self,
        target: &dyn CardSurface,
        format: PreviewFormat,
        quality: f32,
    ) -> Result<String> {
        let _in_flight = InFlight::enter(&self.exporting)?;
        let bitmap = self
            .capturer
            .capture(target, &self.config.preview_tier)
            .await?;
        data_url(&bitmap, format, quality)
    }

    /// Render a small test surface and report whether a usable bitmap came back.
    pub async fn check_export_support(&self) -> bool {
        let Ok(_in_flight) = InFlight::enter(&self.exporting) else {
            return false;
        };
        let probe = CardElement::new(200, 100).with_display_list(vec![
            PaintCommand::SolidRect {
                x: 0,
                y: 0,
                width: 200,
                height: 100,
                color: Color::rgb(0x00, 0x7b, 0xff),
            },
            PaintCommand::Text {
                x: 20,
                y: 20,
                text: "Export Test".into(),
                size: 16,
                color: Color::WHITE,
            },
        ]);
        let profile = CaptureProfile {
            name: "probe".to_string(),
            scale: 1.0,
            ..CaptureProfile::simple()
        };
        match self.capturer.capture(&probe, &profile).await {
            Ok(bitmap) => !bitmap.is_empty(),
            Err(e) => {
                log::error!("Export test failed: {}", e);
                false
            }
        }
    }

    async fn run_chain(
        &self,
        target: &dyn CardSurface,
        format: ExportFormat,
        tiers: &[CaptureProfile],
        filename: &str,
    ) -> Result<ExportResult> {
        let mut last_error = None;
        for profile in tiers {
            match self.run_tier(target, format, profile, filename).await {
                Ok(bytes) => {
                    log::info!(
                        "{} export completed with '{}' method ({} bytes)",
                        format,
                        profile.name,
                        bytes
                    );
                    return Ok(ExportResult::succeeded(format, &profile.name, filename, bytes));
                }
                Err(e) if e.is_retryable() => {
                    log::warn!("{} export method '{}' failed: {}", format, profile.name, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no export methods configured".to_string());
        log::error!("All {} export methods failed: {}", format, message);
        Err(Error::AllExportMethodsFailed(message))
    }

    async fn run_tier(
        &self,
        target: &dyn CardSurface,
        format: ExportFormat,
        profile: &CaptureProfile,
        filename: &str,
    ) -> Result<usize> {
        match format {
            ExportFormat::Png => {
                let bitmap = self.capturer.capture(target, profile).await?;
                self.encoder.export(bitmap, filename, self.sink.as_ref())
            }
            ExportFormat::Pdf => {
                // Load the library before touching the surface
                self.composer.backend().await?;
                let profile = profile.clone().opaque();
                let bitmap = self.capturer.capture(target, &profile).await?;
                self.composer
                    .export(bitmap, filename, self.sink.as_ref())
                    .await
            }
        }
    }
}
