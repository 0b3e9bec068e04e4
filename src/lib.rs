//! Business card export pipeline
//!
//! Captures a styled card surface into a bitmap and delivers it as a lossless
//! PNG or as a single-page PDF sized exactly 3.5in x 2in.
//!
//! # Features
//!
//! - **Style isolation**: hover transforms, transitions and shadows are
//!   neutralized for the capture and always restored afterwards
//! - **Tiered fallback**: each export walks an ordered list of capture
//!   profiles and reports which one succeeded
//! - **Swappable seams**: rasterizer, document backend and download sink are
//!   traits with built-in implementations
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cardexport::{CardElement, CardExporter, DirectorySink, ExporterConfig};
//!
//! # async fn run() -> cardexport::Result<()> {
//! let sink = Arc::new(DirectorySink::new("out"));
//! let exporter = CardExporter::new(ExporterConfig::default(), sink)?;
//!
//! let card = CardElement::new(350, 200);
//! let result = exporter.export_png(&card, "business-card.png").await?;
//! println!("exported with the '{}' method", result.method.unwrap_or_default());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod capture;
pub mod config;
pub mod document;
pub mod download;
pub mod encode;
pub mod export;
pub mod rendering;
pub mod style_guard;
pub mod surface;

pub use capture::{Background, BitmapCapturer, CaptureProfile, CrossOriginPolicy, Rasterizer};
pub use config::ExporterConfig;
pub use document::{DocumentComposer, DocumentLoader, PageSetup};
pub use download::{DirectorySink, Download, DownloadSink, MemorySink};
pub use encode::{PreviewFormat, RasterEncoder};
pub use export::{CardExporter, ExportFormat, ExportResult, ExportState, MultiFormatReport};
pub use rendering::paint::{Color, ImageOrigin, PaintCommand};
pub use rendering::raster::SoftwareRasterizer;
pub use rendering::CapturedBitmap;
pub use style_guard::{StyleGuard, StyleSnapshot};
pub use surface::{CardElement, CardSurface};

/// Pixel dimensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// A physical width/height pair in some unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f32,
    pub height: f32,
}

/// Print-ready card dimensions in common units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrintDimensions {
    pub inches: Extent,
    /// At 300 DPI
    pub pixels: Size,
    pub mm: Extent,
    pub points: Extent,
}

pub const PRINT_DPI: f32 = 300.0;
const MM_PER_INCH: f32 = 25.4;

/// Dimensions of a business card page in inches, 300 DPI pixels, millimetres and points.
///
/// # Examples
///
/// ```
/// let d = cardexport::print_dimensions();
/// assert_eq!((d.pixels.width, d.pixels.height), (1050, 600));
/// assert_eq!((d.points.width, d.points.height), (252.0, 144.0));
/// ```
pub fn print_dimensions() -> PrintDimensions {
    let (w, h) = PageSetup::business_card().size_inches();
    let scaled = |f: f32| Extent {
        width: w * f,
        height: h * f,
    };
    PrintDimensions {
        inches: scaled(1.0),
        pixels: Size {
            width: (w * PRINT_DPI).round() as u32,
            height: (h * PRINT_DPI).round() as u32,
        },
        mm: scaled(MM_PER_INCH),
        points: scaled(document::POINTS_PER_INCH),
    }
}
