//! Error types for the export pipeline

use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing or exporting a card
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The surface is missing, unmounted, or has no visible size
    #[error("Invalid export target: {0}")]
    InvalidTarget(String),

    /// Rasterization failed or produced an empty bitmap
    #[error("Capture failed: {0}")]
    Capture(String),

    /// Rasterization exceeded its time budget
    #[error("Capture timed out after {0}ms")]
    CaptureTimeout(u64),

    /// Bitmap could not be serialized (tainted bitmap, encoder failure)
    #[error("Failed to convert bitmap to image: {0}")]
    Encode(String),

    /// The document backend could not be loaded
    #[error("Failed to load PDF library: {0}")]
    DocumentLibraryLoad(String),

    /// The image could not be placed on the document page
    #[error("Failed to add image to PDF: {0}")]
    DocumentAssemble(String),

    /// The document could not be serialized or delivered
    #[error("Failed to save PDF: {0}")]
    DocumentSave(String),

    /// A raster file could not be delivered to its sink
    #[error("Download failed: {0}")]
    Download(String),

    /// Another export is still running on this exporter
    #[error("Export already in progress")]
    ExportInProgress,

    /// Every tier of the fallback chain failed
    #[error("All export methods failed: {0}")]
    AllExportMethodsFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the orchestrator should move on to the next tier after this error.
    ///
    /// Target problems and the reentrancy guard are surfaced to the caller
    /// immediately; every other failure belongs to a single tier.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::InvalidTarget(_)
                | Error::ExportInProgress
                | Error::AllExportMethodsFailed(_)
                | Error::Config(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Download(err.to_string())
    }
}
