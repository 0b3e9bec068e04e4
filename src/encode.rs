//! Raster encoding: bitmap to PNG (or JPEG preview) bytes

use std::io::Cursor;

use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ImageEncoder;

use crate::download::{Download, DownloadSink};
use crate::rendering::paint::Color;
use crate::rendering::CapturedBitmap;
use crate::{Error, Result};

pub const PNG_MIME: &str = "image/png";
pub const JPEG_MIME: &str = "image/jpeg";

/// Image format for data URL previews
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewFormat {
    #[default]
    Png,
    Jpeg,
}

fn ensure_readable(bitmap: &CapturedBitmap) -> Result<()> {
    if bitmap.is_tainted() {
        return Err(Error::Encode(
            "bitmap is tainted by cross-origin content and cannot be exported".into(),
        ));
    }
    Ok(())
}

/// Lossless PNG with best compression.
pub fn encode_png(bitmap: &CapturedBitmap) -> Result<Vec<u8>> {
    ensure_readable(bitmap)?;
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    encoder
        .write_image(
            bitmap.pixels().as_raw(),
            bitmap.width(),
            bitmap.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(out)
}

/// JPEG has no alpha; transparent areas are flattened onto white.
pub fn encode_jpeg(bitmap: &CapturedBitmap, quality: f32) -> Result<Vec<u8>> {
    ensure_readable(bitmap)?;
    let q = (quality.clamp(0.1, 1.0) * 100.0).round() as u8;
    let rgb = bitmap.flatten(Color::WHITE);
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, q)
        .encode_image(&rgb)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(out.into_inner())
}

/// `data:` URL for inline previews. `quality` only applies to JPEG.
pub fn data_url(bitmap: &CapturedBitmap, format: PreviewFormat, quality: f32) -> Result<String> {
    let (mime, bytes) = match format {
        PreviewFormat::Png => (PNG_MIME, encode_png(bitmap)?),
        PreviewFormat::Jpeg => (JPEG_MIME, encode_jpeg(bitmap, quality)?),
    };
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{}", mime, b64))
}

/// Encodes captured bitmaps and delivers them as PNG downloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterEncoder;

impl RasterEncoder {
    pub fn new() -> Self {
        RasterEncoder
    }

    /// Encode and deliver exactly one file. Returns the number of bytes written.
    pub fn export(
        &self,
        bitmap: CapturedBitmap,
        filename: &str,
        sink: &dyn DownloadSink,
    ) -> Result<usize> {
        let bytes = encode_png(&bitmap)?;
        drop(bitmap);
        log::debug!("Bitmap converted to PNG ({} bytes)", bytes.len());
        let len = bytes.len();
        sink.deliver(Download {
            filename: filename.to_string(),
            mime_type: PNG_MIME,
            bytes,
        })?;
        log::debug!("Download triggered for {}", filename);
        Ok(len)
    }
}
