//! Bitmap capture: turns a live card surface into pixels
//!
//! The capturer validates the surface, isolates its transient styles, waits
//! for the neutralized styles to settle, and then hands the surface to a
//! [`Rasterizer`] under a time budget.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::rendering::paint::Color;
use crate::rendering::CapturedBitmap;
use crate::style_guard::StyleGuard;
use crate::surface::CardSurface;
use crate::{Error, Result, Size};

/// Canvas fill painted before the display list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    Transparent,
    Color(Color),
}

/// Whether cross-origin images may be drawn into the bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossOriginPolicy {
    #[default]
    Allow,
    Deny,
}

/// One capture configuration. The export chains are ordered lists of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureProfile {
    /// Tier name reported in `ExportResult::method`
    pub name: String,
    /// Render resolution multiplier
    pub scale: f32,
    pub background: Background,
    pub cross_origin: CrossOriginPolicy,
    pub timeout_ms: u64,
    /// Fixed capture window instead of the surface's observed size
    #[serde(default)]
    pub output_dimensions: Option<Size>,
    /// Render each letter individually instead of one run per word
    #[serde(default)]
    pub letter_rendering: bool,
}

impl CaptureProfile {
    /// Moderate scale, opaque white, permissive cross-origin
    pub fn simple() -> Self {
        Self {
            name: "simple".to_string(),
            scale: 2.0,
            background: Background::Color(Color::WHITE),
            cross_origin: CrossOriginPolicy::Allow,
            timeout_ms: 15_000,
            output_dimensions: None,
            letter_rendering: false,
        }
    }

    /// Higher scale, transparent, longer budget, per-letter text
    pub fn advanced() -> Self {
        Self {
            name: "advanced".to_string(),
            scale: 3.0,
            background: Background::Transparent,
            cross_origin: CrossOriginPolicy::Allow,
            timeout_ms: 30_000,
            output_dimensions: None,
            letter_rendering: true,
        }
    }

    /// Fixed 350x200 window, white, no cross-origin content
    pub fn fallback() -> Self {
        Self {
            name: "fallback".to_string(),
            scale: 2.0,
            background: Background::Color(Color::WHITE),
            cross_origin: CrossOriginPolicy::Deny,
            timeout_ms: 15_000,
            output_dimensions: Some(Size { width: 350, height: 200 }),
            letter_rendering: false,
        }
    }

    /// Low resolution thumbnail used for previews
    pub fn preview() -> Self {
        Self {
            name: "preview".to_string(),
            scale: 1.0,
            ..Self::fallback()
        }
    }

    /// Same profile with an opaque background, as documents require.
    pub fn opaque(mut self) -> Self {
        if self.background == Background::Transparent {
            self.background = Background::Color(Color::WHITE);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::Config(format!(
                "profile '{}': scale must be positive, got {}",
                self.name, self.scale
            )));
        }
        if self.timeout_ms == 0 {
            return Err(Error::Config(format!(
                "profile '{}': timeout_ms must be positive",
                self.name
            )));
        }
        if let Some(d) = self.output_dimensions {
            if d.width == 0 || d.height == 0 {
                return Err(Error::Config(format!(
                    "profile '{}': output dimensions must be non-zero",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Backend that paints a surface into a bitmap.
///
/// Implementations are not required to be reentrant; the exporter never runs
/// two captures at once.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(
        &self,
        target: &dyn CardSurface,
        profile: &CaptureProfile,
    ) -> Result<CapturedBitmap>;
}

/// Check that a surface can be captured at all.
pub fn validate_target(target: &dyn CardSurface) -> Result<Size> {
    if !target.is_mounted() {
        return Err(Error::InvalidTarget("card element is not mounted".into()));
    }
    let size = target.offset_size();
    if size.width == 0 || size.height == 0 {
        return Err(Error::InvalidTarget(format!(
            "card element has no visible dimensions ({}x{})",
            size.width, size.height
        )));
    }
    Ok(size)
}

pub struct BitmapCapturer {
    rasterizer: Arc<dyn Rasterizer>,
    settle_delay: Duration,
    reject_blank: bool,
}

impl BitmapCapturer {
    pub fn new(rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self {
            rasterizer,
            settle_delay: Duration::from_millis(200),
            reject_blank: false,
        }
    }

    /// Delay between style isolation and sampling
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Treat single-color bitmaps as failed captures.
    pub fn with_reject_blank(mut self, reject: bool) -> Self {
        self.reject_blank = reject;
        self
    }

    pub async fn capture(
        &self,
        target: &dyn CardSurface,
        profile: &CaptureProfile,
    ) -> Result<CapturedBitmap> {
        let size = validate_target(target)?;
        log::debug!(
            "Capturing {}x{} card with profile '{}' (scale {})",
            size.width,
            size.height,
            profile.name,
            profile.scale
        );

        let guard = StyleGuard::acquire(target);
        tokio::time::sleep(self.settle_delay).await;

        let budget = Duration::from_millis(profile.timeout_ms);
        let outcome =
            tokio::time::timeout(budget, self.rasterizer.rasterize(target, profile)).await;
        guard.release();

        let bitmap = match outcome {
            Ok(res) => res?,
            Err(_) => return Err(Error::CaptureTimeout(profile.timeout_ms)),
        };

        if bitmap.is_empty() {
            return Err(Error::Capture(format!(
                "generated bitmap is empty ({}x{})",
                bitmap.width(),
                bitmap.height()
            )));
        }
        if self.reject_blank && bitmap.is_uniform() {
            return Err(Error::Capture("generated bitmap is blank".into()));
        }

        log::debug!("Bitmap generated: {}x{}", bitmap.width(), bitmap.height());
        Ok(bitmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::raster::SoftwareRasterizer;
    use crate::surface::CardElement;
    use image::RgbaImage;

    struct Slow;

    #[async_trait]
    impl Rasterizer for Slow {
        async fn rasterize(&self, _: &dyn CardSurface, _: &CaptureProfile) -> Result<CapturedBitmap> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(CapturedBitmap::new(RgbaImage::new(1, 1)))
        }
    }

    struct Empty;

    #[async_trait]
    impl Rasterizer for Empty {
        async fn rasterize(&self, _: &dyn CardSurface, _: &CaptureProfile) -> Result<CapturedBitmap> {
            Ok(CapturedBitmap::new(RgbaImage::new(0, 0)))
        }
    }

    fn capturer(r: impl Rasterizer + 'static) -> BitmapCapturer {
        BitmapCapturer::new(Arc::new(r)).with_settle_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn captures_at_profile_scale() {
        let el = CardElement::new(400, 220);
        let bitmap = capturer(SoftwareRasterizer::new())
            .capture(&el, &CaptureProfile::simple())
            .await
            .unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (800, 440));
    }

    #[tokio::test]
    async fn zero_size_is_rejected_before_mutation() {
        let el = CardElement::new(0, 220);
        let err = capturer(SoftwareRasterizer::new())
            .capture(&el, &CaptureProfile::simple())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTarget(_)));
        assert_eq!(el.mutation_count(), 0);
    }

    #[tokio::test]
    async fn timeout_restores_styles() {
        let el = CardElement::new(400, 220).with_style("transform", "scale(1.05)");
        let profile = CaptureProfile {
            timeout_ms: 20,
            ..CaptureProfile::simple()
        };
        let err = capturer(Slow).capture(&el, &profile).await.unwrap_err();
        assert_eq!(err, Error::CaptureTimeout(20));
        assert_eq!(el.inline_style("transform").as_deref(), Some("scale(1.05)"));
    }

    #[tokio::test]
    async fn empty_bitmap_is_a_capture_error() {
        let el = CardElement::new(400, 220);
        let err = capturer(Empty)
            .capture(&el, &CaptureProfile::simple())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Capture(_)));
    }

    #[tokio::test]
    async fn blank_check_is_opt_in() {
        let el = CardElement::new(40, 20);
        let permissive = capturer(SoftwareRasterizer::new());
        assert!(permissive.capture(&el, &CaptureProfile::simple()).await.is_ok());

        let strict = capturer(SoftwareRasterizer::new()).with_reject_blank(true);
        let err = strict
            .capture(&el, &CaptureProfile::simple())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Capture(_)));
    }

    #[test]
    fn profile_validation() {
        assert!(CaptureProfile::simple().validate().is_ok());
        let bad = CaptureProfile {
            scale: 0.0,
            ..CaptureProfile::simple()
        };
        assert!(matches!(bad.validate(), Err(Error::Config(_))));
        assert_eq!(
            CaptureProfile::advanced().opaque().background,
            Background::Color(Color::WHITE)
        );
    }
}
