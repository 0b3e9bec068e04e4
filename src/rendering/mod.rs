//! Rendering: card layout, paint commands, and the software rasterizer

pub mod layout;
pub mod paint;
pub mod raster;

use image::{Rgb, RgbImage, RgbaImage};

use self::paint::Color;

/// Owned pixel buffer produced by a capture.
///
/// Consumed by value by the encoder or the document composer and never
/// mutated after creation.
#[derive(Debug, Clone)]
pub struct CapturedBitmap {
    image: RgbaImage,
    tainted: bool,
}

impl CapturedBitmap {
    pub fn new(image: RgbaImage) -> Self {
        Self { image, tainted: false }
    }

    /// Mark the bitmap as holding cross-origin pixels that may not be read back.
    pub fn tainted(mut self) -> Self {
        self.tainted = true;
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// True when every pixel has the same value.
    pub fn is_uniform(&self) -> bool {
        let mut pixels = self.image.pixels();
        match pixels.next() {
            Some(first) => pixels.all(|p| p == first),
            None => true,
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Composite onto an opaque background, dropping the alpha channel.
    pub fn flatten(&self, background: Color) -> RgbImage {
        let bg = [background.r, background.g, background.b];
        RgbImage::from_fn(self.width(), self.height(), |x, y| {
            let p = self.image.get_pixel(x, y).0;
            let a = p[3] as u32;
            let mix = |c: u8, b: u8| ((c as u32 * a + b as u32 * (255 - a) + 127) / 255) as u8;
            Rgb([mix(p[0], bg[0]), mix(p[1], bg[1]), mix(p[2], bg[2])])
        })
    }
}
