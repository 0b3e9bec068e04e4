/// Software rasterizer for card display lists

use async_trait::async_trait;
use image::{Rgba, RgbaImage};

use crate::capture::{Background, CaptureProfile, CrossOriginPolicy, Rasterizer};
use crate::rendering::paint::{Color, ImageOrigin, PaintCommand};
use crate::rendering::CapturedBitmap;
use crate::surface::CardSurface;
use crate::{Error, Result, Size};

/// Largest canvas the rasterizer will allocate, in pixels (16384 x 16384)
pub const MAX_CANVAS_PIXELS: u64 = 268_435_456;

/// Horizontal advance of one glyph, relative to the glyph size
const GLYPH_ADVANCE: f32 = 0.6;
/// Ink height of a glyph block, relative to the glyph size
const GLYPH_INK: f32 = 0.7;

/// Paints a surface's display list on the CPU.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareRasterizer;

impl SoftwareRasterizer {
    pub fn new() -> Self {
        SoftwareRasterizer
    }
}

#[async_trait]
impl Rasterizer for SoftwareRasterizer {
    async fn rasterize(
        &self,
        target: &dyn CardSurface,
        profile: &CaptureProfile,
    ) -> Result<CapturedBitmap> {
        let commands = target.display_list();
        rasterize_display_list(&commands, target.offset_size(), profile)
    }
}

/// Rasterize `commands` into a bitmap of the capture window times `profile.scale`.
///
/// The window is `profile.output_dimensions` when set, otherwise `source`.
/// Content outside the window is clipped. Canvases above
/// [`MAX_CANVAS_PIXELS`] fail with [`Error::Capture`] before allocation.
pub fn rasterize_display_list(
    commands: &[PaintCommand],
    source: Size,
    profile: &CaptureProfile,
) -> Result<CapturedBitmap> {
    let window = profile.output_dimensions.unwrap_or(source);
    let scale = profile.scale;
    let (width, height) = canvas_size(window, scale)?;

    let fill = match profile.background {
        Background::Transparent => Rgba([0, 0, 0, 0]),
        Background::Color(c) => Rgba(c.to_array()),
    };
    let mut canvas = RgbaImage::from_pixel(width, height, fill);
    let mut tainted = false;

    let px = |v: i32| (v as f32 * scale).round() as i64;
    let len = |v: u32| (v as f32 * scale).round() as i64;

    for cmd in commands {
        match cmd {
            PaintCommand::SolidRect {
                x,
                y,
                width,
                height,
                color,
            } => fill_rect(&mut canvas, px(*x), px(*y), len(*width), len(*height), *color),
            PaintCommand::Text {
                x,
                y,
                text,
                size,
                color,
            } => {
                let glyph = *size as f32 * scale;
                let advance = glyph * GLYPH_ADVANCE;
                let ink = (glyph * GLYPH_INK).round().max(1.0) as i64;
                let top = px(*y) + (glyph - ink as f32).round() as i64;
                let left = px(*x) as f32;

                for (start, word) in word_spans(text) {
                    let word_x = left + start as f32 * advance;
                    if profile.letter_rendering {
                        for i in 0..word.chars().count() {
                            let gx = word_x + i as f32 * advance;
                            let gw = (advance * 0.8).round().max(1.0) as i64;
                            fill_rect(&mut canvas, gx.round() as i64, top, gw, ink, *color);
                        }
                    } else {
                        let run = (word.chars().count() as f32 * advance).round().max(1.0) as i64;
                        fill_rect(&mut canvas, word_x.round() as i64, top, run, ink, *color);
                    }
                }
            }
            PaintCommand::Image {
                x,
                y,
                width,
                height,
                pixels,
                origin,
            } => {
                if *origin != ImageOrigin::SameOrigin
                    && profile.cross_origin == CrossOriginPolicy::Deny
                {
                    log::debug!("Skipping cross-origin image under deny policy");
                    continue;
                }
                draw_image(&mut canvas, px(*x), px(*y), len(*width), len(*height), pixels);
                if *origin == ImageOrigin::CrossOrigin {
                    tainted = true;
                }
            }
        }
    }

    let bitmap = CapturedBitmap::new(canvas);
    Ok(if tainted { bitmap.tainted() } else { bitmap })
}

/// Scaled canvas dimensions, bounded by [`MAX_CANVAS_PIXELS`].
fn canvas_size(window: Size, scale: f32) -> Result<(u32, u32)> {
    let width = (window.width as f64 * scale as f64).round();
    let height = (window.height as f64 * scale as f64).round();
    if width * height > MAX_CANVAS_PIXELS as f64 {
        return Err(Error::Capture(format!(
            "canvas {}x{} exceeds the maximum of {} pixels",
            width, height, MAX_CANVAS_PIXELS
        )));
    }
    Ok((width as u32, height as u32))
}

/// Words of `text` with their starting character column.
fn word_spans(text: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut col = 0usize;
    for (i, part) in text.split(' ').enumerate() {
        if i > 0 {
            col += 1;
        }
        if !part.is_empty() {
            spans.push((col, part));
        }
        col += part.chars().count();
    }
    spans
}

fn blend(dst: &mut Rgba<u8>, src: [u8; 4]) {
    let sa = src[3] as u32;
    if sa == 255 {
        *dst = Rgba(src);
        return;
    }
    if sa == 0 {
        return;
    }
    let da = dst.0[3] as u32;
    let out_a = sa + da * (255 - sa) / 255;
    if out_a == 0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let s = src[c] as u32 * sa;
        let d = dst.0[c] as u32 * da * (255 - sa) / 255;
        out[c] = ((s + d) / out_a).min(255) as u8;
    }
    out[3] = out_a as u8;
    *dst = Rgba(out);
}

fn clip(canvas: &RgbaImage, x: i64, y: i64, w: i64, h: i64) -> Option<(u32, u32, u32, u32)> {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w).min(canvas.width() as i64);
    let y1 = (y + h).min(canvas.height() as i64);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

fn fill_rect(canvas: &mut RgbaImage, x: i64, y: i64, w: i64, h: i64, color: Color) {
    let Some((x0, y0, x1, y1)) = clip(canvas, x, y, w, h) else {
        return;
    };
    let src = color.to_array();
    for py in y0..y1 {
        for px in x0..x1 {
            blend(canvas.get_pixel_mut(px, py), src);
        }
    }
}

fn draw_image(canvas: &mut RgbaImage, x: i64, y: i64, w: i64, h: i64, src: &RgbaImage) {
    if src.width() == 0 || src.height() == 0 || w <= 0 || h <= 0 {
        return;
    }
    let Some((x0, y0, x1, y1)) = clip(canvas, x, y, w, h) else {
        return;
    };
    // nearest neighbour
    for py in y0..y1 {
        let sy = ((py as i64 - y) * src.height() as i64 / h) as u32;
        for px in x0..x1 {
            let sx = ((px as i64 - x) * src.width() as i64 / w) as u32;
            let p = src.get_pixel(sx.min(src.width() - 1), sy.min(src.height() - 1)).0;
            blend(canvas.get_pixel_mut(px, py), p);
        }
    }
}
