/// Paint command set describing a card face

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// An sRGB color with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(s: &str) -> Result<Self> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| Error::Config(format!("color must start with '#': {}", s)))?;
        let digit = |i: usize, len: usize| -> Result<u8> {
            let part = hex
                .get(i..i + len)
                .ok_or_else(|| Error::Config(format!("truncated color: {}", s)))?;
            // from_str_radix alone would accept a leading '+'
            if !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(Error::Config(format!("invalid color: {}", s)));
            }
            let v = u8::from_str_radix(part, 16)
                .map_err(|_| Error::Config(format!("invalid color: {}", s)))?;
            // Shorthand digits expand as 0xf -> 0xff
            Ok(if len == 1 { v * 17 } else { v })
        };
        match hex.len() {
            3 => Ok(Color::rgb(digit(0, 1)?, digit(1, 1)?, digit(2, 1)?)),
            6 => Ok(Color::rgb(digit(0, 2)?, digit(2, 2)?, digit(4, 2)?)),
            8 => Ok(Color::rgba(digit(0, 2)?, digit(2, 2)?, digit(4, 2)?, digit(6, 2)?)),
            _ => Err(Error::Config(format!("invalid color: {}", s))),
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

/// Where an embedded image was loaded from, relative to the card's document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    SameOrigin,
    /// Cross-origin, served with CORS headers
    CorsEnabled,
    /// Cross-origin without CORS; drawing it taints the bitmap
    CrossOrigin,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Color,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        /// Glyph height in CSS pixels
        size: u32,
        color: Color,
    },
    Image {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        pixels: Arc<RgbaImage>,
        origin: ImageOrigin,
    },
}
