//! Shirt colour as delivered by the colour picker.

use std::fmt;
use std::str::FromStr;

use image::Rgba;
use palette::Srgb;

use crate::error::{Error, Result};

/// A 24-bit sRGB colour.
///
/// Parses `#rrggbb` and `#rgb` (the `#` is optional, case is ignored) and
/// always formats back to lower-case `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShirtColor(Srgb<u8>);

impl ShirtColor {
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(Srgb::new(r, g, b))
    }

    /// Parses a hex colour string.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let color: Srgb<u8> = hex
            .trim()
            .parse()
            .map_err(|_| Error::InvalidColor(hex.to_string()))?;
        Ok(Self(color))
    }

    /// Formats the colour as `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}",
            self.0.red, self.0.green, self.0.blue
        )
    }

    /// The colour as an opaque pixel.
    pub fn to_rgba(&self) -> Rgba<u8> {
        Rgba([self.0.red, self.0.green, self.0.blue, 255])
    }
}

impl Default for ShirtColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for ShirtColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ShirtColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}
