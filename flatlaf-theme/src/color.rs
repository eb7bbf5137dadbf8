//! RGBA colors, hex notation and the HSL color space.
//!
//! Colors are stored as four bytes. Theme files write them as `#RRGGBB` or
//! `#RRGGBBAA`; the color functions operate on HSL with hue in degrees
//! (0-360) and saturation, lightness and alpha as percentages (0-100).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// An sRGB color with 8-bit channels and straight (non premultiplied) alpha.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel, 255 is opaque.
    pub a: u8,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Opaque black.
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// Opaque red, also used to mark values that failed to materialize.
    pub const RED: Color = Color::rgb(255, 0, 0);

    /// Create an opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color with alpha.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from an `0xAARRGGBB` integer.
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    /// The color as `0xAARRGGBB` integer.
    pub const fn argb(&self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// The same color with another alpha.
    pub const fn with_alpha(&self, a: u8) -> Self {
        Self { a, ..*self }
    }

    /// Whether the color is fully opaque.
    pub const fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// Parse a hex color in `#RRGGBB` or `#RRGGBBAA` notation.
    ///
    /// The leading `#` is required and exactly 6 or 8 hex digits must follow.
    pub fn parse_hex(value: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::new(format!("invalid color '{}'", value));

        let digits = value.strip_prefix('#').ok_or_else(invalid)?;
        if (digits.len() != 6 && digits.len() != 8)
            || !digits.bytes().all(|c| c.is_ascii_hexdigit())
        {
            return Err(invalid());
        }

        let n = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
        Ok(if digits.len() == 6 {
            Self::from_argb(0xff00_0000 | n)
        } else {
            // alpha is the lowest byte in the notation
            Self::from_argb((n >> 8) | ((n & 0xff) << 24))
        })
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` if not opaque.
    pub fn to_hex(&self) -> String {
        if self.is_opaque() {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Convert to HSL: hue 0-360, saturation 0-100, lightness 0-100.
    pub fn to_hsl(&self) -> [f32; 3] {
        let r = self.r as f32 / 255.0;
        let g = self.g as f32 / 255.0;
        let b = self.b as f32 / 255.0;

        let min = r.min(g).min(b);
        let max = r.max(g).max(b);
        let delta = max - min;

        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            ((60.0 * (g - b) / delta) + 360.0) % 360.0
        } else if max == g {
            (60.0 * (b - r) / delta) + 120.0
        } else {
            (60.0 * (r - g) / delta) + 240.0
        };

        let l = (max + min) / 2.0;

        let s = if delta == 0.0 {
            0.0
        } else if l <= 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };

        [h, s * 100.0, l * 100.0]
    }

    /// Convert HSL (hue 0-360, saturation/lightness 0-100) and alpha (0-1) to a color.
    pub fn from_hsl(h: f32, s: f32, l: f32, alpha: f32) -> Self {
        let h = h.rem_euclid(360.0) / 360.0;
        let s = s / 100.0;
        let l = l / 100.0;

        let q = if l < 0.5 { l * (1.0 + s) } else { (l + s) - (s * l) };
        let p = 2.0 * l - q;

        let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
        let g = hue_to_rgb(p, q, h);
        let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

        Self::rgba(unit_to_byte(r), unit_to_byte(g), unit_to_byte(b), unit_to_byte(alpha))
    }

    /// Perceptual brightness (0-1) using Rec. 709 coefficients with gamma correction.
    pub fn luma(&self) -> f32 {
        let r = gamma_correction(self.r as f32 / 255.0);
        let g = gamma_correction(self.g as f32 / 255.0);
        let b = gamma_correction(self.b as f32 / 255.0);
        (0.2126 * r) + (0.7152 * g) + (0.0722 * b)
    }
}

fn hue_to_rgb(p: f32, q: f32, mut h: f32) -> f32 {
    if h < 0.0 {
        h += 1.0;
    }
    if h > 1.0 {
        h -= 1.0;
    }

    if 6.0 * h < 1.0 {
        p + ((q - p) * 6.0 * h)
    } else if 2.0 * h < 1.0 {
        q
    } else if 3.0 * h < 2.0 {
        p + ((q - p) * 6.0 * ((2.0 / 3.0) - h))
    } else {
        p
    }
}

fn unit_to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

fn gamma_correction(value: f32) -> f32 {
    if value <= 0.03928 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color({})", self.to_hex())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s.trim())
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let hex = String::deserialize(deserializer)?;
        Color::parse_hex(&hex).map_err(Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Color::parse_hex("#ff0000").unwrap(), Color::RED);
        assert_eq!(
            Color::parse_hex("#11223380").unwrap(),
            Color::rgba(0x11, 0x22, 0x33, 0x80)
        );
        assert_eq!(Color::parse_hex("#AbCdEf").unwrap(), Color::rgb(0xab, 0xcd, 0xef));
    }

    #[test]
    fn test_parse_hex_rejects_other_lengths() {
        assert!(Color::parse_hex("#fff").is_err());
        assert!(Color::parse_hex("#ffff").is_err());
        assert!(Color::parse_hex("#fffffff").is_err());
        assert!(Color::parse_hex("ffffff").is_err());
        assert!(Color::parse_hex("#gggggg").is_err());
        assert!(Color::parse_hex("#+fffff").is_err());
    }

    #[test]
    fn test_hex_round_trip_is_stable() {
        for input in ["#3c3f41", "#00000000", "#ffffff", "#4b6eaf80"] {
            let first = Color::parse_hex(input).unwrap();
            let second = Color::parse_hex(&first.to_hex()).unwrap();
            assert_eq!(first, second);
            assert_eq!(first.argb(), second.argb());
            assert_eq!(first.to_hex(), input);
        }
    }

    #[test]
    fn test_hsl_conversion() {
        assert_eq!(Color::RED.to_hsl(), [0.0, 100.0, 50.0]);
        assert_eq!(Color::WHITE.to_hsl(), [0.0, 0.0, 100.0]);
        assert_eq!(Color::from_hsl(0.0, 100.0, 50.0, 1.0), Color::RED);
        assert_eq!(Color::from_hsl(120.0, 100.0, 50.0, 1.0), Color::rgb(0, 255, 0));
        assert_eq!(Color::from_hsl(240.0, 100.0, 50.0, 1.0), Color::rgb(0, 0, 255));
    }

    #[test]
    fn test_hsl_round_trip() {
        for color in [
            Color::rgb(0x3c, 0x3f, 0x41),
            Color::rgb(0x4b, 0x6e, 0xaf),
            Color::rgb(0xf2, 0xf2, 0xf2),
        ] {
            let [h, s, l] = color.to_hsl();
            assert_eq!(Color::from_hsl(h, s, l, 1.0), color);
        }
    }

    #[test]
    fn test_luma() {
        assert_eq!(Color::BLACK.luma(), 0.0);
        assert!((Color::WHITE.luma() - 1.0).abs() < 0.0001);
        assert!(Color::rgb(0, 255, 0).luma() > Color::rgb(0, 0, 255).luma());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let json = serde_json::to_string(&Color::rgba(1, 2, 3, 4)).unwrap();
        assert_eq!(json, "\"#01020304\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::rgba(1, 2, 3, 4));
    }
}
