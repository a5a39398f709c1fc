use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::VizError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

const NAMED: &[(&str, Color)] = &[
    ("black", Color::rgb(0, 0, 0)),
    ("k", Color::rgb(0, 0, 0)),
    ("white", Color::rgb(255, 255, 255)),
    ("w", Color::rgb(255, 255, 255)),
    ("red", Color::rgb(255, 0, 0)),
    ("r", Color::rgb(255, 0, 0)),
    ("green", Color::rgb(0, 128, 0)),
    ("g", Color::rgb(0, 128, 0)),
    ("blue", Color::rgb(0, 0, 255)),
    ("b", Color::rgb(0, 0, 255)),
    ("cyan", Color::rgb(0, 191, 191)),
    ("c", Color::rgb(0, 191, 191)),
    ("magenta", Color::rgb(191, 0, 191)),
    ("m", Color::rgb(191, 0, 191)),
    ("yellow", Color::rgb(191, 191, 0)),
    ("y", Color::rgb(191, 191, 0)),
    ("gray", Color::rgb(128, 128, 128)),
    ("grey", Color::rgb(128, 128, 128)),
    ("orange", Color::rgb(255, 165, 0)),
    ("purple", Color::rgb(128, 0, 128)),
    ("tab:blue", Color::rgb(31, 119, 180)),
    ("tab:orange", Color::rgb(255, 127, 14)),
    ("tab:green", Color::rgb(44, 160, 44)),
    ("tab:red", Color::rgb(214, 39, 40)),
    ("tab:purple", Color::rgb(148, 103, 189)),
    ("tab:gray", Color::rgb(127, 127, 127)),
];

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(mut self, a: f64) -> Self {
        self.a = a;
        self
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn hex(s: &str) -> Result<Self, VizError> {
        let invalid = || VizError::InvalidArgument(format!("invalid hex color {s:?}"));
        let digits = s.strip_prefix('#').ok_or_else(invalid)?;
        if !digits.is_ascii() || !matches!(digits.len(), 6 | 8) {
            return Err(invalid());
        }
        let channel = |at: usize| u8::from_str_radix(&digits[at..at + 2], 16).map_err(|_| invalid());
        let mut color = Self::rgb(channel(0)?, channel(2)?, channel(4)?);
        if digits.len() == 8 {
            color.a = f64::from(channel(6)?) / 255.0;
        }
        Ok(color)
    }

    pub fn to_svg_fill(&self) -> String {
        if (self.a - 1.0).abs() < 1e-6 {
            self.to_hex()
        } else {
            format!("rgba({},{},{},{:.3})", self.r, self.g, self.b, self.a)
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        if spec.starts_with('#') {
            return Self::hex(spec);
        }
        let lower = spec.to_ascii_lowercase();
        NAMED
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, color)| *color)
            .ok_or_else(|| VizError::InvalidArgument(format!("unknown color name {spec:?}")))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if (self.a - 1.0).abs() < 1e-6 {
            write!(f, "{}", self.to_hex())
        } else {
            let alpha = (self.a.clamp(0.0, 1.0) * 255.0).round() as u8;
            write!(f, "{}{alpha:02x}", self.to_hex())
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::rgb(0, 0, 0)
    }
}
