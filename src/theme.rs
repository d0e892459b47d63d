use crate::config::ColorConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#?([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Parses `RRGGBB`, `RGB`, `#RRGGBB` or `#RGB`.
pub fn parse_hex_color(value: &str) -> Option<Rgb> {
    let caps = HEX_RE.captures(value.trim())?;
    let digits = caps.get(1)?.as_str();
    let expanded: String = if digits.len() == 3 {
        digits.chars().flat_map(|ch| [ch, ch]).collect()
    } else {
        digits.to_string()
    };
    let channel = |idx: usize| u8::from_str_radix(&expanded[idx..idx + 2], 16).ok();
    Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

fn resolve_or_fallback(role: &str, value: &str) -> Rgb {
    match parse_hex_color(value) {
        Some(color) => color,
        None => {
            tracing::warn!(role, value, "unparseable hex color, using fallback");
            Rgb::BLACK
        }
    }
}

/// The four colors every card and label is painted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub border: Rgb,
    pub background: Rgb,
    pub primary_text: Rgb,
    pub secondary_text: Rgb,
}

impl Palette {
    pub fn from_colors(colors: &ColorConfig) -> Self {
        Self {
            border: resolve_or_fallback("border", &colors.border),
            background: resolve_or_fallback("background", &colors.background),
            primary_text: resolve_or_fallback("primarytext", &colors.primarytext),
            secondary_text: resolve_or_fallback("secondarytext", &colors.secondarytext),
        }
    }
}
