use crate::config::{TextConfig, TextStyle};
use crate::error::{ChartError, ChartResult};
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use ttf_parser::{Face, GlyphId};

static SYSTEM_FONTS: Lazy<Database> = Lazy::new(|| {
    let mut db = Database::new();
    db.load_system_fonts();
    db
});

/// A family + style pair, e.g. `Helvetica Neue` / `Bold`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FontSpec {
    pub family: String,
    pub style: String,
}

impl From<&TextStyle> for FontSpec {
    fn from(style: &TextStyle) -> Self {
        Self {
            family: style.family.clone(),
            style: style.style.clone(),
        }
    }
}

impl FontSpec {
    pub fn weight(&self) -> u16 {
        parse_style(&self.style).0.0
    }

    pub fn is_italic(&self) -> bool {
        parse_style(&self.style).1 != Style::Normal
    }
}

pub trait FontProvider {
    fn load(&mut self, spec: &FontSpec) -> ChartResult<LoadedFont>;
}

pub struct LoadedFont {
    spec: FontSpec,
    face: Option<FontFace>,
}

impl LoadedFont {
    pub fn approximate(spec: FontSpec) -> Self {
        Self { spec, face: None }
    }

    pub fn spec(&self) -> &FontSpec {
        &self.spec
    }

    pub fn measure_width(&self, text: &str, font_size: f32) -> f32 {
        match &self.face {
            Some(face) => face.measure_width(text, font_size),
            None => approximate_width(text, font_size),
        }
    }
}

/// Every font the resolved text roles need, loaded up front.
#[derive(Default)]
pub struct FontBook {
    fonts: HashMap<FontSpec, LoadedFont>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.fonts.keys()).finish()
    }
}

impl FontBook {
    /// Loads each text role's font. Any missing font fails the whole load.
    pub fn load(provider: &mut dyn FontProvider, text: &TextConfig) -> ChartResult<Self> {
        let mut fonts = HashMap::new();
        for (role, style) in text.roles() {
            let spec = FontSpec::from(style);
            if fonts.contains_key(&spec) {
                continue;
            }
            let loaded = provider.load(&spec).inspect_err(|err| {
                tracing::error!(role, %err, "font load failed");
            })?;
            tracing::debug!(role, family = %spec.family, style = %spec.style, "font loaded");
            fonts.insert(spec, loaded);
        }
        Ok(Self { fonts })
    }

    pub fn contains(&self, spec: &FontSpec) -> bool {
        self.fonts.contains_key(spec)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn measure(&self, spec: &FontSpec, text: &str, font_size: f32, letter_spacing: f32) -> f32 {
        if text.is_empty() || font_size <= 0.0 {
            return 0.0;
        }
        let width = match self.fonts.get(spec) {
            Some(font) => font.measure_width(text, font_size),
            None => approximate_width(text, font_size),
        };
        let gaps = text.chars().count().saturating_sub(1) as f32;
        width + gaps * letter_spacing
    }
}

/// Resolves fonts against the fonts installed on this machine.
#[derive(Clone)]
pub struct SystemFonts {
    db: Database,
}

impl SystemFonts {
    pub fn new() -> Self {
        Self {
            db: SYSTEM_FONTS.clone(),
        }
    }

    pub fn load_font_dir(&mut self, dir: &Path) {
        self.db.load_fonts_dir(dir);
    }
}

impl Default for SystemFonts {
    fn default() -> Self {
        Self::new()
    }
}

impl FontProvider for SystemFonts {
    fn load(&mut self, spec: &FontSpec) -> ChartResult<LoadedFont> {
        let not_found = || ChartError::FontLoad {
            family: spec.family.clone(),
            style: spec.style.clone(),
        };
        let family = family_token(&spec.family);
        let families = [family];
        let (weight, style) = parse_style(&spec.style);
        let query = Query {
            families: &families,
            weight,
            stretch: Stretch::Normal,
            style,
        };
        let id = self.db.query(&query).ok_or_else(not_found)?;
        let face = self
            .db
            .with_face_data(id, |data, index| FontFace::parse(data.to_vec(), index))
            .flatten()
            .ok_or_else(not_found)?;
        Ok(LoadedFont {
            spec: spec.clone(),
            face: Some(face),
        })
    }
}

/// Character-width heuristics instead of real font files. With `known` set,
/// families outside the list fail to load like a missing system font would.
#[derive(Debug, Clone, Default)]
pub struct FastTextMetrics {
    known: Option<HashSet<String>>,
}

impl FastTextMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_families<I, S>(families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: Some(families.into_iter().map(Into::into).collect()),
        }
    }
}

impl FontProvider for FastTextMetrics {
    fn load(&mut self, spec: &FontSpec) -> ChartResult<LoadedFont> {
        if let Some(known) = &self.known
            && !known.contains(&spec.family)
        {
            return Err(ChartError::FontLoad {
                family: spec.family.clone(),
                style: spec.style.clone(),
            });
        }
        Ok(LoadedFont::approximate(spec.clone()))
    }
}

fn family_token(name: &str) -> Family<'_> {
    let raw = name.trim().trim_matches('"').trim_matches('\'');
    match raw.to_ascii_lowercase().as_str() {
        "serif" => Family::Serif,
        "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => Family::SansSerif,
        "monospace" | "ui-monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        _ => Family::Name(raw),
    }
}

fn parse_style(style: &str) -> (Weight, Style) {
    let lower = style.to_ascii_lowercase().replace([' ', '-', '_'], "");
    let slant = if lower.contains("italic") {
        Style::Italic
    } else if lower.contains("oblique") {
        Style::Oblique
    } else {
        Style::Normal
    };
    let weight = if lower.contains("thin") || lower.contains("hairline") {
        Weight::THIN
    } else if lower.contains("extralight") || lower.contains("ultralight") {
        Weight::EXTRA_LIGHT
    } else if lower.contains("light") {
        Weight::LIGHT
    } else if lower.contains("medium") {
        Weight::MEDIUM
    } else if lower.contains("semibold") || lower.contains("demibold") {
        Weight::SEMIBOLD
    } else if lower.contains("extrabold") || lower.contains("ultrabold") {
        Weight::EXTRA_BOLD
    } else if lower.contains("bold") {
        Weight::BOLD
    } else if lower.contains("black") || lower.contains("heavy") {
        Weight::BLACK
    } else {
        Weight::NORMAL
    };
    (weight, slant)
}

fn approximate_width(text: &str, font_size: f32) -> f32 {
    text.chars()
        .filter(|ch| *ch != '\n')
        .map(|ch| char_width_factor(ch) * font_size)
        .sum()
}

fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.28,
        'i' | 'j' | 'l' | 'I' | '.' | ',' | ':' | ';' | '|' | '!' | '\'' => 0.26,
        'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' => 0.36,
        'm' | 'w' | 'M' | 'W' | '@' => 0.86,
        'A'..='Z' => 0.66,
        '0'..='9' => 0.56,
        _ if ch.is_ascii() => 0.52,
        _ => 0.9,
    }
}

struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascii_advances: [u16; 128],
}

impl FontFace {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph_id) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph_id).unwrap_or(0);
            }
        }
        Some(Self {
            data,
            index,
            units_per_em,
            ascii_advances,
        })
    }

    fn measure_width(&self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;

        if text.is_ascii() {
            let mut width = 0.0f32;
            for byte in text.as_bytes() {
                if *byte == b'\n' {
                    continue;
                }
                let advance = self.ascii_advances[*byte as usize];
                if advance == 0 {
                    width += fallback;
                } else {
                    width += advance as f32 * scale;
                }
            }
            return width;
        }

        let Ok(face) = Face::parse(&self.data, self.index) else {
            return approximate_width(text, font_size);
        };
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            match face.glyph_index(ch) {
                Some(GlyphId(id)) => {
                    let advance = face.glyph_hor_advance(GlyphId(id)).unwrap_or(0);
                    width += advance as f32 * scale;
                }
                None => width += fallback,
            }
        }
        width
    }
}
