use crate::error::{ChartError, ChartResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub family: String,
    pub style: String,
    pub size: f32,
}

impl TextStyle {
    fn new(family: &str, style: &str, size: f32) -> Self {
        Self {
            family: family.to_string(),
            style: style.to_string(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorConfig {
    pub border: String,
    pub background: String,
    pub primarytext: String,
    pub secondarytext: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            border: "EEECF3".to_string(),
            background: "FFFFFF".to_string(),
            primarytext: "444D56".to_string(),
            secondarytext: "A1A6AA".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
    pub team: TextStyle,
    pub name: TextStyle,
    pub alias: TextStyle,
    pub meta: TextStyle,
}

impl TextConfig {
    pub fn roles(&self) -> [(&'static str, &TextStyle); 4] {
        [
            ("team", &self.team),
            ("name", &self.name),
            ("alias", &self.alias),
            ("meta", &self.meta),
        ]
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            team: TextStyle::new("Helvetica Neue", "Bold", 20.0),
            name: TextStyle::new("Helvetica Neue", "Bold", 16.0),
            alias: TextStyle::new("Helvetica Neue", "Regular", 12.0),
            meta: TextStyle::new("Helvetica Neue", "Regular", 12.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub avatar: bool,
    pub name: bool,
    pub alias: bool,
    pub meta: bool,
    pub ogurl: String,
    pub color: ColorConfig,
    pub text: TextConfig,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            avatar: true,
            name: true,
            alias: true,
            meta: true,
            ogurl: "https://github.com/".to_string(),
            color: ColorConfig::default(),
            text: TextConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub card_width: f32,
    pub card_height: f32,
    pub template_width: f32,
    pub card_corner_radius: f32,
    pub card_stroke_weight: f32,
    pub card_item_spacing: f32,
    pub card_padding_x: f32,
    pub card_padding_y: f32,
    pub avatar_size: f32,
    pub text_frame_width: f32,
    pub spacer_size: f32,
    pub meta_letter_spacing: f32,
    pub line_height: f32,
    pub teams_item_spacing: f32,
    pub team_item_spacing: f32,
    pub members_item_spacing: f32,
    pub root_padding_x: f32,
    pub root_padding_y: f32,
    pub nested_padding_top: f32,
    pub nested_padding_bottom: f32,
    pub team_label_width: f32,
    pub section_label_width: f32,
    pub label_height: f32,
    pub root_gap: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            card_width: 340.0,
            card_height: 74.0,
            template_width: 280.0,
            card_corner_radius: 8.0,
            card_stroke_weight: 2.0,
            card_item_spacing: 16.0,
            card_padding_x: 20.0,
            card_padding_y: 12.0,
            avatar_size: 40.0,
            text_frame_width: 200.0,
            spacer_size: 4.0,
            meta_letter_spacing: 0.3,
            line_height: 1.2,
            teams_item_spacing: 80.0,
            team_item_spacing: 16.0,
            members_item_spacing: 8.0,
            root_padding_x: 100.0,
            root_padding_y: 80.0,
            nested_padding_top: 16.0,
            nested_padding_bottom: 32.0,
            team_label_width: 340.0,
            section_label_width: 296.0,
            label_height: 18.0,
            root_gap: 80.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f32),
    String(String),
}

impl NumberOrString {
    fn as_f32(&self) -> Option<f32> {
        match self {
            NumberOrString::Number(val) => Some(*val),
            NumberOrString::String(val) => val.trim().parse::<f32>().ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PartialTextStyle {
    family: String,
    style: String,
    size: NumberOrString,
}

impl PartialTextStyle {
    fn to_style(&self, role: &str) -> ChartResult<TextStyle> {
        let size = self.size.as_f32().filter(|size| *size > 0.0).ok_or_else(|| {
            ChartError::Config(format!("text.{role}.size must be a positive number"))
        })?;
        Ok(TextStyle {
            family: self.family.clone(),
            style: self.style.clone(),
            size,
        })
    }
}

/// A color as written in a document. Digit-only hex like `333333` parses as a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum ColorValue {
    Integer(u64),
    Float(f64),
    Text(String),
    Other(serde_yaml::Value),
}

impl ColorValue {
    fn into_hex(self) -> String {
        match self {
            ColorValue::Integer(val) => val.to_string(),
            ColorValue::Float(val) => val.to_string(),
            ColorValue::Text(val) => val,
            // left for the palette to reject, which falls back to black
            ColorValue::Other(val) => format!("{val:?}"),
        }
    }
}

fn color_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ColorValue>::deserialize(deserializer)?.map(ColorValue::into_hex))
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialColorConfig {
    #[serde(default, deserialize_with = "color_field")]
    pub border: Option<String>,
    #[serde(default, deserialize_with = "color_field")]
    pub background: Option<String>,
    #[serde(default, deserialize_with = "color_field")]
    pub primarytext: Option<String>,
    #[serde(default, deserialize_with = "color_field")]
    pub secondarytext: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialTextConfig {
    #[serde(alias = "label")]
    pub team: Option<PartialTextStyle>,
    pub name: Option<PartialTextStyle>,
    pub alias: Option<PartialTextStyle>,
    pub meta: Option<PartialTextStyle>,
}

/// A user-supplied override, as found under the document's `config` key or in a config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialChartConfig {
    pub avatar: Option<bool>,
    pub name: Option<bool>,
    pub alias: Option<bool>,
    pub meta: Option<bool>,
    pub ogurl: Option<String>,
    pub color: Option<PartialColorConfig>,
    pub text: Option<PartialTextConfig>,
}

/// Merges `overrides` into `base`: top-level keys replace, `color` and `text` merge per key.
pub fn resolve(base: &ChartConfig, overrides: Option<&PartialChartConfig>) -> ChartResult<ChartConfig> {
    let mut config = base.clone();
    let Some(parsed) = overrides else {
        return Ok(config);
    };

    if let Some(v) = parsed.avatar {
        config.avatar = v;
    }
    if let Some(v) = parsed.name {
        config.name = v;
    }
    if let Some(v) = parsed.alias {
        config.alias = v;
    }
    if let Some(v) = parsed.meta {
        config.meta = v;
    }
    if let Some(v) = &parsed.ogurl {
        config.ogurl = v.clone();
    }

    if let Some(color) = &parsed.color {
        if let Some(v) = &color.border {
            config.color.border = v.clone();
        }
        if let Some(v) = &color.background {
            config.color.background = v.clone();
        }
        if let Some(v) = &color.primarytext {
            config.color.primarytext = v.clone();
        }
        if let Some(v) = &color.secondarytext {
            config.color.secondarytext = v.clone();
        }
    }

    if let Some(text) = &parsed.text {
        if let Some(v) = &text.team {
            config.text.team = v.to_style("team")?;
        }
        if let Some(v) = &text.name {
            config.text.name = v.to_style("name")?;
        }
        if let Some(v) = &text.alias {
            config.text.alias = v.to_style("alias")?;
        }
        if let Some(v) = &text.meta {
            config.text.meta = v.to_style("meta")?;
        }
    }

    Ok(config)
}

pub fn parse_partial_config(contents: &str, yaml: bool) -> ChartResult<PartialChartConfig> {
    if yaml {
        serde_yaml::from_str(contents).map_err(|err| ChartError::Config(err.to_string()))
    } else {
        json5::from_str(contents).map_err(|err| ChartError::Config(err.to_string()))
    }
}

/// Loads a config file (same schema as the document's `config` key).
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<PartialChartConfig>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let contents = std::fs::read_to_string(path)?;
    let yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| matches!(ext, "yaml" | "yml"))
        .unwrap_or(false);
    let parsed = parse_partial_config(&contents, yaml)?;
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_without_override_is_identity() {
        let base = ChartConfig::default();
        assert_eq!(resolve(&base, None).unwrap(), base);
        assert_eq!(
            resolve(&base, Some(&PartialChartConfig::default())).unwrap(),
            base
        );
    }

    #[test]
    fn color_override_touches_only_its_key() {
        let base = ChartConfig::default();
        let overrides = PartialChartConfig {
            color: Some(PartialColorConfig {
                border: Some("000000".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = resolve(&base, Some(&overrides)).unwrap();
        assert_eq!(merged.color.border, "000000");

        let mut expected = base.clone();
        expected.color.border = "000000".to_string();
        assert_eq!(merged, expected);
    }

    #[test]
    fn text_role_replaces_whole_triple() {
        let overrides =
            parse_partial_config(r#"{ text: { label: { family: "Inter", style: "Medium", size: "22" } } }"#, false)
                .unwrap();
        let merged = resolve(&ChartConfig::default(), Some(&overrides)).unwrap();
        assert_eq!(merged.text.team, TextStyle::new("Inter", "Medium", 22.0));
        assert_eq!(merged.text.name, TextConfig::default().name);
    }

    #[test]
    fn toggles_and_url_replace_top_level() {
        let overrides = parse_partial_config("avatar: false\nmeta: false\nogurl: https://example.com/\n", true)
            .unwrap();
        let merged = resolve(&ChartConfig::default(), Some(&overrides)).unwrap();
        assert!(!merged.avatar);
        assert!(!merged.meta);
        assert!(merged.name);
        assert_eq!(merged.ogurl, "https://example.com/");
    }

    #[test]
    fn digit_only_colors_stay_hex() {
        let yaml = parse_partial_config("color:\n  border: 333333\n  background: '#fafafa'\n", true).unwrap();
        let json = parse_partial_config(r#"{"color": {"border": 333333}}"#, false).unwrap();
        for overrides in [yaml, json] {
            let merged = resolve(&ChartConfig::default(), Some(&overrides)).unwrap();
            assert_eq!(merged.color.border, "333333");
            assert_eq!(merged.color.primarytext, ColorConfig::default().primarytext);
        }
    }

    #[test]
    fn unusable_color_value_is_not_a_config_error() {
        let overrides = parse_partial_config("color:\n  border: [1, 2]\n  background: true\n", true).unwrap();
        let merged = resolve(&ChartConfig::default(), Some(&overrides)).unwrap();
        assert_ne!(merged.color.border, ColorConfig::default().border);
        assert_ne!(merged.color.background, ColorConfig::default().background);
    }

    #[test]
    fn rejects_non_numeric_size() {
        let overrides = parse_partial_config(
            r#"{"text": {"name": {"family": "Inter", "style": "Bold", "size": "big"}}}"#,
            false,
        )
        .unwrap();
        assert!(matches!(
            resolve(&ChartConfig::default(), Some(&overrides)),
            Err(ChartError::Config(_))
        ));
    }

    #[test]
    fn incomplete_text_triple_is_a_config_error() {
        let parsed = parse_partial_config(r#"{"text": {"name": {"size": 20}}}"#, false);
        assert!(matches!(parsed, Err(ChartError::Config(_))));
    }
}
