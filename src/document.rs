use crate::config::PartialChartConfig;
use crate::error::{ChartError, ChartResult};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    Json,
    Yaml,
    #[default]
    Auto,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") | Some("json5") => Self::Json,
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Auto,
        }
    }

    fn detect(self, input: &str) -> Self {
        match self {
            Self::Auto => {
                let first = input.trim_start().chars().next();
                if matches!(first, Some('{') | Some('[')) {
                    Self::Json
                } else {
                    Self::Yaml
                }
            }
            other => other,
        }
    }
}

/// A node of the chart document. Mappings keep the document's key order.
#[derive(Debug, Clone, PartialEq)]
pub enum DocValue {
    Null,
    Scalar(String),
    Sequence(Vec<DocValue>),
    Mapping(Vec<(String, DocValue)>),
}

impl DocValue {
    pub fn is_structured(&self) -> bool {
        matches!(self, DocValue::Sequence(_) | DocValue::Mapping(_))
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            DocValue::Scalar(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[DocValue]> {
        match self {
            DocValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(String, DocValue)]> {
        match self {
            DocValue::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&DocValue> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Scalar field lookup that treats empty strings as absent.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(DocValue::as_scalar)
            .filter(|value| !value.is_empty())
    }
}

impl From<serde_yaml::Value> for DocValue {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value;
        match value {
            Value::Null => DocValue::Null,
            Value::Bool(v) => DocValue::Scalar(v.to_string()),
            Value::Number(n) => DocValue::Scalar(number_to_string(&n)),
            Value::String(s) => DocValue::Scalar(s),
            Value::Sequence(items) => DocValue::Sequence(items.into_iter().map(DocValue::from).collect()),
            Value::Mapping(map) => DocValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (key_to_string(k), DocValue::from(v)))
                    .collect(),
            ),
            Value::Tagged(tagged) => DocValue::from(tagged.value),
        }
    }
}

fn number_to_string(n: &serde_yaml::Number) -> String {
    if let Some(v) = n.as_i64() {
        return v.to_string();
    }
    if let Some(v) = n.as_u64() {
        return v.to_string();
    }
    match n.as_f64() {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Some(v) => v.to_string(),
        None => n.to_string(),
    }
}

fn key_to_string(key: serde_yaml::Value) -> String {
    match DocValue::from(key) {
        DocValue::Scalar(s) => s,
        DocValue::Null => String::new(),
        other => format!("{other:?}"),
    }
}

/// The structural role of a document key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKey<'a> {
    Config,
    Team,
    Teams,
    Manager,
    Members,
    Unrecognized(&'a str),
}

impl<'a> ChartKey<'a> {
    pub fn classify(key: &'a str) -> Self {
        match key {
            "config" => Self::Config,
            "team" => Self::Team,
            "teams" => Self::Teams,
            "manager" => Self::Manager,
            "members" => Self::Members,
            other => Self::Unrecognized(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChartDocument {
    pub root: DocValue,
    pub config: Option<PartialChartConfig>,
}

pub fn parse_document(input: &str, format: DocumentFormat) -> ChartResult<ChartDocument> {
    let format = format.detect(input);
    let raw: serde_yaml::Value = match format {
        DocumentFormat::Json => {
            json5::from_str(input).map_err(|err| ChartError::Parse(err.to_string()))?
        }
        _ => serde_yaml::from_str(input).map_err(|err| ChartError::Parse(err.to_string()))?,
    };

    let config = match raw.get("config") {
        Some(serde_yaml::Value::Null) | None => None,
        Some(value) => Some(
            serde_yaml::from_value::<PartialChartConfig>(value.clone())
                .map_err(|err| ChartError::Config(err.to_string()))?,
        ),
    };

    let root = DocValue::from(raw);
    if !matches!(root, DocValue::Mapping(_) | DocValue::Sequence(_)) {
        return Err(ChartError::Parse(
            "chart document must be a mapping or a sequence".to_string(),
        ));
    }

    tracing::debug!(?format, has_config = config.is_some(), "parsed chart document");
    Ok(ChartDocument { root, config })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(value: &DocValue) -> Vec<&str> {
        value
            .as_mapping()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect()
    }

    #[test]
    fn json_keeps_key_order() {
        let doc = parse_document(
            r#"{"team": "X", "manager": {"name": "M"}, "members": [], "aaa": 1}"#,
            DocumentFormat::Auto,
        )
        .unwrap();
        assert_eq!(keys(&doc.root), vec!["team", "manager", "members", "aaa"]);
        assert_eq!(doc.root.get("aaa"), Some(&DocValue::Scalar("1".to_string())));
    }

    #[test]
    fn yaml_keeps_key_order() {
        let doc = parse_document(
            "team: Core\nmembers:\n  - name: A\n    alias: '@a'\n  - section: Leads\n",
            DocumentFormat::Yaml,
        )
        .unwrap();
        assert_eq!(keys(&doc.root), vec!["team", "members"]);
        let members = doc.root.get("members").unwrap().as_sequence().unwrap();
        assert_eq!(members[0].field("alias"), Some("@a"));
        assert_eq!(members[1].field("section"), Some("Leads"));
    }

    #[test]
    fn json5_accepts_comments_and_trailing_commas() {
        let doc = parse_document(
            "{\n  // the whole org\n  team: 'Org',\n  members: [{name: 'A',},],\n}",
            DocumentFormat::Json,
        )
        .unwrap();
        assert_eq!(doc.root.field("team"), Some("Org"));
    }

    #[test]
    fn extracts_config_section() {
        let doc = parse_document(
            r#"{"config": {"avatar": false, "color": {"border": "000000"}}, "team": "X"}"#,
            DocumentFormat::Auto,
        )
        .unwrap();
        let config = doc.config.unwrap();
        assert_eq!(config.avatar, Some(false));
        assert_eq!(config.color.unwrap().border.as_deref(), Some("000000"));
    }

    #[test]
    fn digit_only_border_resolves_to_its_hex_color() {
        use crate::config::{ChartConfig, resolve};
        use crate::theme::{Palette, Rgb};

        let inputs = [
            ("config:\n  color:\n    border: 333333\nteam: X\n", DocumentFormat::Yaml),
            (r#"{"config": {"color": {"border": 333333}}, "team": "X"}"#, DocumentFormat::Json),
        ];
        for (input, format) in inputs {
            let doc = parse_document(input, format).unwrap();
            let config = resolve(&ChartConfig::default(), doc.config.as_ref()).unwrap();
            let palette = Palette::from_colors(&config.color);
            assert_eq!(palette.border, Rgb::new(0x33, 0x33, 0x33));
        }
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        assert!(matches!(
            parse_document("{\"team\": ", DocumentFormat::Auto),
            Err(ChartError::Parse(_))
        ));
        assert!(matches!(
            parse_document("just a string", DocumentFormat::Auto),
            Err(ChartError::Parse(_))
        ));
    }

    #[test]
    fn classifies_keys() {
        assert_eq!(ChartKey::classify("teams"), ChartKey::Teams);
        assert_eq!(ChartKey::classify("config"), ChartKey::Config);
        assert_eq!(ChartKey::classify("Team"), ChartKey::Unrecognized("Team"));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("org.yml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("org.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("org.txt")), DocumentFormat::Auto);
    }
}
