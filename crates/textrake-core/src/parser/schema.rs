//! Field definitions: the caller-supplied schema a record line is parsed
//! against. Definitions are plain serde values so schemas can live in JSON
//! files; the parser reads them and never writes them back.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TextrakeError};

/// The closed set of declared field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Integer,
    Decimal,
    DateTime,
    Boolean,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "Text",
            FieldType::Integer => "Integer",
            FieldType::Decimal => "Decimal",
            FieldType::DateTime => "DateTime",
            FieldType::Boolean => "Boolean",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Locale/format hint for number and date-time coercion. The invariant
/// hint is what a definition without one resolves to at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFormat {
    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: char,
    #[serde(default)]
    pub group_separator: Option<char>,
    /// chrono format strings tried in order; date-only formats resolve to
    /// midnight, and a missing date is never defaulted from "today".
    #[serde(default = "invariant_datetime_formats")]
    pub datetime_formats: Vec<String>,
}

fn default_decimal_separator() -> char {
    '.'
}

fn invariant_datetime_formats() -> Vec<String> {
    [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl FieldFormat {
    /// The locale-invariant hint: `.` decimal point, no grouping, ISO-style
    /// date-times first.
    pub fn invariant() -> Self {
        FieldFormat {
            decimal_separator: '.',
            group_separator: None,
            datetime_formats: invariant_datetime_formats(),
        }
    }
}

impl Default for FieldFormat {
    fn default() -> Self {
        FieldFormat::invariant()
    }
}

/// One column of the schema.
///
/// `min_length`, `max_length` and the regular-expression `pattern` are
/// validation constraints; a record never carries a value that violated
/// them. Lengths count characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FieldFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl FieldDef {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        FieldDef {
            name: name.to_string(),
            field_type,
            format: None,
            pattern: None,
            min_length: None,
            max_length: None,
        }
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn with_min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn with_format(mut self, format: FieldFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Load a schema (an ordered list of field definitions) from JSON.
///
/// The schema must define at least one field, and no field may declare a
/// minimum length above its maximum.
pub fn schema_from_json(json: &str) -> Result<Vec<FieldDef>> {
    let defs: Vec<FieldDef> = serde_json::from_str(json)?;
    if defs.is_empty() {
        return Err(TextrakeError::Schema("schema defines no fields".into()));
    }
    for def in &defs {
        if let (Some(min), Some(max)) = (def.min_length, def.max_length) {
            if min > max {
                return Err(TextrakeError::Schema(format!(
                    "field '{}': min_length {} exceeds max_length {}",
                    def.name, min, max
                )));
            }
        }
    }
    Ok(defs)
}

/// Render a schema back to pretty JSON.
pub fn schema_to_json(defs: &[FieldDef]) -> Result<String> {
    Ok(serde_json::to_string_pretty(defs)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_json_round_trip() {
        let defs = vec![
            FieldDef::new("id", FieldType::Integer).with_pattern(r"^\d+$"),
            FieldDef::new("name", FieldType::Text)
                .with_min_length(1)
                .with_max_length(32),
        ];
        let json = schema_to_json(&defs).unwrap();
        let back = schema_from_json(&json).unwrap();
        assert_eq!(back, defs);
    }

    #[test]
    fn test_schema_from_minimal_json() {
        let json = r#"[
            {"name": "amount", "type": "Decimal"},
            {"name": "when", "type": "DateTime"}
        ]"#;
        let defs = schema_from_json(json).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].field_type, FieldType::Decimal);
        assert!(defs[0].format.is_none());
        assert!(defs[1].max_length.is_none());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(schema_from_json("not json").is_err());
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert!(matches!(
            schema_from_json("[]"),
            Err(crate::error::TextrakeError::Schema(_))
        ));
    }

    #[test]
    fn test_contradictory_lengths_rejected() {
        let json = r#"[
            {"name": "f", "type": "Text", "min_length": 5, "max_length": 2}
        ]"#;
        assert!(matches!(
            schema_from_json(json),
            Err(crate::error::TextrakeError::Schema(_))
        ));
    }

    #[test]
    fn test_invariant_format() {
        let fmt = FieldFormat::invariant();
        assert_eq!(fmt.decimal_separator, '.');
        assert!(fmt.group_separator.is_none());
        assert!(fmt.datetime_formats.iter().any(|f| f == "%Y-%m-%d"));
    }
}
