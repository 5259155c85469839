//! Typed field values and the records that hold them.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::schema::FieldDef;

/// A coerced field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    DateTime(NaiveDateTime),
    Boolean(bool),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            FieldValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Decimal(d) => write!(f, "{}", d),
            FieldValue::DateTime(dt) => write!(f, "{}", dt),
            FieldValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// One parsed record line: values keyed by definition index.
///
/// Keying by position preserves the schema's column order and tolerates two
/// definitions sharing a name; the by-name accessors resolve to the first
/// matching definition. Inserting twice at the same index overwrites.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    values: Vec<Option<FieldValue>>,
}

impl Record {
    pub fn with_width(width: usize) -> Self {
        Record {
            values: vec![None; width],
        }
    }

    pub fn insert(&mut self, index: usize, value: FieldValue) {
        if index < self.values.len() {
            self.values[index] = Some(value);
        }
    }

    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index).and_then(|v| v.as_ref())
    }

    pub fn get_named(&self, defs: &[FieldDef], name: &str) -> Option<&FieldValue> {
        let index = defs.iter().position(|d| d.name == name)?;
        self.get(index)
    }

    /// Populated fields in column order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &FieldValue)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|value| (i, value)))
    }

    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| v.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::schema::FieldType;

    #[test]
    fn test_insert_and_get() {
        let mut record = Record::with_width(2);
        record.insert(0, FieldValue::Text("a".into()));
        record.insert(1, FieldValue::Integer(7));
        assert_eq!(record.get(0).unwrap().as_text(), Some("a"));
        assert_eq!(record.get(1).unwrap().as_integer(), Some(7));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_overwrite_wins_last() {
        let mut record = Record::with_width(1);
        record.insert(0, FieldValue::Integer(1));
        record.insert(0, FieldValue::Integer(2));
        assert_eq!(record.get(0).unwrap().as_integer(), Some(2));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_named_lookup_uses_first_definition() {
        let defs = vec![
            FieldDef::new("dup", FieldType::Text),
            FieldDef::new("dup", FieldType::Text),
        ];
        let mut record = Record::with_width(2);
        record.insert(0, FieldValue::Text("first".into()));
        record.insert(1, FieldValue::Text("second".into()));
        assert_eq!(
            record.get_named(&defs, "dup").unwrap().as_text(),
            Some("first")
        );
        assert!(record.get_named(&defs, "missing").is_none());
    }

    #[test]
    fn test_iter_keeps_column_order() {
        let mut record = Record::with_width(3);
        record.insert(2, FieldValue::Boolean(true));
        record.insert(0, FieldValue::Integer(1));
        let cols: Vec<usize> = record.iter().map(|(i, _)| i).collect();
        assert_eq!(cols, vec![0, 2]);
    }
}
