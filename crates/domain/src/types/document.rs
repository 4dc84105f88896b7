//! Reportable metric documents
//!
//! A [`MetricDocument`] is one data point handed to a payload builder: a
//! formatted name, a kind discriminator, an ordered set of fields and the
//! tags it was recorded with.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::errors::{MetricSinkError, Result};
use crate::types::tags::MetricTags;

/// A single field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl FieldValue {
    /// `false` for NaN or infinite floats
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(value) => value.is_finite(),
            _ => true,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::UInt(u64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Ordered field mapping
///
/// Insertion order is preserved on the wire. Non-finite floats are dropped on
/// insert so they can never reach a serializer. Inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Fields {
    entries: IndexMap<String, FieldValue>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field; returns `false` when the value was dropped as non-finite
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> bool {
        let value = value.into();
        if !value.is_finite() {
            return false;
        }

        self.entries.insert(key.into(), value);
        true
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

/// One reportable data point
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDocument {
    pub name: String,
    pub kind: String,
    pub fields: Fields,
    pub tags: MetricTags,
    pub timestamp: DateTime<Utc>,
}

impl MetricDocument {
    /// Create a document stamped with the current time
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        fields: Fields,
        tags: MetricTags,
    ) -> Self {
        Self { name: name.into(), kind: kind.into(), fields, tags, timestamp: Utc::now() }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Reject documents with a blank name or kind
    pub fn validate(&self) -> Result<()> {
        if self.kind.trim().is_empty() {
            return Err(MetricSinkError::Validation(format!(
                "measurement type is required for metric '{}'",
                self.name
            )));
        }

        if self.name.trim().is_empty() {
            return Err(MetricSinkError::Validation(format!(
                "measurement name is required for '{}' metric",
                self.kind
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_preserve_insertion_order() {
        let fields: Fields = [("p99", 9.0), ("mean", 4.5), ("count", 2.0)].into_iter().collect();
        let keys: Vec<_> = fields.keys().collect();
        assert_eq!(keys, vec!["p99", "mean", "count"]);
    }

    /// Validates that NaN and infinities never enter a field set.
    #[test]
    fn test_fields_drop_non_finite_floats() {
        let mut fields = Fields::new();

        assert!(!fields.insert("nan", f64::NAN));
        assert!(!fields.insert("inf", f64::INFINITY));
        assert!(!fields.insert("neg_inf", f64::NEG_INFINITY));
        assert!(fields.insert("ok", 1.5));

        assert_eq!(fields.len(), 1);
        assert_eq!(serde_json::to_string(&fields).unwrap(), r#"{"ok":1.5}"#);
    }

    #[test]
    fn test_fields_replace_existing_key_in_place() {
        let mut fields = Fields::new();
        fields.insert("a", 1_i64);
        fields.insert("b", 2_i64);
        fields.insert("a", 3_i64);

        assert_eq!(fields.get("a"), Some(&FieldValue::Int(3)));
        assert_eq!(serde_json::to_string(&fields).unwrap(), r#"{"a":3,"b":2}"#);
    }

    #[test]
    fn test_field_values_serialize_untagged() {
        let fields: Fields = vec![
            ("i", FieldValue::Int(-1)),
            ("u", FieldValue::UInt(7)),
            ("s", FieldValue::from("x")),
            ("b", FieldValue::Bool(true)),
        ]
        .into_iter()
        .collect();

        assert_eq!(serde_json::to_string(&fields).unwrap(), r#"{"i":-1,"u":7,"s":"x","b":true}"#);
    }

    #[test]
    fn test_validate_rejects_blank_kind_and_name() {
        let blank_kind = MetricDocument::new(" ", "hits", Fields::new(), MetricTags::new());
        assert!(matches!(blank_kind.validate(), Err(MetricSinkError::Validation(_))));

        let blank_name = MetricDocument::new("counter", "", Fields::new(), MetricTags::new());
        assert!(matches!(blank_name.validate(), Err(MetricSinkError::Validation(_))));

        let ok = MetricDocument::new("counter", "hits", Fields::new(), MetricTags::new());
        assert!(ok.validate().is_ok());
    }
}
