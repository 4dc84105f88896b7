//! Metric tags

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered tag key/value pairs
///
/// Keys are unique; setting an existing key replaces its value in place.
/// Serializes as a JSON object in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricTags {
    pairs: IndexMap<String, String>,
}

impl MetricTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tag set holding a single pair
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut tags = Self::new();
        tags.set(key, value);
        tags
    }

    /// Builder-style [`MetricTags::set`]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Merge two tag sets; keys in `other` win
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (key, value) in other.iter() {
            merged.set(key, value);
        }
        merged
    }

    /// Apply key and value formatters, e.g. before handing tags to a builder
    #[must_use]
    pub fn formatted<K, V>(&self, key_formatter: K, value_formatter: V) -> Self
    where
        K: Fn(&str) -> String,
        V: Fn(&str) -> String,
    {
        let mut formatted = Self::new();
        for (key, value) in self.iter() {
            formatted.set(key_formatter(key), value_formatter(value));
        }
        formatted
    }
}

impl<K, V> FromIterator<(K, V)> for MetricTags
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = Self::new();
        for (key, value) in iter {
            tags.set(key, value);
        }
        tags
    }
}
