//! Metric name and tag formatters
//!
//! Formatters are injected into reporters as shared closures so callers can
//! swap the naming convention per sink.

use std::sync::Arc;

use crate::constants::SPECIAL_CHARS;

/// `(context, name) -> measurement name`
pub type NameFormatter = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Formats a single tag key or value
pub type TagFormatter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Replace reserved characters with `_` and lowercase
pub fn sanitize(value: &str) -> String {
    value.replace(SPECIAL_CHARS, "_").to_lowercase()
}

/// `context__name`, sanitized; the bare name when context is blank
pub fn default_metric_name(context: &str, name: &str) -> String {
    if context.trim().is_empty() {
        sanitize(name)
    } else {
        sanitize(&format!("{context}__{name}"))
    }
}

/// Sanitized, lowercased tag value
pub fn default_tag_value(value: &str) -> String {
    sanitize(value)
}

/// Lowercased tag key
pub fn default_tag_key(key: &str) -> String {
    key.to_lowercase()
}

pub fn default_name_formatter() -> NameFormatter {
    Arc::new(default_metric_name)
}

pub fn default_tag_value_formatter() -> TagFormatter {
    Arc::new(default_tag_value)
}

pub fn default_tag_key_formatter() -> TagFormatter {
    Arc::new(default_tag_key)
}
