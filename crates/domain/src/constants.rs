//! Domain constants
//!
//! Tag keys and name suffixes shared by every reporter.

/// Tag whose value overrides the document kind
pub const MEASUREMENT_TYPE_TAG: &str = "mtype";

/// Tag carrying the formatted source name of a grouped metric
pub const GROUP_ITEM_TAG: &str = "group_item";

/// Suffix appended to the metric name of set-item documents
pub const SET_ITEM_SUFFIX: &str = "  items";

/// Field key used by single-value documents
pub const VALUE_FIELD: &str = "value";

/// Characters replaced by `_` in default metric names and tag values
pub const SPECIAL_CHARS: &[char] =
    &['\\', '/', ' ', '-', '+', '=', '{', '}', '[', ']', ':', '&', '^', '~', '?', '!', ','];
