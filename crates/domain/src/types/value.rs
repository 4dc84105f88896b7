//! Metric value snapshots
//!
//! These are the read-only values a metrics library exposes at flush time.
//! Each [`MetricValue`] variant carries exactly the data its packing logic
//! needs, so reporters dispatch with a `match` instead of inspecting types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::tags::MetricTags;

/// Kind discriminator written into every document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
    Meter,
    Timer,
    Histogram,
    Apdex,
}

impl_label_conversions!(MetricKind {
    Gauge => "gauge",
    Counter => "counter",
    Meter => "meter",
    Timer => "timer",
    Histogram => "histogram",
    Apdex => "apdex",
});

/// One tagged sub-count of a counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterSetItem {
    pub tags: MetricTags,
    pub count: i64,
    pub percent: f64,
}

/// Counter snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterValue {
    pub count: i64,
    #[serde(default)]
    pub items: Vec<CounterSetItem>,
    /// Emit one extra document per set item
    #[serde(default = "default_true")]
    pub report_set_items: bool,
    /// Include `percent` in set-item documents
    #[serde(default = "default_true")]
    pub report_item_percentages: bool,
}

impl Default for CounterValue {
    fn default() -> Self {
        Self { count: 0, items: Vec::new(), report_set_items: true, report_item_percentages: true }
    }
}

const fn default_true() -> bool {
    true
}

/// Rates of a meter or of a timer's throughput
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterValue {
    pub count: i64,
    pub mean_rate: f64,
    pub one_minute_rate: f64,
    pub five_minute_rate: f64,
    pub fifteen_minute_rate: f64,
    #[serde(default)]
    pub items: Vec<MeterSetItem>,
}

/// One tagged sub-meter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterSetItem {
    pub tags: MetricTags,
    pub percent: f64,
    pub value: MeterValue,
}

/// Distribution summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramValue {
    pub count: i64,
    pub sum: f64,
    pub last_value: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub percentile_75: f64,
    pub percentile_95: f64,
    pub percentile_98: f64,
    pub percentile_99: f64,
    pub percentile_999: f64,
    pub sample_size: i64,
    #[serde(default)]
    pub last_user_value: Option<String>,
    #[serde(default)]
    pub min_user_value: Option<String>,
    #[serde(default)]
    pub max_user_value: Option<String>,
}

/// Timer snapshot: a rate plus a duration histogram
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerValue {
    pub rate: MeterValue,
    pub histogram: HistogramValue,
}

/// Application performance index snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApdexValue {
    pub score: f64,
    pub satisfied: i64,
    pub tolerating: i64,
    pub frustrating: i64,
    pub sample_size: i64,
}

/// Snapshot of one metric's current value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum MetricValue {
    Gauge(f64),
    Counter(CounterValue),
    Meter(MeterValue),
    Timer(TimerValue),
    Histogram(HistogramValue),
    Apdex(ApdexValue),
}

impl MetricValue {
    pub const fn kind(&self) -> MetricKind {
        match self {
            Self::Gauge(_) => MetricKind::Gauge,
            Self::Counter(_) => MetricKind::Counter,
            Self::Meter(_) => MetricKind::Meter,
            Self::Timer(_) => MetricKind::Timer,
            Self::Histogram(_) => MetricKind::Histogram,
            Self::Apdex(_) => MetricKind::Apdex,
        }
    }
}

/// A named, tagged metric as exposed by the metrics library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValueSource {
    pub name: String,
    /// Multidimensional metrics share a group name and differ by tags
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub tags: MetricTags,
    pub value: MetricValue,
}

impl MetricValueSource {
    pub fn new(name: impl Into<String>, value: MetricValue) -> Self {
        Self { name: name.into(), group: None, tags: MetricTags::new(), value }
    }

    #[must_use]
    pub fn with_tags(mut self, tags: MetricTags) -> Self {
        self.tags = tags;
        self
    }

    #[must_use]
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Group name if present and non-blank
    pub fn group_name(&self) -> Option<&str> {
        self.group.as_deref().filter(|group| !group.trim().is_empty())
    }
}

/// Metrics registered under one context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsContext {
    pub context: String,
    pub sources: Vec<MetricValueSource>,
}

/// Point-in-time view of every registered metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub contexts: Vec<MetricsContext>,
}

impl MetricsSnapshot {
    pub fn new(contexts: Vec<MetricsContext>) -> Self {
        Self { timestamp: Utc::now(), contexts }
    }

    /// Total number of value sources across contexts
    pub fn source_count(&self) -> usize {
        self.contexts.iter().map(|context| context.sources.len()).sum()
    }
}
