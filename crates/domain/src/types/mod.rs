//! Domain types and models

pub mod document;
pub mod health;
pub mod tags;
pub mod value;

pub use document::{FieldValue, Fields, MetricDocument};
pub use health::{HealthCheckResult, HealthReport, HealthStatus};
pub use tags::MetricTags;
pub use value::{
    ApdexValue, CounterSetItem, CounterValue, HistogramValue, MeterSetItem, MeterValue,
    MetricKind, MetricValue, MetricValueSource, MetricsContext, MetricsSnapshot, TimerValue,
};
