//! Field keys used when packing multi-field metric values

use serde::{Deserialize, Serialize};

/// Histogram field keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramKeys {
    pub samples: String,
    pub last: String,
    pub count: String,
    pub sum: String,
    pub min: String,
    pub max: String,
    pub mean: String,
    pub median: String,
    pub std_dev: String,
    pub p999: String,
    pub p99: String,
    pub p98: String,
    pub p95: String,
    pub p75: String,
    pub user_last: String,
    pub user_min: String,
    pub user_max: String,
}

impl Default for HistogramKeys {
    fn default() -> Self {
        Self {
            samples: "samples".into(),
            last: "last".into(),
            count: "count.hist".into(),
            sum: "sum".into(),
            min: "min".into(),
            max: "max".into(),
            mean: "mean".into(),
            median: "median".into(),
            std_dev: "stddev".into(),
            p999: "p999".into(),
            p99: "p99".into(),
            p98: "p98".into(),
            p95: "p95".into(),
            p75: "p75".into(),
            user_last: "user.last".into(),
            user_min: "user.min".into(),
            user_max: "user.max".into(),
        }
    }
}

/// Meter field keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterKeys {
    pub count: String,
    pub rate_1m: String,
    pub rate_5m: String,
    pub rate_15m: String,
    pub rate_mean: String,
}

impl Default for MeterKeys {
    fn default() -> Self {
        Self {
            count: "count.meter".into(),
            rate_1m: "rate1m".into(),
            rate_5m: "rate5m".into(),
            rate_15m: "rate15m".into(),
            rate_mean: "rate.mean".into(),
        }
    }
}

/// Apdex field keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApdexKeys {
    pub samples: String,
    pub score: String,
    pub satisfied: String,
    pub tolerating: String,
    pub frustrating: String,
}

impl Default for ApdexKeys {
    fn default() -> Self {
        Self {
            samples: "samples".into(),
            score: "score".into(),
            satisfied: "satisfied".into(),
            tolerating: "tolerating".into(),
            frustrating: "frustrating".into(),
        }
    }
}

/// Keys for counter set items and set-item percentages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetItemKeys {
    pub total: String,
    pub percent: String,
}

impl Default for SetItemKeys {
    fn default() -> Self {
        Self { total: "total".into(), percent: "percent".into() }
    }
}

/// Complete key set for one reporter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataKeys {
    pub histogram: HistogramKeys,
    pub meter: MeterKeys,
    pub apdex: ApdexKeys,
    pub set_item: SetItemKeys,
}

impl DataKeys {
    /// Camel-case keys in place of the dotted defaults, which Elasticsearch
    /// maps as nested objects
    pub fn elasticsearch() -> Self {
        let mut keys = Self::default();
        keys.histogram.count = "countHist".into();
        keys.histogram.user_last = "userLast".into();
        keys.histogram.user_min = "userMin".into();
        keys.histogram.user_max = "userMax".into();
        keys.meter.count = "countMeter".into();
        keys.meter.rate_mean = "rateMean".into();
        keys
    }
}
