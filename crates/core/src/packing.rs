//! Translates metric value sources into payload documents
//!
//! Dispatch is a `match` over [`MetricValue`]:
//!
//! | Variant   | Documents                                             |
//! |-----------|-------------------------------------------------------|
//! | Gauge     | one `value` document, skipped when NaN/∞              |
//! | Counter   | one `value` document, plus one per distinct set item  |
//! | Meter     | one meter document, plus one per set item             |
//! | Timer     | one document with meter and histogram fields          |
//! | Histogram | one histogram document                                |
//! | Apdex     | one apdex document                                    |
//!
//! Grouped sources are named after their group and carry the formatted
//! source name in a `group_item` tag.

use std::fmt;

use metricsink_domain::constants::{GROUP_ITEM_TAG, MEASUREMENT_TYPE_TAG, SET_ITEM_SUFFIX};
use metricsink_domain::formatting::{
    default_name_formatter, default_tag_key_formatter, default_tag_value_formatter,
    NameFormatter, TagFormatter,
};
use metricsink_domain::{
    ApdexValue, CounterValue, FieldValue, Fields, HistogramValue, MeterValue, MetricKind,
    MetricTags, MetricValue, MetricValueSource, MetricsSnapshot,
};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::data_keys::DataKeys;
use crate::payload::{PayloadBuilder, PayloadError};

/// Counts from one [`MetricPacker::pack_snapshot`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackSummary {
    /// Documents added to the batch
    pub documents: usize,
    /// Sources dropped because their documents were invalid
    pub skipped: usize,
}

/// Selects which sources a reporter packs
///
/// Empty lists match everything. Context and prefix matching ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricFilter {
    pub contexts: Vec<String>,
    pub kinds: Vec<MetricKind>,
    pub name_prefix: Option<String>,
}

impl MetricFilter {
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
            && self.kinds.is_empty()
            && self.name_prefix.as_deref().map_or(true, |prefix| prefix.is_empty())
    }

    pub fn matches_context(&self, context: &str) -> bool {
        self.contexts.is_empty()
            || self.contexts.iter().any(|allowed| allowed.eq_ignore_ascii_case(context))
    }

    pub fn matches(&self, source: &MetricValueSource) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&source.value.kind()) {
            return false;
        }
        match self.name_prefix.as_deref().filter(|prefix| !prefix.is_empty()) {
            Some(prefix) => source.name.to_lowercase().starts_with(&prefix.to_lowercase()),
            None => true,
        }
    }
}

/// Name, tags and kind shared by every document of one source
struct SourceTarget<'a> {
    context: &'a str,
    /// Group name, or the source name when ungrouped
    base_name: &'a str,
    group_tag: Option<(String, String)>,
    kind: String,
}

/// Formats and packs snapshots into any [`PayloadBuilder`]
#[derive(Clone)]
pub struct MetricPacker {
    name_formatter: NameFormatter,
    tag_key_formatter: TagFormatter,
    tag_value_formatter: TagFormatter,
    data_keys: DataKeys,
    filter: MetricFilter,
}

impl fmt::Debug for MetricPacker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricPacker")
            .field("data_keys", &self.data_keys)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl Default for MetricPacker {
    fn default() -> Self {
        Self {
            name_formatter: default_name_formatter(),
            tag_key_formatter: default_tag_key_formatter(),
            tag_value_formatter: default_tag_value_formatter(),
            data_keys: DataKeys::default(),
            filter: MetricFilter::default(),
        }
    }
}

impl MetricPacker {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name_formatter(mut self, formatter: NameFormatter) -> Self {
        self.name_formatter = formatter;
        self
    }

    #[must_use]
    pub fn with_tag_formatters(mut self, key: TagFormatter, value: TagFormatter) -> Self {
        self.tag_key_formatter = key;
        self.tag_value_formatter = value;
        self
    }

    #[must_use]
    pub fn with_data_keys(mut self, data_keys: DataKeys) -> Self {
        self.data_keys = data_keys;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: MetricFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn data_keys(&self) -> &DataKeys {
        &self.data_keys
    }

    /// Pack every matching source
    ///
    /// A source whose documents fail validation is rolled back and skipped;
    /// the rest of the snapshot is still packed. Only an uninitialized
    /// builder aborts.
    pub fn pack_snapshot<B>(
        &self,
        builder: &mut B,
        snapshot: &MetricsSnapshot,
    ) -> Result<PackSummary, PayloadError>
    where
        B: PayloadBuilder + ?Sized,
    {
        let before = builder.document_count();
        let mut skipped = 0;
        for context in &snapshot.contexts {
            if !self.filter.matches_context(&context.context) {
                trace!(context = %context.context, "context filtered out");
                continue;
            }
            for source in context.sources.iter().filter(|source| self.filter.matches(source)) {
                let mark = builder.document_count();
                match self.pack_source(builder, &context.context, source) {
                    Ok(()) => {}
                    Err(PayloadError::NotInitialized) => return Err(PayloadError::NotInitialized),
                    Err(err) => {
                        builder.batch_mut().truncate(mark);
                        skipped += 1;
                        warn!(
                            context = %context.context,
                            source = %source.name,
                            error = %err,
                            "skipping metric source"
                        );
                    }
                }
            }
        }
        Ok(PackSummary { documents: builder.document_count().saturating_sub(before), skipped })
    }

    /// Pack a single source registered under `context`
    pub fn pack_source<B>(
        &self,
        builder: &mut B,
        context: &str,
        source: &MetricValueSource,
    ) -> Result<(), PayloadError>
    where
        B: PayloadBuilder + ?Sized,
    {
        let kind = source
            .tags
            .get(MEASUREMENT_TYPE_TAG)
            .filter(|mtype| !mtype.trim().is_empty())
            .map_or_else(|| source.value.kind().as_str().to_string(), str::to_string);

        let target = match source.group_name() {
            Some(group) => SourceTarget {
                context,
                base_name: group,
                group_tag: Some((
                    GROUP_ITEM_TAG.to_string(),
                    (self.name_formatter)("", &source.name),
                )),
                kind,
            },
            None => SourceTarget { context, base_name: &source.name, group_tag: None, kind },
        };

        match &source.value {
            MetricValue::Gauge(value) => {
                if !value.is_finite() {
                    trace!(name = %source.name, "skipping non-finite gauge");
                    return Ok(());
                }
                let mut fields = Fields::new();
                fields.insert(metricsink_domain::constants::VALUE_FIELD, *value);
                self.emit(builder, &target, false, fields, &source.tags)
            }
            MetricValue::Counter(counter) => self.pack_counter(builder, &target, counter, &source.tags),
            MetricValue::Meter(meter) => {
                self.emit(builder, &target, false, self.meter_fields(meter), &source.tags)?;
                for item in &meter.items {
                    let mut fields = self.meter_fields(&item.value);
                    fields.insert(self.data_keys.set_item.percent.as_str(), item.percent);
                    self.emit(builder, &target, true, fields, &source.tags.concat(&item.tags))?;
                }
                Ok(())
            }
            MetricValue::Timer(timer) => {
                let mut fields = self.meter_fields(&timer.rate);
                self.add_histogram_fields(&mut fields, &timer.histogram);
                self.emit(builder, &target, false, fields, &source.tags)
            }
            MetricValue::Histogram(histogram) => {
                let mut fields = Fields::new();
                self.add_histogram_fields(&mut fields, histogram);
                self.emit(builder, &target, false, fields, &source.tags)
            }
            MetricValue::Apdex(apdex) => {
                self.emit(builder, &target, false, self.apdex_fields(apdex), &source.tags)
            }
        }
    }

    fn pack_counter<B>(
        &self,
        builder: &mut B,
        target: &SourceTarget<'_>,
        counter: &CounterValue,
        tags: &MetricTags,
    ) -> Result<(), PayloadError>
    where
        B: PayloadBuilder + ?Sized,
    {
        let mut fields = Fields::new();
        fields.insert(metricsink_domain::constants::VALUE_FIELD, counter.count);
        self.emit(builder, target, false, fields, tags)?;

        if !counter.report_set_items {
            return Ok(());
        }

        let keys = &self.data_keys.set_item;
        let mut seen = Vec::with_capacity(counter.items.len());
        for item in &counter.items {
            if seen.contains(&item) {
                continue;
            }
            seen.push(item);

            let mut fields = Fields::new();
            fields.insert(keys.total.as_str(), item.count);
            if counter.report_item_percentages {
                fields.insert(keys.percent.as_str(), item.percent);
            }
            self.emit(builder, target, true, fields, &tags.concat(&item.tags))?;
        }
        Ok(())
    }

    fn emit<B>(
        &self,
        builder: &mut B,
        target: &SourceTarget<'_>,
        set_item: bool,
        fields: Fields,
        tags: &MetricTags,
    ) -> Result<(), PayloadError>
    where
        B: PayloadBuilder + ?Sized,
    {
        let name = if set_item {
            (self.name_formatter)(target.context, &format!("{}{SET_ITEM_SUFFIX}", target.base_name))
        } else {
            (self.name_formatter)(target.context, target.base_name)
        };

        let mut merged = MetricTags::new();
        if let Some((key, value)) = &target.group_tag {
            merged.set(key.as_str(), value.as_str());
        }
        let merged = merged.concat(tags);
        let formatted = merged.formatted(
            |key| (self.tag_key_formatter)(key),
            |value| (self.tag_value_formatter)(value),
        );

        builder.pack_fields(&target.kind, &name, fields, &formatted)
    }

    fn meter_fields(&self, meter: &MeterValue) -> Fields {
        let keys = &self.data_keys.meter;
        let mut fields = Fields::new();
        fields.insert(keys.count.as_str(), meter.count);
        fields.insert(keys.rate_1m.as_str(), meter.one_minute_rate);
        fields.insert(keys.rate_5m.as_str(), meter.five_minute_rate);
        fields.insert(keys.rate_15m.as_str(), meter.fifteen_minute_rate);
        fields.insert(keys.rate_mean.as_str(), meter.mean_rate);
        fields
    }

    fn add_histogram_fields(&self, fields: &mut Fields, histogram: &HistogramValue) {
        let keys = &self.data_keys.histogram;
        fields.insert(keys.samples.as_str(), histogram.sample_size);
        fields.insert(keys.last.as_str(), histogram.last_value);
        fields.insert(keys.count.as_str(), histogram.count);
        fields.insert(keys.sum.as_str(), histogram.sum);
        fields.insert(keys.min.as_str(), histogram.min);
        fields.insert(keys.max.as_str(), histogram.max);
        fields.insert(keys.mean.as_str(), histogram.mean);
        fields.insert(keys.median.as_str(), histogram.median);
        fields.insert(keys.std_dev.as_str(), histogram.std_dev);
        fields.insert(keys.p999.as_str(), histogram.percentile_999);
        fields.insert(keys.p99.as_str(), histogram.percentile_99);
        fields.insert(keys.p98.as_str(), histogram.percentile_98);
        fields.insert(keys.p95.as_str(), histogram.percentile_95);
        fields.insert(keys.p75.as_str(), histogram.percentile_75);

        let user_values = [
            (&keys.user_last, &histogram.last_user_value),
            (&keys.user_min, &histogram.min_user_value),
            (&keys.user_max, &histogram.max_user_value),
        ];
        for (key, value) in user_values {
            if let Some(value) = value.as_deref().filter(|value| !value.trim().is_empty()) {
                fields.insert(key.as_str(), FieldValue::Str(value.to_string()));
            }
        }
    }

    fn apdex_fields(&self, apdex: &ApdexValue) -> Fields {
        let keys = &self.data_keys.apdex;
        let mut fields = Fields::new();
        fields.insert(keys.samples.as_str(), apdex.sample_size);
        fields.insert(keys.score.as_str(), apdex.score);
        fields.insert(keys.satisfied.as_str(), apdex.satisfied);
        fields.insert(keys.tolerating.as_str(), apdex.tolerating);
        fields.insert(keys.frustrating.as_str(), apdex.frustrating);
        fields
    }
}

#[cfg(test)]
mod tests {
    use metricsink_domain::{CounterSetItem, MeterSetItem, MetricDocument, MetricsContext, TimerValue};

    use std::sync::Arc;

    use super::*;
    use crate::payload::{BulkPayloadBuilder, PayloadBuilder};

    fn packed(packer: &MetricPacker, sources: Vec<MetricValueSource>) -> Vec<MetricDocument> {
        let mut builder = BulkPayloadBuilder::new("metrics").unwrap();
        builder.init();
        let snapshot =
            MetricsSnapshot::new(vec![MetricsContext { context: "Application".into(), sources }]);
        packer.pack_snapshot(&mut builder, &snapshot).unwrap();
        builder.batch().documents().to_vec()
    }

    #[test]
    fn test_gauge_names_and_tags_are_formatted() {
        let source = MetricValueSource::new("Free Memory", MetricValue::Gauge(42.0))
            .with_tags(MetricTags::single("Host", "Web 01"));

        let docs = packed(&MetricPacker::new(), vec![source]);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "application__free_memory");
        assert_eq!(docs[0].kind, "gauge");
        assert_eq!(docs[0].tags.get("host"), Some("web_01"));
        assert_eq!(docs[0].fields.get("value"), Some(&FieldValue::Float(42.0)));
    }

    #[test]
    fn test_non_finite_gauges_are_skipped() {
        let docs = packed(
            &MetricPacker::new(),
            vec![
                MetricValueSource::new("nan", MetricValue::Gauge(f64::NAN)),
                MetricValueSource::new("inf", MetricValue::Gauge(f64::INFINITY)),
                MetricValueSource::new("ok", MetricValue::Gauge(1.0)),
            ],
        );
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "application__ok");
    }

    /// Validates counter set items.
    ///
    /// Assertions:
    /// - duplicate items produce one document
    /// - item documents use the `  items` suffix and merge item tags
    /// - `percent` follows `report_item_percentages`
    #[test]
    fn test_counter_set_items() {
        let item = CounterSetItem { tags: MetricTags::single("item", "a"), count: 3, percent: 60.0 };
        let counter = CounterValue {
            count: 5,
            items: vec![item.clone(), item],
            report_item_percentages: false,
            ..CounterValue::default()
        };
        let docs = packed(&MetricPacker::new(), vec![MetricValueSource::new("hits", MetricValue::Counter(counter))]);

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].fields.get("value"), Some(&FieldValue::Int(5)));
        assert_eq!(docs[1].name, "application__hits__items");
        assert_eq!(docs[1].tags.get("item"), Some("a"));
        assert_eq!(docs[1].fields.get("total"), Some(&FieldValue::Int(3)));
        assert!(!docs[1].fields.contains_key("percent"));
    }

    #[test]
    fn test_counter_set_items_can_be_disabled() {
        let counter = CounterValue {
            count: 1,
            items: vec![CounterSetItem { tags: MetricTags::new(), count: 1, percent: 100.0 }],
            report_set_items: false,
            ..CounterValue::default()
        };
        let docs = packed(&MetricPacker::new(), vec![MetricValueSource::new("c", MetricValue::Counter(counter))]);
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_grouped_source_uses_group_name_and_tag() {
        let source = MetricValueSource::new("GET /users", MetricValue::Gauge(1.0)).in_group("requests");

        let docs = packed(&MetricPacker::new(), vec![source]);
        assert_eq!(docs[0].name, "application__requests");
        assert_eq!(docs[0].tags.get(GROUP_ITEM_TAG), Some("get__users"));
    }

    #[test]
    fn test_mtype_tag_overrides_kind() {
        let source = MetricValueSource::new("queue", MetricValue::Gauge(3.0))
            .with_tags(MetricTags::single(MEASUREMENT_TYPE_TAG, "depth"));

        let docs = packed(&MetricPacker::new(), vec![source]);
        assert_eq!(docs[0].kind, "depth");
    }

    #[test]
    fn test_meter_items_carry_percent() {
        let meter = MeterValue {
            count: 10,
            mean_rate: 1.5,
            items: vec![MeterSetItem {
                tags: MetricTags::single("status", "200"),
                percent: 80.0,
                value: MeterValue { count: 8, ..MeterValue::default() },
            }],
            ..MeterValue::default()
        };
        let docs = packed(&MetricPacker::new(), vec![MetricValueSource::new("rps", MetricValue::Meter(meter))]);

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].fields.get("rate.mean"), Some(&FieldValue::Float(1.5)));
        assert_eq!(docs[1].fields.get("count.meter"), Some(&FieldValue::Int(8)));
        assert_eq!(docs[1].fields.get("percent"), Some(&FieldValue::Float(80.0)));
    }

    #[test]
    fn test_timer_combines_meter_and_histogram_fields() {
        let timer = TimerValue {
            rate: MeterValue { count: 4, ..MeterValue::default() },
            histogram: HistogramValue {
                count: 4,
                mean: f64::NAN,
                percentile_99: 12.0,
                last_user_value: Some("user-7".into()),
                ..HistogramValue::default()
            },
        };
        let packer = MetricPacker::new().with_data_keys(DataKeys::elasticsearch());
        let docs = packed(&packer, vec![MetricValueSource::new("t", MetricValue::Timer(timer))]);

        let fields = &docs[0].fields;
        assert_eq!(fields.get("countMeter"), Some(&FieldValue::Int(4)));
        assert_eq!(fields.get("countHist"), Some(&FieldValue::Int(4)));
        assert_eq!(fields.get("p99"), Some(&FieldValue::Float(12.0)));
        assert_eq!(fields.get("userLast"), Some(&FieldValue::Str("user-7".into())));
        assert!(!fields.contains_key("mean"));
    }

    #[test]
    fn test_filter_by_context_and_kind() {
        let filter = MetricFilter {
            contexts: vec!["application".into()],
            kinds: vec![MetricKind::Counter],
            name_prefix: None,
        };
        let docs = packed(
            &MetricPacker::new().with_filter(filter.clone()),
            vec![
                MetricValueSource::new("g", MetricValue::Gauge(1.0)),
                MetricValueSource::new("c", MetricValue::Counter(CounterValue::default())),
            ],
        );
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].kind, "counter");

        assert!(!filter.matches_context("system"));
        assert!(MetricFilter::default().is_empty());
    }

    #[test]
    fn test_invalid_source_counted_as_skipped() {
        let packer = MetricPacker::new()
            .with_name_formatter(Arc::new(|_: &str, name: &str| name.to_string()));
        let mut builder = BulkPayloadBuilder::new("metrics").unwrap();
        builder.init();
        let snapshot = MetricsSnapshot::new(vec![MetricsContext {
            context: "app".into(),
            sources: vec![
                MetricValueSource::new(" ", MetricValue::Gauge(1.0)),
                MetricValueSource::new("ok", MetricValue::Gauge(2.0)),
            ],
        }]);

        let summary = packer.pack_snapshot(&mut builder, &snapshot).unwrap();
        assert_eq!(summary, PackSummary { documents: 1, skipped: 1 });
        assert_eq!(builder.batch().documents()[0].name, "ok");
    }

    #[test]
    fn test_uninitialized_builder_still_aborts() {
        let mut builder = BulkPayloadBuilder::new("metrics").unwrap();
        let snapshot = MetricsSnapshot::new(vec![MetricsContext {
            context: "app".into(),
            sources: vec![MetricValueSource::new("ok", MetricValue::Gauge(2.0))],
        }]);

        let result = MetricPacker::new().pack_snapshot(&mut builder, &snapshot);
        assert_eq!(result, Err(PayloadError::NotInitialized));
    }
}
