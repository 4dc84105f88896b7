//! Payload serialization benchmarks
//!
//! Packs a snapshot of mixed metric kinds and renders it in each wire format.
//!
//! Run with: `cargo bench --bench payload_serialization -p metricsink-core`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use metricsink_core::data_keys::DataKeys;
use metricsink_core::packing::MetricPacker;
use metricsink_core::payload::{
    BulkPayloadBuilder, LineProtocolPayloadBuilder, PayloadBuilder, PlainTextPayloadBuilder,
};
use metricsink_domain::{
    CounterSetItem, CounterValue, HistogramValue, MeterValue, MetricTags, MetricValue,
    MetricValueSource, MetricsContext, MetricsSnapshot, TimerValue,
};

fn sample_snapshot(sources_per_kind: usize) -> MetricsSnapshot {
    let mut sources = Vec::with_capacity(sources_per_kind * 4);
    for idx in 0..sources_per_kind {
        let tags = MetricTags::single("host", format!("web-{idx:02}")).with("env", "prod");
        sources.push(
            MetricValueSource::new(format!("queue depth {idx}"), MetricValue::Gauge(idx as f64))
                .with_tags(tags.clone()),
        );
        sources.push(
            MetricValueSource::new(
                format!("requests {idx}"),
                MetricValue::Counter(CounterValue {
                    count: 1_000 + idx as i64,
                    items: vec![
                        CounterSetItem { tags: MetricTags::single("status", "200"), count: 900, percent: 90.0 },
                        CounterSetItem { tags: MetricTags::single("status", "500"), count: 100, percent: 10.0 },
                    ],
                    ..CounterValue::default()
                }),
            )
            .with_tags(tags.clone()),
        );
        sources.push(
            MetricValueSource::new(
                format!("latency {idx}"),
                MetricValue::Timer(TimerValue {
                    rate: MeterValue { count: 500, mean_rate: 12.5, ..MeterValue::default() },
                    histogram: HistogramValue {
                        count: 500,
                        mean: 41.2,
                        percentile_99: 180.0,
                        ..HistogramValue::default()
                    },
                }),
            )
            .with_tags(tags.clone()),
        );
        sources.push(
            MetricValueSource::new(
                format!("payload size {idx}"),
                MetricValue::Histogram(HistogramValue { count: 50, max: 4096.0, ..HistogramValue::default() }),
            )
            .with_tags(tags),
        );
    }
    MetricsSnapshot::new(vec![MetricsContext { context: "Application".into(), sources }])
}

fn pack_and_serialize<B: PayloadBuilder>(builder: &mut B, packer: &MetricPacker, snapshot: &MetricsSnapshot) -> usize {
    builder.init();
    packer.pack_snapshot(builder, snapshot).expect("pack snapshot");
    let payload = builder.serialize().expect("serialize payload");
    builder.clear();
    payload.len()
}

fn bench_formats(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload_serialization");

    for size in [10usize, 100] {
        let snapshot = sample_snapshot(size);
        let es_packer = MetricPacker::new().with_data_keys(DataKeys::elasticsearch());
        let packer = MetricPacker::new();

        group.bench_with_input(BenchmarkId::new("elasticsearch_bulk", size), &snapshot, |b, snapshot| {
            let mut builder = BulkPayloadBuilder::new("metrics").expect("valid index");
            b.iter(|| black_box(pack_and_serialize(&mut builder, &es_packer, snapshot)));
        });

        group.bench_with_input(BenchmarkId::new("line_protocol", size), &snapshot, |b, snapshot| {
            let mut builder = LineProtocolPayloadBuilder::new();
            b.iter(|| black_box(pack_and_serialize(&mut builder, &packer, snapshot)));
        });

        group.bench_with_input(BenchmarkId::new("plain_text", size), &snapshot, |b, snapshot| {
            let mut builder = PlainTextPayloadBuilder::new();
            b.iter(|| black_box(pack_and_serialize(&mut builder, &packer, snapshot)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_formats);
criterion_main!(benches);
