//! Metrics collector implementation.
//!
//! Holds the latest value of every (family, stream) series. Gauges are
//! stored as `f64` bit patterns so every write is a single atomic store.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use super::sink::{MetricKind, MetricsSink, StreamMetric};

/// Thread-safe store of per-stream metrics.
#[derive(Debug)]
pub struct MetricsCollector {
    // Indexed by `StreamMetric::index`.
    families: [DashMap<String, AtomicU64>; StreamMetric::COUNT],
}

/// Value of one series, in the representation of its family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SampleValue {
    Gauge(f64),
    Counter(u64),
}

/// Point-in-time copy of one metric family.
#[derive(Debug, Clone, Serialize)]
pub struct FamilySnapshot {
    pub metric: StreamMetric,
    /// `(stream, value)` pairs sorted by stream.
    pub series: Vec<(String, SampleValue)>,
}

/// Point-in-time copy of every metric family, in export order.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub families: Vec<FamilySnapshot>,
}

impl MetricsSnapshot {
    /// Look up one series.
    pub fn get(&self, metric: StreamMetric, stream: &str) -> Option<SampleValue> {
        self.families
            .iter()
            .find(|family| family.metric == metric)?
            .series
            .iter()
            .find(|(url, _)| url == stream)
            .map(|(_, value)| *value)
    }
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            families: std::array::from_fn(|_| DashMap::new()),
        }
    }

    fn family(&self, metric: StreamMetric) -> &DashMap<String, AtomicU64> {
        &self.families[metric.index()]
    }

    fn store(&self, metric: StreamMetric, stream: &str, bits: u64) {
        let family = self.family(metric);
        if let Some(cell) = family.get(stream) {
            cell.store(bits, Ordering::Relaxed);
            return;
        }
        family
            .entry(stream.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .store(bits, Ordering::Relaxed);
    }

    fn fetch_add(&self, metric: StreamMetric, stream: &str, delta: u64) {
        let family = self.family(metric);
        if let Some(cell) = family.get(stream) {
            cell.fetch_add(delta, Ordering::Relaxed);
            return;
        }
        family
            .entry(stream.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(delta, Ordering::Relaxed);
    }

    // ========== Reads ==========

    /// Current value of a gauge series.
    pub fn gauge(&self, metric: StreamMetric, stream: &str) -> Option<f64> {
        debug_assert_eq!(metric.kind(), MetricKind::Gauge);
        self.family(metric)
            .get(stream)
            .map(|cell| f64::from_bits(cell.load(Ordering::Relaxed)))
    }

    /// Current value of a counter series.
    pub fn counter(&self, metric: StreamMetric, stream: &str) -> Option<u64> {
        debug_assert_eq!(metric.kind(), MetricKind::Counter);
        self.family(metric)
            .get(stream)
            .map(|cell| cell.load(Ordering::Relaxed))
    }

    /// Number of series across all families.
    pub fn series_count(&self) -> usize {
        self.families.iter().map(DashMap::len).sum()
    }

    /// Take a snapshot of every family.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let families = StreamMetric::ALL
            .iter()
            .map(|&metric| {
                let mut series: Vec<(String, SampleValue)> = self
                    .family(metric)
                    .iter()
                    .map(|entry| {
                        let raw = entry.value().load(Ordering::Relaxed);
                        let value = match metric.kind() {
                            MetricKind::Gauge => SampleValue::Gauge(f64::from_bits(raw)),
                            MetricKind::Counter => SampleValue::Counter(raw),
                        };
                        (entry.key().clone(), value)
                    })
                    .collect();
                series.sort_by(|a, b| a.0.cmp(&b.0));
                FamilySnapshot { metric, series }
            })
            .collect();

        MetricsSnapshot { families }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for MetricsCollector {
    fn set_gauge(&self, metric: StreamMetric, stream: &str, value: f64) {
        debug_assert_eq!(metric.kind(), MetricKind::Gauge);
        self.store(metric, stream, value.to_bits());
    }

    fn add_counter(&self, metric: StreamMetric, stream: &str, delta: u64) {
        debug_assert_eq!(metric.kind(), MetricKind::Counter);
        self.fetch_add(metric, stream, delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_gauge_last_write_wins() {
        let collector = MetricsCollector::new();
        collector.set_gauge(StreamMetric::RmsLevel, "http://a", -18.0);
        collector.set_gauge(StreamMetric::RmsLevel, "http://a", -20.5);

        assert_eq!(
            collector.gauge(StreamMetric::RmsLevel, "http://a"),
            Some(-20.5)
        );
        assert_eq!(collector.gauge(StreamMetric::RmsLevel, "http://b"), None);
    }

    #[test]
    fn test_gauge_keeps_infinities() {
        let collector = MetricsCollector::new();
        collector.set_gauge(StreamMetric::PeakLevel, "http://a", f64::NEG_INFINITY);
        assert_eq!(
            collector.gauge(StreamMetric::PeakLevel, "http://a"),
            Some(f64::NEG_INFINITY)
        );
    }

    #[test]
    fn test_counter_accumulates() {
        let collector = MetricsCollector::new();
        collector.add_counter(StreamMetric::ClippedSamples, "http://a", 3);
        collector.add_counter(StreamMetric::ClippedSamples, "http://a", 4);
        collector.add_counter(StreamMetric::ClippedSamples, "http://b", 1);

        assert_eq!(
            collector.counter(StreamMetric::ClippedSamples, "http://a"),
            Some(7)
        );
        assert_eq!(
            collector.counter(StreamMetric::ClippedSamples, "http://b"),
            Some(1)
        );
    }

    #[test]
    fn test_streams_are_isolated() {
        let collector = MetricsCollector::new();
        collector.set_gauge(StreamMetric::SilenceActive, "http://a", 1.0);
        collector.set_gauge(StreamMetric::SilenceActive, "http://b", 0.0);

        assert_eq!(
            collector.gauge(StreamMetric::SilenceActive, "http://a"),
            Some(1.0)
        );
        assert_eq!(
            collector.gauge(StreamMetric::SilenceActive, "http://b"),
            Some(0.0)
        );
    }

    #[test]
    fn test_snapshot_sorted_and_typed() {
        let collector = MetricsCollector::new();
        collector.set_gauge(StreamMetric::StreamUp, "http://b", 1.0);
        collector.set_gauge(StreamMetric::StreamUp, "http://a", 0.0);
        collector.add_counter(StreamMetric::ClippedSamples, "http://a", 5);

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.families.len(), StreamMetric::COUNT);

        let up = &snapshot.families[StreamMetric::StreamUp.index()];
        assert_eq!(
            up.series,
            vec![
                ("http://a".to_string(), SampleValue::Gauge(0.0)),
                ("http://b".to_string(), SampleValue::Gauge(1.0)),
            ]
        );
        assert_eq!(
            snapshot.get(StreamMetric::ClippedSamples, "http://a"),
            Some(SampleValue::Counter(5))
        );
    }

    #[test]
    fn test_snapshot_keeps_large_counters_exact() {
        let collector = MetricsCollector::new();
        let large = (1u64 << 53) + 1;
        collector.add_counter(StreamMetric::ClippedSamples, "http://a", large);

        assert_eq!(
            collector.snapshot().get(StreamMetric::ClippedSamples, "http://a"),
            Some(SampleValue::Counter(large))
        );
    }

    #[test]
    fn test_concurrent_counter_updates() {
        let collector = Arc::new(MetricsCollector::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let collector = collector.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        collector.add_counter(StreamMetric::ClippedSamples, "http://a", 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            collector.counter(StreamMetric::ClippedSamples, "http://a"),
            Some(8000)
        );
    }

    proptest! {
        /// The clip counter equals the sum of every delta added, in any order.
        #[test]
        fn prop_counter_is_additive(deltas in proptest::collection::vec(1u64..10_000, 0..64)) {
            let collector = MetricsCollector::new();
            for delta in &deltas {
                collector.add_counter(StreamMetric::ClippedSamples, "http://a", *delta);
            }
            let expected = if deltas.is_empty() { None } else { Some(deltas.iter().sum::<u64>()) };
            prop_assert_eq!(collector.counter(StreamMetric::ClippedSamples, "http://a"), expected);
        }
    }
}
