//! Metrics module.
//!
//! Provides the per-stream metric families, the [`MetricsSink`] write
//! interface injected into the monitors, and Prometheus text exposition.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use audio_exporter::metrics::{MetricsCollector, MetricsSink, PrometheusExporter, StreamMetric};
//!
//! let collector = Arc::new(MetricsCollector::new());
//! collector.set_gauge(StreamMetric::StreamUp, "http://radio.example/live", 1.0);
//!
//! let exporter = PrometheusExporter::new(collector);
//! assert!(exporter.export().contains("audio_stream_up{url=\"http://radio.example/live\"} 1"));
//! ```

mod collector;
mod prometheus;
mod sink;

pub use collector::{FamilySnapshot, MetricsCollector, MetricsSnapshot, SampleValue};
pub use prometheus::{CONTENT_TYPE, PrometheusExporter};
pub use sink::{MetricKind, MetricsSink, StreamMetric};
