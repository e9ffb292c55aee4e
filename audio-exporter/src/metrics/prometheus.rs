//! Prometheus metrics exporter.
//!
//! Exports metrics in Prometheus text format (version 0.0.4).

use std::fmt::Write as _;
use std::sync::Arc;

use super::collector::{FamilySnapshot, MetricsCollector, SampleValue};

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus metrics exporter.
pub struct PrometheusExporter {
    collector: Arc<MetricsCollector>,
    namespace: String,
}

impl PrometheusExporter {
    /// Create a new Prometheus exporter.
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self {
            collector,
            namespace: "audio".to_string(),
        }
    }

    /// Create a new Prometheus exporter with custom namespace.
    pub fn with_namespace(collector: Arc<MetricsCollector>, namespace: impl Into<String>) -> Self {
        Self {
            collector,
            namespace: namespace.into(),
        }
    }

    /// Export metrics in Prometheus text format.
    pub fn export(&self) -> String {
        let snapshot = self.collector.snapshot();
        let mut output = String::new();

        for family in &snapshot.families {
            self.write_family(&mut output, family);
        }

        output
    }

    fn write_family(&self, output: &mut String, family: &FamilySnapshot) {
        let metric = family.metric;
        let full_name = format!("{}_{}", self.namespace, metric.name());
        let _ = writeln!(output, "# HELP {} {}", full_name, metric.help());
        let _ = writeln!(output, "# TYPE {} {}", full_name, metric.kind().as_str());

        for (url, value) in &family.series {
            let value = match *value {
                SampleValue::Gauge(value) => format_value(value),
                SampleValue::Counter(count) => count.to_string(),
            };
            let _ = writeln!(
                output,
                "{}{{url=\"{}\"}} {}",
                full_name,
                escape_label_value(url),
                value
            );
        }
    }
}

/// Format a sample value, spelling non-finite values the way Prometheus expects.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MetricsSink, StreamMetric};

    #[test]
    fn test_prometheus_exporter_creation() {
        let collector = Arc::new(MetricsCollector::new());
        let exporter = PrometheusExporter::new(collector);
        assert_eq!(exporter.namespace, "audio");
    }

    #[test]
    fn test_prometheus_export_empty() {
        let collector = Arc::new(MetricsCollector::new());
        let exporter = PrometheusExporter::new(collector);
        let output = exporter.export();

        assert!(output.contains("# HELP audio_stream_up Indicates if the audio stream is online"));
        assert!(output.contains("# TYPE audio_stream_up gauge"));
        assert!(output.contains("# TYPE audio_clipped_samples_total counter"));
        assert!(!output.contains("{url="));
    }

    #[test]
    fn test_prometheus_export_with_data() {
        let collector = Arc::new(MetricsCollector::new());
        collector.set_gauge(StreamMetric::StreamUp, "http://radio/a", 1.0);
        collector.set_gauge(StreamMetric::SilenceDuration, "http://radio/a", 7.5);
        collector.set_gauge(StreamMetric::RmsLevel, "http://radio/a", -18.231);
        collector.add_counter(StreamMetric::ClippedSamples, "http://radio/a", 3);

        let exporter = PrometheusExporter::new(collector);
        let output = exporter.export();

        assert!(output.contains("audio_stream_up{url=\"http://radio/a\"} 1\n"));
        assert!(output.contains("audio_silence_duration_seconds{url=\"http://radio/a\"} 7.5\n"));
        assert!(output.contains("audio_rms_level_db{url=\"http://radio/a\"} -18.231\n"));
        assert!(output.contains("audio_clipped_samples_total{url=\"http://radio/a\"} 3\n"));
    }

    #[test]
    fn test_help_and_type_written_once_per_family() {
        let collector = Arc::new(MetricsCollector::new());
        collector.set_gauge(StreamMetric::StreamUp, "http://a", 1.0);
        collector.set_gauge(StreamMetric::StreamUp, "http://b", 0.0);

        let output = PrometheusExporter::new(collector).export();
        assert_eq!(output.matches("# TYPE audio_stream_up gauge").count(), 1);

        let a = output.find("audio_stream_up{url=\"http://a\"}").unwrap();
        let b = output.find("audio_stream_up{url=\"http://b\"}").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_counter_exported_as_exact_integer() {
        let collector = Arc::new(MetricsCollector::new());
        collector.add_counter(StreamMetric::ClippedSamples, "http://a", u64::MAX - 1);

        let output = PrometheusExporter::new(collector).export();
        assert!(
            output.contains("audio_clipped_samples_total{url=\"http://a\"} 18446744073709551614\n")
        );
    }

    #[test]
    fn test_non_finite_values() {
        let collector = Arc::new(MetricsCollector::new());
        collector.set_gauge(StreamMetric::RmsLevel, "http://a", f64::NEG_INFINITY);
        collector.set_gauge(StreamMetric::PeakLevel, "http://a", f64::NAN);

        let output = PrometheusExporter::new(collector).export();
        assert!(output.contains("audio_rms_level_db{url=\"http://a\"} -Inf\n"));
        assert!(output.contains("audio_peak_level_db{url=\"http://a\"} NaN\n"));
    }

    #[test]
    fn test_label_escaping() {
        assert_eq!(escape_label_value(r#"http://a/"x"\y"#), r#"http://a/\"x\"\\y"#);
        assert_eq!(escape_label_value("a\nb"), "a\\nb");
    }

    #[test]
    fn test_prometheus_custom_namespace() {
        let collector = Arc::new(MetricsCollector::new());
        let exporter = PrometheusExporter::with_namespace(collector, "custom");
        let output = exporter.export();

        assert!(output.contains("custom_stream_up"));
        assert!(!output.contains("audio_"));
    }
}
