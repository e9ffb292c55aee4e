//! Metric families and the sink interface the monitors write through.

use serde::Serialize;

/// Kind of a metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Last written value wins.
    Gauge,
    /// Monotonic, only ever increased by non-negative deltas.
    Counter,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gauge => "gauge",
            Self::Counter => "counter",
        }
    }
}

/// Per-stream metric families. Every series is labelled with the stream URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMetric {
    StreamUp,
    SilenceActive,
    SilenceDuration,
    RmsLevel,
    PeakLevel,
    ClippedSamples,
    DynamicRange,
}

impl StreamMetric {
    /// Number of families.
    pub const COUNT: usize = 7;

    /// All families, in export order.
    pub const ALL: [StreamMetric; Self::COUNT] = [
        Self::StreamUp,
        Self::SilenceActive,
        Self::SilenceDuration,
        Self::RmsLevel,
        Self::PeakLevel,
        Self::ClippedSamples,
        Self::DynamicRange,
    ];

    /// Metric name without namespace.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StreamUp => "stream_up",
            Self::SilenceActive => "silence_active",
            Self::SilenceDuration => "silence_duration_seconds",
            Self::RmsLevel => "rms_level_db",
            Self::PeakLevel => "peak_level_db",
            Self::ClippedSamples => "clipped_samples_total",
            Self::DynamicRange => "dynamic_range_db",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Self::StreamUp => "Indicates if the audio stream is online",
            Self::SilenceActive => "1 if a silence >= configured duration is detected, 0 otherwise",
            Self::SilenceDuration => "Duration of the last detected silence (seconds)",
            Self::RmsLevel => "Latest RMS level reported by astats (dBFS)",
            Self::PeakLevel => "Latest peak level reported by astats (dBFS)",
            Self::ClippedSamples => "Total number of clipped samples reported",
            Self::DynamicRange => "Latest dynamic range reported by astats (dB)",
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Self::ClippedSamples => MetricKind::Counter,
            _ => MetricKind::Gauge,
        }
    }

    /// Dense index into per-family storage.
    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for StreamMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Write side of the metrics registry.
///
/// Implementations must be internally synchronized: every stream task
/// writes concurrently and expects each call to be atomic on its own.
pub trait MetricsSink: Send + Sync {
    /// Overwrite the gauge `metric` for `stream`.
    fn set_gauge(&self, metric: StreamMetric, stream: &str, value: f64);

    /// Add `delta` to the counter `metric` for `stream`.
    fn add_counter(&self, metric: StreamMetric, stream: &str, delta: u64);
}
