//! Test doubles shared by the monitor unit tests.

use std::sync::Mutex;

use crate::metrics::{MetricsSink, StreamMetric};

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Gauge {
        metric: StreamMetric,
        stream: String,
        value: f64,
    },
    Counter {
        metric: StreamMetric,
        stream: String,
        delta: u64,
    },
}

impl SinkCall {
    pub fn gauge(metric: StreamMetric, stream: &str, value: f64) -> Self {
        Self::Gauge {
            metric,
            stream: stream.to_string(),
            value,
        }
    }

    pub fn counter(metric: StreamMetric, stream: &str, delta: u64) -> Self {
        Self::Counter {
            metric,
            stream: stream.to_string(),
            delta,
        }
    }
}

/// Sink that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingSink {
    fn set_gauge(&self, metric: StreamMetric, stream: &str, value: f64) {
        self.calls
            .lock()
            .unwrap()
            .push(SinkCall::gauge(metric, stream, value));
    }

    fn add_counter(&self, metric: StreamMetric, stream: &str, delta: u64) {
        self.calls
            .lock()
            .unwrap()
            .push(SinkCall::counter(metric, stream, delta));
    }
}
