//! Prometheus exporter for live audio streams.
//!
//! Each configured stream is watched by a long-running ffmpeg diagnostic
//! process (`silencedetect`, optionally `astats`) whose stderr is turned
//! into per-stream gauges and counters, plus a periodic reachability probe.
//! Everything is served on a single `/metrics` endpoint.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod monitor;

pub use error::{Error, Result};
