//! Periodic reachability checks.
//!
//! Every probe interval each stream gets a short decode attempt; the
//! outcome is published as the `stream_up` gauge.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use process_utils::tokio_command;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, StreamTarget};
use crate::metrics::{MetricsSink, StreamMetric};
use crate::{Error, Result};

/// Reachability check for a single stream URL.
#[async_trait]
pub trait StreamProbe: Send + Sync {
    async fn check(&self, url: &str) -> Result<()>;
}

/// Decodes two seconds of the stream with ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    binary_path: String,
    timeout: Duration,
}

impl FfmpegProbe {
    pub fn new(binary_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout,
        }
    }

    pub fn build_args(url: &str) -> Vec<String> {
        ["-v", "error", "-t", "2", "-i", url, "-f", "null", "-"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

impl From<&AppConfig> for FfmpegProbe {
    fn from(config: &AppConfig) -> Self {
        Self::new(config.ffmpeg_path.clone(), config.probe_timeout())
    }
}

#[async_trait]
impl StreamProbe for FfmpegProbe {
    async fn check(&self, url: &str) -> Result<()> {
        let mut command = tokio_command(&self.binary_path);
        command
            .args(Self::build_args(url))
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // kill_on_drop reaps the process if the timeout wins.
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| Error::probe(url, format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| Error::probe(url, e.to_string()))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .map(|l| l.trim().to_string())
            .unwrap_or_else(|| output.status.to_string());
        Err(Error::probe(url, reason))
    }
}

/// Probes every stream on a fixed interval.
pub struct LivenessProber {
    targets: Vec<Arc<StreamTarget>>,
    probe: Arc<dyn StreamProbe>,
    sink: Arc<dyn MetricsSink>,
    interval: Duration,
}

impl LivenessProber {
    pub fn new(
        targets: Vec<Arc<StreamTarget>>,
        probe: Arc<dyn StreamProbe>,
        sink: Arc<dyn MetricsSink>,
        interval: Duration,
    ) -> Self {
        Self {
            targets,
            probe,
            sink,
            interval,
        }
    }

    /// Probe until cancelled. The first round runs immediately.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Liveness prober shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.probe_all() => {}
                    }
                }
            }
        }
    }

    /// Check every stream concurrently and publish the results.
    pub async fn probe_all(&self) {
        let checks = self.targets.iter().map(|target| async move {
            let result = self.probe.check(&target.url).await;
            (target, result)
        });

        for (target, result) in join_all(checks).await {
            match result {
                Ok(()) => {
                    info!("Stream OK: {}", target.url);
                    self.sink.set_gauge(StreamMetric::StreamUp, &target.url, 1.0);
                }
                Err(e) => {
                    warn!("Stream KO: {} ({})", target.url, e);
                    self.sink.set_gauge(StreamMetric::StreamUp, &target.url, 0.0);
                }
            }
        }
    }
}
