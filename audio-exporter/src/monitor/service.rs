//! Monitor service: owns every per-stream supervisor and the liveness prober.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::launcher::DiagnosticLauncher;
use super::prober::{LivenessProber, StreamProbe};
use super::supervisor::{StreamSupervisor, SupervisorConfig};
use crate::config::{AppConfig, StreamTarget};
use crate::metrics::{MetricsSink, StreamMetric};

/// Monitor service configuration.
#[derive(Debug, Clone, Copy)]
pub struct MonitorServiceConfig {
    pub supervisor: SupervisorConfig,
    pub probe_interval: Duration,
}

impl Default for MonitorServiceConfig {
    fn default() -> Self {
        Self {
            supervisor: SupervisorConfig::default(),
            probe_interval: Duration::from_secs(30),
        }
    }
}

impl From<&AppConfig> for MonitorServiceConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            supervisor: SupervisorConfig::from(config),
            probe_interval: config.probe_interval(),
        }
    }
}

/// Running set of monitoring tasks.
pub struct MonitorService {
    streams: Vec<Arc<StreamTarget>>,
    cancellation_token: CancellationToken,
    tasks: JoinSet<()>,
}

impl MonitorService {
    /// Prime per-stream gauges and spawn one supervisor per stream plus the
    /// prober. Must be called from within a tokio runtime.
    pub fn start(
        streams: Vec<Arc<StreamTarget>>,
        config: MonitorServiceConfig,
        sink: Arc<dyn MetricsSink>,
        launcher: Arc<dyn DiagnosticLauncher>,
        probe: Arc<dyn StreamProbe>,
    ) -> Self {
        let cancellation_token = CancellationToken::new();
        let mut tasks = JoinSet::new();

        for target in &streams {
            sink.set_gauge(StreamMetric::SilenceActive, &target.url, 0.0);
            sink.set_gauge(StreamMetric::SilenceDuration, &target.url, 0.0);

            let supervisor = StreamSupervisor::new(
                target.clone(),
                launcher.clone(),
                sink.clone(),
                config.supervisor,
            );
            tasks.spawn(supervisor.run(cancellation_token.child_token()));
        }

        let prober = LivenessProber::new(streams.clone(), probe, sink, config.probe_interval);
        tasks.spawn(prober.run(cancellation_token.child_token()));

        info!(streams = streams.len(), "Monitor service started");

        Self {
            streams,
            cancellation_token,
            tasks,
        }
    }

    /// Monitored streams, in configuration order.
    pub fn streams(&self) -> &[Arc<StreamTarget>] {
        &self.streams
    }

    /// Root token of every monitoring task.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Cancel every task and wait for them to stop. Tasks still running
    /// after `timeout` are aborted.
    pub async fn shutdown(mut self, timeout: Duration) {
        info!("Shutting down monitor service");
        self.cancellation_token.cancel();

        let drain = async {
            while let Some(result) = self.tasks.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "Monitor task failed");
                }
            }
        };

        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(
                remaining = self.tasks.len(),
                "Monitor tasks did not stop in time, aborting"
            );
            self.tasks.abort_all();
            while self.tasks.join_next().await.is_some() {}
        }

        debug!("Monitor service stopped");
    }
}
