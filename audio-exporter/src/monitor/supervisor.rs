//! Per-stream diagnostic supervisor.
//!
//! Keeps one diagnostic process alive for a stream for the lifetime of the
//! service: launch, read, classify, and relaunch after a fixed delay when
//! the process exits or fails to start.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::launcher::{DiagnosticLauncher, DiagnosticSession};
use super::output_record_reader::OutputRecordReader;
use super::recorder::StreamRecorder;
use crate::config::{AppConfig, StreamTarget};
use crate::metrics::MetricsSink;

/// Fixed delays between diagnostic sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait after a failed launch.
    pub launch_retry_delay: Duration,
    /// Wait after a session ended.
    pub restart_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            launch_retry_delay: Duration::from_secs(10),
            restart_delay: Duration::from_secs(5),
        }
    }
}

/// Supervisor configuration.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    pub retry: RetryPolicy,
    /// Longest diagnostic line accepted before the session is restarted.
    pub max_line_bytes: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_line_bytes: 64 * 1024,
        }
    }
}

impl From<&AppConfig> for SupervisorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_line_bytes: config.max_line_bytes,
        }
    }
}

/// How a session's output stream ended.
#[derive(Debug)]
enum StreamEnd {
    Eof,
    ReadError(std::io::Error),
    Cancelled,
}

/// Supervises the diagnostic process of a single stream.
pub struct StreamSupervisor {
    target: Arc<StreamTarget>,
    launcher: Arc<dyn DiagnosticLauncher>,
    recorder: StreamRecorder,
    config: SupervisorConfig,
}

impl StreamSupervisor {
    pub fn new(
        target: Arc<StreamTarget>,
        launcher: Arc<dyn DiagnosticLauncher>,
        sink: Arc<dyn MetricsSink>,
        config: SupervisorConfig,
    ) -> Self {
        let recorder = StreamRecorder::new(target.url.clone(), sink);
        Self {
            target,
            launcher,
            recorder,
            config,
        }
    }

    /// Run until `cancel` fires. Any running process is killed on return.
    pub async fn run(mut self, cancel: CancellationToken) {
        let url = self.target.url.clone();
        info!("Starting ffmpeg diagnostics for {}", url);

        loop {
            let session_token = cancel.child_token();

            let launched = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.launcher.launch(&self.target, session_token.clone()) => result,
            };

            match launched {
                Ok(session) => {
                    if !self.drive_session(session, &cancel).await {
                        break;
                    }
                    if !sleep_or_cancel(self.config.retry.restart_delay, &cancel).await {
                        break;
                    }
                }
                Err(e) => {
                    warn!("ffmpeg diag start failed for {}: {}", url, e);
                    if !sleep_or_cancel(self.config.retry.launch_retry_delay, &cancel).await {
                        break;
                    }
                }
            }
        }

        debug!(url = %url, "Diagnostic supervisor stopped");
    }

    /// Drive one session to completion. Returns `false` if cancelled.
    async fn drive_session(
        &mut self,
        session: DiagnosticSession,
        cancel: &CancellationToken,
    ) -> bool {
        let DiagnosticSession { output, exit, stop } = session;
        let url = self.target.url.clone();

        self.recorder.begin_session();
        let mut reader = OutputRecordReader::new(output, self.config.max_line_bytes);

        let end = loop {
            tokio::select! {
                _ = cancel.cancelled() => break StreamEnd::Cancelled,
                record = reader.next_record() => match record {
                    Ok(Some(line)) => {
                        self.recorder.process_line(&line);
                    }
                    Ok(None) => break StreamEnd::Eof,
                    Err(e) => break StreamEnd::ReadError(e),
                },
            }
        };

        match end {
            StreamEnd::Cancelled => {
                stop.cancel();
                return false;
            }
            StreamEnd::ReadError(e) => {
                warn!(url = %url, error = %e, "Diagnostic output read failed, stopping process");
                stop.cancel();
            }
            StreamEnd::Eof => {}
        }

        let exit = tokio::select! {
            _ = cancel.cancelled() => {
                stop.cancel();
                return false;
            }
            exit = exit => exit,
        };

        match exit {
            Ok(status) if status.success() => {
                info!("ffmpeg diag ended for {}", url);
            }
            Ok(status) => {
                error!("ffmpeg diag exited for {}: {}", url, status);
            }
            Err(_) => {
                error!("ffmpeg diag exited for {}: exit status unavailable", url);
            }
        }

        true
    }
}

/// Sleep for `delay`. Returns `false` if cancelled first.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
