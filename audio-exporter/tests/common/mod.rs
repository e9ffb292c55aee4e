//! Stub launcher shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use audio_exporter::config::StreamTarget;
use audio_exporter::monitor::{DiagnosticLauncher, DiagnosticSession, ProcessExit, StreamProbe};
use audio_exporter::{Error, Result};
use tokio::io::DuplexStream;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// What the next launch does.
pub enum Outcome {
    /// Launch fails.
    Fail,
    /// Session prints `output`, then exits with status 0.
    Lines(&'static str),
    /// Session streams from a pipe the test controls. The process "exits"
    /// when `exit` resolves or is killed through its stop token.
    Pipe {
        output: DuplexStream,
        exit: oneshot::Receiver<ProcessExit>,
    },
}

impl Outcome {
    /// Pipe outcome plus the test's ends: writer and exit trigger.
    pub fn pipe() -> (Self, DuplexStream, oneshot::Sender<ProcessExit>) {
        let (writer, output) = tokio::io::duplex(64 * 1024);
        let (exit_tx, exit) = oneshot::channel();
        (Self::Pipe { output, exit }, writer, exit_tx)
    }
}

/// Plays back scripted outcomes; fails once the script runs out.
#[derive(Default)]
pub struct StubLauncher {
    script: Mutex<VecDeque<Outcome>>,
    launches: Mutex<Vec<(String, Instant)>>,
    stops: Mutex<Vec<CancellationToken>>,
}

impl StubLauncher {
    pub fn new(script: impl IntoIterator<Item = Outcome>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Launch attempts for `url`, as offsets from `since`.
    pub fn launch_offsets(&self, url: &str, since: Instant) -> Vec<u64> {
        self.launches
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, at)| at.duration_since(since).as_secs())
            .collect()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    /// Stop tokens handed out for successful launches.
    pub fn stop_tokens(&self) -> Vec<CancellationToken> {
        self.stops.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiagnosticLauncher for StubLauncher {
    async fn launch(
        &self,
        target: &StreamTarget,
        stop: CancellationToken,
    ) -> Result<DiagnosticSession> {
        self.launches
            .lock()
            .unwrap()
            .push((target.url.clone(), Instant::now()));

        let outcome = self.script.lock().unwrap().pop_front().unwrap_or(Outcome::Fail);
        let (exit_tx, exit_rx) = oneshot::channel();

        let session = match outcome {
            Outcome::Fail => {
                return Err(Error::launch(
                    &target.url,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "ffmpeg not found"),
                ));
            }
            Outcome::Lines(output) => {
                let _ = exit_tx.send(ProcessExit::Exited { code: Some(0) });
                DiagnosticSession::new(Cursor::new(output.as_bytes()), exit_rx, stop.clone())
            }
            Outcome::Pipe { output, exit } => {
                let token = stop.clone();
                tokio::spawn(async move {
                    let status = tokio::select! {
                        _ = token.cancelled() => ProcessExit::Killed,
                        status = exit => status.unwrap_or(ProcessExit::Killed),
                    };
                    let _ = exit_tx.send(status);
                });
                DiagnosticSession::new(output, exit_rx, stop.clone())
            }
        };

        self.stops.lock().unwrap().push(stop);
        Ok(session)
    }
}

/// Probe that reports every URL in `down` as unreachable.
#[derive(Default)]
pub struct StubProbe {
    pub down: Vec<String>,
}

#[async_trait]
impl StreamProbe for StubProbe {
    async fn check(&self, url: &str) -> Result<()> {
        if self.down.iter().any(|u| u == url) {
            Err(Error::probe(url, "Connection refused"))
        } else {
            Ok(())
        }
    }
}

/// Let every runnable task settle without moving the paused clock far.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
}
