//! Diagnostic process launcher.
//!
//! A launcher starts one analysis subprocess for a stream and hands back
//! its stderr together with a way to observe and force its exit.

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use process_utils::{ProcessExit, spawn_process_waiter, tokio_command};
use tokio::io::AsyncRead;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{AppConfig, StreamTarget};
use crate::{Error, Result};

/// Frame metadata keys printed for the loudness gauges. No clipping key is
/// printed; the clipped sample counter only sees summary lines.
const ASTATS_PRINT_KEYS: &[&str] = &[
    "lavfi.astats.Overall.RMS_level",
    "lavfi.astats.Overall.Peak_level",
    "lavfi.astats.Overall.Dynamic_range",
];

/// Live handle to one running diagnostic subprocess.
pub struct DiagnosticSession {
    /// Diagnostic text output (ffmpeg's stderr).
    pub output: Box<dyn AsyncRead + Send + Unpin>,
    /// Resolves once the process has exited or been killed.
    pub exit: oneshot::Receiver<ProcessExit>,
    /// Cancelling this token terminates the process.
    pub stop: CancellationToken,
}

impl DiagnosticSession {
    pub fn new(
        output: impl AsyncRead + Send + Unpin + 'static,
        exit: oneshot::Receiver<ProcessExit>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            output: Box::new(output),
            exit,
            stop,
        }
    }
}

impl std::fmt::Debug for DiagnosticSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticSession")
            .field("stopped", &self.stop.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Starts diagnostic subprocesses.
#[async_trait]
pub trait DiagnosticLauncher: Send + Sync {
    /// Launch a diagnostic process for `target`.
    ///
    /// `stop` becomes the session's stop token: cancelling it must
    /// terminate the process.
    async fn launch(&self, target: &StreamTarget, stop: CancellationToken)
    -> Result<DiagnosticSession>;
}

/// ffmpeg launcher configuration.
#[derive(Debug, Clone)]
pub struct FfmpegLauncherConfig {
    /// Path to the ffmpeg binary.
    pub binary_path: String,
    /// Chain `astats` after `silencedetect`.
    pub loudness_analysis: bool,
    /// Frames per `astats` measurement window.
    pub astats_reset_frames: u32,
}

impl Default for FfmpegLauncherConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            loudness_analysis: true,
            astats_reset_frames: 50,
        }
    }
}

impl From<&AppConfig> for FfmpegLauncherConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            binary_path: config.ffmpeg_path.clone(),
            loudness_analysis: config.loudness_analysis,
            astats_reset_frames: config.astats_reset_frames,
        }
    }
}

/// Launches `ffmpeg` with `silencedetect` (and optionally `astats`) on a stream.
#[derive(Debug, Clone, Default)]
pub struct FfmpegLauncher {
    config: FfmpegLauncherConfig,
}

impl FfmpegLauncher {
    pub fn new(config: FfmpegLauncherConfig) -> Self {
        Self { config }
    }

    /// Build the audio filter graph for a target.
    pub fn audio_filter(&self, target: &StreamTarget) -> String {
        let mut filter = format!(
            "silencedetect=noise={}:d={}",
            target.noise_level, target.silence_min_seconds
        );

        if self.config.loudness_analysis {
            filter.push_str(&format!(
                ",astats=metadata=1:reset={}",
                self.config.astats_reset_frames
            ));
            for key in ASTATS_PRINT_KEYS {
                filter.push_str(&format!(",ametadata=mode=print:key={}", key));
            }
        }

        filter
    }

    /// Build ffmpeg command arguments.
    pub fn build_args(&self, target: &StreamTarget) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostats".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            target.url.clone(),
            "-vn".to_string(),
            "-af".to_string(),
            self.audio_filter(target),
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ]
    }
}

#[async_trait]
impl DiagnosticLauncher for FfmpegLauncher {
    async fn launch(
        &self,
        target: &StreamTarget,
        stop: CancellationToken,
    ) -> Result<DiagnosticSession> {
        let args = self.build_args(target);
        debug!(url = %target.url, ?args, "Starting ffmpeg diagnostics");

        let mut child = tokio_command(&self.config.binary_path)
            .args(&args)
            .env("LC_ALL", "C") // Force consistent output
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::launch(&target.url, e))?;

        let stderr = child.stderr.take().ok_or_else(|| {
            Error::launch(
                &target.url,
                io::Error::new(io::ErrorKind::BrokenPipe, "stderr was not captured"),
            )
        })?;

        let exit = spawn_process_waiter(child, stop.clone());
        Ok(DiagnosticSession::new(stderr, exit, stop))
    }
}
