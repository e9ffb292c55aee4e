//! Stream monitoring.
//!
//! One [`StreamSupervisor`] per stream keeps an ffmpeg diagnostic process
//! running and turns its stderr into metrics; the [`LivenessProber`]
//! periodically checks reachability. [`MonitorService`] owns both.

mod launcher;
mod output_record_reader;
mod prober;
mod recorder;
mod service;
mod silence;
mod supervisor;

#[cfg(test)]
mod testing;

pub use launcher::{DiagnosticLauncher, DiagnosticSession, FfmpegLauncher, FfmpegLauncherConfig};
pub use output_record_reader::OutputRecordReader;
pub use prober::{FfmpegProbe, LivenessProber, StreamProbe};
pub use process_utils::ProcessExit;
pub use recorder::StreamRecorder;
pub use service::{MonitorService, MonitorServiceConfig};
pub use silence::{SilenceEffect, SilenceState, Transition};
pub use supervisor::{RetryPolicy, StreamSupervisor, SupervisorConfig};
