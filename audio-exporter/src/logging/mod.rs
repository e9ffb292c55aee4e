//! Logging setup.
//!
//! Console output is always enabled (plain or JSON). A daily rolling file
//! log is added when a log directory is configured. Both use local-time
//! timestamps and the same `RUST_LOG` driven filter.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "audio_exporter=info,ffmpeg_diag=info,tower_http=warn";

/// Rolled log files kept on disk.
const MAX_LOG_FILES: usize = 7;

const LOG_FILE_PREFIX: &str = "audio-exporter";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Formats timestamps in the server's local timezone.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Logging options, usually from the command line.
#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Directory for the rolling log file. Console only when `None`.
    pub log_dir: Option<PathBuf>,
    /// Emit console logs as JSON lines.
    pub json: bool,
}

/// Filter from `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`].
pub fn build_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber.
///
/// Returns the file writer guard when file logging is enabled; it must be
/// held for the lifetime of the process or buffered lines are lost.
pub fn init_logging(options: &LoggingOptions) -> crate::Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console = fmt::layer().with_timer(LocalTimer);
    if options.json {
        layers.push(console.json().with_filter(build_filter()).boxed());
    } else {
        layers.push(console.with_ansi(true).with_filter(build_filter()).boxed());
    }

    let guard = match &options.log_dir {
        Some(dir) => {
            let appender = file_appender(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_timer(LocalTimer)
                    .with_filter(build_filter())
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| {
            crate::Error::Other(format!("Failed to set global default subscriber: {}", e))
        })?;

    Ok(guard)
}

fn file_appender(dir: &Path) -> crate::Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .map_err(|e| crate::Error::Other(format!("Failed to create log file appender: {}", e)))
}
