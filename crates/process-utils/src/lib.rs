//! Child-process helpers for the ffmpeg invocations of the exporter.

use std::ffi::OsStr;
use std::fmt;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self) -> &mut Self;
}

#[cfg(feature = "tokio")]
impl NoWindowExt for tokio::process::Command {
    fn no_window(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
        self
    }
}

/// Create a `tokio::process::Command` for a supervised child.
///
/// The child gets no console window on Windows and is killed when its
/// handle is dropped, so an exiting host never leaves it orphaned.
#[cfg(feature = "tokio")]
pub fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.no_window().kill_on_drop(true);
    cmd
}

/// How a supervised child process finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    /// The process exited on its own. `code` is `None` when it was
    /// terminated by a signal.
    Exited { code: Option<i32> },
    /// The process was killed because its cancellation token fired.
    Killed,
    /// Waiting on the process failed.
    WaitFailed(String),
}

impl ProcessExit {
    /// Whether the process exited on its own with status 0.
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited { code: Some(0) })
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited { code: Some(code) } => write!(f, "exit status {}", code),
            Self::Exited { code: None } => write!(f, "terminated by signal"),
            Self::Killed => write!(f, "killed"),
            Self::WaitFailed(e) => write!(f, "wait failed: {}", e),
        }
    }
}

/// Spawn a task that waits for `child` to exit and reports how it finished.
///
/// If `cancellation_token` fires first, the child is killed and
/// [`ProcessExit::Killed`] is sent.
#[cfg(feature = "tokio")]
pub fn spawn_process_waiter(
    mut child: tokio::process::Child,
    cancellation_token: tokio_util::sync::CancellationToken,
) -> tokio::sync::oneshot::Receiver<ProcessExit> {
    let (tx, rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let exit = tokio::select! {
            _ = cancellation_token.cancelled() => {
                let _ = child.kill().await;
                ProcessExit::Killed
            }
            status = child.wait() => match status {
                Ok(exit_status) => ProcessExit::Exited { code: exit_status.code() },
                Err(e) => ProcessExit::WaitFailed(e.to_string()),
            }
        };
        let _ = tx.send(exit);
    });

    rx
}
