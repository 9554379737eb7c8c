//! Server process lifecycle.
//!
//! A [`ProcessHandle`] owns the spawned server process for the stream
//! transport. It is cheap to clone so that an interrupt handler on another
//! thread can terminate the server while the session thread is blocked
//! reading from it. Termination never fails: secondary errors are logged and
//! swallowed.

use std::process::{Child, ExitStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// How long a server gets to exit after the termination request.
pub const TERMINATION_GRACE: Duration = Duration::from_secs(5);

/// Interval between liveness polls while waiting for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
struct ProcessSlot {
    child: Option<Child>,
    exit: Option<ExitStatus>,
}

/// Shared handle to a spawned server process.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    slot: Arc<Mutex<ProcessSlot>>,
    pid: u32,
    command: Arc<str>,
}

impl ProcessHandle {
    /// Take ownership of a spawned child.
    pub fn new(child: Child, command: impl Into<String>) -> Self {
        let pid = child.id();
        Self {
            slot: Arc::new(Mutex::new(ProcessSlot {
                child: Some(child),
                exit: None,
            })),
            pid,
            command: Arc::from(command.into()),
        }
    }

    /// OS process id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Command line the process was started with.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Whether the process is still alive.
    ///
    /// Reaps the process if it has exited on its own.
    pub fn is_running(&self) -> bool {
        let mut slot = self.slot.lock();
        let status = match slot.child.as_mut() {
            None => return false,
            Some(child) => child.try_wait(),
        };
        match status {
            Ok(None) => true,
            Ok(Some(status)) => {
                slot.exit = Some(status);
                slot.child = None;
                false
            }
            Err(e) => {
                tracing::warn!(pid = self.pid, error = %e, "failed to poll MCP server process");
                false
            }
        }
    }

    /// Exit status, once the process has been reaped.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.slot.lock().exit
    }

    /// Stop the process: request termination, wait up to `grace`, then kill.
    ///
    /// Idempotent. Safe to call from any thread.
    pub fn terminate(&self, grace: Duration) {
        let mut slot = self.slot.lock();
        let Some(mut child) = slot.child.take() else {
            return;
        };

        if let Ok(Some(status)) = child.try_wait() {
            tracing::debug!(pid = self.pid, %status, "MCP server already exited");
            slot.exit = Some(status);
            return;
        }

        tracing::info!(pid = self.pid, command = %self.command, "terminating MCP server");
        request_termination(&mut child);

        let deadline = Instant::now() + grace;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!(pid = self.pid, %status, "MCP server exited");
                    slot.exit = Some(status);
                    return;
                }
                Ok(None) if Instant::now() < deadline => std::thread::sleep(POLL_INTERVAL),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(pid = self.pid, error = %e, "failed to poll MCP server process");
                    break;
                }
            }
        }

        tracing::warn!(
            pid = self.pid,
            grace_secs = grace.as_secs_f32(),
            "MCP server did not exit in time, killing"
        );
        if let Err(e) = child.kill() {
            tracing::warn!(pid = self.pid, error = %e, "failed to kill MCP server process");
        }
        match child.wait() {
            Ok(status) => slot.exit = Some(status),
            Err(e) => tracing::warn!(pid = self.pid, error = %e, "failed to reap MCP server process"),
        }
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    let pid = child.id() as libc::pid_t;
    // SAFETY: pid belongs to a child we have not yet reaped.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc != 0 {
        tracing::warn!(
            pid,
            error = %std::io::Error::last_os_error(),
            "failed to send SIGTERM to MCP server"
        );
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::warn!(pid = child.id(), error = %e, "failed to stop MCP server process");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    fn spawn_sh(script: &str) -> ProcessHandle {
        let child = Command::new("/bin/sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .expect("failed to spawn /bin/sh");
        ProcessHandle::new(child, script)
    }

    #[test]
    fn test_terminate_running_process() {
        let handle = spawn_sh("sleep 30");
        assert!(handle.is_running());

        handle.terminate(TERMINATION_GRACE);

        assert!(!handle.is_running());
        assert!(handle.exit_status().is_some());
    }

    #[test]
    fn test_terminate_is_idempotent() {
        let handle = spawn_sh("sleep 30");
        handle.terminate(TERMINATION_GRACE);
        handle.terminate(TERMINATION_GRACE);
        assert!(!handle.is_running());
    }

    #[test]
    fn test_kill_after_grace_when_term_ignored() {
        let handle = spawn_sh("trap '' TERM; sleep 30");
        // give the shell a moment to install the trap
        std::thread::sleep(Duration::from_millis(200));

        let started = Instant::now();
        handle.terminate(Duration::from_millis(300));

        assert!(!handle.is_running());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_exited_process_is_reaped() {
        let handle = spawn_sh("exit 3");
        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.is_running() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(!handle.is_running());
        assert_eq!(handle.exit_status().and_then(|s| s.code()), Some(3));

        handle.terminate(TERMINATION_GRACE);
        assert_eq!(handle.exit_status().and_then(|s| s.code()), Some(3));
    }

    #[test]
    fn test_clones_share_state() {
        let handle = spawn_sh("sleep 30");
        let other = handle.clone();
        other.terminate(TERMINATION_GRACE);
        assert!(!handle.is_running());
        assert_eq!(handle.pid(), other.pid());
    }
}
