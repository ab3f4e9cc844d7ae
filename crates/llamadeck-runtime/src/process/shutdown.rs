//! Stop requests for external processes.
//!
//! Stopping is always two-phase: a catchable signal first, then
//! `Child::start_kill` once the grace period elapses without an exit.
//! Neither phase waits for the process to die.
//!
//! # Platform behavior
//! - Unix: `SIGINT` for explicit stops, `SIGTERM` for the watchdog (via nix)
//! - Windows: no catchable signal exists; the first phase reports
//!   `false` and the caller kills immediately

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;
use tracing::debug;

/// The catchable signal sent in the first phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// Interrupt, as from Ctrl-C. Used by stop-all and stop-query.
    Interrupt,
    /// Termination request. Used by the stuck-process watchdog.
    Terminate,
}

/// Send `sig` to `pid`.
///
/// Returns `true` if the signal was delivered, or if the process is already
/// gone. Returns `false` when the caller should fall back to a forced kill.
#[cfg(unix)]
pub fn send_stop_signal(pid: u32, sig: StopSignal) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    let signal = match sig {
        StopSignal::Interrupt => Signal::SIGINT,
        StopSignal::Terminate => Signal::SIGTERM,
    };

    match signal::kill(Pid::from_raw(raw), signal) {
        Ok(()) => {
            debug!(pid, ?signal, "Sent stop signal");
            true
        }
        // Process already exited
        Err(nix::errno::Errno::ESRCH) => true,
        Err(e) => {
            debug!(pid, ?signal, error = %e, "Failed to send stop signal");
            false
        }
    }
}

#[cfg(not(unix))]
pub fn send_stop_signal(pid: u32, sig: StopSignal) -> bool {
    debug!(pid, ?sig, "No catchable stop signal on this platform");
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::process::Command;

    #[tokio::test]
    async fn interrupt_stops_sleep() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id().unwrap();

        assert!(send_stop_signal(pid, StopSignal::Interrupt));
        let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn signal_to_reaped_process_is_ok() {
        let mut child = Command::new("true").spawn().unwrap();
        let pid = child.id().unwrap();
        child.wait().await.unwrap();

        assert!(send_stop_signal(pid, StopSignal::Terminate));
    }
}
