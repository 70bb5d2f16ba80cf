//! Observers notified whenever the supervisor starts a process.
use std::sync::Mutex;

use nix::{
    errno::Errno,
    sys::signal::{self, Signal},
    unistd::Pid,
};
use tracing::{debug, warn};

/// Notified synchronously, on the supervising thread, right after each spawn.
pub trait ProcessMonitor: Send + Sync {
    fn process_started(&self, pid: u32);
}

impl<F> ProcessMonitor for F
where
    F: Fn(u32) + Send + Sync,
{
    fn process_started(&self, pid: u32) {
        self(pid)
    }
}

/// Remembers every started process so they can be killed later.
///
/// Test harnesses and the CLI's interrupt handler use this to take down a
/// run-forever supervisor's children, since the supervisor itself has no stop.
#[derive(Debug, Default)]
pub struct ProcessKiller {
    pids: Mutex<Vec<u32>>,
}

impl ProcessKiller {
    pub fn new() -> Self {
        Self::default()
    }

    /// PIDs recorded so far, in start order.
    pub fn pids(&self) -> Vec<u32> {
        self.pids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Sends `SIGKILL` to every recorded process group and forgets them.
    ///
    /// Supervised children lead their own group, so this also takes down
    /// anything they forked. A pid that leads no group is signalled directly.
    pub fn kill_all(&self) {
        let pids = std::mem::take(
            &mut *self
                .pids
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for pid in pids {
            let target = Pid::from_raw(pid as i32);
            let result = match signal::killpg(target, Signal::SIGKILL) {
                Err(Errno::ESRCH) => signal::kill(target, Signal::SIGKILL),
                other => other,
            };
            match result {
                Ok(()) => debug!("Killed process group {pid}"),
                Err(Errno::ESRCH) => debug!("Process {pid} already exited"),
                Err(err) => warn!("Failed to kill process {pid}: {err}"),
            }
        }
    }
}

impl ProcessMonitor for ProcessKiller {
    fn process_started(&self, pid: u32) {
        self.pids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(pid);
    }
}
