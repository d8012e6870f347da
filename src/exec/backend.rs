// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The supervisor talks to a `ProcessBackend` instead of `tokio::process`
//! directly. This makes it easy to swap in a fake backend in tests while
//! keeping the production implementation here.
//!
//! - `RealProcessBackend` spawns each command as the leader of a new process
//!   group and kills the whole group with `SIGKILL`.
//! - Tests can provide their own `ProcessBackend` that hands out
//!   [`ChildProcess`] handles wired to channels they control.

use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::errors::{Result, WatchrunError};
use crate::exec::child::{ChildOutcome, ChildProcess};

/// Trait abstracting how the supervised command is started and stopped.
pub trait ProcessBackend: Send {
    /// Start `argv` (program first) in a new process group.
    fn spawn(&mut self, argv: &[String]) -> Result<ChildProcess>;

    /// Forcefully kill every process in the child's group.
    ///
    /// Does not wait; the caller reaps with [`ChildProcess::wait`].
    fn kill_group(&mut self, child: &mut ChildProcess) -> Result<()>;

    /// Kill whatever is left in the group `pgid` after its leader exited on
    /// its own. Returns whether anything was still there.
    ///
    /// The leftovers are no longer our children, so they cannot be reaped
    /// here; `SIGKILL` guarantees they never run again.
    fn kill_leftovers(&mut self, pgid: u32) -> Result<bool>;
}

/// Real backend used in production.
#[derive(Debug, Default)]
pub struct RealProcessBackend;

impl RealProcessBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessBackend for RealProcessBackend {
    fn spawn(&mut self, argv: &[String]) -> Result<ChildProcess> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| WatchrunError::ConfigError("empty command".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| WatchrunError::Spawn {
            program: program.clone(),
            source,
        })?;

        let pid = child.id().ok_or_else(|| WatchrunError::Spawn {
            program: program.clone(),
            source: std::io::Error::other("process exited before its pid was read"),
        })?;

        let (exit_tx, exit_rx) = oneshot::channel::<ChildOutcome>();
        let (kill_tx, mut kill_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                Ok(()) = &mut kill_rx => {
                    if let Err(e) = child.start_kill() {
                        debug!(pid, error = %e, "kill request for already exited process");
                    }
                    child.wait().await
                }
            };

            let outcome = match status {
                Ok(status) => ChildOutcome::from_status(status),
                Err(e) => {
                    warn!(pid, error = %e, "failed to wait for command");
                    ChildOutcome::Failed { code: None }
                }
            };
            // The supervisor may have dropped the handle while shutting down.
            let _ = exit_tx.send(outcome);
        });

        Ok(ChildProcess::new(pid, exit_rx).with_kill_request(kill_tx))
    }

    #[cfg(unix)]
    fn kill_group(&mut self, child: &mut ChildProcess) -> Result<()> {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let pid = child.id();
        let pgid = i32::try_from(pid).map_err(|_| WatchrunError::Kill {
            pid,
            source: std::io::Error::other("pid out of range"),
        })?;

        killpg(Pid::from_raw(pgid), Signal::SIGKILL).map_err(|errno| WatchrunError::Kill {
            pid,
            source: std::io::Error::from_raw_os_error(errno as i32),
        })
    }

    #[cfg(unix)]
    fn kill_leftovers(&mut self, pgid: u32) -> Result<bool> {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let raw = i32::try_from(pgid).map_err(|_| WatchrunError::Kill {
            pid: pgid,
            source: std::io::Error::other("pid out of range"),
        })?;

        match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(errno) => Err(WatchrunError::Kill {
                pid: pgid,
                source: std::io::Error::from_raw_os_error(errno as i32),
            }),
        }
    }

    // Without process groups only the leader can be reached.
    #[cfg(not(unix))]
    fn kill_group(&mut self, child: &mut ChildProcess) -> Result<()> {
        if child.request_kill() {
            Ok(())
        } else {
            Err(WatchrunError::Kill {
                pid: child.id(),
                source: std::io::Error::other("process already exited"),
            })
        }
    }

    #[cfg(not(unix))]
    fn kill_leftovers(&mut self, _pgid: u32) -> Result<bool> {
        Ok(false)
    }
}
