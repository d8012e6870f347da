// src/exec/child.rs

//! Handle for the single in-flight command execution.

use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    Success,
    /// Non-zero exit. `code` is `None` when the process was killed by a
    /// signal or its status could not be collected.
    Failed { code: Option<i32> },
}

impl ChildOutcome {
    pub fn from_status(status: std::process::ExitStatus) -> Self {
        if status.success() {
            ChildOutcome::Success
        } else {
            ChildOutcome::Failed {
                code: status.code(),
            }
        }
    }
}

impl fmt::Display for ChildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildOutcome::Success => write!(f, "exit status 0"),
            ChildOutcome::Failed { code: Some(code) } => write!(f, "exit status {code}"),
            ChildOutcome::Failed { code: None } => write!(f, "terminated by signal"),
        }
    }
}

/// A running (or finished but not yet observed) command.
///
/// The process itself is owned by a waiter task that sends exactly one
/// [`ChildOutcome`] when it has been reaped. This handle is what the
/// supervisor keeps; the pid doubles as the process-group id.
pub struct ChildProcess {
    pid: u32,
    started_at: Instant,
    exit_rx: oneshot::Receiver<ChildOutcome>,
    outcome: Option<ChildOutcome>,
    kill_tx: Option<oneshot::Sender<()>>,
}

impl fmt::Debug for ChildProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildProcess")
            .field("pid", &self.pid)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

impl ChildProcess {
    pub fn new(pid: u32, exit_rx: oneshot::Receiver<ChildOutcome>) -> Self {
        Self {
            pid,
            started_at: Instant::now(),
            exit_rx,
            outcome: None,
            kill_tx: None,
        }
    }

    /// Attach a channel the waiter task listens on for kill requests.
    pub fn with_kill_request(mut self, kill_tx: oneshot::Sender<()>) -> Self {
        self.kill_tx = Some(kill_tx);
        self
    }

    pub fn id(&self) -> u32 {
        self.pid
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Ask the waiter task to kill the process. Returns false if the request
    /// can no longer be delivered (already requested, or the waiter is done).
    pub fn request_kill(&mut self) -> bool {
        match self.kill_tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Wait until the process has been reaped.
    ///
    /// Cancel-safe, and may be called again after it has resolved.
    pub async fn wait(&mut self) -> ChildOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        // A dropped sender means the waiter task died without reporting.
        let outcome = (&mut self.exit_rx)
            .await
            .unwrap_or(ChildOutcome::Failed { code: None });
        self.outcome = Some(outcome);
        outcome
    }
}
