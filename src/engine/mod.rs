// src/engine/mod.rs

//! Process supervision engine for watchrun.
//!
//! This module ties together:
//! - the control signals produced by the event router
//! - the supervisor state machine that decides when to spawn, kill and exit
//! - the async loop that waits on signals and child exits
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;
use std::path::{Path, PathBuf};

use crate::exec::ChildOutcome;

/// Normalized message driving the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlSignal {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
    Interrupt,
}

impl ControlSignal {
    /// The triggering path; `None` for `Interrupt`.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ControlSignal::Modified(p) | ControlSignal::Created(p) | ControlSignal::Removed(p) => {
                Some(p)
            }
            ControlSignal::Interrupt => None,
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, ControlSignal::Interrupt)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ControlSignal::Modified(_) => "modified",
            ControlSignal::Created(_) => "created",
            ControlSignal::Removed(_) => "removed",
            ControlSignal::Interrupt => "interrupt",
        }
    }
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path() {
            Some(path) => write!(f, "{} {}", self.kind(), path.display()),
            None => f.write_str(self.kind()),
        }
    }
}

/// Why the supervisor stopped. Every reason maps to exit status 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Ctrl-C.
    Interrupted,
    /// The command failed under the `abort` policy.
    CommandFailed { code: Option<i32> },
    /// The control-signal channel closed (watcher went away).
    SignalsClosed,
}

impl ExitReason {
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Interrupted => f.write_str("interrupted"),
            ExitReason::CommandFailed { code: Some(code) } => {
                write!(f, "command failed with exit status {code}")
            }
            ExitReason::CommandFailed { code: None } => {
                f.write_str("command terminated by signal")
            }
            ExitReason::SignalsClosed => f.write_str("change source closed"),
        }
    }
}

/// Inputs to the supervisor core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorInput {
    Signal(ControlSignal),
    ChildExited(ChildOutcome),
    SignalsClosed,
}

pub mod core;
pub mod runtime;

pub use self::core::{SupervisorCommand, SupervisorCore, SupervisorState, SupervisorStep};
pub use self::runtime::{Supervisor, SupervisorOptions};
