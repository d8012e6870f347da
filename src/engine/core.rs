// src/engine/core.rs

//! Pure supervisor state machine.
//!
//! This module contains a synchronous, deterministic core that consumes
//! [`SupervisorInput`]s and produces:
//! - an updated state
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Supervisor`) is responsible for:
//! - waiting on the control-signal channel and the child's exit
//! - spawning and killing processes through a `ProcessBackend`
//!
//! The core has no channels, no Tokio types and does no IO, so every
//! transition can be unit tested directly.

use crate::engine::{ControlSignal, ExitReason, SupervisorInput};
use crate::exec::ChildOutcome;
use crate::types::FailurePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// No child yet.
    Idle,
    /// Child alive.
    Running,
    /// Child finished on its own; nothing runs until the next change.
    Waiting,
    /// Shutting down; all further input is ignored.
    Terminating,
}

/// Command produced by the core, executed in order by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorCommand {
    Spawn,
    /// Kill the child's process group and block until it is reaped.
    KillAndReap,
    Exit(ExitReason),
}

/// Commands returned by the core after one input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorStep {
    pub commands: Vec<SupervisorCommand>,
}

impl SupervisorStep {
    fn of(commands: impl Into<Vec<SupervisorCommand>>) -> Self {
        Self {
            commands: commands.into(),
        }
    }

    /// The exit reason, if this step ends the supervisor.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.commands.iter().find_map(|c| match c {
            SupervisorCommand::Exit(reason) => Some(*reason),
            _ => None,
        })
    }
}

#[derive(Debug)]
pub struct SupervisorCore {
    state: SupervisorState,
    on_command_failure: FailurePolicy,
    spawns: u64,
}

impl SupervisorCore {
    pub fn new(on_command_failure: FailurePolicy) -> Self {
        Self {
            state: SupervisorState::Idle,
            on_command_failure,
            spawns: 0,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Number of spawns requested so far.
    pub fn spawns(&self) -> u64 {
        self.spawns
    }

    /// Initial transition: `Idle` -> `Running`.
    pub fn start(&mut self) -> SupervisorStep {
        match self.state {
            SupervisorState::Idle => self.spawn_step(Vec::new()),
            _ => SupervisorStep::default(),
        }
    }

    /// Handle a single input, updating state and returning the commands for
    /// the IO shell.
    pub fn step(&mut self, input: SupervisorInput) -> SupervisorStep {
        use SupervisorState::*;

        match (self.state, input) {
            (Terminating, _) => SupervisorStep::default(),

            (Running, SupervisorInput::ChildExited(outcome)) => {
                if let ChildOutcome::Failed { code } = outcome {
                    if self.on_command_failure == FailurePolicy::Abort {
                        return self.exit_step(Vec::new(), ExitReason::CommandFailed { code });
                    }
                }
                self.state = Waiting;
                SupervisorStep::default()
            }
            // A late exit report with no live child changes nothing.
            (Idle | Waiting, SupervisorInput::ChildExited(_)) => SupervisorStep::default(),

            (Running, SupervisorInput::Signal(ControlSignal::Interrupt)) => {
                self.exit_step(vec![SupervisorCommand::KillAndReap], ExitReason::Interrupted)
            }
            (Idle | Waiting, SupervisorInput::Signal(ControlSignal::Interrupt)) => {
                self.exit_step(Vec::new(), ExitReason::Interrupted)
            }

            // The kind of change is informational only.
            (Running, SupervisorInput::Signal(_)) => {
                self.spawn_step(vec![SupervisorCommand::KillAndReap])
            }
            (Idle | Waiting, SupervisorInput::Signal(_)) => self.spawn_step(Vec::new()),

            (Running, SupervisorInput::SignalsClosed) => {
                self.exit_step(vec![SupervisorCommand::KillAndReap], ExitReason::SignalsClosed)
            }
            (Idle | Waiting, SupervisorInput::SignalsClosed) => {
                self.exit_step(Vec::new(), ExitReason::SignalsClosed)
            }
        }
    }

    fn spawn_step(&mut self, mut commands: Vec<SupervisorCommand>) -> SupervisorStep {
        commands.push(SupervisorCommand::Spawn);
        self.state = SupervisorState::Running;
        self.spawns += 1;
        SupervisorStep::of(commands)
    }

    fn exit_step(
        &mut self,
        mut commands: Vec<SupervisorCommand>,
        reason: ExitReason,
    ) -> SupervisorStep {
        commands.push(SupervisorCommand::Exit(reason));
        self.state = SupervisorState::Terminating;
        SupervisorStep::of(commands)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn modified() -> SupervisorInput {
        SupervisorInput::Signal(ControlSignal::Modified(PathBuf::from("a.txt")))
    }

    fn interrupt() -> SupervisorInput {
        SupervisorInput::Signal(ControlSignal::Interrupt)
    }

    #[test]
    fn start_spawns_once() {
        let mut core = SupervisorCore::new(FailurePolicy::Continue);
        assert_eq!(core.start().commands, vec![SupervisorCommand::Spawn]);
        assert_eq!(core.state(), SupervisorState::Running);
        assert!(core.start().commands.is_empty());
    }

    #[test]
    fn change_while_running_kills_then_respawns() {
        let mut core = SupervisorCore::new(FailurePolicy::Continue);
        core.start();
        let step = core.step(modified());
        assert_eq!(
            step.commands,
            vec![SupervisorCommand::KillAndReap, SupervisorCommand::Spawn]
        );
        assert_eq!(core.state(), SupervisorState::Running);
    }

    #[test]
    fn natural_exit_waits_for_next_change() {
        let mut core = SupervisorCore::new(FailurePolicy::Continue);
        core.start();
        assert!(core.step(SupervisorInput::ChildExited(ChildOutcome::Success)).commands.is_empty());
        assert_eq!(core.state(), SupervisorState::Waiting);

        let removed = SupervisorInput::Signal(ControlSignal::Removed(PathBuf::from("gone")));
        assert_eq!(core.step(removed).commands, vec![SupervisorCommand::Spawn]);
        assert_eq!(core.spawns(), 2);
    }

    #[test]
    fn failure_is_absorbed_under_continue() {
        let mut core = SupervisorCore::new(FailurePolicy::Continue);
        core.start();
        let step = core.step(SupervisorInput::ChildExited(ChildOutcome::Failed { code: Some(2) }));
        assert!(step.commands.is_empty());
        assert_eq!(core.state(), SupervisorState::Waiting);
    }

    #[test]
    fn failure_exits_under_abort() {
        let mut core = SupervisorCore::new(FailurePolicy::Abort);
        core.start();
        let step = core.step(SupervisorInput::ChildExited(ChildOutcome::Failed { code: Some(2) }));
        assert_eq!(
            step.exit_reason(),
            Some(ExitReason::CommandFailed { code: Some(2) })
        );
        assert_eq!(core.state(), SupervisorState::Terminating);
    }

    #[test]
    fn interrupt_kills_live_child_before_exit() {
        let mut core = SupervisorCore::new(FailurePolicy::Continue);
        core.start();
        assert_eq!(
            core.step(interrupt()).commands,
            vec![
                SupervisorCommand::KillAndReap,
                SupervisorCommand::Exit(ExitReason::Interrupted)
            ]
        );
    }

    #[test]
    fn interrupt_with_dead_child_exits_directly() {
        let mut core = SupervisorCore::new(FailurePolicy::Continue);
        core.start();
        core.step(SupervisorInput::ChildExited(ChildOutcome::Success));
        assert_eq!(
            core.step(interrupt()).commands,
            vec![SupervisorCommand::Exit(ExitReason::Interrupted)]
        );
        assert_eq!(ExitReason::Interrupted.exit_code(), 1);
    }

    #[test]
    fn terminating_ignores_everything() {
        let mut core = SupervisorCore::new(FailurePolicy::Continue);
        core.start();
        core.step(interrupt());
        assert!(core.step(modified()).commands.is_empty());
        assert!(core.step(interrupt()).commands.is_empty());
    }
}
