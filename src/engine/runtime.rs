// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::WatchSpec;
use crate::errors::Result;
use crate::exec::{ChildOutcome, ChildProcess, ProcessBackend};
use crate::types::FailurePolicy;

use super::core::{SupervisorCommand, SupervisorCore};
use super::{ControlSignal, ExitReason, SupervisorInput};

/// How long a kill failure under the `abort` policy waits for the leader
/// before giving up on it.
const ABORT_REAP_GRACE: Duration = Duration::from_millis(500);

/// The parts of a `WatchSpec` the supervisor needs.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub command: Vec<String>,
    pub on_command_failure: FailurePolicy,
    pub on_kill_failure: FailurePolicy,
}

impl SupervisorOptions {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            on_command_failure: FailurePolicy::default(),
            on_kill_failure: FailurePolicy::default(),
        }
    }
}

impl From<&WatchSpec> for SupervisorOptions {
    fn from(spec: &WatchSpec) -> Self {
        Self {
            command: spec.command().to_vec(),
            on_command_failure: spec.on_command_failure(),
            on_kill_failure: spec.on_kill_failure(),
        }
    }
}

/// Owns the single child process and drives `SupervisorCore` from control
/// signals and child exits.
///
/// This is a pure IO shell around the core: it waits on channels, and
/// spawns/kills through its `ProcessBackend`. Nothing else touches the child.
///
/// When a leader exits on its own its group id is kept in `finished_group`,
/// and whatever it left behind is killed before the next spawn or exit.
pub struct Supervisor<B: ProcessBackend> {
    core: SupervisorCore,
    options: SupervisorOptions,
    signals: mpsc::Receiver<ControlSignal>,
    backend: B,
    child: Option<ChildProcess>,
    finished_group: Option<u32>,
}

impl<B: ProcessBackend> fmt::Debug for Supervisor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("core", &self.core)
            .field("child", &self.child)
            .field("finished_group", &self.finished_group)
            .finish_non_exhaustive()
    }
}

impl<B: ProcessBackend> Supervisor<B> {
    pub fn new(
        options: SupervisorOptions,
        signals: mpsc::Receiver<ControlSignal>,
        backend: B,
    ) -> Self {
        Self {
            core: SupervisorCore::new(options.on_command_failure),
            options,
            signals,
            backend,
            child: None,
            finished_group: None,
        }
    }

    /// Main supervisor loop.
    ///
    /// - Spawns the command immediately.
    /// - Waits on control signals and, while a child is alive, its exit.
    /// - Executes the commands returned by the core until one of them is
    ///   `Exit`.
    ///
    /// Returns the exit reason, or an error for fatal conditions (spawn
    /// failure, kill failure under the `abort` policy).
    pub async fn run(mut self) -> Result<ExitReason> {
        info!(cmd = %self.options.command.join(" "), "supervisor started");

        let mut step = self.core.start();
        loop {
            for command in step.commands {
                if let Some(reason) = self.execute_command(command).await? {
                    info!(%reason, "exit");
                    return Ok(reason);
                }
            }

            let input = self.next_input().await;
            step = self.core.step(input);
        }
    }

    /// Wait for the next input: a two-source wait while a child is alive,
    /// otherwise control signals only.
    async fn next_input(&mut self) -> SupervisorInput {
        let input = match self.child.as_mut() {
            Some(child) => {
                let signals = &mut self.signals;
                tokio::select! {
                    biased;
                    outcome = child.wait() => SupervisorInput::ChildExited(outcome),
                    signal = signals.recv() => to_input(signal),
                }
            }
            None => {
                info!("waiting for changes");
                to_input(self.signals.recv().await)
            }
        };

        match &input {
            SupervisorInput::ChildExited(outcome) => {
                let pid = self.child.take().map(|c| c.id());
                self.report_exit(pid, *outcome);
                self.finished_group = pid;
            }
            SupervisorInput::Signal(signal) => debug!(%signal, "control signal received"),
            SupervisorInput::SignalsClosed => debug!("control signal channel closed"),
        }

        input
    }

    fn report_exit(&self, pid: Option<u32>, outcome: ChildOutcome) {
        match (outcome, self.options.on_command_failure) {
            (ChildOutcome::Success, _) => info!(?pid, "command finished"),
            (ChildOutcome::Failed { code }, FailurePolicy::Continue) => {
                warn!(?pid, ?code, "command exited with failure")
            }
            (ChildOutcome::Failed { code }, FailurePolicy::Abort) => {
                error!(?pid, ?code, "command exited with failure")
            }
        }
    }

    /// Execute a single command from the core. Returns the exit reason for
    /// `Exit`.
    async fn execute_command(&mut self, command: SupervisorCommand) -> Result<Option<ExitReason>> {
        match command {
            SupervisorCommand::Spawn => {
                self.spawn_child()?;
                Ok(None)
            }
            SupervisorCommand::KillAndReap => {
                self.kill_and_reap().await?;
                Ok(None)
            }
            SupervisorCommand::Exit(reason) => {
                self.kill_finished_group()?;
                Ok(Some(reason))
            }
        }
    }

    fn spawn_child(&mut self) -> Result<()> {
        debug_assert!(self.child.is_none(), "spawn with a live child");
        self.kill_finished_group()?;

        let child = self.backend.spawn(&self.options.command).map_err(|err| {
            error!(error = %err, "failed to start command");
            err
        })?;
        info!(pid = child.id(), cmd = %self.options.command.join(" "), "started command");
        self.child = Some(child);
        Ok(())
    }

    async fn kill_and_reap(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            debug!("no live command to stop");
            return Ok(());
        };
        let pid = child.id();

        if let Err(err) = self.backend.kill_group(&mut child) {
            // Fall back to the leader alone.
            child.request_kill();
            match self.options.on_kill_failure {
                FailurePolicy::Abort => {
                    error!(pid, error = %err, "failed to kill command");
                    if tokio::time::timeout(ABORT_REAP_GRACE, child.wait()).await.is_err() {
                        error!(pid, "exiting with the command's process group still running");
                    }
                    return Err(err);
                }
                FailurePolicy::Continue => {
                    warn!(pid, error = %err, "failed to kill command; waiting for it to exit");
                }
            }
        }

        // The next spawn must not happen before the group is reaped.
        let outcome = child.wait().await;
        info!(pid, %outcome, uptime_ms = child.uptime().as_millis() as u64, "stopped command");
        Ok(())
    }

    /// Kill what the last naturally finished command left in its group.
    fn kill_finished_group(&mut self) -> Result<()> {
        let Some(pgid) = self.finished_group.take() else {
            return Ok(());
        };

        match self.backend.kill_leftovers(pgid) {
            Ok(true) => {
                info!(pgid, "killed processes left behind by finished command");
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(err) => match self.options.on_kill_failure {
                FailurePolicy::Abort => {
                    error!(pgid, error = %err, "failed to kill leftover processes");
                    Err(err)
                }
                FailurePolicy::Continue => {
                    warn!(pgid, error = %err, "failed to kill leftover processes");
                    Ok(())
                }
            },
        }
    }
}

fn to_input(signal: Option<ControlSignal>) -> SupervisorInput {
    match signal {
        Some(signal) => SupervisorInput::Signal(signal),
        None => SupervisorInput::SignalsClosed,
    }
}
