use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use watchrun::errors::{Result, WatchrunError};
use watchrun::exec::{ChildOutcome, ChildProcess, ProcessBackend};

/// What happened to the fake processes, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeOp {
    Spawned(u32),
    Killed(u32),
    Exited(u32),
    /// Members left behind by an exited leader were killed.
    LeftoversKilled(u32),
}

#[derive(Default)]
struct FakeState {
    next_pid: u32,
    live: BTreeMap<u32, oneshot::Sender<ChildOutcome>>,
    /// Groups whose leader exited while other members kept running.
    leftovers: BTreeSet<u32>,
    ops: Vec<FakeOp>,
    max_live: usize,
    fail_spawn: bool,
    kill_races_exit: bool,
    kill_fails: bool,
}

impl FakeState {
    fn live_groups(&self) -> usize {
        self.live.len() + self.leftovers.len()
    }
}

/// A process backend that never touches the OS.
///
/// - records every spawn, kill and natural exit
/// - tracks the largest number of simultaneously live process groups,
///   counting groups whose leader exited but left members behind
/// - lets the test finish a child naturally with [`FakeProcessBackend::exit_current`]
///
/// Clones share state, so keep one clone in the test and move the other
/// into the supervisor.
#[derive(Clone, Default)]
pub struct FakeProcessBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProcessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every spawn fails as if the executable did not exist.
    pub fn failing_spawn() -> Self {
        let backend = Self::new();
        backend.state.lock().unwrap().fail_spawn = true;
        backend
    }

    /// Make kills lose the race with a natural exit: the child is reaped
    /// with success, but `kill_group` reports "no such process".
    pub fn set_kill_races_exit(&self, val: bool) {
        self.state.lock().unwrap().kill_races_exit = val;
    }

    /// Make kills fail outright: the child keeps running.
    pub fn set_kill_fails(&self, val: bool) {
        self.state.lock().unwrap().kill_fails = val;
    }

    /// Finish the newest live child with `outcome`. Returns its pid.
    pub fn exit_current(&self, outcome: ChildOutcome) -> Option<u32> {
        self.finish_current(outcome, false)
    }

    /// Like [`FakeProcessBackend::exit_current`], but the leader leaves a
    /// background member running in its group.
    pub fn exit_current_leaving_group(&self, outcome: ChildOutcome) -> Option<u32> {
        self.finish_current(outcome, true)
    }

    fn finish_current(&self, outcome: ChildOutcome, leave_group: bool) -> Option<u32> {
        let mut state = self.state.lock().unwrap();
        let pid = *state.live.keys().next_back()?;
        let tx = state.live.remove(&pid)?;
        if leave_group {
            state.leftovers.insert(pid);
        }
        state.ops.push(FakeOp::Exited(pid));
        let _ = tx.send(outcome);
        Some(pid)
    }

    pub fn ops(&self) -> Vec<FakeOp> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn spawned(&self) -> Vec<u32> {
        self.filter_ops(|op| match op {
            FakeOp::Spawned(pid) => Some(pid),
            _ => None,
        })
    }

    pub fn killed(&self) -> Vec<u32> {
        self.filter_ops(|op| match op {
            FakeOp::Killed(pid) => Some(pid),
            _ => None,
        })
    }

    /// Live process groups, including leftovers of exited leaders.
    pub fn live_count(&self) -> usize {
        self.state.lock().unwrap().live_groups()
    }

    /// Largest number of live process groups ever observed at once.
    pub fn max_live(&self) -> usize {
        self.state.lock().unwrap().max_live
    }

    fn filter_ops(&self, f: impl Fn(FakeOp) -> Option<u32>) -> Vec<u32> {
        self.state
            .lock()
            .unwrap()
            .ops
            .iter()
            .copied()
            .filter_map(f)
            .collect()
    }
}

impl ProcessBackend for FakeProcessBackend {
    fn spawn(&mut self, argv: &[String]) -> Result<ChildProcess> {
        let mut state = self.state.lock().unwrap();
        if state.fail_spawn {
            return Err(WatchrunError::Spawn {
                program: argv.first().cloned().unwrap_or_default(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        state.next_pid += 1;
        let pid = 1000 + state.next_pid;
        let (tx, rx) = oneshot::channel();
        state.live.insert(pid, tx);
        state.max_live = state.max_live.max(state.live_groups());
        state.ops.push(FakeOp::Spawned(pid));

        Ok(ChildProcess::new(pid, rx))
    }

    fn kill_group(&mut self, child: &mut ChildProcess) -> Result<()> {
        let pid = child.id();
        let mut state = self.state.lock().unwrap();
        let no_such_process = || WatchrunError::Kill {
            pid,
            source: std::io::Error::other("no such process"),
        };

        if state.kill_fails {
            return Err(WatchrunError::Kill {
                pid,
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }

        let Some(tx) = state.live.remove(&pid) else {
            return Err(no_such_process());
        };

        if state.kill_races_exit {
            state.ops.push(FakeOp::Exited(pid));
            let _ = tx.send(ChildOutcome::Success);
            return Err(no_such_process());
        }

        state.ops.push(FakeOp::Killed(pid));
        let _ = tx.send(ChildOutcome::Failed { code: None });
        Ok(())
    }

    fn kill_leftovers(&mut self, pgid: u32) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if !state.leftovers.remove(&pgid) {
            return Ok(false);
        }
        state.ops.push(FakeOp::LeftoversKilled(pgid));
        Ok(true)
    }
}
