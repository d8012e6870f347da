// src/watch/router.rs

//! Turns raw `notify` events and interrupt notifications into
//! [`ControlSignal`]s for the supervisor.
//!
//! The router owns no process state. It only classifies, filters and forwards,
//! one signal at a time, on a single ordered channel.

use std::path::PathBuf;

use notify::event::{EventKind, MetadataKind, ModifyKind, RenameMode};
use notify::Event;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::ControlSignal;
use crate::watch::filter::NameFilter;

/// The three change bits a raw event can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeMask {
    pub write: bool,
    pub create: bool,
    pub remove: bool,
}

impl ChangeMask {
    /// Classify a backend event kind.
    ///
    /// A timestamp change counts as a write, so `touch` on an existing file
    /// is one write. inotify reports every attribute change as
    /// `Metadata(Any)`, so there a chmod counts too. Backends that name the
    /// attribute drop permission and ownership changes. Access events carry
    /// no bit, including close-after-write.
    ///
    /// A move-out (`Name(From)`) carries no bit; a move-in counts as a create.
    pub fn from_kind(kind: &EventKind) -> Self {
        let mut mask = ChangeMask::default();
        match kind {
            EventKind::Create(_) => mask.create = true,
            EventKind::Remove(_) => mask.remove = true,
            EventKind::Modify(ModifyKind::Name(mode)) => match mode {
                RenameMode::To => mask.create = true,
                RenameMode::Both | RenameMode::Any => {
                    mask.create = true;
                    mask.remove = true;
                }
                RenameMode::From | RenameMode::Other => {}
            },
            EventKind::Modify(ModifyKind::Metadata(
                MetadataKind::WriteTime | MetadataKind::Any,
            )) => mask.write = true,
            EventKind::Modify(ModifyKind::Metadata(_)) => {}
            EventKind::Modify(_) => mask.write = true,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
        }
        mask
    }

    pub fn is_empty(&self) -> bool {
        !(self.write || self.create || self.remove)
    }
}

/// Expand one raw event into control signals.
///
/// Each set bit yields its own signal, in the order write, create, remove.
/// For a two-path rename (`Name(Both)`) the create applies to the destination
/// and the remove to the source; otherwise each bit applies to every path.
pub fn expand_event(event: &Event) -> Vec<ControlSignal> {
    let mask = ChangeMask::from_kind(&event.kind);
    if mask.is_empty() {
        return Vec::new();
    }

    let (created, removed): (&[PathBuf], &[PathBuf]) = match (&event.kind, event.paths.as_slice()) {
        (EventKind::Modify(ModifyKind::Name(RenameMode::Both)), [from, to]) => {
            (std::slice::from_ref(to), std::slice::from_ref(from))
        }
        (_, paths) => (paths, paths),
    };

    let mut signals = Vec::new();
    if mask.write {
        signals.extend(event.paths.iter().cloned().map(ControlSignal::Modified));
    }
    if mask.create {
        signals.extend(created.iter().cloned().map(ControlSignal::Created));
    }
    if mask.remove {
        signals.extend(removed.iter().cloned().map(ControlSignal::Removed));
    }
    signals
}

/// Forwards filtered control signals to the supervisor.
#[derive(Debug)]
pub struct EventRouter {
    filter: NameFilter,
    signal_tx: mpsc::Sender<ControlSignal>,
}

impl EventRouter {
    pub fn new(filter: NameFilter, signal_tx: mpsc::Sender<ControlSignal>) -> Self {
        Self { filter, signal_tx }
    }

    /// Whether a signal passes the name filter. `Interrupt` always passes.
    pub fn admits(&self, signal: &ControlSignal) -> bool {
        match signal.path() {
            Some(path) => self.filter.allows(path),
            None => true,
        }
    }

    /// Main router loop.
    ///
    /// Runs until the supervisor drops its receiver, or until both the raw
    /// event source and the interrupt source are closed.
    pub async fn run(
        self,
        mut raw_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
        mut interrupt_rx: mpsc::Receiver<()>,
    ) {
        let mut raw_open = true;
        let mut interrupts_open = true;

        while raw_open || interrupts_open {
            tokio::select! {
                res = raw_rx.recv(), if raw_open => match res {
                    Some(Ok(event)) => {
                        if !self.route_event(&event).await {
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "file watch error");
                    }
                    None => {
                        debug!("raw event source closed");
                        raw_open = false;
                    }
                },
                res = interrupt_rx.recv(), if interrupts_open => match res {
                    Some(()) => {
                        info!("interrupt received");
                        if !self.forward(ControlSignal::Interrupt).await {
                            break;
                        }
                    }
                    None => {
                        debug!("interrupt source closed");
                        interrupts_open = false;
                    }
                },
            }
        }

        debug!("event router finished");
    }

    /// Returns false once the supervisor is gone.
    async fn route_event(&self, event: &Event) -> bool {
        for signal in expand_event(event) {
            if !self.admits(&signal) {
                debug!(%signal, "ignored change (filtered out)");
                continue;
            }
            info!(%signal, "change detected");
            if !self.forward(signal).await {
                return false;
            }
        }
        true
    }

    async fn forward(&self, signal: ControlSignal) -> bool {
        if let Err(err) = self.signal_tx.send(signal).await {
            debug!(signal = %err.0, "supervisor gone; stopping router");
            return false;
        }
        true
    }
}

/// Listen for Ctrl-C for the lifetime of the process.
///
/// Every received signal produces one `()` on the returned channel, so a
/// second Ctrl-C during shutdown is still seen.
pub fn spawn_interrupt_listener() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel::<()>(8);
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl-C");
                return;
            }
            if tx.send(()).await.is_err() {
                return;
            }
        }
    });
    rx
}
