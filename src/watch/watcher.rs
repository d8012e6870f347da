// src/watch/watcher.rs

use notify::{Config, Event, RecommendedWatcher, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::WatchSpec;
use crate::engine::ControlSignal;
use crate::errors::Result;
use crate::fs::RealFileSystem;
use crate::watch::registrar::{register_roots, Registration};
use crate::watch::router::EventRouter;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    registration: Registration,
    router: JoinHandle<()>,
}

impl WatcherHandle {
    /// Directories registered at startup.
    pub fn registration(&self) -> &Registration {
        &self.registration
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.router.abort();
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("directories", &self.registration.directories.len())
            .finish_non_exhaustive()
    }
}

/// Register every root of `spec` with a notify watcher and start the event
/// router.
///
/// - `signal_tx` is the ordered channel into the supervisor.
/// - `interrupt_rx` delivers one `()` per Ctrl-C.
///
/// Registration failures (including inotify limits) are returned before the
/// router starts; the partially populated watcher is dropped with the error.
pub fn spawn_watcher(
    spec: &WatchSpec,
    signal_tx: mpsc::Sender<ControlSignal>,
    interrupt_rx: mpsc::Receiver<()>,
) -> Result<WatcherHandle> {
    // Channel from the blocking notify callback into the async world.
    let (raw_tx, raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // Only fails once the router is gone, at which point nobody cares.
            let _ = raw_tx.send(res);
        },
        Config::default(),
    )?;

    let registration = register_roots(&RealFileSystem, spec.filter(), spec.roots(), &mut watcher)?;

    info!(
        directories = registration.directories.len(),
        ignored_files = registration.ignored_files.len(),
        "file watcher started"
    );

    let router = EventRouter::new(spec.filter().clone(), signal_tx);
    let router = tokio::spawn(router.run(raw_rx, interrupt_rx));

    Ok(WatcherHandle {
        _inner: watcher,
        registration,
        router,
    })
}
