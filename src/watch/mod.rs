// src/watch/mod.rs

//! File watching and change routing.
//!
//! This module is responsible for:
//! - Registering every non-hidden directory under the watch roots.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Classifying raw events into `ControlSignal`s and applying the
//!   include/exclude filter.
//!
//! It does **not** know about child processes; it only turns filesystem
//! changes and Ctrl-C into an ordered stream of control signals.

pub mod filter;
pub mod registrar;
pub mod router;
pub mod watcher;

pub use filter::NameFilter;
pub use registrar::{is_hidden, register_roots, PathRegistrar, Registration, WatchBackend};
pub use router::{expand_event, spawn_interrupt_listener, ChangeMask, EventRouter};
pub use watcher::{spawn_watcher, WatcherHandle};
