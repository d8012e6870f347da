// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the watched command, using
//! `tokio::process::Command`, and reporting its exit back to the supervisor.
//!
//! - [`child`] holds the `ChildProcess` handle and `ChildOutcome`.
//! - [`backend`] provides the `ProcessBackend` trait and the concrete
//!   `RealProcessBackend` used in production, which tests can replace with a
//!   fake implementation.

pub mod backend;
pub mod child;

pub use backend::{ProcessBackend, RealProcessBackend};
pub use child::{ChildOutcome, ChildProcess};
