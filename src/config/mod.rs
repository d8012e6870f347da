// src/config/mod.rs

//! Configuration loading and validation for watchrun.
//!
//! Responsibilities:
//! - Define the raw (file/CLI) and validated watch spec (`model.rs`).
//! - Load an optional TOML file and merge CLI flags (`loader.rs`).
//! - Validate roots, command and filters (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_from_path, raw_from_args, resolve_spec};
pub use model::{split_command, RawWatchSpec, WatchSpec};
pub use validate::validate_raw_spec;
