// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::cli::CliArgs;
use crate::config::model::{RawWatchSpec, WatchSpec};
use crate::errors::Result;

/// Load a spec file from a given path and return the raw `RawWatchSpec`.
///
/// This only performs TOML deserialization; it does **not** check that roots
/// exist or that patterns compile. Use [`resolve_spec`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawWatchSpec> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawWatchSpec = toml::from_str(&contents)?;
    Ok(raw)
}

/// Build the raw spec for this invocation: the `--config` file (if any)
/// with CLI flags layered on top.
pub fn raw_from_args(args: &CliArgs) -> Result<RawWatchSpec> {
    let base = match &args.config {
        Some(path) => load_from_path(path)?,
        None => RawWatchSpec::default(),
    };
    Ok(base.overlay_cli(args))
}

/// Validate a merged raw spec into the immutable `WatchSpec`.
pub fn resolve_spec(raw: RawWatchSpec) -> Result<WatchSpec> {
    WatchSpec::try_from(raw)
}
