// src/config/validate.rs

use crate::config::model::{split_command, RawWatchSpec, WatchSpec};
use crate::errors::{Result, WatchrunError};
use crate::watch::NameFilter;

impl TryFrom<RawWatchSpec> for WatchSpec {
    type Error = crate::errors::WatchrunError;

    fn try_from(raw: RawWatchSpec) -> std::result::Result<Self, Self::Error> {
        validate_raw_spec(&raw)?;

        let include = non_empty(raw.include);
        let exclude = non_empty(raw.exclude);
        let filter = NameFilter::new(include.as_deref(), exclude.as_deref())?;
        let command = split_command(raw.exec.as_deref().unwrap_or_default());

        Ok(WatchSpec::new_unchecked(
            raw.roots,
            command,
            include,
            exclude,
            filter,
            raw.on_command_failure.unwrap_or_default(),
            raw.on_kill_failure.unwrap_or_default(),
        ))
    }
}

/// Run the structural checks without building a `WatchSpec`.
pub fn validate_raw_spec(raw: &RawWatchSpec) -> Result<()> {
    ensure_has_roots(raw)?;
    ensure_roots_exist(raw)?;
    ensure_has_command(raw)?;
    Ok(())
}

fn ensure_has_roots(raw: &RawWatchSpec) -> Result<()> {
    if raw.roots.is_empty() {
        return Err(WatchrunError::ConfigError(
            "at least one path to watch is required".to_string(),
        ));
    }
    Ok(())
}

// All roots are checked before anything is registered, so a typo in the
// last root never leaves the first ones half-watched.
fn ensure_roots_exist(raw: &RawWatchSpec) -> Result<()> {
    for root in &raw.roots {
        if !root.exists() {
            return Err(WatchrunError::NoSuchPath(root.clone()));
        }
    }
    Ok(())
}

fn ensure_has_command(raw: &RawWatchSpec) -> Result<()> {
    match raw.exec.as_deref() {
        Some(cmd) if !cmd.trim().is_empty() => Ok(()),
        _ => Err(WatchrunError::ConfigError(
            "no command given (use -e/--exec)".to_string(),
        )),
    }
}

fn non_empty(pattern: Option<String>) -> Option<String> {
    pattern.filter(|p| !p.is_empty())
}
