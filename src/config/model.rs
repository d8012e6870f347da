// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::CliArgs;
use crate::types::FailurePolicy;
use crate::watch::NameFilter;

/// Watch configuration as read from a TOML file, before validation.
///
/// ```toml
/// roots = ["src", "tests"]
/// exec = "cargo test"
/// include = '\.rs$'
/// exclude = "target"
/// on_command_failure = "continue"
/// on_kill_failure = "abort"
/// ```
///
/// Every key is optional here; CLI flags are layered on top with
/// [`RawWatchSpec::overlay_cli`] and the result is checked by
/// `WatchSpec::try_from`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWatchSpec {
    #[serde(default)]
    pub roots: Vec<PathBuf>,

    #[serde(default)]
    pub exec: Option<String>,

    #[serde(default)]
    pub include: Option<String>,

    #[serde(default)]
    pub exclude: Option<String>,

    #[serde(default)]
    pub on_command_failure: Option<FailurePolicy>,

    #[serde(default)]
    pub on_kill_failure: Option<FailurePolicy>,
}

impl RawWatchSpec {
    /// Apply command-line values on top of this (possibly file-backed) spec.
    ///
    /// Positional paths replace the configured roots when any are given;
    /// every other flag replaces its key only when present.
    pub fn overlay_cli(mut self, args: &CliArgs) -> Self {
        if !args.paths.is_empty() {
            self.roots = args.paths.clone();
        }
        if let Some(exec) = &args.exec {
            self.exec = Some(exec.clone());
        }
        if let Some(include) = &args.include {
            self.include = Some(include.clone());
        }
        if let Some(exclude) = &args.exclude {
            self.exclude = Some(exclude.clone());
        }
        if let Some(policy) = args.on_command_failure {
            self.on_command_failure = Some(policy);
        }
        if let Some(policy) = args.on_kill_failure {
            self.on_kill_failure = Some(policy);
        }
        self
    }
}

/// Validated, immutable watch specification.
///
/// Only constructible through `TryFrom<RawWatchSpec>` (see `validate.rs`),
/// which guarantees at least one existing root, a non-empty command and
/// compilable filters.
#[derive(Debug, Clone)]
pub struct WatchSpec {
    roots: Vec<PathBuf>,
    command: Vec<String>,
    include: Option<String>,
    exclude: Option<String>,
    filter: NameFilter,
    on_command_failure: FailurePolicy,
    on_kill_failure: FailurePolicy,
}

impl WatchSpec {
    pub(crate) fn new_unchecked(
        roots: Vec<PathBuf>,
        command: Vec<String>,
        include: Option<String>,
        exclude: Option<String>,
        filter: NameFilter,
        on_command_failure: FailurePolicy,
        on_kill_failure: FailurePolicy,
    ) -> Self {
        Self {
            roots,
            command,
            include,
            exclude,
            filter,
            on_command_failure,
            on_kill_failure,
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Command argv; the first element is the program.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn include(&self) -> Option<&str> {
        self.include.as_deref()
    }

    pub fn exclude(&self) -> Option<&str> {
        self.exclude.as_deref()
    }

    /// Compiled include/exclude filter.
    pub fn filter(&self) -> &NameFilter {
        &self.filter
    }

    pub fn on_command_failure(&self) -> FailurePolicy {
        self.on_command_failure
    }

    pub fn on_kill_failure(&self) -> FailurePolicy {
        self.on_kill_failure
    }

    /// Roots made absolute against the current directory, for display.
    pub fn absolute_roots(&self) -> Vec<PathBuf> {
        self.roots.iter().map(|r| absolutize(r)).collect()
    }
}

fn absolutize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}

/// Split a command string on single spaces into argv.
///
/// Consecutive spaces yield empty arguments; no quoting is interpreted.
pub fn split_command(cmd: &str) -> Vec<String> {
    cmd.split(' ').map(str::to_string).collect()
}
