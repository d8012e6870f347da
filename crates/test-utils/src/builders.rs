#![allow(dead_code)]

use std::path::{Path, PathBuf};

use watchrun::config::{RawWatchSpec, WatchSpec};
use watchrun::types::FailurePolicy;

/// Builder for `WatchSpec` to simplify test setup.
///
/// Roots must exist on disk, so tests usually point them at a `tempdir`.
pub struct WatchSpecBuilder {
    raw: RawWatchSpec,
}

impl WatchSpecBuilder {
    pub fn new(exec: &str) -> Self {
        Self {
            raw: RawWatchSpec {
                exec: Some(exec.to_string()),
                ..Default::default()
            },
        }
    }

    pub fn root(mut self, path: impl AsRef<Path>) -> Self {
        self.raw.roots.push(path.as_ref().to_path_buf());
        self
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.raw.include = Some(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.raw.exclude = Some(pattern.to_string());
        self
    }

    pub fn on_command_failure(mut self, policy: FailurePolicy) -> Self {
        self.raw.on_command_failure = Some(policy);
        self
    }

    pub fn on_kill_failure(mut self, policy: FailurePolicy) -> Self {
        self.raw.on_kill_failure = Some(policy);
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.raw.roots
    }

    pub fn build_raw(self) -> RawWatchSpec {
        self.raw
    }

    pub fn build(self) -> WatchSpec {
        WatchSpec::try_from(self.raw).expect("Failed to build valid spec from builder")
    }
}
