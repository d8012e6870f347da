use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;

/// What to do when something goes wrong that the watcher could survive.
///
/// Used for two knobs:
/// - a command exiting with a non-zero status;
/// - a failed process-group kill (usually a race with natural exit).
///
/// - `Continue`: log a warning and keep watching (default).
/// - `Abort`: stop the watcher with a non-zero exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Continue,
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(format!(
                "invalid failure policy: {other} (expected \"continue\" or \"abort\")"
            )),
        }
    }
}
