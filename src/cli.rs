// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{CommandFactory, Parser, ValueEnum};

use crate::types::FailurePolicy;

/// Command-line arguments for `watchrun`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "watchrun",
    version,
    about = "Executes a command when files or directories are modified.",
    long_about = None
)]
pub struct CliArgs {
    /// Paths to watch recursively.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Command to execute, split on single spaces into arguments.
    #[arg(short = 'e', long = "exec", value_name = "CMD")]
    pub exec: Option<String>,

    /// Only react to paths matching this regex, e.g. `\.(rs|toml)$`.
    #[arg(short = 'i', long = "include", value_name = "REGEX")]
    pub include: Option<String>,

    /// Ignore paths matching this regex.
    #[arg(short = 'x', long = "exclude", value_name = "REGEX")]
    pub exclude: Option<String>,

    /// Optional TOML file with defaults; flags given here take precedence.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// What to do when the command exits with a non-zero status.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub on_command_failure: Option<FailurePolicy>,

    /// What to do when killing the command's process group fails.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub on_kill_failure: Option<FailurePolicy>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate and print the watch set, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Accepts the same names as `--log-level`, case-insensitively, plus
/// `warning`. Used for `WATCHRUN_LOG`.
impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warning" => Ok(LogLevel::Warn),
            other => <LogLevel as ValueEnum>::from_str(other, true),
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Print the generated help text to stdout.
pub fn print_usage() {
    let mut cmd = CliArgs::command();
    if let Err(e) = cmd.print_help() {
        eprintln!("failed to print usage: {e}");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paths_and_flags() {
        let args = CliArgs::try_parse_from([
            "watchrun",
            "-e",
            "cargo test",
            "-i",
            r"\.rs$",
            "--on-command-failure",
            "abort",
            "src",
            "tests",
        ])
        .unwrap();

        assert_eq!(args.paths, vec![PathBuf::from("src"), PathBuf::from("tests")]);
        assert_eq!(args.exec.as_deref(), Some("cargo test"));
        assert_eq!(args.include.as_deref(), Some(r"\.rs$"));
        assert_eq!(args.on_command_failure, Some(FailurePolicy::Abort));
        assert_eq!(args.on_kill_failure, None);
    }

    #[test]
    fn log_level_names_parse_loosely() {
        assert!(matches!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn)));
        assert!(matches!(" debug ".parse::<LogLevel>(), Ok(LogLevel::Debug)));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn paths_are_optional_at_parse_time() {
        let args = CliArgs::try_parse_from(["watchrun", "-e", "true"]).unwrap();
        assert!(args.paths.is_empty());
    }
}
