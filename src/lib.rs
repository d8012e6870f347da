// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use tokio::sync::mpsc;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::{raw_from_args, resolve_spec, WatchSpec};
use crate::engine::{ControlSignal, ExitReason, Supervisor, SupervisorOptions};
use crate::errors::Result;
use crate::exec::RealProcessBackend;
use crate::fs::RealFileSystem;
use crate::watch::register_roots;

/// How a `run` ended when no fatal error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No paths were given; usage was printed.
    Usage,
    /// `--dry-run` finished.
    DryRun,
    /// The supervisor stopped.
    Stopped(ExitReason),
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Usage => 1,
            RunOutcome::DryRun => 0,
            RunOutcome::Stopped(reason) => reason.exit_code(),
        }
    }
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - spec loading (config file + CLI flags) and validation
/// - the Ctrl-C listener
/// - the file watcher and event router
/// - the process supervisor
pub async fn run(args: CliArgs) -> Result<RunOutcome> {
    let raw = raw_from_args(&args)?;
    if raw.roots.is_empty() {
        cli::print_usage();
        return Ok(RunOutcome::Usage);
    }

    let spec = resolve_spec(raw)?;

    info!("now watching at:");
    for root in spec.absolute_roots() {
        info!("  {}", root.display());
    }

    if args.dry_run {
        print_dry_run(&spec)?;
        return Ok(RunOutcome::DryRun);
    }

    // The supervisor receives signals one at a time, in router order.
    let (signal_tx, signal_rx) = mpsc::channel::<ControlSignal>(1);

    let interrupts = watch::spawn_interrupt_listener();
    let watcher = watch::spawn_watcher(&spec, signal_tx, interrupts)?;

    let supervisor = Supervisor::new(
        SupervisorOptions::from(&spec),
        signal_rx,
        RealProcessBackend::new(),
    );
    let reason = supervisor.run().await?;

    drop(watcher);
    Ok(RunOutcome::Stopped(reason))
}

/// Dry-run output: the resolved spec and the directories that would be
/// registered.
fn print_dry_run(spec: &WatchSpec) -> Result<()> {
    let mut dirs: Vec<std::path::PathBuf> = Vec::new();
    let registration = register_roots(&RealFileSystem, spec.filter(), spec.roots(), &mut dirs)?;

    println!("watchrun dry-run");
    println!("  command: {:?}", spec.command());
    if let Some(include) = spec.include() {
        println!("  include: {include}");
    }
    if let Some(exclude) = spec.exclude() {
        println!("  exclude: {exclude}");
    }
    println!("  on_command_failure: {:?}", spec.on_command_failure());
    println!("  on_kill_failure: {:?}", spec.on_kill_failure());
    println!();

    println!("directories ({}):", dirs.len());
    for dir in &dirs {
        println!("  - {}", dir.display());
    }
    if !registration.ignored_files.is_empty() {
        println!("ignored files ({}):", registration.ignored_files.len());
        for file in &registration.ignored_files {
            println!("  - {}", file.display());
        }
    }
    Ok(())
}
