// tests/process_groups.rs
#![cfg(unix)]

mod common;
use crate::common::{eventually, init_tracing, with_timeout};

use std::error::Error;
use std::path::{Path, PathBuf};

use nix::sys::signal::kill;
use nix::unistd::Pid;
use tokio::sync::mpsc;

use watchrun::engine::{ControlSignal, ExitReason, Supervisor, SupervisorOptions};
use watchrun::exec::RealProcessBackend;

type TestResult = Result<(), Box<dyn Error>>;

fn sh(script: &str) -> SupervisorOptions {
    SupervisorOptions::new(vec!["sh".into(), "-c".into(), script.into()])
}

fn lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn pids(path: &Path) -> Vec<i32> {
    lines(path).iter().filter_map(|l| l.trim().parse().ok()).collect()
}

/// True once `pid` no longer exists, or only as a zombie waiting for its new
/// parent to reap it.
fn is_gone(pid: i32) -> bool {
    if kill(Pid::from_raw(pid), None).is_err() {
        return true;
    }
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .map(|stat| {
            stat.rsplit_once(')')
                .map(|(_, rest)| rest.trim_start().starts_with('Z'))
                .unwrap_or(false)
        })
        .unwrap_or(false)
}

fn modified(path: &Path) -> ControlSignal {
    ControlSignal::Modified(PathBuf::from(path))
}

#[tokio::test]
async fn modification_reruns_the_command() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("out.txt");

    let (tx, rx) = mpsc::channel(1);
    let script = format!("echo run >> '{}'", out.display());
    let supervisor = Supervisor::new(sh(&script), rx, RealProcessBackend::new());
    let handle = tokio::spawn(supervisor.run());

    eventually(|| lines(&out).len() == 1).await;
    tx.send(modified(&out)).await?;
    eventually(|| lines(&out).len() == 2).await;

    tx.send(ControlSignal::Interrupt).await?;
    let reason = with_timeout(handle).await??;
    assert_eq!(reason, ExitReason::Interrupted);
    assert_eq!(reason.exit_code(), 1);
    assert_eq!(lines(&out), vec!["run", "run"]);
    Ok(())
}

#[tokio::test]
async fn each_restart_replaces_the_previous_process() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let pid_file = dir.path().join("pids");

    let (tx, rx) = mpsc::channel(1);
    let script = format!("echo $$ >> '{}'; exec sleep 100", pid_file.display());
    let supervisor = Supervisor::new(sh(&script), rx, RealProcessBackend::new());
    let handle = tokio::spawn(supervisor.run());

    for n in 1..=3 {
        eventually(|| pids(&pid_file).len() == n).await;
        tx.send(modified(&pid_file)).await?;
    }
    eventually(|| pids(&pid_file).len() == 4).await;

    let seen = pids(&pid_file);
    let mut distinct = seen.clone();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct.len(), 4, "pids were reused: {seen:?}");

    // Every older generation was killed and reaped before its successor ran.
    for pid in &seen[..3] {
        assert!(is_gone(*pid), "process {pid} survived a restart");
    }
    assert!(!is_gone(seen[3]));

    tx.send(ControlSignal::Interrupt).await?;
    assert_eq!(with_timeout(handle).await??, ExitReason::Interrupted);
    assert!(is_gone(seen[3]));
    Ok(())
}

#[tokio::test]
async fn interrupt_kills_grandchildren_too() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let pid_file = dir.path().join("grandchild");

    let (tx, rx) = mpsc::channel(1);
    let script = format!("sleep 100 & echo $! >> '{}'; wait", pid_file.display());
    let supervisor = Supervisor::new(sh(&script), rx, RealProcessBackend::new());
    let handle = tokio::spawn(supervisor.run());

    eventually(|| pids(&pid_file).len() == 1).await;
    let grandchild = pids(&pid_file)[0];
    assert!(!is_gone(grandchild));

    tx.send(ControlSignal::Interrupt).await?;
    assert_eq!(with_timeout(handle).await??, ExitReason::Interrupted);

    // The grandchild is reparented, so reaping it is up to its new parent.
    eventually(|| is_gone(grandchild)).await;
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() -> TestResult {
    init_tracing();
    let (_tx, rx) = mpsc::channel(1);
    let options = SupervisorOptions::new(vec!["watchrun-no-such-program-xyz".into()]);
    let supervisor = Supervisor::new(options, rx, RealProcessBackend::new());

    let err = with_timeout(supervisor.run()).await.unwrap_err();
    assert!(
        matches!(err, watchrun::errors::WatchrunError::Spawn { .. }),
        "unexpected error: {err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn background_jobs_of_a_finished_command_do_not_outlive_it() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let pid_file = dir.path().join("background");

    let (tx, rx) = mpsc::channel(1);
    let script = format!("sleep 30 & echo $! >> '{}'; exit 0", pid_file.display());
    let supervisor = Supervisor::new(sh(&script), rx, RealProcessBackend::new());
    let handle = tokio::spawn(supervisor.run());

    eventually(|| pids(&pid_file).len() == 1).await;
    let first = pids(&pid_file)[0];
    // Let the leader exit on its own, leaving `sleep` behind in its group.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    tx.send(modified(&pid_file)).await?;
    eventually(|| pids(&pid_file).len() == 2).await;
    let second = pids(&pid_file)[1];
    eventually(|| is_gone(first)).await;

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    tx.send(ControlSignal::Interrupt).await?;
    assert_eq!(with_timeout(handle).await??, ExitReason::Interrupted);
    eventually(|| is_gone(second)).await;
    Ok(())
}
