// tests/router.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::path::PathBuf;

use notify::event::{CreateKind, DataChange, EventKind, ModifyKind, RenameMode};
use notify::Event;
use tokio::sync::mpsc;

use watchrun::engine::ControlSignal;
use watchrun::watch::{EventRouter, NameFilter};

type TestResult = Result<(), Box<dyn Error>>;

struct Harness {
    raw_tx: mpsc::UnboundedSender<notify::Result<Event>>,
    interrupt_tx: mpsc::Sender<()>,
    signal_rx: mpsc::Receiver<ControlSignal>,
    router: tokio::task::JoinHandle<()>,
}

fn start_router(filter: NameFilter) -> Harness {
    let (signal_tx, signal_rx) = mpsc::channel(1);
    let (raw_tx, raw_rx) = mpsc::unbounded_channel();
    let (interrupt_tx, interrupt_rx) = mpsc::channel(8);

    let router = tokio::spawn(EventRouter::new(filter, signal_tx).run(raw_rx, interrupt_rx));
    Harness {
        raw_tx,
        interrupt_tx,
        signal_rx,
        router,
    }
}

fn write_event(path: &str) -> Event {
    Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Any))).add_path(PathBuf::from(path))
}

fn create_event(path: &str) -> Event {
    Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from(path))
}

#[tokio::test]
async fn signals_arrive_in_backend_order() -> TestResult {
    init_tracing();
    let mut h = start_router(NameFilter::default());

    h.raw_tx.send(Ok(create_event("/w/a.txt")))?;
    h.raw_tx.send(Ok(write_event("/w/a.txt")))?;
    h.raw_tx.send(Ok(Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
        .add_path(PathBuf::from("/w/a.txt"))
        .add_path(PathBuf::from("/w/b.txt"))))?;

    let mut got = Vec::new();
    for _ in 0..4 {
        got.push(with_timeout(h.signal_rx.recv()).await.ok_or("router closed")?);
    }

    assert_eq!(
        got,
        vec![
            ControlSignal::Created(PathBuf::from("/w/a.txt")),
            ControlSignal::Modified(PathBuf::from("/w/a.txt")),
            ControlSignal::Created(PathBuf::from("/w/b.txt")),
            ControlSignal::Removed(PathBuf::from("/w/a.txt")),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn filtered_paths_produce_no_signals() -> TestResult {
    init_tracing();
    let filter = NameFilter::new(Some(r"\.rs$"), None)?;
    let mut h = start_router(filter);

    h.raw_tx.send(Ok(write_event("/w/notes.md")))?;
    h.raw_tx.send(Ok(create_event("/w/scratch.txt")))?;
    h.raw_tx.send(Ok(write_event("/w/src/lib.rs")))?;

    // The first signal through must be the only matching one.
    let first = with_timeout(h.signal_rx.recv()).await;
    assert_eq!(first, Some(ControlSignal::Modified(PathBuf::from("/w/src/lib.rs"))));
    assert!(h.signal_rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn every_interrupt_is_forwarded() -> TestResult {
    init_tracing();
    let mut h = start_router(NameFilter::default());

    h.interrupt_tx.send(()).await?;
    assert_eq!(with_timeout(h.signal_rx.recv()).await, Some(ControlSignal::Interrupt));

    h.interrupt_tx.send(()).await?;
    assert_eq!(with_timeout(h.signal_rx.recv()).await, Some(ControlSignal::Interrupt));
    Ok(())
}

#[tokio::test]
async fn backend_errors_do_not_stop_the_router() -> TestResult {
    init_tracing();
    let mut h = start_router(NameFilter::default());

    h.raw_tx.send(Err(notify::Error::generic("queue overflow")))?;
    h.raw_tx.send(Ok(write_event("/w/after-error")))?;

    assert_eq!(
        with_timeout(h.signal_rx.recv()).await,
        Some(ControlSignal::Modified(PathBuf::from("/w/after-error")))
    );
    Ok(())
}

#[tokio::test]
async fn router_stops_when_supervisor_goes_away() -> TestResult {
    init_tracing();
    let h = start_router(NameFilter::default());
    let Harness {
        raw_tx,
        signal_rx,
        router,
        interrupt_tx: _interrupt_tx,
    } = h;

    drop(signal_rx);
    raw_tx.send(Ok(write_event("/w/x")))?;

    with_timeout(router).await?;
    Ok(())
}

#[tokio::test]
async fn router_stops_when_both_sources_close() -> TestResult {
    init_tracing();
    let Harness {
        raw_tx,
        interrupt_tx,
        signal_rx: _signal_rx,
        router,
    } = start_router(NameFilter::default());

    drop(raw_tx);
    drop(interrupt_tx);

    with_timeout(router).await?;
    Ok(())
}
