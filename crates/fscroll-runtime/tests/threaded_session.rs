#![forbid(unsafe_code)]

//! End-to-end sessions with real fetch workers.
//!
//! A host thread drives a `VirtualViewport` and sends samples through a
//! `ProgramHandle` while the loop thread applies them and page answers
//! arrive from workers with artificial latency.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fscroll_core::{OriginAnchor, ScrollConfig, VirtualViewport};
use fscroll_engine::{CountingObserver, ScrollEngine, SyntheticSource};
use fscroll_runtime::ScrollProgram;
use tracing_subscriber::EnvFilter;

const WAIT: Duration = Duration::from_secs(10);

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config() -> ScrollConfig {
    ScrollConfig::with_item_height(10, 30, 20).unwrap()
}

#[test]
fn slow_source_session_respects_live_bound() {
    init_logging();
    let source = Arc::new(SyntheticSource::new().with_latency(Duration::from_millis(5)));
    let engine = ScrollEngine::with_observer(config(), CountingObserver::new());
    let mut program = ScrollProgram::with_shared_source(engine, Arc::clone(&source));
    assert!(program.run_until_idle(WAIT).unwrap());

    let mut viewport = VirtualViewport::new(20, 150.0);
    let anchor = OriginAnchor::capture(&viewport);
    for _ in 0..60 {
        viewport.set_item_count(program.engine().store().len());
        viewport.scroll_by(45.0);
        program.handle().scroll(anchor.sample(&viewport)).unwrap();
        program.process_pending().unwrap();
        assert!(program.engine().store().live_count() <= 30);
    }
    assert!(program.run_until_idle(WAIT).unwrap());

    let engine = program.engine();
    let store = engine.store();
    assert!(store.len() >= 60, "len {}", store.len());
    assert!(store.is_range_loaded(0..store.len()));
    assert_eq!(engine.observer().failures, 0);
    assert_eq!(source.calls() as u64, program.spawned());
    for item in store.items() {
        let page = item.sequence_index() / 10;
        let slot = item.sequence_index() % 10;
        assert_eq!(
            item.payload_ref(),
            format!("synthetic://images/{page}/{slot}.jpg")
        );
    }
}

#[test]
fn host_thread_sends_while_loop_runs() {
    init_logging();
    let engine = ScrollEngine::new(config());
    let mut program = ScrollProgram::new(
        engine,
        SyntheticSource::new().with_latency(Duration::from_millis(2)),
    );
    let handle = program.handle();

    let host = thread::spawn(move || {
        for page in 1..=6 {
            handle.load_page(page).unwrap();
            thread::sleep(Duration::from_millis(1));
        }
        handle.load_page(1).unwrap();
        thread::sleep(Duration::from_millis(50));
        handle.quit().unwrap();
    });

    program.run().unwrap();
    host.join().unwrap();

    assert!(!program.is_running());
    assert_eq!(program.in_flight(), 0);
    let engine = program.engine();
    assert_eq!(engine.store().len(), 70);
    assert_eq!(engine.current_page(), 1);
    assert_eq!(engine.store().live_span(), Some(0..30));
}

#[test]
fn failed_pages_recover_through_retry() {
    init_logging();
    let source = SyntheticSource::new().failing(1, 2).failing(2, 1);
    let engine = ScrollEngine::with_observer(config(), CountingObserver::new());
    let mut program = ScrollProgram::new(engine, source);
    program.handle().load_page(2).unwrap();
    assert!(program.run_until_idle(WAIT).unwrap());
    assert_eq!(program.engine().observer().failures, 2);

    for _ in 0..2 {
        program.handle().retry(1).unwrap();
        program.handle().retry(2).unwrap();
        assert!(program.run_until_idle(WAIT).unwrap());
    }
    let store = program.engine().store();
    assert!(store.is_range_loaded(0..30));
    assert_eq!(program.engine().observer().failures, 3);
}
