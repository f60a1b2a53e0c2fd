#![forbid(unsafe_code)]

//! Message loop and background page fetches.
//!
//! The loop is single-threaded: only the thread calling into
//! [`ScrollProgram`] ever touches the engine. Scroll samples (sent by the host
//! through a [`ProgramHandle`]) and page answers (sent by worker threads) are
//! both [`Msg`]s on one `mpsc` queue, so every mutation is applied whole
//! before the next one starts.
//!
//! # Architecture
//!
//! ```text
//! host ──ProgramHandle──┐
//!                       ├──► mpsc queue ──► ScrollModel::update ──► Cmd
//! worker threads ───────┘                                           │
//!        ▲                                                          │
//!        └────────────── Cmd::Fetch spawns one worker ◄─────────────┘
//! ```
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Worker panic | `RemoteSource` panicked | Reaped, answered with `FetchError::Aborted`, logged at error level |
//! | Index defect | Engine bug | [`RuntimeError::Engine`] from the call that applied the message |
//! | Spawn failure | OS refused a thread | [`RuntimeError::Spawn`] |

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use fscroll_core::ScrollSample;
use fscroll_engine::{
    EngineObserver, FetchError, IndexRangeError, NoopObserver, PageRequest, RemoteItem,
    RemoteSource, ScrollEngine,
};
use tracing::debug_span;

/// Longest single wait on the queue before finished workers are reaped.
const REAP_INTERVAL: Duration = Duration::from_millis(25);

// ============================================================================
// Messages and commands
// ============================================================================

/// Input to the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// A scroll sample from the host.
    Scroll(ScrollSample),
    /// Load a page directly (jump navigation).
    Load(usize),
    /// A worker finished fetching `request`.
    PageFetched {
        request: PageRequest,
        result: Result<Vec<RemoteItem>, FetchError>,
    },
    /// Re-issue the fetch for a page whose placeholders are still empty.
    Retry(usize),
    /// Stop the loop.
    Quit,
}

impl Msg {
    /// Short name for spans and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Scroll(_) => "scroll",
            Self::Load(_) => "load",
            Self::PageFetched { .. } => "page_fetched",
            Self::Retry(_) => "retry",
            Self::Quit => "quit",
        }
    }
}

/// Effect requested by [`ScrollModel::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Cmd {
    /// Nothing to do.
    #[default]
    None,
    /// Fetch one page in the background.
    Fetch(PageRequest),
    /// Several commands, executed in order.
    Batch(Vec<Cmd>),
    /// Stop the loop.
    Quit,
}

impl Cmd {
    /// One [`Cmd::Fetch`] per request, collapsed to the smallest shape.
    #[must_use]
    pub fn fetches(requests: Vec<PageRequest>) -> Self {
        let mut cmds: Vec<Self> = requests.into_iter().map(Self::Fetch).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.remove(0),
            _ => Self::Batch(cmds),
        }
    }

    /// Pages this command would fetch, in order.
    #[must_use]
    pub fn fetched_pages(&self) -> Vec<usize> {
        match self {
            Self::Fetch(request) => vec![request.page],
            Self::Batch(cmds) => cmds.iter().flat_map(Self::fetched_pages).collect(),
            Self::None | Self::Quit => Vec::new(),
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Fetch(_) => "Fetch",
            Self::Batch(_) => "Batch",
            Self::Quit => "Quit",
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that stop the loop.
#[derive(Debug)]
pub enum RuntimeError {
    /// The engine reported an index defect.
    Engine(IndexRangeError),
    /// A worker thread could not be spawned.
    Spawn(io::Error),
    /// The program was dropped while a handle was still sending.
    Disconnected,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(e) => write!(f, "engine error: {e}"),
            Self::Spawn(e) => write!(f, "failed to spawn fetch worker: {e}"),
            Self::Disconnected => write!(f, "scroll program is no longer running"),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Engine(e) => Some(e),
            Self::Spawn(e) => Some(e),
            Self::Disconnected => None,
        }
    }
}

impl From<IndexRangeError> for RuntimeError {
    fn from(e: IndexRangeError) -> Self {
        Self::Engine(e)
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> Self {
        Self::Spawn(e)
    }
}

// ============================================================================
// Model
// ============================================================================

/// Pure update logic shared by [`ScrollProgram`] and the simulator.
#[derive(Debug)]
pub struct ScrollModel<O: EngineObserver = NoopObserver> {
    engine: ScrollEngine<O>,
}

impl<O: EngineObserver> ScrollModel<O> {
    /// Wrap an unmounted engine.
    #[must_use]
    pub fn new(engine: ScrollEngine<O>) -> Self {
        Self { engine }
    }

    /// Mount the engine and fetch the first page.
    pub fn init(&mut self) -> Result<Cmd, IndexRangeError> {
        Ok(Cmd::fetches(self.engine.mount()?))
    }

    /// Apply one message.
    pub fn update(&mut self, msg: Msg) -> Result<Cmd, IndexRangeError> {
        match msg {
            Msg::Scroll(sample) => Ok(Cmd::fetches(self.engine.on_scroll(&sample)?)),
            Msg::Load(page) => Ok(Cmd::fetches(self.engine.load_page(page)?.into_requests())),
            Msg::PageFetched { request, result } => {
                self.engine.complete_fetch(&request, result)?;
                Ok(Cmd::None)
            }
            Msg::Retry(page) => Ok(self.engine.retry_page(page).map_or(Cmd::None, Cmd::Fetch)),
            Msg::Quit => Ok(Cmd::Quit),
        }
    }

    /// The engine.
    #[must_use]
    pub fn engine(&self) -> &ScrollEngine<O> {
        &self.engine
    }

    /// The engine, mutably.
    pub fn engine_mut(&mut self) -> &mut ScrollEngine<O> {
        &mut self.engine
    }

    /// Unwrap the engine.
    #[must_use]
    pub fn into_engine(self) -> ScrollEngine<O> {
        self.engine
    }
}

// ============================================================================
// Program
// ============================================================================

/// Cloneable sender into a running [`ScrollProgram`].
#[derive(Debug, Clone)]
pub struct ProgramHandle {
    sender: mpsc::Sender<Msg>,
}

impl ProgramHandle {
    /// Queue a message.
    pub fn send(&self, msg: Msg) -> Result<(), RuntimeError> {
        self.sender.send(msg).map_err(|_| RuntimeError::Disconnected)
    }

    /// Queue a scroll sample.
    pub fn scroll(&self, sample: ScrollSample) -> Result<(), RuntimeError> {
        self.send(Msg::Scroll(sample))
    }

    /// Queue a direct page load.
    pub fn load_page(&self, page: usize) -> Result<(), RuntimeError> {
        self.send(Msg::Load(page))
    }

    /// Queue a retry for `page`.
    pub fn retry(&self, page: usize) -> Result<(), RuntimeError> {
        self.send(Msg::Retry(page))
    }

    /// Ask the loop to stop.
    pub fn quit(&self) -> Result<(), RuntimeError> {
        self.send(Msg::Quit)
    }
}

#[derive(Debug)]
struct Worker {
    request: PageRequest,
    handle: JoinHandle<()>,
}

/// Single-threaded loop around a [`ScrollEngine`] with one background
/// worker per page fetch.
pub struct ScrollProgram<S, O = NoopObserver>
where
    S: RemoteSource + 'static,
    O: EngineObserver,
{
    model: ScrollModel<O>,
    source: Arc<S>,
    sender: mpsc::Sender<Msg>,
    receiver: mpsc::Receiver<Msg>,
    /// Join handles for fetch workers; reaped opportunistically.
    workers: Vec<Worker>,
    running: bool,
    started: bool,
    processed: u64,
    spawned: u64,
}

impl<S, O> ScrollProgram<S, O>
where
    S: RemoteSource + 'static,
    O: EngineObserver,
{
    /// Create a program around an unmounted engine.
    pub fn new(engine: ScrollEngine<O>, source: S) -> Self {
        Self::with_shared_source(engine, Arc::new(source))
    }

    /// Create a program fetching from a source the caller also holds.
    pub fn with_shared_source(engine: ScrollEngine<O>, source: Arc<S>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            model: ScrollModel::new(engine),
            source,
            sender,
            receiver,
            workers: Vec::new(),
            running: true,
            started: false,
            processed: 0,
            spawned: 0,
        }
    }

    /// A sender the host can move to another thread.
    #[must_use]
    pub fn handle(&self) -> ProgramHandle {
        ProgramHandle {
            sender: self.sender.clone(),
        }
    }

    /// Mount the engine and start fetching page 0. Idempotent.
    pub fn start(&mut self) -> Result<(), RuntimeError> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        let cmd = self.model.init()?;
        self.execute(cmd)
    }

    /// Wait up to `timeout` for one message and apply it.
    ///
    /// Returns whether a message was applied.
    pub fn step(&mut self, timeout: Duration) -> Result<bool, RuntimeError> {
        self.reap_finished_workers();
        match self.receiver.recv_timeout(timeout) {
            Ok(msg) => {
                self.dispatch(msg)?;
                Ok(true)
            }
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => Err(RuntimeError::Disconnected),
        }
    }

    /// Apply every message already queued. Returns how many were applied.
    pub fn process_pending(&mut self) -> Result<usize, RuntimeError> {
        self.reap_finished_workers();
        let mut applied = 0;
        while self.running {
            let Ok(msg) = self.receiver.try_recv() else {
                break;
            };
            self.dispatch(msg)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Run until a [`Msg::Quit`] arrives, then join outstanding workers.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        self.start()?;
        while self.running {
            self.step(REAP_INTERVAL)?;
        }
        self.shutdown();
        Ok(())
    }

    /// Run until no fetch is in flight and the queue is empty, or until
    /// `timeout` elapses. Returns whether the program went idle.
    pub fn run_until_idle(&mut self, timeout: Duration) -> Result<bool, RuntimeError> {
        self.start()?;
        let deadline = Instant::now() + timeout;
        loop {
            self.process_pending()?;
            if !self.running || self.is_idle() {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(
                    in_flight = self.workers.len(),
                    "scroll program still busy at deadline"
                );
                return Ok(false);
            }
            self.step(REAP_INTERVAL.min(deadline - now))?;
        }
    }

    /// Join every outstanding worker and drop their answers.
    pub fn shutdown(&mut self) {
        for worker in self.workers.drain(..) {
            if let Err(payload) = worker.handle.join() {
                tracing::error!(
                    page = worker.request.page,
                    "fetch worker panicked during shutdown: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
        while self.receiver.try_recv().is_ok() {}
    }

    /// Whether nothing is queued, running, or awaiting an answer.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.workers.is_empty() && self.model.engine().pending_pages().next().is_none()
    }

    /// Whether the loop has not seen [`Msg::Quit`].
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Fetch workers not yet reaped.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.workers.len()
    }

    /// Messages applied so far.
    #[must_use]
    pub const fn processed(&self) -> u64 {
        self.processed
    }

    /// Workers spawned so far.
    #[must_use]
    pub const fn spawned(&self) -> u64 {
        self.spawned
    }

    /// The engine.
    #[must_use]
    pub fn engine(&self) -> &ScrollEngine<O> {
        self.model.engine()
    }

    /// The shared remote source.
    #[must_use]
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    fn dispatch(&mut self, msg: Msg) -> Result<(), RuntimeError> {
        let cmd = {
            let _span = debug_span!(
                "fscroll.program.update",
                msg_type = msg.kind(),
                cmd_type = tracing::field::Empty
            )
            .entered();
            let cmd = self.model.update(msg).inspect_err(|err| {
                tracing::error!(%err, "update hit an index defect");
            })?;
            tracing::Span::current().record("cmd_type", cmd.type_name());
            cmd
        };
        self.processed += 1;
        self.execute(cmd)
    }

    fn execute(&mut self, cmd: Cmd) -> Result<(), RuntimeError> {
        match cmd {
            Cmd::None => {}
            Cmd::Quit => self.running = false,
            Cmd::Batch(cmds) => {
                for c in cmds {
                    self.execute(c)?;
                    if !self.running {
                        break;
                    }
                }
            }
            Cmd::Fetch(request) => self.spawn_fetch(request)?,
        }
        Ok(())
    }

    fn spawn_fetch(&mut self, request: PageRequest) -> Result<(), RuntimeError> {
        let source = Arc::clone(&self.source);
        let sender = self.sender.clone();
        let job = request.clone();
        let handle = thread::Builder::new()
            .name(format!("fscroll-fetch-{}", request.page))
            .spawn(move || {
                let result = source.fetch_page(&job);
                let _ = sender.send(Msg::PageFetched {
                    request: job,
                    result,
                });
            })?;
        tracing::debug!(page = request.page, "fetch worker spawned");
        self.spawned += 1;
        self.workers.push(Worker { request, handle });
        Ok(())
    }

    fn reap_finished_workers(&mut self) {
        if self.workers.is_empty() {
            return;
        }

        let mut remaining = Vec::with_capacity(self.workers.len());
        for worker in self.workers.drain(..) {
            if !worker.handle.is_finished() {
                remaining.push(worker);
                continue;
            }
            if let Err(payload) = worker.handle.join() {
                let msg = panic_message(payload.as_ref());
                tracing::error!(page = worker.request.page, "fetch worker panicked: {msg}");
                let _ = self.sender.send(Msg::PageFetched {
                    request: worker.request,
                    result: Err(FetchError::Aborted(msg)),
                });
            }
        }
        self.workers = remaining;
    }
}

impl<S, O> fmt::Debug for ScrollProgram<S, O>
where
    S: RemoteSource + 'static,
    O: EngineObserver,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollProgram")
            .field("store_len", &self.model.engine().store().len())
            .field("in_flight", &self.workers.len())
            .field("running", &self.running)
            .field("processed", &self.processed)
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fscroll_core::ScrollConfig;
    use fscroll_engine::{CountingObserver, SyntheticSource};
    use pretty_assertions::assert_eq;

    const WAIT: Duration = Duration::from_secs(5);

    fn config() -> ScrollConfig {
        ScrollConfig::with_item_height(10, 30, 10).unwrap()
    }

    #[test]
    fn fetches_collapse_to_smallest_shape() {
        assert_eq!(Cmd::fetches(Vec::new()), Cmd::None);
        assert_eq!(
            Cmd::fetches(vec![PageRequest::new(0, 10)]),
            Cmd::Fetch(PageRequest::new(0, 10))
        );
        let batch = Cmd::fetches(vec![PageRequest::new(1, 10), PageRequest::new(2, 10)]);
        assert_eq!(batch.type_name(), "Batch");
        assert_eq!(batch.fetched_pages(), vec![1, 2]);
    }

    #[test]
    fn model_update_maps_messages_to_commands() {
        let mut model = ScrollModel::new(ScrollEngine::new(config()));
        assert_eq!(model.init().unwrap(), Cmd::Fetch(PageRequest::new(0, 10)));

        let cmd = model.update(Msg::Load(2)).unwrap();
        assert_eq!(cmd.fetched_pages(), vec![1, 2]);

        let source = SyntheticSource::new();
        let request = PageRequest::new(1, 10);
        let result = source.fetch_page(&request);
        assert_eq!(
            model.update(Msg::PageFetched { request, result }).unwrap(),
            Cmd::None
        );
        assert_eq!(model.update(Msg::Retry(1)).unwrap(), Cmd::None);
        assert_eq!(model.update(Msg::Quit).unwrap(), Cmd::Quit);
    }

    #[test]
    fn program_loads_first_page() {
        let mut program = ScrollProgram::new(ScrollEngine::new(config()), SyntheticSource::new());
        assert!(program.run_until_idle(WAIT).unwrap());
        let store = program.engine().store();
        assert_eq!(store.len(), 10);
        assert!(store.is_range_loaded(0..10));
        assert_eq!(program.spawned(), 1);
        assert_eq!(program.in_flight(), 0);
    }

    #[test]
    fn handle_scrolls_from_another_thread() {
        let engine = ScrollEngine::with_observer(config(), CountingObserver::new());
        let mut program = ScrollProgram::new(engine, SyntheticSource::new());
        assert!(program.run_until_idle(WAIT).unwrap());

        let handle = program.handle();
        thread::spawn(move || {
            // 100 units of content, 50 unit viewport, scrolled to the end.
            handle.scroll(ScrollSample::new(-50.0, 50.0, 50.0)).unwrap();
        })
        .join()
        .unwrap();

        assert!(program.run_until_idle(WAIT).unwrap());
        assert_eq!(program.engine().store().len(), 20);
        assert!(program.engine().store().is_range_loaded(0..20));
        assert_eq!(program.engine().observer().requests, 2);
    }

    #[test]
    fn quit_stops_run() {
        let mut program = ScrollProgram::new(ScrollEngine::new(config()), SyntheticSource::new());
        program.handle().quit().unwrap();
        program.run().unwrap();
        assert!(!program.is_running());
        assert_eq!(program.in_flight(), 0);
    }

    #[test]
    fn panicking_worker_becomes_aborted_fetch() {
        let source = |request: &PageRequest| -> Result<Vec<RemoteItem>, FetchError> {
            if request.page == 0 {
                panic!("remote exploded");
            }
            Ok(SyntheticSource::new().page_items(request.page, request.limit))
        };
        let engine = ScrollEngine::with_observer(config(), CountingObserver::new());
        let mut program = ScrollProgram::new(engine, source);
        assert!(program.run_until_idle(WAIT).unwrap());

        let engine = program.engine();
        assert_eq!(engine.observer().failures, 1);
        assert!(!engine.store().is_range_loaded(0..10));
        assert!(!engine.is_pending(0));
    }

    #[test]
    fn failed_page_can_be_retried() {
        let source = SyntheticSource::new().failing(0, 1);
        let mut program = ScrollProgram::new(ScrollEngine::new(config()), source);
        assert!(program.run_until_idle(WAIT).unwrap());
        assert!(!program.engine().store().is_range_loaded(0..10));

        program.handle().retry(0).unwrap();
        assert!(program.run_until_idle(WAIT).unwrap());
        assert!(program.engine().store().is_range_loaded(0..10));
        assert_eq!(program.source().calls(), 2);
    }

    #[test]
    fn runtime_error_display() {
        let err = RuntimeError::from(IndexRangeError::OutOfBounds { range: 0..10, len: 0 });
        assert!(err.to_string().starts_with("engine error:"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(std::error::Error::source(&RuntimeError::Disconnected).is_none());
    }
}
