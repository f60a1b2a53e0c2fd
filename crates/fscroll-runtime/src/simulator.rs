#![forbid(unsafe_code)]

//! Deterministic fetch simulator for testing.
//!
//! `FetchSimulator` runs the same [`ScrollModel`] as [`ScrollProgram`] but
//! never spawns a thread: every [`Cmd::Fetch`] is held until the test
//! resolves or fails it, in whatever order it likes.
//!
//! # Example
//!
//! ```
//! use fscroll_core::ScrollConfig;
//! use fscroll_engine::{ScrollEngine, SyntheticSource};
//! use fscroll_runtime::{FetchSimulator, Msg};
//!
//! let engine = ScrollEngine::new(ScrollConfig::new(10, 30).unwrap());
//! let mut sim = FetchSimulator::new(engine, SyntheticSource::new());
//! sim.init().unwrap();
//! sim.send(Msg::Load(1)).unwrap();
//! assert_eq!(sim.held_pages(), vec![0, 1]);
//!
//! sim.resolve(1).unwrap();
//! sim.resolve(0).unwrap();
//! assert!(sim.engine().store().is_range_loaded(0..20));
//! ```
//!
//! [`ScrollProgram`]: crate::program::ScrollProgram

use fscroll_core::ScrollSample;
use fscroll_engine::{
    EngineObserver, FetchError, IndexRangeError, NoopObserver, PageRequest, RemoteSource,
    ScrollEngine,
};

use crate::program::{Cmd, Msg, ScrollModel};

/// Record of a command executed during simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdRecord {
    /// No-op command.
    None,
    /// Quit command.
    Quit,
    /// Batch of commands.
    Batch(usize),
    /// Fetch held for the test.
    Fetch(usize),
}

/// Deterministic simulator for [`ScrollModel`] testing.
pub struct FetchSimulator<S: RemoteSource, O: EngineObserver = NoopObserver> {
    model: ScrollModel<O>,
    source: S,
    /// Fetches issued but not yet answered, in issue order.
    held: Vec<PageRequest>,
    /// Record of all executed commands.
    command_log: Vec<CmdRecord>,
    running: bool,
}

impl<S: RemoteSource, O: EngineObserver> FetchSimulator<S, O> {
    /// Create a simulator around an unmounted engine.
    ///
    /// The engine is not mounted until [`init`](Self::init) is called.
    pub fn new(engine: ScrollEngine<O>, source: S) -> Self {
        Self {
            model: ScrollModel::new(engine),
            source,
            held: Vec::new(),
            command_log: Vec::new(),
            running: true,
        }
    }

    /// Mount the engine and hold the first fetch.
    pub fn init(&mut self) -> Result<(), IndexRangeError> {
        let cmd = self.model.init()?;
        self.execute_cmd(cmd);
        Ok(())
    }

    /// Send a message through `update` and execute the resulting command.
    pub fn send(&mut self, msg: Msg) -> Result<(), IndexRangeError> {
        if !self.running {
            return Ok(());
        }
        let cmd = self.model.update(msg)?;
        self.execute_cmd(cmd);
        Ok(())
    }

    /// Send a scroll sample.
    pub fn scroll(&mut self, sample: ScrollSample) -> Result<(), IndexRangeError> {
        self.send(Msg::Scroll(sample))
    }

    /// Answer the held fetch for `page` from the source.
    ///
    /// Returns `false` when no fetch for `page` is held.
    pub fn resolve(&mut self, page: usize) -> Result<bool, IndexRangeError> {
        let Some(request) = self.take(page) else {
            return Ok(false);
        };
        let result = self.source.fetch_page(&request);
        self.send(Msg::PageFetched { request, result })?;
        Ok(true)
    }

    /// Fail the held fetch for `page` with `error`.
    ///
    /// Returns `false` when no fetch for `page` is held.
    pub fn fail(&mut self, page: usize, error: FetchError) -> Result<bool, IndexRangeError> {
        let Some(request) = self.take(page) else {
            return Ok(false);
        };
        self.send(Msg::PageFetched {
            request,
            result: Err(error),
        })?;
        Ok(true)
    }

    /// Answer every held fetch, newest first, until none remain.
    ///
    /// Returns how many fetches were answered.
    pub fn resolve_all(&mut self) -> Result<usize, IndexRangeError> {
        let mut answered = 0;
        while let Some(request) = self.held.last() {
            let page = request.page;
            self.resolve(page)?;
            answered += 1;
        }
        Ok(answered)
    }

    /// Pages with a held fetch, in issue order.
    #[must_use]
    pub fn held_pages(&self) -> Vec<usize> {
        self.held.iter().map(|request| request.page).collect()
    }

    /// Held fetches, in issue order.
    #[must_use]
    pub fn held(&self) -> &[PageRequest] {
        &self.held
    }

    /// Get the command execution log.
    #[must_use]
    pub fn command_log(&self) -> &[CmdRecord] {
        &self.command_log
    }

    /// Check if the simulated program is still running.
    ///
    /// Returns `false` after a `Cmd::Quit` has been executed.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// The engine.
    #[must_use]
    pub fn engine(&self) -> &ScrollEngine<O> {
        self.model.engine()
    }

    /// The engine, mutably.
    pub fn engine_mut(&mut self) -> &mut ScrollEngine<O> {
        self.model.engine_mut()
    }

    /// The source answering held fetches.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    fn take(&mut self, page: usize) -> Option<PageRequest> {
        let position = self.held.iter().position(|request| request.page == page)?;
        Some(self.held.remove(position))
    }

    fn execute_cmd(&mut self, cmd: Cmd) {
        match cmd {
            Cmd::None => {
                self.command_log.push(CmdRecord::None);
            }
            Cmd::Quit => {
                self.running = false;
                self.command_log.push(CmdRecord::Quit);
            }
            Cmd::Batch(cmds) => {
                self.command_log.push(CmdRecord::Batch(cmds.len()));
                for c in cmds {
                    self.execute_cmd(c);
                    if !self.running {
                        break;
                    }
                }
            }
            Cmd::Fetch(request) => {
                self.command_log.push(CmdRecord::Fetch(request.page));
                self.held.push(request);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fscroll_core::ScrollConfig;
    use fscroll_engine::{CountingObserver, SyntheticSource};
    use pretty_assertions::assert_eq;

    fn sim() -> FetchSimulator<SyntheticSource, CountingObserver> {
        let engine = ScrollEngine::with_observer(
            ScrollConfig::new(10, 30).unwrap(),
            CountingObserver::new(),
        );
        FetchSimulator::new(engine, SyntheticSource::new())
    }

    #[test]
    fn init_holds_first_page() {
        let mut sim = sim();
        sim.init().unwrap();
        assert_eq!(sim.held_pages(), vec![0]);
        assert_eq!(sim.command_log(), &[CmdRecord::Fetch(0)]);
        assert!(!sim.engine().store().is_range_loaded(0..10));
    }

    #[test]
    fn reverse_resolution_lands_in_place() {
        let mut sim = sim();
        sim.init().unwrap();
        sim.send(Msg::Load(1)).unwrap();

        assert!(sim.resolve(1).unwrap());
        assert!(sim.engine().store().is_range_loaded(10..20));
        assert!(!sim.engine().store().is_range_loaded(0..10));
        assert!(sim.resolve(0).unwrap());

        let store = sim.engine().store();
        assert_eq!(store.get(3).unwrap().remote_id(), Some("item-0-3"));
        assert_eq!(store.get(13).unwrap().remote_id(), Some("item-1-3"));
        assert!(!sim.resolve(0).unwrap(), "nothing left to resolve");
    }

    #[test]
    fn gap_fill_is_logged_as_batch() {
        let mut sim = sim();
        sim.init().unwrap();
        sim.send(Msg::Load(3)).unwrap();
        assert_eq!(
            sim.command_log(),
            &[
                CmdRecord::Fetch(0),
                CmdRecord::Batch(3),
                CmdRecord::Fetch(1),
                CmdRecord::Fetch(2),
                CmdRecord::Fetch(3),
            ]
        );
        assert_eq!(sim.resolve_all().unwrap(), 4);
        assert!(sim.held().is_empty());
        assert!(sim.engine().store().is_range_loaded(10..40));
    }

    #[test]
    fn distant_load_holds_bounded_fetches() {
        let mut sim = sim();
        sim.init().unwrap();
        sim.send(Msg::Load(1_000_000)).unwrap();
        let held = sim.held_pages();
        assert_eq!(held.len(), 1 + fscroll_engine::DEFAULT_MAX_GAP_PAGES + 1);
        assert_eq!(held.last(), Some(&(1 + fscroll_engine::DEFAULT_MAX_GAP_PAGES)));
        assert_eq!(sim.engine().store().live_count(), 30);
    }

    #[test]
    fn failure_then_retry() {
        let mut sim = sim();
        sim.init().unwrap();
        assert!(sim.fail(0, FetchError::Transport("reset".into())).unwrap());
        assert_eq!(sim.engine().observer().failures, 1);
        assert!(sim.held().is_empty());

        sim.send(Msg::Retry(0)).unwrap();
        assert_eq!(sim.held_pages(), vec![0]);
        sim.resolve(0).unwrap();
        assert!(sim.engine().store().is_range_loaded(0..10));
    }

    #[test]
    fn quit_ignores_further_messages() {
        let mut sim = sim();
        sim.init().unwrap();
        sim.send(Msg::Quit).unwrap();
        assert!(!sim.is_running());
        sim.send(Msg::Load(5)).unwrap();
        assert_eq!(sim.engine().store().len(), 10);
    }
}
