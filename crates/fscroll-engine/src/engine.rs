#![forbid(unsafe_code)]

//! The windowing engine facade.
//!
//! [`ScrollEngine`] owns the [`SequenceStore`] and wires the tracker, loader,
//! and validator together. It performs no I/O: every method that needs a
//! fetch returns [`PageRequest`]s, and the host reports answers through
//! [`ScrollEngine::complete_fetch`].
//!
//! # Invariants
//!
//! 1. At most `max_live_items` records are live after any call.
//! 2. The store length never decreases.
//! 3. A payload, once set, is never replaced.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | [`FetchError`] | Transport failure or malformed batch | Placeholders kept, observer told, `Ok(FetchOutcome::Failed)` |
//! | [`IndexRangeError`] | Engine defect | Returned as `Err`, logged at error level |

use std::collections::BTreeSet;

use fscroll_core::{ScrollConfig, ScrollSample};

use crate::loader::{LoadOutcome, PageLoader, PageRequest, Reconciled};
use crate::observer::{EngineObserver, NoopObserver};
use crate::snapshot::{Snapshot, WindowSummary};
use crate::source::{FetchError, RemoteItem};
use crate::store::{IndexRangeError, SequenceStore};
use crate::tracker::{ScrollPositionTracker, ScrollState};

/// Result of feeding a fetch answer to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The batch was written into the store.
    Loaded(Reconciled),
    /// The fetch failed; the page keeps its placeholders.
    Failed { page: usize, error: FetchError },
}

/// Windowed infinite-scroll engine.
#[derive(Debug)]
pub struct ScrollEngine<O: EngineObserver = NoopObserver> {
    config: ScrollConfig,
    store: SequenceStore,
    loader: PageLoader,
    tracker: ScrollPositionTracker,
    current_page: usize,
    pending: BTreeSet<usize>,
    observer: O,
}

impl ScrollEngine<NoopObserver> {
    /// Create an engine without an observer.
    #[must_use]
    pub fn new(config: ScrollConfig) -> Self {
        Self::with_observer(config, NoopObserver)
    }
}

impl<O: EngineObserver> ScrollEngine<O> {
    /// Create an engine reporting to `observer`.
    #[must_use]
    pub fn with_observer(config: ScrollConfig, observer: O) -> Self {
        Self {
            config,
            store: SequenceStore::new(),
            loader: PageLoader::new(config),
            tracker: ScrollPositionTracker::new(&config),
            current_page: 0,
            pending: BTreeSet::new(),
            observer,
        }
    }

    /// Limit how many pages past the end a single load may append.
    #[must_use]
    pub fn with_max_gap_pages(mut self, max_gap_pages: usize) -> Self {
        self.loader = self.loader.with_max_gap_pages(max_gap_pages);
        self
    }

    /// Initial load of page 0.
    pub fn mount(&mut self) -> Result<Vec<PageRequest>, IndexRangeError> {
        tracing::info!(
            items_per_page = self.config.items_per_page(),
            max_live_items = self.config.max_live_items(),
            "scroll engine mounted"
        );
        Ok(self.load_page(0)?.into_requests())
    }

    /// Load `page`: append and request it, or re-centre the window on it.
    pub fn load_page(&mut self, page: usize) -> Result<LoadOutcome, IndexRangeError> {
        let outcome = self
            .loader
            .load_page(&mut self.store, page)
            .inspect_err(|err| tracing::error!(page, %err, "load_page hit an index defect"))?;
        match &outcome {
            LoadOutcome::Appended { requests, .. } => {
                for request in requests {
                    self.pending.insert(request.page);
                    self.observer.on_request(request);
                }
            }
            LoadOutcome::Seeked { .. } => {
                self.current_page = page;
            }
        }
        self.publish();
        Ok(outcome)
    }

    /// Feed a scroll sample. Returns the fetches to issue.
    pub fn on_scroll(&mut self, sample: &ScrollSample) -> Result<Vec<PageRequest>, IndexRangeError> {
        match self.tracker.observe(sample) {
            Some(action) => Ok(self.load_page(action.target_page())?.into_requests()),
            None => Ok(Vec::new()),
        }
    }

    /// Report the answer to `request`.
    ///
    /// Fetch errors and malformed batches are absorbed: the page keeps its
    /// placeholders and the observer is told. Only index defects are errors.
    pub fn complete_fetch(
        &mut self,
        request: &PageRequest,
        result: Result<Vec<RemoteItem>, FetchError>,
    ) -> Result<FetchOutcome, IndexRangeError> {
        self.pending.remove(&request.page);

        let checked = result.and_then(|batch| {
            self.loader.validate_batch(request, &batch)?;
            Ok(batch)
        });
        let batch = match checked {
            Ok(batch) => batch,
            Err(error) => {
                tracing::warn!(page = request.page, %error, "page fetch failed");
                self.observer.on_fetch_failed(request, &error);
                return Ok(FetchOutcome::Failed {
                    page: request.page,
                    error,
                });
            }
        };

        let reconciled = self
            .loader
            .reconcile(&mut self.store, request, batch)
            .inspect_err(|err| {
                tracing::error!(page = request.page, %err, "reconcile hit an index defect");
            })?;
        self.publish();
        Ok(FetchOutcome::Loaded(reconciled))
    }

    /// Re-issue the request for a materialized page that still has
    /// placeholders and is not already in flight.
    pub fn retry_page(&mut self, page: usize) -> Option<PageRequest> {
        let request = PageRequest::new(page, self.config.items_per_page());
        if self.pending.contains(&page)
            || request.range.end > self.store.len()
            || self.store.is_range_loaded(request.range.clone())
        {
            return None;
        }
        tracing::debug!(page, "retrying page");
        self.pending.insert(page);
        self.observer.on_request(&request);
        Some(request)
    }

    /// Renderer view of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(
            &self.store,
            self.current_page,
            self.config.items_per_page(),
        )
    }

    /// Overlay statistics of the current state.
    #[must_use]
    pub fn summary(&self) -> WindowSummary {
        self.snapshot().summary()
    }

    /// The item sequence.
    #[must_use]
    pub fn store(&self) -> &SequenceStore {
        &self.store
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &ScrollConfig {
        &self.config
    }

    /// The tracker's recorded scroll state.
    #[must_use]
    pub fn scroll_state(&self) -> ScrollState {
        self.tracker.state()
    }

    /// Page the live window was last centred on.
    #[must_use]
    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    /// Pages with a fetch in flight, ascending.
    pub fn pending_pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.pending.iter().copied()
    }

    /// Whether `page` has a fetch in flight.
    #[must_use]
    pub fn is_pending(&self, page: usize) -> bool {
        self.pending.contains(&page)
    }

    /// The observer.
    #[must_use]
    pub const fn observer(&self) -> &O {
        &self.observer
    }

    /// The observer, mutably.
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    fn publish(&mut self) {
        debug_assert!(
            self.store.live_count() <= self.config.max_live_items(),
            "live bound violated"
        );
        if self.observer.wants_snapshots() {
            let snapshot = self.snapshot();
            self.observer.on_snapshot(&snapshot);
        }
    }
}
