#![forbid(unsafe_code)]

//! Injectable observers.
//!
//! The engine reports every store mutation to an [`EngineObserver`] passed in
//! at construction. Three implementations ship here:
//!
//! - [`NoopObserver`]: ignores everything and skips snapshot capture.
//! - [`TracingObserver`]: one structured `tracing` event per snapshot.
//! - [`CountingObserver`]: counters plus the latest snapshot, for tests and
//!   host diagnostics.

use crate::loader::PageRequest;
use crate::snapshot::Snapshot;
use crate::source::FetchError;

/// Receives engine notifications.
///
/// All methods have empty defaults.
pub trait EngineObserver {
    /// Whether [`on_snapshot`](Self::on_snapshot) should be called.
    ///
    /// Returning `false` lets the engine skip building snapshots.
    fn wants_snapshots(&self) -> bool {
        true
    }

    /// Called after every store mutation with the new state.
    fn on_snapshot(&mut self, _snapshot: &Snapshot) {}

    /// Called for every page request the engine issues.
    fn on_request(&mut self, _request: &PageRequest) {}

    /// Called when a page fetch fails and its placeholders stay in place.
    fn on_fetch_failed(&mut self, _request: &PageRequest, _error: &FetchError) {}
}

impl<O: EngineObserver + ?Sized> EngineObserver for Box<O> {
    fn wants_snapshots(&self) -> bool {
        (**self).wants_snapshots()
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        (**self).on_snapshot(snapshot);
    }

    fn on_request(&mut self, request: &PageRequest) {
        (**self).on_request(request);
    }

    fn on_fetch_failed(&mut self, request: &PageRequest, error: &FetchError) {
        (**self).on_fetch_failed(request, error);
    }
}

/// Observer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl EngineObserver for NoopObserver {
    fn wants_snapshots(&self) -> bool {
        false
    }
}

/// Logs each snapshot as a structured event.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver {
    snapshots: u64,
}

impl TracingObserver {
    /// Create a tracing observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots logged so far.
    #[must_use]
    pub const fn snapshots(&self) -> u64 {
        self.snapshots
    }
}

impl EngineObserver for TracingObserver {
    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        let seq = self.snapshots;
        self.snapshots += 1;
        if snapshot.is_empty() {
            return;
        }
        let summary = snapshot.summary();
        let (first_live, last_live) = summary
            .live_span
            .as_ref()
            .map_or((None, None), |span| (Some(span.start), Some(span.end - 1)));
        tracing::debug!(
            seq,
            live_span = summary.span_len(),
            total = summary.total,
            first_live = ?first_live,
            last_live = ?last_live,
            page = summary.current_page,
            "window snapshot"
        );
    }

    fn on_request(&mut self, request: &PageRequest) {
        tracing::debug!(
            page = request.page,
            limit = request.limit,
            start = request.range.start,
            "page requested"
        );
    }

    fn on_fetch_failed(&mut self, request: &PageRequest, error: &FetchError) {
        tracing::debug!(page = request.page, %error, "fetch failure observed; placeholders kept");
    }
}

/// Counts notifications and keeps the latest snapshot.
#[derive(Debug, Clone, Default)]
pub struct CountingObserver {
    /// Snapshots received.
    pub snapshots: u64,
    /// Requests issued.
    pub requests: u64,
    /// Fetch failures reported.
    pub failures: u64,
    /// Most recent snapshot.
    pub last: Option<Snapshot>,
}

impl CountingObserver {
    /// Create a zeroed counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EngineObserver for CountingObserver {
    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        self.snapshots += 1;
        self.last = Some(snapshot.clone());
    }

    fn on_request(&mut self, _request: &PageRequest) {
        self.requests += 1;
    }

    fn on_fetch_failed(&mut self, _request: &PageRequest, _error: &FetchError) {
        self.failures += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SequenceStore;

    #[test]
    fn noop_skips_snapshots() {
        assert!(!NoopObserver.wants_snapshots());
        assert!(CountingObserver::new().wants_snapshots());
    }

    #[test]
    fn boxed_observer_forwards() {
        let mut boxed: Box<dyn EngineObserver> = Box::new(NoopObserver);
        assert!(!boxed.wants_snapshots());
        boxed.on_request(&PageRequest::new(0, 10));
    }

    #[test]
    fn counting_observer_keeps_latest() {
        let mut store = SequenceStore::new();
        let mut counter = CountingObserver::new();
        store.append(10);
        counter.on_snapshot(&Snapshot::capture(&store, 0, 10));
        store.append(10);
        counter.on_snapshot(&Snapshot::capture(&store, 1, 10));
        counter.on_request(&PageRequest::new(1, 10));
        counter.on_fetch_failed(
            &PageRequest::new(1, 10),
            &FetchError::Transport("down".into()),
        );

        assert_eq!(counter.snapshots, 2);
        assert_eq!(counter.requests, 1);
        assert_eq!(counter.failures, 1);
        let last = counter.last.unwrap();
        assert_eq!(last.len(), 20);
        assert_eq!(last.current_page, 1);
    }

    #[test]
    fn tracing_observer_counts_empty_snapshots() {
        let mut observer = TracingObserver::new();
        observer.on_snapshot(&Snapshot::capture(&SequenceStore::new(), 0, 10));
        assert_eq!(observer.snapshots(), 1);
    }
}
