#![forbid(unsafe_code)]

//! Remote page source interface.
//!
//! The engine never performs I/O. A host hands each [`PageRequest`] to a
//! [`RemoteSource`] (usually on a worker thread) and feeds the result back
//! through [`ScrollEngine::complete_fetch`](crate::engine::ScrollEngine::complete_fetch).
//! Retry and backoff belong to the source; the engine only re-issues a
//! request when asked via `retry_page`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::loader::PageRequest;

/// One record returned by the remote source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// Identifier assigned by the source.
    pub remote_id: String,
    /// Reference to the payload (typically a URL).
    pub payload_ref: String,
}

impl RemoteItem {
    /// Create a remote record.
    #[must_use]
    pub fn new(remote_id: impl Into<String>, payload_ref: impl Into<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            payload_ref: payload_ref.into(),
        }
    }
}

/// Page-scoped, recoverable fetch failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request did not complete.
    Transport(String),
    /// The batch did not contain exactly one page of records.
    WrongBatchSize { expected: usize, received: usize },
    /// A record arrived without a payload reference.
    EmptyPayload { position: usize },
    /// The worker running the request went away before answering.
    Aborted(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::WrongBatchSize { expected, received } => {
                write!(f, "expected {expected} records, received {received}")
            }
            Self::EmptyPayload { position } => {
                write!(f, "record {position} has an empty payload reference")
            }
            Self::Aborted(msg) => write!(f, "fetch aborted: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// A paged remote item source.
///
/// Implementations must return records in request order. They may block;
/// the runtime calls them off the event loop.
pub trait RemoteSource: Send + Sync {
    /// Fetch `request.limit` records of page `request.page`.
    fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RemoteItem>, FetchError>;
}

impl<F> RemoteSource for F
where
    F: Fn(&PageRequest) -> Result<Vec<RemoteItem>, FetchError> + Send + Sync,
{
    fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RemoteItem>, FetchError> {
        self(request)
    }
}

/// Deterministic in-process source for demos and tests.
///
/// Record `i` of page `p` is `"{prefix}-{p}-{i}"` with payload
/// `"{base_url}/{p}/{i}.jpg"`, so the same page always yields the same data.
#[derive(Debug)]
pub struct SyntheticSource {
    prefix: String,
    base_url: String,
    latency: Duration,
    failures: Mutex<HashMap<usize, usize>>,
    calls: AtomicUsize,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticSource {
    /// Create a source with no latency and no failures.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prefix: "item".to_string(),
            base_url: "synthetic://images".to_string(),
            latency: Duration::ZERO,
            failures: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Set the remote id prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the payload base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sleep this long before answering each request.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the next `times` requests for `page` with a transport error.
    #[must_use]
    pub fn failing(self, page: usize, times: usize) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(page, times);
        }
        self
    }

    /// Number of requests served so far, failures included.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// The records this source returns for `page`.
    #[must_use]
    pub fn page_items(&self, page: usize, limit: usize) -> Vec<RemoteItem> {
        (0..limit)
            .map(|i| {
                RemoteItem::new(
                    format!("{}-{page}-{i}", self.prefix),
                    format!("{}/{page}/{i}.jpg", self.base_url),
                )
            })
            .collect()
    }

    fn take_failure(&self, page: usize) -> bool {
        let Ok(mut failures) = self.failures.lock() else {
            return false;
        };
        match failures.get_mut(&page) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl RemoteSource for SyntheticSource {
    fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RemoteItem>, FetchError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        if self.take_failure(request.page) {
            return Err(FetchError::Transport(format!(
                "synthetic failure for page {}",
                request.page
            )));
        }
        Ok(self.page_items(request.page, request.limit))
    }
}
