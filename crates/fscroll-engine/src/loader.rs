#![forbid(unsafe_code)]

//! Page loading and out-of-order reconciliation.
//!
//! Loading a page has a synchronous half and an asynchronous half:
//!
//! 1. [`PageLoader::load_page`] appends placeholders (append case) or
//!    re-centres the window (seek case), and hands back one [`PageRequest`]
//!    per page that needs fetching.
//! 2. When the fetch answers, [`PageLoader::reconcile`] writes the batch over
//!    the request's absolute index range.
//!
//! The range is fixed when the request is created, so a slow page that
//! answers after later pages were appended still lands in its own slots.

use std::ops::Range;

use fscroll_core::ScrollConfig;

use crate::source::{FetchError, RemoteItem};
use crate::store::{IndexRangeError, Item, SequenceStore};
use crate::window::WindowValidator;

/// A fetch ticket: which page to request and where its records belong.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRequest {
    /// Page number sent to the remote source.
    pub page: usize,
    /// Records requested.
    pub limit: usize,
    /// Absolute index range the answer will occupy.
    pub range: Range<usize>,
}

impl PageRequest {
    /// Request for `page` with `limit` records per page.
    #[must_use]
    pub fn new(page: usize, limit: usize) -> Self {
        let start = page.saturating_mul(limit);
        Self {
            page,
            limit,
            range: start..start.saturating_add(limit),
        }
    }
}

/// Result of the synchronous half of a page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Placeholders were appended and must be fetched.
    Appended {
        /// One request per appended page, in ascending order.
        requests: Vec<PageRequest>,
        /// Front of the sequence evicted to respect the live bound.
        evicted: Option<Range<usize>>,
    },
    /// The page already existed; the window was re-centred.
    Seeked {
        /// New live window.
        window: Range<usize>,
    },
}

impl LoadOutcome {
    /// Fetches the caller must issue.
    #[must_use]
    pub fn requests(&self) -> &[PageRequest] {
        match self {
            Self::Appended { requests, .. } => requests,
            Self::Seeked { .. } => &[],
        }
    }

    /// Consume into the fetches the caller must issue.
    #[must_use]
    pub fn into_requests(self) -> Vec<PageRequest> {
        match self {
            Self::Appended { requests, .. } => requests,
            Self::Seeked { .. } => Vec::new(),
        }
    }
}

/// What a successful reconciliation changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// Range the batch was written into.
    pub range: Range<usize>,
    /// Placeholders that received their payload.
    pub filled: usize,
    /// Slots that were already loaded and kept as they were.
    pub kept: usize,
}

/// Pages past the current end that one load may materialize by default.
pub const DEFAULT_MAX_GAP_PAGES: usize = 32;

/// Creates placeholders, issues page requests, and merges answers.
#[derive(Debug, Clone, Copy)]
pub struct PageLoader {
    config: ScrollConfig,
    validator: WindowValidator,
    max_gap_pages: usize,
}

impl PageLoader {
    /// Create a loader for `config`.
    #[must_use]
    pub const fn new(config: ScrollConfig) -> Self {
        Self {
            config,
            validator: WindowValidator::new(config),
            max_gap_pages: DEFAULT_MAX_GAP_PAGES,
        }
    }

    /// Limit how far past the current end a single load may reach.
    ///
    /// A target more than `max_gap_pages` pages past the next page is
    /// clamped to that distance.
    #[must_use]
    pub const fn with_max_gap_pages(mut self, max_gap_pages: usize) -> Self {
        self.max_gap_pages = max_gap_pages;
        self
    }

    /// Current gap limit.
    #[must_use]
    pub const fn max_gap_pages(&self) -> usize {
        self.max_gap_pages
    }

    /// The window policy used by this loader.
    #[must_use]
    pub const fn validator(&self) -> &WindowValidator {
        &self.validator
    }

    /// Synchronous half of loading `page`.
    ///
    /// In the append case every page from the current end up to and
    /// including `page` is appended, so each returned request's range exists
    /// in the store. A target further than [`max_gap_pages`](Self::max_gap_pages)
    /// past the next page is clamped. In the seek case nothing is fetched.
    pub fn load_page(
        &self,
        store: &mut SequenceStore,
        page: usize,
    ) -> Result<LoadOutcome, IndexRangeError> {
        let _span = tracing::info_span!("fscroll.load_page", page).entered();

        if !self.validator.is_append(page, store.len()) {
            let window = self.validator.apply_seek(store, page)?;
            return Ok(LoadOutcome::Seeked { window });
        }

        let ipp = self.config.items_per_page();
        let next_page = store.len() / ipp;
        let last_allowed = next_page.saturating_add(self.max_gap_pages);
        let target = if page > last_allowed {
            tracing::warn!(
                page,
                clamped_to = last_allowed,
                max_gap_pages = self.max_gap_pages,
                "requested page too far past the end; clamped"
            );
            last_allowed
        } else {
            page
        };

        let target_end = self.config.page_start(target).saturating_add(ipp);
        let mut requests = Vec::with_capacity(target - next_page + 1);
        while store.len() < target_end {
            let range = store.append(ipp);
            let request = PageRequest::new(range.start / ipp, ipp);
            debug_assert_eq!(request.range, range);
            tracing::debug!(
                page = request.page,
                start = request.range.start,
                end = request.range.end,
                "appended placeholders"
            );
            requests.push(request);
        }
        // The eviction prefix depends only on the final length.
        let evicted = self.validator.apply_append(store)?;
        Ok(LoadOutcome::Appended { requests, evicted })
    }

    /// Check that `batch` is a well-formed answer to `request`.
    pub fn validate_batch(
        &self,
        request: &PageRequest,
        batch: &[RemoteItem],
    ) -> Result<(), FetchError> {
        if batch.len() != request.range.len() {
            return Err(FetchError::WrongBatchSize {
                expected: request.range.len(),
                received: batch.len(),
            });
        }
        if let Some(position) = batch.iter().position(|item| item.payload_ref.is_empty()) {
            return Err(FetchError::EmptyPayload { position });
        }
        Ok(())
    }

    /// Asynchronous half: write `batch` over `request.range`.
    ///
    /// Each new record keeps the live flag of the placeholder it replaces, so
    /// a late answer never revives an evicted slot. Slots that already hold a
    /// payload are left untouched.
    pub fn reconcile(
        &self,
        store: &mut SequenceStore,
        request: &PageRequest,
        batch: Vec<RemoteItem>,
    ) -> Result<Reconciled, IndexRangeError> {
        let _span = tracing::debug_span!("fscroll.reconcile", page = request.page).entered();

        let range = request.range.clone();
        let Some(current) = store.items().get(range.clone()) else {
            return Err(IndexRangeError::OutOfBounds {
                range,
                len: store.len(),
            });
        };

        let mut filled = 0;
        let mut kept = 0;
        let merged: Vec<Item> = current
            .iter()
            .zip(batch)
            .map(|(existing, remote)| {
                if existing.is_loaded() {
                    kept += 1;
                    existing.clone()
                } else {
                    filled += 1;
                    Item::loaded(
                        existing.sequence_index(),
                        remote.remote_id,
                        remote.payload_ref,
                        existing.is_live(),
                    )
                }
            })
            .collect();

        store.splice_range(range.clone(), merged)?;
        tracing::debug!(
            page = request.page,
            filled,
            kept,
            "page reconciled"
        );
        Ok(Reconciled {
            range,
            filled,
            kept,
        })
    }
}
