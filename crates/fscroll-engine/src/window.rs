#![forbid(unsafe_code)]

//! Live-window computation.
//!
//! Two policies decide which records stay live:
//!
//! - **Append**: after a page of placeholders lands at the end, evict from
//!   the front until at most `max_live_items` remain live.
//! - **Seek**: the target page already exists, so the whole store is
//!   invalidated and a window of `max_live_items` is re-centred on it.
//!
//! Both ranges are pure functions of `(len, page, config)`; the `apply_*`
//! methods only write the result into the store.

use std::ops::Range;

use fscroll_core::ScrollConfig;

use crate::store::{IndexRangeError, SequenceStore};

/// Computes and applies the live window.
#[derive(Debug, Clone, Copy)]
pub struct WindowValidator {
    config: ScrollConfig,
}

impl WindowValidator {
    /// Create a validator for `config`.
    #[must_use]
    pub const fn new(config: ScrollConfig) -> Self {
        Self { config }
    }

    /// Whether loading `page` into a store of `len` records appends.
    #[must_use]
    pub const fn is_append(&self, page: usize, len: usize) -> bool {
        self.config.page_start(page) >= len
    }

    /// Live window for a seek to `page` in a store of `len` records.
    ///
    /// Starts `half_window` items before the page, clamped so the window
    /// never runs off either end of the store.
    #[must_use]
    pub fn seek_window(&self, page: usize, len: usize) -> Range<usize> {
        let max = self.config.max_live_items();
        let start = self
            .config
            .page_start(page)
            .saturating_sub(self.config.half_window())
            .min(len.saturating_sub(max));
        let end = start.saturating_add(max).min(len);
        start..end
    }

    /// Prefix to evict after an append, if the live count exceeds the bound.
    #[must_use]
    pub fn eviction_range(&self, live_count: usize, len: usize) -> Option<Range<usize>> {
        let max = self.config.max_live_items();
        if live_count > max {
            Some(0..len.saturating_sub(max))
        } else {
            None
        }
    }

    /// Apply the append policy. Returns the evicted prefix, if any.
    pub fn apply_append(
        &self,
        store: &mut SequenceStore,
    ) -> Result<Option<Range<usize>>, IndexRangeError> {
        let live = store.live_count();
        let Some(evict) = self.eviction_range(live, store.len()) else {
            tracing::trace!(live, len = store.len(), "append within live bound");
            return Ok(None);
        };
        store.invalidate_range(evict.clone())?;
        tracing::debug!(
            live,
            evict_start = evict.start,
            evict_end = evict.end,
            "evicted front of sequence"
        );
        Ok(Some(evict))
    }

    /// Apply the seek policy for `page`. Returns the new live window.
    pub fn apply_seek(
        &self,
        store: &mut SequenceStore,
        page: usize,
    ) -> Result<Range<usize>, IndexRangeError> {
        let window = self.seek_window(page, store.len());
        store.invalidate_all();
        store.set_live_range(window.clone())?;
        tracing::debug!(
            page,
            window_start = window.start,
            window_end = window.end,
            "re-centred live window"
        );
        Ok(window)
    }
}
