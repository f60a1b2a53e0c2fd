#![forbid(unsafe_code)]

//! Scroll position tracking and bottom-edge detection.
//!
//! Each [`ScrollSample`] is classified into a [`ScrollPosition`] and a page
//! number. The tracker keeps a two-state memory (previous position, previous
//! page) and compares fresh values against it:
//!
//! | Previous | New | Page changed | Action |
//! |----------|-----|--------------|--------|
//! | not Bottom | Bottom | any | load `page + 1` |
//! | any | any other | no | none |
//! | any | any other | yes | load `page` |
//!
//! The position is recorded on every sample, so resting at the bottom does
//! not fire again until the view has left it.

use serde::Serialize;

use fscroll_core::{ScrollConfig, ScrollSample};

/// Semantic scroll position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScrollPosition {
    /// First item not yet fully scrolled past.
    Top,
    /// Container bottom is inside the viewport.
    Bottom,
    /// Anywhere else.
    Interior,
}

/// Session scroll state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrollState {
    /// Last recorded position.
    pub position: ScrollPosition,
    /// Last recorded page.
    pub current_page: usize,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            position: ScrollPosition::Top,
            current_page: 0,
        }
    }
}

/// What the tracker wants loaded after a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerAction {
    /// The view just arrived at the bottom: load the page after `page`.
    LoadNext { page: usize },
    /// The view moved to another page: load (or seek to) it.
    LoadPage { page: usize },
}

impl TrackerAction {
    /// The page to pass to the loader.
    #[must_use]
    pub const fn target_page(&self) -> usize {
        match *self {
            Self::LoadNext { page } => page.saturating_add(1),
            Self::LoadPage { page } => page,
        }
    }
}

/// Converts scroll samples into load decisions.
#[derive(Debug, Clone)]
pub struct ScrollPositionTracker {
    item_height: f64,
    page_height: f64,
    state: ScrollState,
    samples: u64,
}

impl ScrollPositionTracker {
    /// Create a tracker in the initial `{Top, 0}` state.
    #[must_use]
    pub fn new(config: &ScrollConfig) -> Self {
        Self {
            item_height: f64::from(config.item_height()),
            page_height: config.page_height(),
            state: ScrollState::default(),
            samples: 0,
        }
    }

    /// Recorded state.
    #[must_use]
    pub const fn state(&self) -> ScrollState {
        self.state
    }

    /// Number of samples observed.
    #[must_use]
    pub const fn samples(&self) -> u64 {
        self.samples
    }

    /// Classify a sample without touching the recorded state.
    #[must_use]
    pub fn classify(&self, sample: &ScrollSample) -> ScrollPosition {
        if sample.viewport_height >= sample.container_bottom {
            ScrollPosition::Bottom
        } else if -sample.container_top < self.item_height {
            ScrollPosition::Top
        } else {
            ScrollPosition::Interior
        }
    }

    /// Page under the viewport top for a sample.
    #[must_use]
    pub fn page_of(&self, sample: &ScrollSample) -> usize {
        let page = (sample.scrolled() / self.page_height).floor();
        if page.is_finite() && page >= 0.0 {
            page as usize
        } else {
            0
        }
    }

    /// Feed one sample and return the load it triggers, if any.
    pub fn observe(&mut self, sample: &ScrollSample) -> Option<TrackerAction> {
        self.samples += 1;
        let position = self.classify(sample);
        let page = self.page_of(sample);
        let previous = self.state;
        self.state.position = position;

        if previous.position != ScrollPosition::Bottom && position == ScrollPosition::Bottom {
            tracing::debug!(page, "bottom reached");
            return Some(TrackerAction::LoadNext { page });
        }

        if page == previous.current_page {
            return None;
        }

        self.state.current_page = page;
        tracing::trace!(from = previous.current_page, to = page, "page changed");
        Some(TrackerAction::LoadPage { page })
    }
}
