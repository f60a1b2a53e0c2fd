#![forbid(unsafe_code)]

//! Scroll geometry: samples, metric providers, and a simulated viewport.
//!
//! All coordinates are in the provider's own units (pixels for a DOM host,
//! rows for a terminal pane). Only their ratios to the configured item height
//! matter to the engine.

use serde::{Deserialize, Serialize};

/// One scroll-geometry sample, relative to the origin captured at mount.
///
/// `container_top` is zero when unscrolled and goes negative as the content
/// scrolls up past the origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollSample {
    /// Top edge of the item container.
    pub container_top: f64,
    /// Bottom edge of the item container.
    pub container_bottom: f64,
    /// Height of the visible viewport.
    pub viewport_height: f64,
}

impl ScrollSample {
    /// Create a sample.
    #[must_use]
    pub const fn new(container_top: f64, container_bottom: f64, viewport_height: f64) -> Self {
        Self {
            container_top,
            container_bottom,
            viewport_height,
        }
    }

    /// Distance scrolled past the origin (never negative).
    #[must_use]
    pub fn scrolled(&self) -> f64 {
        let scrolled = -self.container_top;
        if scrolled.is_finite() && scrolled > 0.0 {
            scrolled
        } else {
            0.0
        }
    }
}

/// Source of raw scroll metrics.
///
/// Implemented by the host (DOM bridge, terminal pane, test fixture).
pub trait ScrollMetrics {
    /// Raw top edge of the item container.
    fn container_top(&self) -> f64;

    /// Raw bottom edge of the item container.
    fn container_bottom(&self) -> f64;

    /// Height of the viewport.
    fn viewport_height(&self) -> f64;
}

/// Converts raw provider metrics into origin-relative [`ScrollSample`]s.
///
/// The origin is the container's top edge at mount time and is captured
/// exactly once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OriginAnchor {
    offset: f64,
}

impl OriginAnchor {
    /// Capture the current container top as the origin.
    #[must_use]
    pub fn capture<P: ScrollMetrics + ?Sized>(provider: &P) -> Self {
        Self {
            offset: provider.container_top(),
        }
    }

    /// Use an explicit origin offset.
    #[must_use]
    pub const fn at(offset: f64) -> Self {
        Self { offset }
    }

    /// The captured offset.
    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    /// Read the provider and produce an origin-relative sample.
    #[must_use]
    pub fn sample<P: ScrollMetrics + ?Sized>(&self, provider: &P) -> ScrollSample {
        ScrollSample {
            container_top: provider.container_top() - self.offset,
            container_bottom: provider.container_bottom() - self.offset,
            viewport_height: provider.viewport_height(),
        }
    }
}

/// A simulated single-axis scroll pane over fixed-height items.
///
/// The container starts at `header` units below the viewport top; scrolling
/// moves the container up. Useful for terminal hosts and deterministic tests.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualViewport {
    item_height: f64,
    viewport_height: f64,
    header: f64,
    item_count: usize,
    scroll_offset: f64,
}

impl VirtualViewport {
    /// Create an unscrolled viewport with no items.
    #[must_use]
    pub fn new(item_height: u32, viewport_height: f64) -> Self {
        Self {
            item_height: f64::from(item_height),
            viewport_height,
            header: 0.0,
            item_count: 0,
            scroll_offset: 0.0,
        }
    }

    /// Place the container `header` units below the viewport top.
    #[must_use]
    pub fn with_header(mut self, header: f64) -> Self {
        self.header = header;
        self
    }

    /// Update the number of items laid out in the container.
    pub fn set_item_count(&mut self, count: usize) {
        self.item_count = count;
        self.clamp();
    }

    /// Number of items laid out.
    #[must_use]
    pub const fn item_count(&self) -> usize {
        self.item_count
    }

    /// Total container height.
    #[must_use]
    pub fn content_height(&self) -> f64 {
        self.item_count as f64 * self.item_height
    }

    /// Largest reachable scroll offset.
    #[must_use]
    pub fn max_scroll(&self) -> f64 {
        (self.header + self.content_height() - self.viewport_height).max(0.0)
    }

    /// Current scroll offset.
    #[must_use]
    pub const fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// Scroll by `delta` (positive = down), clamped to the content.
    pub fn scroll_by(&mut self, delta: f64) {
        self.scroll_offset += delta;
        self.clamp();
    }

    /// Scroll to an absolute offset, clamped to the content.
    pub fn scroll_to(&mut self, offset: f64) {
        self.scroll_offset = offset;
        self.clamp();
    }

    /// Scroll so that item `index` sits at the viewport top.
    pub fn scroll_to_item(&mut self, index: usize) {
        self.scroll_to(self.header + index as f64 * self.item_height);
    }

    /// Scroll to the end of the content.
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_scroll();
    }

    fn clamp(&mut self) {
        let max = self.max_scroll();
        if !self.scroll_offset.is_finite() || self.scroll_offset < 0.0 {
            self.scroll_offset = 0.0;
        } else if self.scroll_offset > max {
            self.scroll_offset = max;
        }
    }
}

impl ScrollMetrics for VirtualViewport {
    fn container_top(&self) -> f64 {
        self.header - self.scroll_offset
    }

    fn container_bottom(&self) -> f64 {
        self.container_top() + self.content_height()
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }
}
