#![forbid(unsafe_code)]

//! Read-only views handed to the rendering layer.

use std::ops::Range;

use serde::Serialize;

use crate::store::{DisplayColor, SequenceStore};

/// Render view of one item.
///
/// `payload_ref` is empty whenever the item is not live, so a renderer can
/// never materialize an evicted payload by accident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemView {
    /// Permanent position of the item in the logical sequence.
    pub sequence_index: usize,
    /// Whether the item is inside the live window.
    pub is_live: bool,
    /// Payload reference, empty for placeholders and evicted items.
    pub payload_ref: String,
    /// Placeholder until the item's page has been fetched.
    pub display_color: DisplayColor,
}

/// Full-sequence snapshot plus the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Every item in the store, in sequence order.
    pub items: Vec<ItemView>,
    /// Page the live window was last centred on.
    pub current_page: usize,
    /// Page size the snapshot was captured with.
    pub items_per_page: usize,
}

impl Snapshot {
    /// Capture `store` as seen by a renderer.
    #[must_use]
    pub fn capture(store: &SequenceStore, current_page: usize, items_per_page: usize) -> Self {
        let items = store
            .items()
            .iter()
            .map(|item| ItemView {
                sequence_index: item.sequence_index(),
                is_live: item.is_live(),
                payload_ref: if item.is_live() {
                    item.payload_ref().to_string()
                } else {
                    String::new()
                },
                display_color: item.display_color(),
            })
            .collect();
        Self {
            items,
            current_page,
            items_per_page,
        }
    }

    /// Number of items in the sequence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of live items.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_live).count()
    }

    /// Overlay statistics for this snapshot.
    #[must_use]
    pub fn summary(&self) -> WindowSummary {
        WindowSummary::of(self)
    }
}

/// Where the live window sits inside the sequence.
///
/// Fractions are relative to the sequence length (a zero-length sequence is
/// treated as length one), ready to be scaled to an overlay or scrollbar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummary {
    /// Sequence length.
    pub total: usize,
    /// Live items.
    pub live: usize,
    /// Smallest range covering every live item.
    pub live_span: Option<Range<usize>>,
    /// Current page.
    pub current_page: usize,
    /// Start of the live span as a fraction of the sequence.
    pub span_top: f64,
    /// Length of the live span as a fraction of the sequence.
    pub span_height: f64,
    /// Start of the current page as a fraction of the sequence.
    pub page_top: f64,
    /// Length of one page as a fraction of the sequence.
    pub page_height: f64,
}

impl WindowSummary {
    /// Compute the summary of `snapshot`.
    #[must_use]
    pub fn of(snapshot: &Snapshot) -> Self {
        let total = snapshot.len();
        let denom = total.max(1) as f64;
        let first = snapshot.items.iter().position(|item| item.is_live);
        let last = snapshot.items.iter().rposition(|item| item.is_live);
        let live_span = first.zip(last).map(|(first, last)| first..last + 1);
        let (span_top, span_height) = live_span
            .as_ref()
            .map_or((0.0, 0.0), |span| {
                (span.start as f64 / denom, span.len() as f64 / denom)
            });
        let page_start = snapshot.current_page.saturating_mul(snapshot.items_per_page);
        Self {
            total,
            live: snapshot.live_count(),
            live_span,
            current_page: snapshot.current_page,
            span_top,
            span_height,
            page_top: page_start as f64 / denom,
            page_height: snapshot.items_per_page as f64 / denom,
        }
    }

    /// Length of the live span (zero when nothing is live).
    #[must_use]
    pub fn span_len(&self) -> usize {
        self.live_span.as_ref().map_or(0, |span| span.len())
    }
}
