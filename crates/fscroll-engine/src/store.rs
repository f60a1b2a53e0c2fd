#![forbid(unsafe_code)]

//! Append-only item sequence.
//!
//! [`SequenceStore`] is the single source of truth for the logical position
//! of every item. It only grows: records are appended a page at a time,
//! replaced in place when their page arrives, and flagged non-live when they
//! leave the window. Nothing is ever removed.
//!
//! Out-of-range operations return [`IndexRangeError`]. They indicate an
//! engine defect, so callers surface them instead of clamping.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// Paint state of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DisplayColor {
    /// Waiting for the remote page.
    Placeholder,
    /// Remote payload has arrived.
    Loaded,
}

/// One record in the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    sequence_index: usize,
    remote_id: Option<String>,
    payload_ref: String,
    is_live: bool,
    display_color: DisplayColor,
}

impl Item {
    /// A live placeholder at `sequence_index`.
    #[must_use]
    pub fn placeholder(sequence_index: usize) -> Self {
        Self {
            sequence_index,
            remote_id: None,
            payload_ref: String::new(),
            is_live: true,
            display_color: DisplayColor::Placeholder,
        }
    }

    /// A loaded record at `sequence_index`.
    #[must_use]
    pub fn loaded(
        sequence_index: usize,
        remote_id: impl Into<String>,
        payload_ref: impl Into<String>,
        is_live: bool,
    ) -> Self {
        Self {
            sequence_index,
            remote_id: Some(remote_id.into()),
            payload_ref: payload_ref.into(),
            is_live,
            display_color: DisplayColor::Loaded,
        }
    }

    /// Permanent identity of this item.
    #[must_use]
    pub const fn sequence_index(&self) -> usize {
        self.sequence_index
    }

    /// Identifier assigned by the remote source, once fetched.
    #[must_use]
    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    /// Payload reference; empty until fetched.
    #[must_use]
    pub fn payload_ref(&self) -> &str {
        &self.payload_ref
    }

    /// Whether the item is inside the live window.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.is_live
    }

    /// Current paint state.
    #[must_use]
    pub const fn display_color(&self) -> DisplayColor {
        self.display_color
    }

    /// Whether the remote payload has arrived.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.display_color == DisplayColor::Loaded
    }
}

/// A store operation addressed indices outside the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRangeError {
    /// The range does not lie inside `0..len`.
    OutOfBounds { range: Range<usize>, len: usize },
    /// A splice would change the store length.
    LengthMismatch { range: Range<usize>, items: usize },
    /// A replacement record carries another slot's identity.
    IdentityMismatch { slot: usize, sequence_index: usize },
}

impl fmt::Display for IndexRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { range, len } => write!(
                f,
                "range {}..{} out of bounds for sequence of length {len}",
                range.start, range.end
            ),
            Self::LengthMismatch { range, items } => write!(
                f,
                "splice of {}..{} given {items} items",
                range.start, range.end
            ),
            Self::IdentityMismatch {
                slot,
                sequence_index,
            } => write!(f, "item {sequence_index} spliced into slot {slot}"),
        }
    }
}

impl std::error::Error for IndexRangeError {}

/// Append-only ordered collection of [`Item`] records.
#[derive(Debug, Clone, Default)]
pub struct SequenceStore {
    items: Vec<Item>,
}

impl SequenceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Record at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    /// All records in sequence order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Append `n` live placeholders and return their index range.
    pub fn append(&mut self, n: usize) -> Range<usize> {
        let start = self.items.len();
        self.items.extend((start..start + n).map(Item::placeholder));
        start..start + n
    }

    /// Replace `range` with `items`, leaving everything outside untouched.
    ///
    /// `items` must fill the range exactly and each record must carry the
    /// sequence index of the slot it lands in.
    pub fn splice_range(
        &mut self,
        range: Range<usize>,
        items: Vec<Item>,
    ) -> Result<(), IndexRangeError> {
        self.check(&range)?;
        if items.len() != range.len() {
            return Err(IndexRangeError::LengthMismatch {
                range,
                items: items.len(),
            });
        }
        if let Some((slot, item)) = range
            .clone()
            .zip(items.iter())
            .find(|(slot, item)| item.sequence_index != *slot)
        {
            return Err(IndexRangeError::IdentityMismatch {
                slot,
                sequence_index: item.sequence_index,
            });
        }
        for (slot, item) in self.items[range].iter_mut().zip(items) {
            *slot = item;
        }
        Ok(())
    }

    /// Mark every record in `range` live. Records outside are untouched.
    pub fn set_live_range(&mut self, range: Range<usize>) -> Result<(), IndexRangeError> {
        self.set_live(range, true)
    }

    /// Mark every record in `range` non-live. Records outside are untouched.
    pub fn invalidate_range(&mut self, range: Range<usize>) -> Result<(), IndexRangeError> {
        self.set_live(range, false)
    }

    /// Mark every record non-live.
    pub fn invalidate_all(&mut self) {
        for item in &mut self.items {
            item.is_live = false;
        }
    }

    /// Number of live records.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_live).count()
    }

    /// Smallest range covering every live record, if any.
    #[must_use]
    pub fn live_span(&self) -> Option<Range<usize>> {
        let first = self.items.iter().position(|item| item.is_live)?;
        let last = self.items.iter().rposition(|item| item.is_live)?;
        Some(first..last + 1)
    }

    /// Whether every record in `range` has its payload.
    #[must_use]
    pub fn is_range_loaded(&self, range: Range<usize>) -> bool {
        self.items
            .get(range)
            .is_some_and(|slice| slice.iter().all(Item::is_loaded))
    }

    fn set_live(&mut self, range: Range<usize>, live: bool) -> Result<(), IndexRangeError> {
        self.check(&range)?;
        for item in &mut self.items[range] {
            item.is_live = live;
        }
        Ok(())
    }

    fn check(&self, range: &Range<usize>) -> Result<(), IndexRangeError> {
        if range.start > range.end || range.end > self.items.len() {
            return Err(IndexRangeError::OutOfBounds {
                range: range.clone(),
                len: self.items.len(),
            });
        }
        Ok(())
    }
}
