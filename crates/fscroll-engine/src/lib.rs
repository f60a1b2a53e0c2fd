#![forbid(unsafe_code)]

//! Windowed infinite-scroll engine for FrankenScroll.
//!
//! Presents an arbitrarily long, stable item sequence while keeping at most
//! `max_live_items` of it live. Pages are fetched asynchronously by the host
//! and may answer in any order; each answer lands in the absolute index
//! range fixed when its page was requested.
//!
//! # Example
//!
//! ```
//! use fscroll_core::ScrollConfig;
//! use fscroll_engine::{RemoteSource, ScrollEngine, SyntheticSource};
//!
//! let mut engine = ScrollEngine::new(ScrollConfig::new(10, 30).unwrap());
//! let source = SyntheticSource::new();
//! for request in engine.mount().unwrap() {
//!     let answer = source.fetch_page(&request);
//!     engine.complete_fetch(&request, answer).unwrap();
//! }
//! assert_eq!(engine.store().len(), 10);
//! assert_eq!(engine.store().live_count(), 10);
//! ```

pub mod engine;
pub mod loader;
pub mod observer;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod tracker;
pub mod window;

pub use engine::{FetchOutcome, ScrollEngine};
pub use loader::{DEFAULT_MAX_GAP_PAGES, LoadOutcome, PageLoader, PageRequest, Reconciled};
pub use observer::{CountingObserver, EngineObserver, NoopObserver, TracingObserver};
pub use snapshot::{ItemView, Snapshot, WindowSummary};
pub use source::{FetchError, RemoteItem, RemoteSource, SyntheticSource};
pub use store::{DisplayColor, IndexRangeError, Item, SequenceStore};
pub use tracker::{ScrollPosition, ScrollPositionTracker, ScrollState, TrackerAction};
pub use window::WindowValidator;
