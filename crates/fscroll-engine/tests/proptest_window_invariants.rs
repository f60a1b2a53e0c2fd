//! Property-based invariant tests for the windowing engine.
//!
//! Random interleavings of page loads, scroll samples, fetch answers, fetch
//! failures, and retries must preserve:
//!
//! 1. Live bound: live count never exceeds `max_live_items`.
//! 2. Identity stability: a payload at index k never changes once set.
//! 3. Monotonic growth: store length never decreases.
//! 4. Seek idempotence: seeking the same page twice gives the same window.
//! 5. Placement: every loaded item holds its own page's data, whatever the
//!    completion order.

use std::collections::HashMap;

use fscroll_core::{ScrollConfig, ScrollSample};
use fscroll_engine::{
    LoadOutcome, PageRequest, RemoteSource, ScrollEngine, SyntheticSource, WindowValidator,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Load(usize),
    Scroll { scrolled: f64, viewport: f64 },
    Answer(usize),
    Fail(usize),
    Retry(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..12).prop_map(Op::Load),
        2 => (0.0f64..20_000.0, 100.0f64..3_000.0)
            .prop_map(|(scrolled, viewport)| Op::Scroll { scrolled, viewport }),
        4 => any::<usize>().prop_map(Op::Answer),
        1 => any::<usize>().prop_map(Op::Fail),
        1 => (0usize..12).prop_map(Op::Retry),
    ]
}

fn config_strategy() -> impl Strategy<Value = ScrollConfig> {
    (1usize..=12, 3usize..=6, 1u32..=200).prop_map(|(ipp, pages, height)| {
        ScrollConfig::with_item_height(ipp, ipp * pages, height).unwrap()
    })
}

struct Harness {
    engine: ScrollEngine,
    source: SyntheticSource,
    in_flight: Vec<PageRequest>,
    payloads: HashMap<usize, String>,
    last_len: usize,
}

impl Harness {
    fn new(config: ScrollConfig) -> Self {
        let mut engine = ScrollEngine::new(config);
        let in_flight = engine.mount().unwrap();
        Self {
            engine,
            source: SyntheticSource::new(),
            in_flight,
            payloads: HashMap::new(),
            last_len: 0,
        }
    }

    fn apply(&mut self, op: &Op) {
        match *op {
            Op::Load(page) => {
                let requests = self.engine.load_page(page).unwrap().into_requests();
                self.in_flight.extend(requests);
            }
            Op::Scroll { scrolled, viewport } => {
                let content = self.engine.store().len() as f64
                    * f64::from(self.engine.config().item_height());
                let scrolled = scrolled.min((content - viewport).max(0.0));
                let sample = ScrollSample::new(-scrolled, content - scrolled, viewport);
                let requests = self.engine.on_scroll(&sample).unwrap();
                self.in_flight.extend(requests);
            }
            Op::Answer(pick) => {
                if self.in_flight.is_empty() {
                    return;
                }
                let request = self.in_flight.remove(pick % self.in_flight.len());
                let answer = self.source.fetch_page(&request);
                self.engine.complete_fetch(&request, answer).unwrap();
            }
            Op::Fail(pick) => {
                if self.in_flight.is_empty() {
                    return;
                }
                let request = self.in_flight.remove(pick % self.in_flight.len());
                self.engine
                    .complete_fetch(
                        &request,
                        Err(fscroll_engine::FetchError::Transport("dropped".into())),
                    )
                    .unwrap();
            }
            Op::Retry(page) => {
                if let Some(request) = self.engine.retry_page(page) {
                    self.in_flight.push(request);
                }
            }
        }
    }

    fn check(&mut self) -> Result<(), TestCaseError> {
        let store = self.engine.store();
        let config = self.engine.config();
        prop_assert!(
            store.live_count() <= config.max_live_items(),
            "live bound: {} > {}",
            store.live_count(),
            config.max_live_items()
        );
        prop_assert!(store.len() >= self.last_len, "store shrank");
        prop_assert_eq!(store.len() % config.items_per_page(), 0);
        self.last_len = store.len();

        for item in store.items() {
            if item.payload_ref().is_empty() {
                continue;
            }
            let page = item.sequence_index() / config.items_per_page();
            let slot = item.sequence_index() % config.items_per_page();
            prop_assert_eq!(
                item.payload_ref(),
                format!("synthetic://images/{page}/{slot}.jpg")
            );
            let previous = self
                .payloads
                .entry(item.sequence_index())
                .or_insert_with(|| item.payload_ref().to_string());
            prop_assert_eq!(previous.as_str(), item.payload_ref());
        }
        for (index, item) in store.items().iter().enumerate() {
            prop_assert_eq!(index, item.sequence_index());
        }
        Ok(())
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3, 5. Live bound, identity, growth, placement under random interleavings
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn invariants_hold_under_interleavings(
        config in config_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..80),
    ) {
        let mut harness = Harness::new(config);
        harness.check()?;
        for op in &ops {
            harness.apply(op);
            harness.check()?;
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Seek idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn seek_is_idempotent(config in config_strategy(), pages in 1usize..20, target in 0usize..20) {
        let mut engine = ScrollEngine::new(config);
        engine.load_page(pages - 1).unwrap();
        let target = target % pages;

        let first = engine.load_page(target).unwrap();
        let live_after_first = engine.store().live_span();
        let second = engine.load_page(target).unwrap();
        prop_assert!(matches!(first, LoadOutcome::Seeked { .. }), "expected LoadOutcome::Seeked");
        prop_assert_eq!(first, second);
        prop_assert_eq!(live_after_first, engine.store().live_span());
    }
}

proptest! {
    #[test]
    fn seek_window_is_bounded_and_contains_page(
        config in config_strategy(),
        len_pages in 0usize..40,
        page in 0usize..40,
    ) {
        let validator = WindowValidator::new(config);
        let len = len_pages * config.items_per_page();
        let window = validator.seek_window(page, len);
        prop_assert!(window.end <= len);
        prop_assert!(window.len() <= config.max_live_items());
        prop_assert_eq!(window.len(), len.min(config.max_live_items()));
        if page < len_pages {
            let start = page * config.items_per_page();
            prop_assert!(window.contains(&start), "window {:?} misses page start {}", window, start);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Completion order does not matter
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn completion_order_is_irrelevant(order in Just((0usize..6).collect::<Vec<_>>()).prop_shuffle()) {
        let config = ScrollConfig::new(10, 30).unwrap();
        let source = SyntheticSource::new();
        let mut engine = ScrollEngine::new(config);
        let mut requests = engine.mount().unwrap();
        for page in 1..6 {
            requests.extend(engine.load_page(page).unwrap().into_requests());
        }
        for &i in &order {
            let answer = source.fetch_page(&requests[i]);
            engine.complete_fetch(&requests[i], answer).unwrap();
        }
        for item in engine.store().items() {
            let page = item.sequence_index() / 10;
            let expected = format!("item-{page}-{}", item.sequence_index() % 10);
            prop_assert_eq!(item.remote_id(), Some(expected.as_str()));
        }
        prop_assert_eq!(engine.store().live_span(), Some(30..60));
    }
}
