//! Scan-match engine
//!
//! Owns the per-key dedup table and the scanning/frozen state machine. The
//! frame path (filter, region check, merge, normalize, observe) runs
//! synchronously under one lock; catalog lookups run as fire-and-forget
//! tokio tasks whose completions re-enter the same lock. That lock is the
//! engine's only shared-mutable-state surface.

pub mod resolver;

pub use resolver::{MatchResult, Resolution};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::catalog::{CatalogItem, CatalogSearch, LookupError};
use crate::config::EngineConfig;
use crate::events::{EngineEvent, ResolveOutcome, ScanProgress};
use crate::frame::TextFragment;
use crate::pipeline;

/// Overall engine mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// Frames are processed and lookups dispatched
    Scanning,
    /// A decisive match latched; frames are ignored until restart
    Frozen,
}

/// Per-key dedup state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyState {
    /// A lookup for this key is outstanding
    InFlight,
    /// Terminal for the session; never re-searched until restart
    Resolved(ResolveOutcome),
}

/// Summary of one frame's processing, for observability
#[derive(Debug, Clone, Default)]
pub struct FrameSummary {
    /// Whether the frame was processed at all (false when frozen or throttled)
    pub processed: bool,
    /// Fragments that passed the plausibility filter and region check
    pub fragments_kept: usize,
    /// Merged candidates produced
    pub candidates: usize,
    /// New lookups dispatched
    pub lookups_started: usize,
    /// Time spent on the frame path in microseconds
    pub processing_time_us: u64,
}

/// State behind the engine's single mutual-exclusion domain
struct EngineShared {
    mode: EngineMode,
    keys: HashMap<String, KeyState>,
    match_result: Option<MatchResult>,
    last_frame: Option<Instant>,
    /// Incremented on restart; completions from an older session are discarded
    generation: u64,
    lookup_failures: u64,
}

struct EngineInner {
    config: EngineConfig,
    catalog: Arc<dyn CatalogSearch>,
    shared: Mutex<EngineShared>,
    events_tx: Sender<EngineEvent>,
    events_rx: Receiver<EngineEvent>,
    handle: tokio::runtime::Handle,
}

/// Live scan-match engine
///
/// Cheap to clone; all clones share one session. Must be created within a
/// tokio runtime, which hosts the lookup tasks.
#[derive(Clone)]
pub struct ScanEngine {
    inner: Arc<EngineInner>,
}

impl ScanEngine {
    /// Create an engine in `Scanning` mode against the given catalog
    pub fn new(config: EngineConfig, catalog: Arc<dyn CatalogSearch>) -> Self {
        let (events_tx, events_rx) = unbounded();

        Self {
            inner: Arc::new(EngineInner {
                config,
                catalog,
                shared: Mutex::new(EngineShared {
                    mode: EngineMode::Scanning,
                    keys: HashMap::new(),
                    match_result: None,
                    last_frame: None,
                    generation: 0,
                    lookup_failures: 0,
                }),
                events_tx,
                events_rx,
                handle: tokio::runtime::Handle::current(),
            }),
        }
    }

    /// Process one frame of recognized fragments.
    ///
    /// Runs the full synchronous pipeline and dispatches lookups for unseen
    /// keys. Never blocks on network I/O. No-op while frozen or when frames
    /// arrive faster than the configured minimum interval.
    pub fn process_frame(&self, fragments: Vec<TextFragment>) -> FrameSummary {
        let start = Instant::now();
        let mut events = Vec::new();
        let mut summary = FrameSummary::default();

        {
            let mut shared = self.inner.shared.lock();

            if shared.mode == EngineMode::Frozen {
                return summary;
            }

            let min_interval = Duration::from_millis(self.inner.config.region.min_frame_interval_ms);
            if let Some(last) = shared.last_frame {
                if start.duration_since(last) < min_interval {
                    return summary;
                }
            }
            shared.last_frame = Some(start);
            summary.processed = true;

            let region = self.inner.config.region.scan_region;
            let kept: Vec<TextFragment> = fragments
                .into_iter()
                .filter(|f| pipeline::is_plausible_part_number(&f.text))
                .filter(|f| f.bounds.intersects(&region))
                .collect();
            summary.fragments_kept = kept.len();

            let candidates = pipeline::merge_fragments(kept, &self.inner.config.merge);
            summary.candidates = candidates.len();

            for candidate in &candidates {
                if self.observe_locked(&mut shared, &candidate.text, &mut events) {
                    summary.lookups_started += 1;
                }
            }
        }

        for event in events {
            let _ = self.inner.events_tx.send(event);
        }

        summary.processing_time_us = start.elapsed().as_micros() as u64;
        debug!(
            "Frame processed: {} kept, {} candidates, {} lookups started",
            summary.fragments_kept, summary.candidates, summary.lookups_started
        );

        summary
    }

    /// Observe one candidate under the lock. Returns true if a lookup was
    /// dispatched for its key.
    fn observe_locked(
        &self,
        shared: &mut EngineShared,
        candidate_text: &str,
        events: &mut Vec<EngineEvent>,
    ) -> bool {
        let key = pipeline::normalize(candidate_text);

        // Too short to be meaningful; resolve without searching
        if key.chars().count() < self.inner.config.lookup.min_key_length {
            if !shared.keys.contains_key(&key) {
                shared
                    .keys
                    .insert(key.clone(), KeyState::Resolved(ResolveOutcome::NoMatch));
                events.push(EngineEvent::KeyResolved {
                    key,
                    outcome: ResolveOutcome::NoMatch,
                });
            }
            return false;
        }

        // At most one lookup per key per session
        if shared.keys.contains_key(&key) {
            return false;
        }

        shared.keys.insert(key.clone(), KeyState::InFlight);
        let generation = shared.generation;
        let limit = self.inner.config.lookup.page_size;
        let inner = Arc::clone(&self.inner);

        debug!("Dispatching catalog lookup for key {:?}", key);
        self.inner.handle.spawn(async move {
            let result = inner.catalog.search(&key, limit).await;
            inner.complete_lookup(generation, key, result);
        });

        true
    }

    /// Restart the scan session: clear all key history, drop any match, and
    /// return to `Scanning`. The only path out of `Frozen`.
    pub fn restart(&self) {
        {
            let mut shared = self.inner.shared.lock();
            shared.keys.clear();
            shared.mode = EngineMode::Scanning;
            shared.match_result = None;
            shared.last_frame = None;
            shared.generation += 1;
        }

        let _ = self.inner.events_tx.send(EngineEvent::Restarted);
        info!("Scan session restarted");
    }

    /// Current engine mode
    pub fn mode(&self) -> EngineMode {
        self.inner.shared.lock().mode
    }

    /// The decisive match, if the engine is frozen on one
    pub fn match_result(&self) -> Option<MatchResult> {
        self.inner.shared.lock().match_result.clone()
    }

    /// Snapshot of in-flight and resolved keys for progress display
    pub fn progress(&self) -> ScanProgress {
        let shared = self.inner.shared.lock();
        let mut progress = ScanProgress::default();

        for (key, state) in &shared.keys {
            match state {
                KeyState::InFlight => progress.in_flight.push(key.clone()),
                KeyState::Resolved(_) => progress.resolved.push(key.clone()),
            }
        }
        progress.in_flight.sort();
        progress.resolved.sort();
        progress
    }

    /// Number of lookups that failed this session
    pub fn lookup_failures(&self) -> u64 {
        self.inner.shared.lock().lookup_failures
    }

    /// Receiver for engine events. Events are consumed by a single
    /// subscriber; clones of the receiver share the queue.
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        self.inner.events_rx.clone()
    }
}

impl EngineInner {
    /// Apply a completed lookup. Stale completions (restarted session,
    /// frozen engine, or key no longer in flight) are discarded.
    fn complete_lookup(
        &self,
        generation: u64,
        key: String,
        result: Result<Vec<CatalogItem>, LookupError>,
    ) {
        let mut events = Vec::new();

        {
            let mut shared = self.shared.lock();

            if shared.generation != generation {
                debug!("Discarding lookup result for {:?}: session restarted", key);
                return;
            }
            if shared.mode == EngineMode::Frozen {
                debug!("Discarding lookup result for {:?}: engine frozen", key);
                return;
            }
            if shared.keys.get(&key) != Some(&KeyState::InFlight) {
                debug!("Discarding lookup result for {:?}: key not in flight", key);
                return;
            }

            match result {
                Err(err) => {
                    // No retry within the session; the key stays no-match
                    warn!("Catalog lookup failed for {:?}: {}", key, err);
                    shared.lookup_failures += 1;
                    shared
                        .keys
                        .insert(key.clone(), KeyState::Resolved(ResolveOutcome::NoMatch));
                    events.push(EngineEvent::KeyResolved {
                        key,
                        outcome: ResolveOutcome::NoMatch,
                    });
                }
                Ok(items) => match resolver::resolve(&key, &items) {
                    Resolution::NoMatch => {
                        debug!("No exact match for {:?} ({} results)", key, items.len());
                        shared
                            .keys
                            .insert(key.clone(), KeyState::Resolved(ResolveOutcome::NoMatch));
                        events.push(EngineEvent::KeyResolved {
                            key,
                            outcome: ResolveOutcome::NoMatch,
                        });
                    }
                    Resolution::Matched(match_result) => {
                        info!(
                            "Matched part {:?} ({} longer-variant conflicts), freezing scan",
                            match_result.matched_item.number,
                            match_result.conflicts.len()
                        );
                        shared
                            .keys
                            .insert(key.clone(), KeyState::Resolved(ResolveOutcome::Matched));
                        shared.mode = EngineMode::Frozen;
                        shared.match_result = Some(match_result.clone());
                        events.push(EngineEvent::KeyResolved {
                            key,
                            outcome: ResolveOutcome::Matched,
                        });
                        events.push(EngineEvent::MatchFrozen(match_result));
                    }
                },
            }
        }

        for event in events {
            let _ = self.events_tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Catalog double: records queries, optionally holds lookups for one
    /// key open behind a semaphore, optionally fails every lookup.
    struct MockCatalog {
        items: Vec<CatalogItem>,
        queries: Mutex<Vec<String>>,
        gated_key: Option<(String, Arc<Semaphore>)>,
        fail: bool,
    }

    impl MockCatalog {
        fn with_items(numbers: &[&str]) -> Self {
            Self {
                items: numbers.iter().map(|n| CatalogItem::new(*n)).collect(),
                queries: Mutex::new(Vec::new()),
                gated_key: None,
                fail: false,
            }
        }

        fn gated(numbers: &[&str], key: &str, gate: Arc<Semaphore>) -> Self {
            Self {
                gated_key: Some((key.to_string(), gate)),
                ..Self::with_items(numbers)
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::with_items(&[])
            }
        }

        fn query_count(&self) -> usize {
            self.queries.lock().len()
        }
    }

    #[async_trait]
    impl CatalogSearch for MockCatalog {
        async fn search(&self, query: &str, limit: usize) -> Result<Vec<CatalogItem>, LookupError> {
            self.queries.lock().push(query.to_string());

            if let Some((key, gate)) = &self.gated_key {
                if query == key {
                    gate.acquire().await.unwrap().forget();
                }
            }

            if self.fail {
                return Err(LookupError::Transport("connection reset".to_string()));
            }

            let needle = query.to_lowercase();
            Ok(self
                .items
                .iter()
                .filter(|item| item.number.to_lowercase().starts_with(&needle))
                .take(limit)
                .cloned()
                .collect())
        }
    }

    fn test_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        // Whole frame in scope, no throttling, for deterministic tests
        config.region.scan_region = Rect::new(0.0, 0.0, 1.0, 1.0);
        config.region.min_frame_interval_ms = 0;
        config
    }

    fn part_frame(text: &str) -> Vec<TextFragment> {
        vec![TextFragment::new(text, Rect::new(0.3, 0.44, 0.1, 0.03))]
    }

    fn wait_for_event(rx: &Receiver<EngineEvent>) -> EngineEvent {
        rx.recv_timeout(Duration::from_secs(2))
            .expect("timed out waiting for engine event")
    }

    /// Lookup tasks record their query asynchronously; poll until the
    /// expected number have started.
    fn wait_for_queries(catalog: &MockCatalog, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while catalog.query_count() < n {
            assert!(Instant::now() < deadline, "timed out waiting for lookups");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_exact_match_freezes_with_conflicts() {
        let catalog = Arc::new(MockCatalog::with_items(&["C123-1", "C123-17", "C123-10"]));
        let engine = ScanEngine::new(test_config(), catalog.clone());
        let events = engine.subscribe();

        let summary = engine.process_frame(part_frame("P/N C123-1"));
        assert!(summary.processed);
        assert_eq!(summary.lookups_started, 1);

        assert!(matches!(
            wait_for_event(&events),
            EngineEvent::KeyResolved {
                outcome: ResolveOutcome::Matched,
                ..
            }
        ));
        let EngineEvent::MatchFrozen(result) = wait_for_event(&events) else {
            panic!("expected freeze event");
        };

        assert_eq!(result.matched_item.number, "C123-1");
        let conflicts: Vec<&str> = result.conflicts.iter().map(|c| c.number.as_str()).collect();
        assert_eq!(conflicts, vec!["C123-17", "C123-10"]);
        assert_eq!(engine.mode(), EngineMode::Frozen);
        assert_eq!(engine.match_result().unwrap().matched_item.number, "C123-1");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_at_most_one_lookup_in_flight_per_key() {
        let gate = Arc::new(Semaphore::new(0));
        let catalog = Arc::new(MockCatalog::gated(&[], "C123-1", gate.clone()));
        let engine = ScanEngine::new(test_config(), catalog.clone());
        let events = engine.subscribe();

        assert_eq!(engine.process_frame(part_frame("C123-1")).lookups_started, 1);
        wait_for_queries(&catalog, 1);
        // Same key again while the first lookup is still held open
        assert_eq!(engine.process_frame(part_frame("C123-1")).lookups_started, 0);
        assert_eq!(engine.process_frame(part_frame("PN: C123-1")).lookups_started, 0);
        assert_eq!(catalog.query_count(), 1);
        assert_eq!(engine.progress().in_flight, vec!["C123-1".to_string()]);

        gate.add_permits(1);
        assert!(matches!(
            wait_for_event(&events),
            EngineEvent::KeyResolved {
                outcome: ResolveOutcome::NoMatch,
                ..
            }
        ));
        assert_eq!(engine.progress().resolved, vec!["C123-1".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_resolved_key_never_searched_again() {
        let catalog = Arc::new(MockCatalog::with_items(&[]));
        let engine = ScanEngine::new(test_config(), catalog.clone());
        let events = engine.subscribe();

        engine.process_frame(part_frame("C123-1"));
        wait_for_event(&events);
        assert_eq!(catalog.query_count(), 1);

        // Key is terminal for the session
        assert_eq!(engine.process_frame(part_frame("C123-1")).lookups_started, 0);
        assert_eq!(catalog.query_count(), 1);
        assert_eq!(engine.mode(), EngineMode::Scanning);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_short_keys_resolve_without_lookup() {
        let catalog = Arc::new(MockCatalog::with_items(&["A1"]));
        let engine = ScanEngine::new(test_config(), catalog.clone());
        let events = engine.subscribe();

        let summary = engine.process_frame(part_frame("A1"));
        assert_eq!(summary.candidates, 1);
        assert_eq!(summary.lookups_started, 0);
        assert_eq!(catalog.query_count(), 0);

        assert!(matches!(
            wait_for_event(&events),
            EngineEvent::KeyResolved {
                outcome: ResolveOutcome::NoMatch,
                ..
            }
        ));
        assert_eq!(engine.progress().resolved, vec!["A1".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lookup_failure_resolves_no_match_without_retry() {
        let catalog = Arc::new(MockCatalog::failing());
        let engine = ScanEngine::new(test_config(), catalog.clone());
        let events = engine.subscribe();

        engine.process_frame(part_frame("C123-1"));
        assert!(matches!(
            wait_for_event(&events),
            EngineEvent::KeyResolved {
                outcome: ResolveOutcome::NoMatch,
                ..
            }
        ));

        // Failure is terminal for the key; scanning continues
        assert_eq!(engine.mode(), EngineMode::Scanning);
        assert_eq!(engine.lookup_failures(), 1);
        assert_eq!(engine.process_frame(part_frame("C123-1")).lookups_started, 0);
        assert_eq!(catalog.query_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_freeze_latches_until_restart() {
        let catalog = Arc::new(MockCatalog::with_items(&["C123-1"]));
        let engine = ScanEngine::new(test_config(), catalog.clone());
        let events = engine.subscribe();

        engine.process_frame(part_frame("C123-1"));
        wait_for_event(&events); // KeyResolved
        wait_for_event(&events); // MatchFrozen
        assert_eq!(engine.mode(), EngineMode::Frozen);

        // Frames that would otherwise start lookups are ignored entirely
        let summary = engine.process_frame(part_frame("X900-5"));
        assert!(!summary.processed);
        assert_eq!(catalog.query_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_restart_clears_history_and_permits_research() {
        let catalog = Arc::new(MockCatalog::with_items(&[]));
        let engine = ScanEngine::new(test_config(), catalog.clone());
        let events = engine.subscribe();

        engine.process_frame(part_frame("C123-1"));
        wait_for_event(&events);
        assert_eq!(catalog.query_count(), 1);

        engine.restart();
        assert!(matches!(wait_for_event(&events), EngineEvent::Restarted));
        assert!(engine.progress().resolved.is_empty());

        // Previously resolved key is eligible again
        assert_eq!(engine.process_frame(part_frame("C123-1")).lookups_started, 1);
        assert_eq!(catalog.query_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_late_result_after_freeze_is_discarded() {
        let gate = Arc::new(Semaphore::new(0));
        let catalog = Arc::new(MockCatalog::gated(
            &["HELD-99", "C123-1"],
            "HELD-99",
            gate.clone(),
        ));
        let engine = ScanEngine::new(test_config(), catalog.clone());
        let events = engine.subscribe();

        // First lookup is held open behind the gate
        engine.process_frame(part_frame("HELD-99"));
        wait_for_queries(&catalog, 1);

        // Second lookup completes and freezes the engine
        engine.process_frame(part_frame("C123-1"));
        loop {
            match wait_for_event(&events) {
                EngineEvent::MatchFrozen(result) => {
                    assert_eq!(result.matched_item.number, "C123-1");
                    break;
                }
                _ => continue,
            }
        }

        // Release the held lookup; its result must be discarded
        gate.add_permits(1);
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(engine.match_result().unwrap().matched_item.number, "C123-1");
        assert!(events.try_recv().is_err(), "no event after discard");
        // The held key stays in flight on the books; restart clears it
        assert_eq!(engine.progress().in_flight, vec!["HELD-99".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_frames_outside_region_are_ignored() {
        let mut config = test_config();
        config.region.scan_region = Rect::new(0.3, 0.42, 0.4, 0.08);
        let catalog = Arc::new(MockCatalog::with_items(&[]));
        let engine = ScanEngine::new(config, catalog.clone());

        // Fragment well outside the region
        let frame = vec![TextFragment::new(
            "C123-1",
            Rect::new(0.0, 0.9, 0.1, 0.03),
        )];
        let summary = engine.process_frame(frame);

        assert!(summary.processed);
        assert_eq!(summary.fragments_kept, 0);
        assert_eq!(catalog.query_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_frame_throttle_drops_fast_frames() {
        let mut config = test_config();
        config.region.min_frame_interval_ms = 10_000;
        let catalog = Arc::new(MockCatalog::with_items(&[]));
        let engine = ScanEngine::new(config, catalog.clone());

        assert!(engine.process_frame(part_frame("C123-1")).processed);
        assert!(!engine.process_frame(part_frame("X900-5")).processed);
        wait_for_queries(&catalog, 1);
        assert_eq!(catalog.query_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_split_fragments_merge_before_lookup() {
        let catalog = Arc::new(MockCatalog::with_items(&["C123-1"]));
        let engine = ScanEngine::new(test_config(), catalog.clone());
        let events = engine.subscribe();

        // Recognizer split the placard into a prefix and a number
        let frame = vec![
            TextFragment::new("P/N", Rect::new(0.30, 0.44, 0.05, 0.03)),
            TextFragment::new("C123-1", Rect::new(0.36, 0.44, 0.08, 0.03)),
        ];
        let summary = engine.process_frame(frame);

        assert_eq!(summary.candidates, 1);
        assert_eq!(summary.lookups_started, 1);

        wait_for_event(&events);
        let EngineEvent::MatchFrozen(result) = wait_for_event(&events) else {
            panic!("expected freeze");
        };
        assert_eq!(result.matched_item.number, "C123-1");
        // Merged candidate was normalized before the lookup
        assert_eq!(catalog.queries.lock()[0], "C123-1");
    }
}
