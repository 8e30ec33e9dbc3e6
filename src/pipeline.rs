/// Scan pipeline — turns periodic WiFi scans into card events.
///
/// The pipeline is a sans-IO state machine. It never sleeps or spawns:
/// the platform driver owns the clock and the radio callbacks, and feeds
/// them in through [`ScanPipeline::poll`] and
/// [`ScanPipeline::on_results_available`]. Timers are deadlines the
/// driver sleeps until ([`ScanPipeline::next_deadline`]); stopping the
/// pipeline disarms them, and a late timer or results callback delivered
/// after `stop()` is ignored.
///
/// Every method takes `&mut self`. Drivers that receive radio callbacks
/// and timer ticks on different tasks or threads keep the pipeline behind
/// a single mutex, so a batch always runs to completion before a cache
/// flush or a lifecycle change can touch the seen-cache.
///
/// ```text
///            start()                    stop()
///   Idle ─────────────▶ Scanning ─────────────▶ Idle
///                        │  ▲
///      rescan timer ─────┤  │ results available
///      flush timer ──────┘  └── radio facility
/// ```
use crate::cache::SeenCache;
use crate::card::Card;
use crate::codec::{self, BeaconName};
use crate::defaults::{CACHE_WINDOW_MS, MAX_SCAN_RESULTS, SCAN_INTERVAL_MS, SEEN_CAPACITY};

/// Beacon names visible in the latest completed scan.
pub type ScanResults = heapless::Vec<BeaconName, MAX_SCAN_RESULTS>;

/// Failure reported by the radio scan facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FacilityError {
    /// Radio is off, not initialized, or permission was denied.
    #[error("scan facility unavailable")]
    Unavailable,
    /// A scan is already in flight; its results will still be delivered.
    #[error("scan already in progress")]
    Busy,
    /// Unsubscribe without an active subscription.
    #[error("not subscribed to scan results")]
    NotSubscribed,
}

/// The radio scan facility consumed by the pipeline.
///
/// `subscribe` registers interest in "results available" notifications;
/// the driver routes each notification to
/// [`ScanPipeline::on_results_available`]. `trigger_scan` is
/// fire-and-forget: completion is signalled through that notification.
pub trait ScanFacility {
    fn subscribe(&mut self) -> Result<(), FacilityError>;
    fn unsubscribe(&mut self) -> Result<(), FacilityError>;
    fn trigger_scan(&mut self) -> Result<(), FacilityError>;
    fn current_results(&self) -> ScanResults;
}

/// A card decoded from a newly seen beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardObserved {
    pub card: Card,
    /// Driver clock at the time the scan batch was processed
    pub ts_ms: u64,
}

/// Observer receiving card events.
pub trait CardSink {
    fn card_observed(&mut self, event: CardObserved);
}

/// Adapts a closure into a [`CardSink`].
pub struct FnSink<F>(pub F);

impl<F: FnMut(CardObserved)> CardSink for FnSink<F> {
    fn card_observed(&mut self, event: CardObserved) {
        (self.0)(event)
    }
}

/// Fan-out to two sinks, in order.
impl<A: CardSink, B: CardSink> CardSink for (A, B) {
    fn card_observed(&mut self, event: CardObserved) {
        self.0.card_observed(event);
        self.1.card_observed(event);
    }
}

/// Bounded event queue. Events arriving while full are dropped.
impl<const N: usize> CardSink for heapless::Vec<CardObserved, N> {
    fn card_observed(&mut self, event: CardObserved) {
        if self.push(event).is_err() {
            log::warn!("Card event queue full, dropping {}", event.card);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Scanning,
}

/// Runtime pipeline configuration. Changes apply the next time a timer
/// is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Interval between scan triggers
    pub scan_interval_ms: u64,
    /// Interval between full seen-cache flushes
    pub cache_window_ms: u64,
}

impl PipelineConfig {
    pub const fn new() -> Self {
        Self {
            scan_interval_ms: SCAN_INTERVAL_MS,
            cache_window_ms: CACHE_WINDOW_MS,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ScanPipeline<F, S> {
    facility: F,
    sink: S,
    config: PipelineConfig,
    state: PipelineState,
    seen: SeenCache<SEEN_CAPACITY>,
    /// Deadline of the re-trigger timer, `None` when disarmed
    rescan_at: Option<u64>,
    /// Deadline of the cache-flush timer, `None` when disarmed
    flush_at: Option<u64>,
    observed: u32,
}

impl<F, S> ScanPipeline<F, S> {
    pub const fn new(facility: F, sink: S, config: PipelineConfig) -> Self {
        Self {
            facility,
            sink,
            config,
            state: PipelineState::Idle,
            seen: SeenCache::new(),
            rescan_at: None,
            flush_at: None,
            observed: 0,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_scanning(&self) -> bool {
        self.state == PipelineState::Scanning
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PipelineConfig) {
        self.config = config;
    }

    /// Number of names in the seen-cache.
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    /// Card events emitted since construction.
    pub fn observed_count(&self) -> u32 {
        self.observed
    }

    pub fn facility(&self) -> &F {
        &self.facility
    }

    pub fn facility_mut(&mut self) -> &mut F {
        &mut self.facility
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Earliest armed timer deadline, `None` when idle.
    pub fn next_deadline(&self) -> Option<u64> {
        match (self.rescan_at, self.flush_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

impl<F: ScanFacility, S: CardSink> ScanPipeline<F, S> {
    /// Enter `Scanning`: fresh cache, subscribe, trigger a scan right away
    /// and arm both timers. A no-op when already scanning.
    ///
    /// On failure the pipeline stays `Idle` and any subscription made
    /// here is released again.
    pub fn start(&mut self, now_ms: u64) -> Result<(), FacilityError> {
        if self.is_scanning() {
            log::debug!("Start ignored, already scanning");
            return Ok(());
        }

        if let Err(e) = self.facility.subscribe() {
            log::warn!("Scan start failed, cannot subscribe: {}", e);
            return Err(e);
        }

        match self.facility.trigger_scan() {
            Ok(()) => {}
            Err(FacilityError::Busy) => {
                log::debug!("Initial scan coalesced into one already in flight");
            }
            Err(e) => {
                log::warn!("Scan start failed, cannot trigger scan: {}", e);
                if let Err(u) = self.facility.unsubscribe() {
                    log::warn!("Rollback unsubscribe failed: {}", u);
                }
                return Err(e);
            }
        }

        self.seen.clear();
        self.state = PipelineState::Scanning;
        self.rescan_at = Some(now_ms + self.config.scan_interval_ms);
        self.flush_at = Some(now_ms + self.config.cache_window_ms);

        log::info!(
            "Scanning started (every {} ms, cache window {} ms)",
            self.config.scan_interval_ms,
            self.config.cache_window_ms
        );
        Ok(())
    }

    /// Leave `Scanning`: disarm both timers, drop the cache and
    /// unsubscribe. A no-op when idle.
    ///
    /// The pipeline is `Idle` when this returns, whatever the result.
    /// `NotSubscribed` counts as success; other unsubscribe failures are
    /// reported after the transition.
    pub fn stop(&mut self) -> Result<(), FacilityError> {
        if !self.is_scanning() {
            log::debug!("Stop ignored, not scanning");
            return Ok(());
        }

        self.state = PipelineState::Idle;
        self.rescan_at = None;
        self.flush_at = None;
        self.seen.clear();
        log::info!("Scanning stopped");

        match self.facility.unsubscribe() {
            Ok(()) | Err(FacilityError::NotSubscribed) => Ok(()),
            Err(e) => {
                log::warn!("Unsubscribe failed: {}", e);
                Err(e)
            }
        }
    }

    /// Fire every timer whose deadline is at or before `now_ms`.
    pub fn poll(&mut self, now_ms: u64) {
        if self.flush_at.is_some_and(|at| now_ms >= at) {
            self.on_flush_timer(now_ms);
        }
        if self.rescan_at.is_some_and(|at| now_ms >= at) {
            self.on_rescan_timer(now_ms);
        }
    }

    /// Re-trigger timer callback. Triggers another scan and rearms, but
    /// only while scanning.
    pub fn on_rescan_timer(&mut self, now_ms: u64) {
        if !self.is_scanning() {
            self.rescan_at = None;
            return;
        }

        match self.facility.trigger_scan() {
            Ok(()) => {}
            Err(FacilityError::Busy) => log::debug!("Scan still in flight, skipping trigger"),
            Err(e) => log::warn!("Scan trigger failed, retrying next tick: {}", e),
        }
        self.rescan_at = Some(now_ms + self.config.scan_interval_ms);
    }

    /// Cache-flush timer callback. Clears the seen-cache; rearms only
    /// while scanning.
    pub fn on_flush_timer(&mut self, now_ms: u64) {
        let flushed = self.seen.len();
        self.seen.clear();
        if self.is_scanning() {
            self.flush_at = Some(now_ms + self.config.cache_window_ms);
            log::debug!("Seen-cache flushed ({} names)", flushed);
        } else {
            self.flush_at = None;
        }
    }

    /// "Results available" notification from the facility. Reads the
    /// latest scan and processes it; ignored when idle.
    ///
    /// Returns the number of card events emitted.
    pub fn on_results_available(&mut self, now_ms: u64) -> usize {
        if !self.is_scanning() {
            log::debug!("Ignoring scan results delivered after stop");
            return 0;
        }
        let results = self.facility.current_results();
        self.process_batch(&results, now_ms)
    }

    /// Check, cache and decode each name of one scan, in delivery order.
    fn process_batch(&mut self, names: &[BeaconName], now_ms: u64) -> usize {
        debug_assert!(self.is_scanning(), "batch processed while idle");

        let mut emitted = 0;
        for name in names {
            if !codec::is_card_beacon(name) {
                continue;
            }
            if self.seen.contains(name) {
                continue;
            }
            let decoded = codec::decode(name);
            self.seen.insert(name, decoded.is_some());
            if let Some(card) = decoded {
                log::info!("Card observed: {}", card);
                self.observed = self.observed.wrapping_add(1);
                self.sink.card_observed(CardObserved { card, ts_ms: now_ms });
                emitted += 1;
            }
        }
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Suit;
    use crate::codec::encode;

    type Events = heapless::Vec<CardObserved, 16>;

    /// Scripted radio facility recording every call.
    #[derive(Default)]
    struct MockFacility {
        subscribed: bool,
        subscribe_calls: u32,
        unsubscribe_calls: u32,
        triggers: u32,
        results: ScanResults,
        fail_subscribe: Option<FacilityError>,
        fail_trigger: Option<FacilityError>,
        fail_unsubscribe: Option<FacilityError>,
    }

    impl MockFacility {
        fn air(&mut self, names: &[&str]) {
            self.results.clear();
            for n in names {
                self.results.push(BeaconName::try_from(*n).unwrap()).unwrap();
            }
        }
    }

    impl ScanFacility for MockFacility {
        fn subscribe(&mut self) -> Result<(), FacilityError> {
            self.subscribe_calls += 1;
            if let Some(e) = self.fail_subscribe {
                return Err(e);
            }
            self.subscribed = true;
            Ok(())
        }

        fn unsubscribe(&mut self) -> Result<(), FacilityError> {
            self.unsubscribe_calls += 1;
            if let Some(e) = self.fail_unsubscribe {
                return Err(e);
            }
            if !self.subscribed {
                return Err(FacilityError::NotSubscribed);
            }
            self.subscribed = false;
            Ok(())
        }

        fn trigger_scan(&mut self) -> Result<(), FacilityError> {
            if let Some(e) = self.fail_trigger {
                return Err(e);
            }
            self.triggers += 1;
            Ok(())
        }

        fn current_results(&self) -> ScanResults {
            self.results.clone()
        }
    }

    fn pipeline() -> ScanPipeline<MockFacility, Events> {
        ScanPipeline::new(MockFacility::default(), Events::new(), PipelineConfig::new())
    }

    fn card(suit: Suit, rank: u8) -> Card {
        Card::new(suit, rank).unwrap()
    }

    fn beacon(suit: Suit, rank: u8) -> BeaconName {
        encode(card(suit, rank))
    }

    fn cards(p: &ScanPipeline<MockFacility, Events>) -> Vec<Card> {
        p.sink().iter().map(|e| e.card).collect()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    #[test]
    fn idle_on_creation() {
        let p = pipeline();
        assert_eq!(p.state(), PipelineState::Idle);
        assert!(!p.is_scanning());
        assert_eq!(p.next_deadline(), None);
    }

    #[test]
    fn start_subscribes_triggers_and_arms_timers() {
        let mut p = pipeline();
        p.start(1_000).unwrap();

        assert!(p.is_scanning());
        assert!(p.facility().subscribed);
        assert_eq!(p.facility().triggers, 1);
        assert_eq!(p.next_deadline(), Some(1_500));
    }

    #[test]
    fn start_twice_keeps_one_subscription_and_timer_pair() {
        let mut p = pipeline();
        p.start(0).unwrap();
        p.start(200).unwrap();

        assert_eq!(p.facility().subscribe_calls, 1);
        assert_eq!(p.facility().triggers, 1);
        // Timers still armed from the first start
        assert_eq!(p.next_deadline(), Some(500));
    }

    #[test]
    fn stop_unsubscribes_and_disarms() {
        let mut p = pipeline();
        p.start(0).unwrap();
        p.stop().unwrap();

        assert_eq!(p.state(), PipelineState::Idle);
        assert!(!p.facility().subscribed);
        assert_eq!(p.next_deadline(), None);
    }

    #[test]
    fn stop_when_idle_is_a_noop() {
        let mut p = pipeline();
        p.stop().unwrap();
        assert_eq!(p.facility().unsubscribe_calls, 0);

        p.start(0).unwrap();
        p.stop().unwrap();
        p.stop().unwrap();
        assert_eq!(p.facility().unsubscribe_calls, 1);
    }

    #[test]
    fn restart_after_stop() {
        let mut p = pipeline();
        p.start(0).unwrap();
        p.stop().unwrap();
        p.start(5_000).unwrap();

        assert!(p.is_scanning());
        assert_eq!(p.facility().subscribe_calls, 2);
        assert_eq!(p.next_deadline(), Some(5_500));
    }

    // ── Facility failures ───────────────────────────────────────────

    #[test]
    fn failed_subscribe_leaves_pipeline_idle() {
        let mut p = pipeline();
        p.facility_mut().fail_subscribe = Some(FacilityError::Unavailable);

        assert_eq!(p.start(0), Err(FacilityError::Unavailable));
        assert!(!p.is_scanning());
        assert_eq!(p.facility().triggers, 0);
        assert_eq!(p.next_deadline(), None);
    }

    #[test]
    fn failed_initial_trigger_rolls_back_subscription() {
        let mut p = pipeline();
        p.facility_mut().fail_trigger = Some(FacilityError::Unavailable);

        assert_eq!(p.start(0), Err(FacilityError::Unavailable));
        assert!(!p.is_scanning());
        assert!(!p.facility().subscribed);
        assert_eq!(p.facility().unsubscribe_calls, 1);
    }

    #[test]
    fn busy_initial_trigger_still_starts() {
        let mut p = pipeline();
        p.facility_mut().fail_trigger = Some(FacilityError::Busy);

        assert_eq!(p.start(0), Ok(()));
        assert!(p.is_scanning());
    }

    #[test]
    fn failed_unsubscribe_is_reported_but_stop_completes() {
        let mut p = pipeline();
        p.start(0).unwrap();
        p.facility_mut().fail_unsubscribe = Some(FacilityError::Unavailable);

        assert_eq!(p.stop(), Err(FacilityError::Unavailable));
        assert_eq!(p.state(), PipelineState::Idle);
        assert_eq!(p.next_deadline(), None);
    }

    #[test]
    fn not_subscribed_on_stop_is_tolerated() {
        let mut p = pipeline();
        p.start(0).unwrap();
        p.facility_mut().subscribed = false;

        assert_eq!(p.stop(), Ok(()));
        assert!(!p.is_scanning());
    }

    #[test]
    fn trigger_failure_on_tick_keeps_scanning() {
        let mut p = pipeline();
        p.start(0).unwrap();
        p.facility_mut().fail_trigger = Some(FacilityError::Unavailable);

        p.poll(500);
        assert!(p.is_scanning());
        assert_eq!(p.next_deadline(), Some(1_000));

        p.facility_mut().fail_trigger = None;
        p.poll(1_000);
        assert_eq!(p.facility().triggers, 2);
    }

    // ── Batch processing ────────────────────────────────────────────

    #[test]
    fn valid_beacon_emits_one_event() {
        let mut p = pipeline();
        p.start(0).unwrap();
        let ace = beacon(Suit::Hearts, 1);
        p.facility_mut().air(&["HomeWiFi", &ace]);

        assert_eq!(p.on_results_available(120), 1);
        assert_eq!(
            p.sink().as_slice(),
            &[CardObserved {
                card: card(Suit::Hearts, 1),
                ts_ms: 120
            }]
        );
        assert_eq!(p.observed_count(), 1);
    }

    #[test]
    fn duplicate_within_one_batch_emits_once() {
        let mut p = pipeline();
        p.start(0).unwrap();
        let k = beacon(Suit::Spades, 13);
        p.facility_mut().air(&[&k, &k, &k]);

        assert_eq!(p.on_results_available(100), 1);
        assert_eq!(cards(&p), vec![card(Suit::Spades, 13)]);
    }

    #[test]
    fn same_beacon_in_two_batches_emits_once() {
        let mut p = pipeline();
        p.start(0).unwrap();
        let q = beacon(Suit::Diamonds, 12);
        p.facility_mut().air(&[&q]);

        p.on_results_available(100);
        p.poll(500);
        p.on_results_available(600);

        assert_eq!(cards(&p), vec![card(Suit::Diamonds, 12)]);
    }

    #[test]
    fn batch_preserves_delivery_order() {
        let mut p = pipeline();
        p.start(0).unwrap();
        let a = beacon(Suit::Clubs, 2);
        let b = beacon(Suit::Hearts, 9);
        let c = beacon(Suit::Spades, 11);
        p.facility_mut().air(&[&b, &a, &c]);

        assert_eq!(p.on_results_available(10), 3);
        assert_eq!(
            cards(&p),
            vec![card(Suit::Hearts, 9), card(Suit::Clubs, 2), card(Suit::Spades, 11)]
        );
    }

    #[test]
    fn unprefixed_names_are_never_cached() {
        let mut p = pipeline();
        p.start(0).unwrap();
        p.facility_mut().air(&["HomeWiFi", "cafe-guest", "card_lowercase"]);

        assert_eq!(p.on_results_available(10), 0);
        assert_eq!(p.seen_len(), 0);
    }

    #[test]
    fn malformed_prefixed_names_are_cached_without_events() {
        let mut p = pipeline();
        p.start(0).unwrap();
        p.facility_mut().air(&["CARD_", "CARD_junk"]);

        assert_eq!(p.on_results_available(10), 0);
        assert_eq!(p.seen_len(), 2);
        assert!(p.sink().is_empty());

        // Seen again in the same window: skipped before decoding
        assert_eq!(p.on_results_available(20), 0);
        assert_eq!(p.seen_len(), 2);
    }

    #[test]
    fn malformed_flood_does_not_evict_reported_card() {
        let mut p = pipeline();
        p.start(0).unwrap();
        let ace = beacon(Suit::Hearts, 1);
        p.facility_mut().air(&[&ace]);
        p.on_results_available(10);

        // Two full scans of distinct junk overflow the 64-slot cache
        for batch in 0..2 {
            let junk: Vec<String> = (0..MAX_SCAN_RESULTS)
                .map(|i| format!("CARD_junk{}", batch * MAX_SCAN_RESULTS + i))
                .collect();
            let names: Vec<&str> = junk.iter().map(String::as_str).collect();
            p.facility_mut().air(&names);
            assert_eq!(p.on_results_available(100 + batch as u64), 0);
        }
        assert_eq!(p.seen_len(), SEEN_CAPACITY);

        p.facility_mut().air(&[&ace]);
        assert_eq!(p.on_results_available(200), 0);
        assert_eq!(cards(&p), vec![card(Suit::Hearts, 1)]);
    }

    #[test]
    fn results_after_stop_are_ignored() {
        let mut p = pipeline();
        p.start(0).unwrap();
        let ace = beacon(Suit::Hearts, 1);
        p.facility_mut().air(&[&ace]);
        p.stop().unwrap();

        assert_eq!(p.on_results_available(300), 0);
        assert!(p.sink().is_empty());
        assert_eq!(p.seen_len(), 0);
    }

    // ── Timers ──────────────────────────────────────────────────────

    #[test]
    fn rescan_timer_triggers_and_rearms() {
        let mut p = pipeline();
        p.start(0).unwrap();

        p.poll(499);
        assert_eq!(p.facility().triggers, 1);

        p.poll(500);
        assert_eq!(p.facility().triggers, 2);
        assert_eq!(p.next_deadline(), Some(1_000));

        p.poll(1_000);
        p.poll(1_500);
        assert_eq!(p.facility().triggers, 4);
    }

    #[test]
    fn flush_makes_seen_beacon_eligible_again() {
        let mut p = pipeline();
        p.start(0).unwrap();
        let seven = beacon(Suit::Clubs, 7);
        p.facility_mut().air(&[&seven]);

        p.on_results_available(100);
        p.poll(9_999);
        p.on_results_available(9_999);
        assert_eq!(p.sink().len(), 1);

        p.poll(10_000);
        assert_eq!(p.seen_len(), 0);
        p.on_results_available(10_050);

        assert_eq!(cards(&p), vec![card(Suit::Clubs, 7), card(Suit::Clubs, 7)]);
        assert_eq!(p.sink()[1].ts_ms, 10_050);
    }

    #[test]
    fn flush_timer_rearms_while_scanning() {
        let mut p = pipeline();
        p.set_config(PipelineConfig {
            scan_interval_ms: 20_000,
            cache_window_ms: 1_000,
        });
        p.start(0).unwrap();

        p.poll(1_000);
        assert_eq!(p.next_deadline(), Some(2_000));
    }

    #[test]
    fn timer_callbacks_after_stop_are_noops() {
        let mut p = pipeline();
        p.start(0).unwrap();
        p.stop().unwrap();

        // Callbacks already queued by a driver before stop() took effect
        p.on_rescan_timer(500);
        p.on_flush_timer(10_000);

        assert_eq!(p.facility().triggers, 1);
        assert_eq!(p.next_deadline(), None);
    }

    #[test]
    fn start_begins_with_empty_cache() {
        let mut p = pipeline();
        p.start(0).unwrap();
        let two = beacon(Suit::Hearts, 2);
        p.facility_mut().air(&[&two]);
        p.on_results_available(10);

        p.stop().unwrap();
        p.start(20).unwrap();
        p.on_results_available(30);

        assert_eq!(p.sink().len(), 2);
    }

    // ── Sinks ───────────────────────────────────────────────────────

    #[test]
    fn closure_and_pair_sinks_receive_events() {
        let mut count = 0;
        {
            let counter = |_: CardObserved| count += 1;
            let mut p = ScanPipeline::new(
                MockFacility::default(),
                (Events::new(), FnSink(counter)),
                PipelineConfig::new(),
            );
            p.start(0).unwrap();
            let a = beacon(Suit::Spades, 1);
            let b = beacon(Suit::Spades, 2);
            p.facility_mut().air(&[&a, &b]);
            p.on_results_available(5);
            assert_eq!(p.sink().0.len(), 2);
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn full_event_queue_drops_newest() {
        let mut queue = heapless::Vec::<CardObserved, 1>::new();
        let e = CardObserved {
            card: card(Suit::Hearts, 3),
            ts_ms: 0,
        };
        queue.card_observed(e);
        queue.card_observed(e);
        assert_eq!(queue.len(), 1);
    }
}
