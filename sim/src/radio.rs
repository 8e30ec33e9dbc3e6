/// Simulated airwaves: a card sender putting beacons on air and a radio
/// whose scans report what is on air after a short latency.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::Rng;

use cardbeacon::card::{Card, Suit};
use cardbeacon::codec::{self, BeaconName};
use cardbeacon::defaults::{BROADCAST_INTERVAL_MS, BROADCAST_REPEATS, MAX_SCAN_RESULTS};
use cardbeacon::pipeline::{FacilityError, ScanFacility, ScanResults};

/// Networks visible right now. An entry without expiry stays on air.
#[derive(Default)]
pub struct Air {
    beacons: Vec<(BeaconName, Option<Instant>)>,
}

pub type SharedAir = Arc<Mutex<Air>>;

impl Air {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `name` on air until `until`, refreshing an existing entry.
    pub fn broadcast(&mut self, name: &BeaconName, until: Option<Instant>) {
        match self.beacons.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = until,
            None => self.beacons.push((name.clone(), until)),
        }
    }

    /// Names still on air at `now`, in broadcast order. Expired entries
    /// are dropped.
    pub fn visible(&mut self, now: Instant) -> ScanResults {
        self.beacons
            .retain(|(_, until)| until.map_or(true, |until| now < until));
        self.beacons
            .iter()
            .take(MAX_SCAN_RESULTS)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

fn lock(air: &SharedAir) -> std::sync::MutexGuard<'_, Air> {
    air.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Background networks: ordinary SSIDs plus prefixed names that fail to
/// decode.
pub fn add_noise(air: &SharedAir) {
    let mut air = lock(air);
    for ssid in ["HomeWiFi", "cafe-guest", "CARD_", "CARD_\u{200F}\u{200B}\u{200C}\u{200C}\u{200C}\u{200C}"] {
        if let Ok(name) = BeaconName::try_from(ssid) {
            air.broadcast(&name, None);
        }
    }
}

pub fn random_card(rng: &mut StdRng) -> Card {
    loop {
        let suit = Suit::ALL[rng.gen_range(0..Suit::ALL.len())];
        let rank = rng.gen_range(Card::MIN_RANK..=Card::MAX_RANK);
        if let Some(card) = Card::new(suit, rank) {
            return card;
        }
    }
}

/// Card sender: broadcasts one card `BROADCAST_REPEATS` times at
/// `BROADCAST_INTERVAL_MS`, pauses, then picks the next card. `cards == 0`
/// keeps going forever.
pub fn broadcaster_thread(air: SharedAir, mut rng: StdRng, cards: u32) {
    let interval = Duration::from_millis(BROADCAST_INTERVAL_MS);
    let mut sent = 0u32;

    while cards == 0 || sent < cards {
        let card = random_card(&mut rng);
        let name = codec::encode(card);
        log::info!("Sender: broadcasting {} ({} repeats)", card, BROADCAST_REPEATS);

        for _ in 0..BROADCAST_REPEATS {
            // A beacon lingers for a couple of intervals after its last repeat
            lock(&air).broadcast(&name, Some(Instant::now() + interval * 2));
            thread::sleep(interval);
        }
        sent += 1;

        thread::sleep(Duration::from_millis(rng.gen_range(1_000..3_000)));
    }
    log::info!("Sender: done after {} cards", sent);
}

/// Scan facility backed by [`Air`]. Each trigger is served by a radio
/// thread that waits the scan latency, snapshots the air and notifies the
/// subscriber.
pub struct SimRadio {
    subscribed: Arc<AtomicBool>,
    in_flight: Arc<AtomicBool>,
    latest: Arc<Mutex<ScanResults>>,
    trigger_tx: SyncSender<()>,
}

impl SimRadio {
    pub fn spawn(
        air: SharedAir,
        latency: Duration,
        notify: impl Fn() + Send + 'static,
    ) -> std::io::Result<Self> {
        let subscribed = Arc::new(AtomicBool::new(false));
        let in_flight = Arc::new(AtomicBool::new(false));
        let latest = Arc::new(Mutex::new(ScanResults::new()));
        let (trigger_tx, trigger_rx) = mpsc::sync_channel::<()>(1);

        let radio = Self {
            subscribed: subscribed.clone(),
            in_flight: in_flight.clone(),
            latest: latest.clone(),
            trigger_tx,
        };

        thread::Builder::new().name("radio".into()).spawn(move || {
            while trigger_rx.recv().is_ok() {
                thread::sleep(latency);
                let visible = lock(&air).visible(Instant::now());
                *latest.lock().unwrap_or_else(PoisonError::into_inner) = visible;
                in_flight.store(false, Ordering::SeqCst);
                if subscribed.load(Ordering::SeqCst) {
                    notify();
                }
            }
        })?;

        Ok(radio)
    }
}

impl ScanFacility for SimRadio {
    fn subscribe(&mut self) -> Result<(), FacilityError> {
        self.subscribed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn unsubscribe(&mut self) -> Result<(), FacilityError> {
        if self.subscribed.swap(false, Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FacilityError::NotSubscribed)
        }
    }

    fn trigger_scan(&mut self) -> Result<(), FacilityError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(FacilityError::Busy);
        }
        if self.trigger_tx.try_send(()).is_err() {
            self.in_flight.store(false, Ordering::SeqCst);
            return Err(FacilityError::Unavailable);
        }
        Ok(())
    }

    fn current_results(&self) -> ScanResults {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn name(s: &str) -> BeaconName {
        BeaconName::try_from(s).unwrap()
    }

    #[test]
    fn air_expires_beacons() {
        let mut air = Air::new();
        let now = Instant::now();
        air.broadcast(&name("HomeWiFi"), None);
        air.broadcast(&name("CARD_a"), Some(now + Duration::from_millis(100)));

        assert_eq!(air.visible(now).len(), 2);
        let later = air.visible(now + Duration::from_millis(200));
        assert_eq!(later.len(), 1);
        assert_eq!(later[0], "HomeWiFi");
    }

    #[test]
    fn air_refreshes_existing_beacon() {
        let mut air = Air::new();
        let now = Instant::now();
        air.broadcast(&name("CARD_a"), Some(now + Duration::from_millis(10)));
        air.broadcast(&name("CARD_a"), Some(now + Duration::from_millis(500)));
        assert_eq!(air.visible(now + Duration::from_millis(100)).len(), 1);
    }

    #[test]
    fn noise_never_decodes() {
        let air: SharedAir = Arc::new(Mutex::new(Air::new()));
        add_noise(&air);
        let visible = lock(&air).visible(Instant::now());
        assert!(!visible.is_empty());
        assert!(visible.iter().all(|n| codec::decode(n).is_none()));
    }

    #[test]
    fn seeded_cards_are_reproducible() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            assert_eq!(random_card(&mut a), random_card(&mut b));
        }
    }

    #[test]
    fn radio_scan_reports_air_and_notifies() {
        let air: SharedAir = Arc::new(Mutex::new(Air::new()));
        let card = codec::encode(Card::new(Suit::Spades, 11).unwrap());
        lock(&air).broadcast(&card, None);

        let (tx, rx) = mpsc::channel();
        let mut radio = SimRadio::spawn(air, Duration::ZERO, move || {
            let _ = tx.send(());
        })
        .unwrap();

        radio.subscribe().unwrap();
        radio.trigger_scan().unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let results = radio.current_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0], card);
    }

    #[test]
    fn radio_unsubscribe_twice() {
        let air: SharedAir = Arc::new(Mutex::new(Air::new()));
        let mut radio = SimRadio::spawn(air, Duration::ZERO, || {}).unwrap();
        assert_eq!(radio.unsubscribe(), Err(FacilityError::NotSubscribed));
        radio.subscribe().unwrap();
        assert_eq!(radio.unsubscribe(), Ok(()));
    }

    #[test]
    fn radio_trigger_while_in_flight_is_busy() {
        let air: SharedAir = Arc::new(Mutex::new(Air::new()));
        let mut radio = SimRadio::spawn(air, Duration::from_secs(1), || {}).unwrap();
        radio.trigger_scan().unwrap();
        assert_eq!(radio.trigger_scan(), Err(FacilityError::Busy));
    }
}
