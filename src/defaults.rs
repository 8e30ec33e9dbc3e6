/// Default tunables for the receiver.
///
/// Timing values mirror the sender: a card beacon is repeated
/// `BROADCAST_REPEATS` times at `BROADCAST_INTERVAL_MS`, so a receiver
/// re-scanning every 500 ms sees it several times inside one cache window.

/// Interval between scan triggers while scanning.
pub const SCAN_INTERVAL_MS: u64 = 500;

/// Lifetime of the seen-cache before it is flushed entirely.
pub const CACHE_WINDOW_MS: u64 = 10_000;

/// Maximum number of distinct beacon names remembered per cache window.
///
/// 52 valid encodings exist; the remainder absorbs malformed `CARD_` names.
pub const SEEN_CAPACITY: usize = 64;

/// Maximum number of beacon names delivered by one scan.
pub const MAX_SCAN_RESULTS: usize = 32;

/// Number of cards kept in the observed-card history.
pub const HISTORY_LEN: usize = 10;

/// How many times a sender repeats one card beacon.
pub const BROADCAST_REPEATS: u32 = 50;

/// Gap between two repeats of the same card beacon.
pub const BROADCAST_INTERVAL_MS: u64 = 100;
