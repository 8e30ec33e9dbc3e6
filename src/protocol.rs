/// JSON message protocol between the card receiver and companion apps.
///
/// All messages are newline-delimited JSON (NDJSON).
/// Uses `heapless` types for no_std/no-alloc operation.
use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::card::{LongName, ShortName};
use crate::defaults::HISTORY_LEN;

/// Short card names, newest first
pub type HistoryNames = Vec<ShortName, HISTORY_LEN>;

/// Messages sent from the device to the companion app
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum DeviceMessage<'a> {
    /// A card decoded from a newly seen beacon
    #[serde(rename = "card")]
    Card {
        /// "hearts", "spades", "clubs" or "diamonds"
        suit: &'static str,
        /// 1 (Ace) ..= 13 (King)
        rank: u8,
        /// Display form, e.g. "A♥"
        short: &'a ShortName,
        /// Display form, e.g. "Ace of Hearts"
        name: &'a LongName,
        /// Display color as "#RRGGBB"
        color: &'static str,
        /// Uptime in milliseconds when observed
        ts: u32,
    },
    /// Recently observed cards
    #[serde(rename = "history")]
    History { cards: &'a HistoryNames },
    /// Device status report
    #[serde(rename = "status")]
    Status {
        scanning: bool,
        /// Names currently held by the seen-cache
        seen: u16,
        /// Cards observed since boot
        cards: u32,
        /// Uptime in seconds
        uptime: u32,
        /// Board identifier
        board: &'static str,
        /// Firmware version
        version: &'static str,
    },
}

/// Commands sent from the companion app to the device.
///
/// Deserialized manually via [`RawCommand`] in `comm::parse_command()` because
/// `serde_json_core` does not support internally tagged enums (`deserialize_any`).
#[derive(Debug, PartialEq)]
pub enum HostCommand {
    /// Start scanning
    Start,
    /// Stop scanning
    Stop,
    /// Request current status
    GetStatus,
    /// Request the recent card history
    GetHistory,
    /// Retune the pipeline timers; omitted fields keep their value
    SetTiming {
        scan_ms: Option<u32>,
        cache_ms: Option<u32>,
    },
}

/// Wire format for host commands — flat struct that `serde_json_core` can
/// deserialize without `deserialize_any`. Converted to [`HostCommand`] in
/// `comm::parse_command()`.
#[derive(Deserialize)]
pub(crate) struct RawCommand {
    pub cmd: String<16>,
    #[serde(default)]
    pub scan_ms: Option<u32>,
    #[serde(default)]
    pub cache_ms: Option<u32>,
}

/// Firmware version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum size of a serialized JSON message
pub const MAX_MSG_LEN: usize = 256;

/// Buffer type for serialized JSON messages
pub type MsgBuffer = Vec<u8, MAX_MSG_LEN>;
