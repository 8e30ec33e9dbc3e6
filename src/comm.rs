/// Communication layer — NDJSON transport shared by every driver.
///
/// The device streams card events as newline-delimited JSON over BLE
/// notifications and serial, and accepts host commands from either
/// transport. This module holds the transport-independent half: message
/// serialization, command parsing, line assembly and command dispatch
/// onto the scan pipeline. The GATT server itself lives in the firmware
/// binary because its proc macros need the firmware-only BLE stack.
use crate::board;
use crate::card::Card;
use crate::pipeline::{CardObserved, CardSink, PipelineConfig, ScanFacility, ScanPipeline};
use crate::protocol::{DeviceMessage, HistoryNames, HostCommand, RawCommand, MsgBuffer, MAX_MSG_LEN, VERSION};

/// BLE GATT service UUIDs.
///
/// These duplicate the string literals in the `#[gatt_service]` and `#[characteristic]`
/// proc macro attributes in the firmware binary — Rust proc macros require string
/// literals, so we can't reference these constants there. Kept here as the canonical
/// source of truth.
pub mod ble_uuids {
    /// Card receiver primary service UUID
    pub const SERVICE: &str = "c4a20001-5d7e-4b8f-9a3c-2e61f0b8d417";
    /// TX characteristic — card events, notify
    pub const TX_CHAR: &str = "c4a20002-5d7e-4b8f-9a3c-2e61f0b8d417";
    /// RX characteristic — commands, write
    pub const RX_CHAR: &str = "c4a20003-5d7e-4b8f-9a3c-2e61f0b8d417";
}

/// BLE advertising name
pub const BLE_ADV_NAME: &str = "CardBeacon";

/// Maximum BLE notification payload (MTU-3)
pub const BLE_MAX_NOTIFY: usize = 20;

// ── Serialization helpers ──────────────────────────────────────────────

/// Serialize a DeviceMessage to JSON bytes and write to the output buffer.
/// Returns the number of bytes written, or None if serialization failed
/// or left no room for the newline.
pub fn serialize_message(msg: &DeviceMessage, buf: &mut [u8]) -> Option<usize> {
    let len = serde_json_core::to_slice(msg, buf).ok()?;
    // NDJSON delimiter
    *buf.get_mut(len)? = b'\n';
    Some(len + 1)
}

/// Serialize into a fresh [`MsgBuffer`] trimmed to the message length.
pub fn to_buffer(msg: &DeviceMessage) -> Option<MsgBuffer> {
    let mut buf = MsgBuffer::new();
    buf.resize_default(MAX_MSG_LEN).ok()?;
    let len = serialize_message(msg, &mut buf)?;
    buf.truncate(len);
    Some(buf)
}

/// `card` message for one observed card.
pub fn card_message(event: &CardObserved) -> Option<MsgBuffer> {
    let card = event.card;
    let short = card.short_name();
    let name = card.long_name();
    to_buffer(&DeviceMessage::Card {
        suit: card.suit().as_str(),
        rank: card.rank(),
        short: &short,
        name: &name,
        color: card.color(),
        ts: (event.ts_ms & 0xFFFF_FFFF) as u32,
    })
}

/// `history` message listing `cards` in iteration order.
pub fn history_message<'a>(cards: impl IntoIterator<Item = &'a Card>) -> Option<MsgBuffer> {
    let mut names = HistoryNames::new();
    for card in cards {
        if names.push(card.short_name()).is_err() {
            break;
        }
    }
    to_buffer(&DeviceMessage::History { cards: &names })
}

/// `status` message describing `pipeline`.
pub fn status_message<F, S>(pipeline: &ScanPipeline<F, S>, uptime_secs: u32) -> Option<MsgBuffer> {
    to_buffer(&DeviceMessage::Status {
        scanning: pipeline.is_scanning(),
        seen: pipeline.seen_len() as u16,
        cards: pipeline.observed_count(),
        uptime: uptime_secs,
        board: board::BOARD_NAME,
        version: VERSION,
    })
}

/// Deserialize a HostCommand from a JSON byte slice.
pub fn parse_command(data: &[u8]) -> Option<HostCommand> {
    let trimmed = data.trim_ascii();
    if trimmed.is_empty() {
        return None;
    }
    let (raw, _) = match serde_json_core::from_slice::<RawCommand>(trimmed) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::debug!("Unparseable command: {:?}", e);
            return None;
        }
    };
    match raw.cmd.as_str() {
        "start" => Some(HostCommand::Start),
        "stop" => Some(HostCommand::Stop),
        "status" => Some(HostCommand::GetStatus),
        "history" => Some(HostCommand::GetHistory),
        "set_timing" => Some(HostCommand::SetTiming {
            scan_ms: raw.scan_ms,
            cache_ms: raw.cache_ms,
        }),
        other => {
            log::debug!("Unknown command {:?}", other);
            None
        }
    }
}

/// What the driver should send back after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    None,
    Status,
    History,
}

/// Apply a host command to the pipeline.
///
/// Start and Stop answer with a status report so the host sees whether the
/// transition took effect.
pub fn handle_command<F: ScanFacility, S: CardSink>(
    cmd: HostCommand,
    pipeline: &mut ScanPipeline<F, S>,
    now_ms: u64,
) -> Reply {
    match cmd {
        HostCommand::Start => {
            match pipeline.start(now_ms) {
                Ok(()) => log::info!("Scanning started by host command"),
                Err(e) => log::warn!("Host start command failed: {}", e),
            }
            Reply::Status
        }
        HostCommand::Stop => {
            match pipeline.stop() {
                Ok(()) => log::info!("Scanning stopped by host command"),
                Err(e) => log::warn!("Host stop command: {}", e),
            }
            Reply::Status
        }
        HostCommand::GetStatus => Reply::Status,
        HostCommand::GetHistory => Reply::History,
        HostCommand::SetTiming { scan_ms, cache_ms } => {
            let mut config: PipelineConfig = *pipeline.config();
            match scan_ms {
                Some(0) => log::warn!("Ignoring zero scan interval"),
                Some(ms) => config.scan_interval_ms = u64::from(ms),
                None => {}
            }
            match cache_ms {
                Some(0) => log::warn!("Ignoring zero cache window"),
                Some(ms) => config.cache_window_ms = u64::from(ms),
                None => {}
            }
            pipeline.set_config(config);
            log::info!(
                "Timing set: scan every {} ms, cache window {} ms",
                config.scan_interval_ms,
                config.cache_window_ms
            );
            Reply::None
        }
    }
}

// ── Serial NDJSON reader ───────────────────────────────────────────────

/// Serial NDJSON reader state machine.
/// Accumulates bytes until a newline is found, then yields the line.
pub struct LineReader {
    buf: [u8; MAX_MSG_LEN],
    pos: usize,
    overflowed: bool,
}

impl LineReader {
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_MSG_LEN],
            pos: 0,
            overflowed: false,
        }
    }

    /// Feed a byte into the reader. Returns a complete line (without newline)
    /// when one is detected. An overlong line is dropped whole.
    pub fn feed(&mut self, byte: u8) -> Option<&[u8]> {
        if byte == b'\n' || byte == b'\r' {
            let len = core::mem::take(&mut self.pos);
            if core::mem::take(&mut self.overflowed) || len == 0 {
                return None;
            }
            Some(&self.buf[..len])
        } else if self.overflowed {
            None
        } else if self.pos < self.buf.len() {
            self.buf[self.pos] = byte;
            self.pos += 1;
            None
        } else {
            log::warn!("Command line exceeds {} bytes, discarding", MAX_MSG_LEN);
            self.overflowed = true;
            None
        }
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}
