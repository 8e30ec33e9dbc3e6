/// Beacon codec — maps a [`Card`] to and from a WiFi beacon name (SSID).
///
/// Wire format, counted in Unicode scalar values after the ASCII prefix:
///
/// ```text
///  "CARD_"  suit  sep   b3  b2  b1  b0
///            │     │    └─ rank, MSB first ─┘
///            │     └─ U+200B, written on encode, skipped on decode
///            └─ U+200B ♥ | U+200C ♠ | U+200D ♣ | U+200E ♦
/// ```
///
/// Rank bits use U+200C for `1` and U+200B for `0`. All six payload code
/// points are invisible, so the SSID renders as plain `CARD_`. Encoded
/// names are 5 + 6 × 3 = 23 bytes, well inside the 32-byte SSID limit.
///
/// Decoding is total: malformed names yield `None`, never a panic.
use crate::card::{Card, Suit};

/// Visible prefix identifying card beacons
pub const BEACON_PREFIX: &str = "CARD_";

/// Zero Width Space
pub const ZWSP: char = '\u{200B}';
/// Zero Width Non-Joiner
pub const ZWNJ: char = '\u{200C}';
/// Zero Width Joiner
pub const ZWJ: char = '\u{200D}';
/// Left-to-Right Mark
pub const LRM: char = '\u{200E}';

/// Separator between suit symbol and rank field
pub const SEPARATOR: char = ZWSP;
/// Rank bit `0`
pub const BIT_ZERO: char = ZWSP;
/// Rank bit `1`
pub const BIT_ONE: char = ZWNJ;

/// Width of the rank field in bits
pub const RANK_BITS: usize = 4;

/// Payload width after the prefix: suit + separator + rank bits
pub const PAYLOAD_LEN: usize = 2 + RANK_BITS;

/// An SSID-sized beacon name (SSIDs are at most 32 bytes)
pub type BeaconName = heapless::String<33>;

/// Why a beacon name failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MalformedBeacon {
    #[error("missing \"CARD_\" prefix")]
    MissingPrefix,
    #[error("payload too short ({len} of 6 symbols)")]
    TooShort { len: usize },
    #[error("unexpected data after the rank field")]
    TrailingData,
    #[error("unknown suit symbol U+{:04X}", code_point(.0))]
    UnknownSuit(char),
    #[error("symbol U+{:04X} at position {position} is not a rank bit", code_point(.symbol))]
    InvalidRankSymbol { position: usize, symbol: char },
    #[error("rank {0} outside 1..=13")]
    RankOutOfRange(u8),
}

fn code_point(c: &char) -> u32 {
    *c as u32
}

/// Zero-width symbol carrying `suit`.
pub const fn suit_symbol(suit: Suit) -> char {
    match suit {
        Suit::Hearts => ZWSP,
        Suit::Spades => ZWNJ,
        Suit::Clubs => ZWJ,
        Suit::Diamonds => LRM,
    }
}

/// Suit carried by a zero-width symbol, if it is one of the four.
pub const fn suit_from_symbol(symbol: char) -> Option<Suit> {
    match symbol {
        ZWSP => Some(Suit::Hearts),
        ZWNJ => Some(Suit::Spades),
        ZWJ => Some(Suit::Clubs),
        LRM => Some(Suit::Diamonds),
        _ => None,
    }
}

/// True if `name` carries the card beacon prefix.
///
/// Only a cheap pre-filter: a prefixed name may still fail to decode.
pub fn is_card_beacon(name: &str) -> bool {
    name.starts_with(BEACON_PREFIX)
}

/// Encode a card into its beacon name.
pub fn encode(card: Card) -> BeaconName {
    let mut name = BeaconName::new();
    // 23 bytes always fit a BeaconName
    let _ = name.push_str(BEACON_PREFIX);
    let _ = name.push(suit_symbol(card.suit()));
    let _ = name.push(SEPARATOR);
    for bit in (0..RANK_BITS).rev() {
        let symbol = if (card.rank() >> bit) & 1 == 1 {
            BIT_ONE
        } else {
            BIT_ZERO
        };
        let _ = name.push(symbol);
    }
    name
}

/// Decode a beacon name, reporting which rule a malformed name broke.
pub fn decode_detailed(name: &str) -> Result<Card, MalformedBeacon> {
    let payload = name
        .strip_prefix(BEACON_PREFIX)
        .ok_or(MalformedBeacon::MissingPrefix)?;

    let mut symbols = ['\0'; PAYLOAD_LEN];
    let mut len = 0;
    for symbol in payload.chars() {
        if len == PAYLOAD_LEN {
            return Err(MalformedBeacon::TrailingData);
        }
        symbols[len] = symbol;
        len += 1;
    }
    if len < PAYLOAD_LEN {
        return Err(MalformedBeacon::TooShort { len });
    }

    let suit = suit_from_symbol(symbols[0]).ok_or(MalformedBeacon::UnknownSuit(symbols[0]))?;

    // symbols[1] is the separator
    let mut rank = 0u8;
    for (position, &symbol) in symbols.iter().enumerate().skip(2) {
        rank <<= 1;
        match symbol {
            BIT_ONE => rank |= 1,
            BIT_ZERO => {}
            _ => return Err(MalformedBeacon::InvalidRankSymbol { position, symbol }),
        }
    }

    Card::new(suit, rank).ok_or(MalformedBeacon::RankOutOfRange(rank))
}

/// Decode a beacon name into a card. Malformed names are logged at debug
/// level and yield `None`.
pub fn decode(name: &str) -> Option<Card> {
    match decode_detailed(name) {
        Ok(card) => Some(card),
        Err(e) => {
            log::debug!("Rejected beacon {:?}: {}", name, e);
            None
        }
    }
}
