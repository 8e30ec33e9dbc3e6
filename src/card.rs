/// Playing-card value type carried by card beacons.
///
/// A `Card` is only ever built through [`Card::new`], which rejects ranks
/// outside `1..=13`, so every `Card` in the system is valid.
use core::fmt::{self, Write};

/// Card suit. Discriminants follow the sender's numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suit {
    Hearts = 1,
    Spades = 2,
    Clubs = 3,
    Diamonds = 4,
}

impl Suit {
    /// All suits in wire order.
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Spades, Suit::Clubs, Suit::Diamonds];

    pub fn as_str(&self) -> &'static str {
        match self {
            Suit::Hearts => "hearts",
            Suit::Spades => "spades",
            Suit::Clubs => "clubs",
            Suit::Diamonds => "diamonds",
        }
    }

    /// Capitalized name used in long card names.
    pub fn name(&self) -> &'static str {
        match self {
            Suit::Hearts => "Hearts",
            Suit::Spades => "Spades",
            Suit::Clubs => "Clubs",
            Suit::Diamonds => "Diamonds",
        }
    }

    pub fn glyph(&self) -> char {
        match self {
            Suit::Hearts => '♥',
            Suit::Spades => '♠',
            Suit::Clubs => '♣',
            Suit::Diamonds => '♦',
        }
    }

    pub fn is_red(&self) -> bool {
        matches!(self, Suit::Hearts | Suit::Diamonds)
    }
}

/// Display color for red suits
pub const RED: &str = "#D32F2F";

/// Display color for black suits
pub const BLACK: &str = "#000000";

/// Short rank symbols, indexed by rank (index 0 unused)
const RANK_SYMBOLS: [&str; 14] = [
    "", "A", "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K",
];

/// Long rank names, indexed by rank (index 0 unused)
const RANK_NAMES: [&str; 14] = [
    "", "Ace", "2", "3", "4", "5", "6", "7", "8", "9", "10", "Jack", "Queen", "King",
];

/// Fits "10♦" (2 + 3 bytes)
pub type ShortName = heapless::String<8>;

/// Fits "Queen of Diamonds"
pub type LongName = heapless::String<24>;

/// A playing card: suit plus rank in `1..=13` (1 = Ace, 11..=13 = J, Q, K).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    suit: Suit,
    rank: u8,
}

impl Card {
    pub const MIN_RANK: u8 = 1;
    pub const MAX_RANK: u8 = 13;

    /// Build a card, or `None` if `rank` is outside `1..=13`.
    pub const fn new(suit: Suit, rank: u8) -> Option<Self> {
        if rank < Self::MIN_RANK || rank > Self::MAX_RANK {
            return None;
        }
        Some(Self { suit, rank })
    }

    pub const fn suit(&self) -> Suit {
        self.suit
    }

    pub const fn rank(&self) -> u8 {
        self.rank
    }

    pub fn rank_symbol(&self) -> &'static str {
        RANK_SYMBOLS[self.rank as usize]
    }

    pub fn rank_name(&self) -> &'static str {
        RANK_NAMES[self.rank as usize]
    }

    /// Glyph form, e.g. "A♥" or "10♣".
    pub fn short_name(&self) -> ShortName {
        let mut s = ShortName::new();
        let _ = s.push_str(self.rank_symbol());
        let _ = s.push(self.suit.glyph());
        s
    }

    /// Long form, e.g. "Ace of Hearts".
    pub fn long_name(&self) -> LongName {
        let mut s = LongName::new();
        let _ = write!(s, "{}", self);
        s
    }

    /// Hex display color: red for hearts/diamonds, black otherwise.
    pub fn color(&self) -> &'static str {
        if self.suit.is_red() {
            RED
        } else {
            BLACK
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.rank_name(), self.suit.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_full_rank_range() {
        for suit in Suit::ALL {
            for rank in 1..=13 {
                let card = Card::new(suit, rank).unwrap();
                assert_eq!(card.suit(), suit);
                assert_eq!(card.rank(), rank);
            }
        }
    }

    #[test]
    fn new_rejects_out_of_range_ranks() {
        assert!(Card::new(Suit::Hearts, 0).is_none());
        assert!(Card::new(Suit::Spades, 14).is_none());
        assert!(Card::new(Suit::Clubs, 15).is_none());
        assert!(Card::new(Suit::Diamonds, u8::MAX).is_none());
    }

    #[test]
    fn short_names() {
        assert_eq!(Card::new(Suit::Hearts, 1).unwrap().short_name(), "A♥");
        assert_eq!(Card::new(Suit::Clubs, 10).unwrap().short_name(), "10♣");
        assert_eq!(Card::new(Suit::Spades, 13).unwrap().short_name(), "K♠");
        assert_eq!(Card::new(Suit::Diamonds, 12).unwrap().short_name(), "Q♦");
    }

    #[test]
    fn long_names() {
        assert_eq!(Card::new(Suit::Hearts, 1).unwrap().long_name(), "Ace of Hearts");
        assert_eq!(Card::new(Suit::Clubs, 7).unwrap().long_name(), "7 of Clubs");
        assert_eq!(Card::new(Suit::Spades, 11).unwrap().long_name(), "Jack of Spades");
        // Longest possible name must fit LongName
        assert_eq!(
            Card::new(Suit::Diamonds, 12).unwrap().long_name(),
            "Queen of Diamonds"
        );
    }

    #[test]
    fn colors_follow_suit() {
        assert_eq!(Card::new(Suit::Hearts, 5).unwrap().color(), RED);
        assert_eq!(Card::new(Suit::Diamonds, 5).unwrap().color(), RED);
        assert_eq!(Card::new(Suit::Spades, 5).unwrap().color(), BLACK);
        assert_eq!(Card::new(Suit::Clubs, 5).unwrap().color(), BLACK);
    }

    #[test]
    fn display_matches_long_name() {
        let card = Card::new(Suit::Spades, 13).unwrap();
        assert_eq!(format!("{card}"), "King of Spades");
    }
}
