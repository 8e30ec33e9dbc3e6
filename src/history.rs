/// Bounded history of observed cards, most recent first.
///
/// Backs the "last card" and "recent cards" views of a companion app.
/// In-memory only; the oldest card falls off once `HISTORY_LEN` is reached.
use heapless::Deque;

use crate::card::Card;
use crate::defaults::HISTORY_LEN;
use crate::pipeline::{CardObserved, CardSink};

pub struct CardHistory {
    cards: Deque<Card, HISTORY_LEN>,
}

impl CardHistory {
    pub const fn new() -> Self {
        Self {
            cards: Deque::new(),
        }
    }

    pub fn record(&mut self, card: Card) {
        if self.cards.is_full() {
            self.cards.pop_back();
        }
        let _ = self.cards.push_front(card);
    }

    /// Most recently observed card.
    pub fn latest(&self) -> Option<&Card> {
        self.cards.front()
    }

    /// Cards from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &Card> + '_ {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }
}

impl Default for CardHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl CardSink for CardHistory {
    fn card_observed(&mut self, event: CardObserved) {
        self.record(event.card);
    }
}
