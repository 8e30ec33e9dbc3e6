/// Seen-cache — beacon names already processed in the current window.
///
/// A fixed-capacity, insertion-ordered set. The pipeline flushes it
/// wholesale on its cache timer. When it fills up before that, the oldest
/// name that did not decode to a card is evicted; card names stay until
/// the flush. At most 52 distinct names decode, so with more slots than
/// that a card name is never evicted. Linear scans are fine at this size.
use heapless::Vec;

use crate::codec::BeaconName;

struct Entry {
    name: BeaconName,
    card: bool,
}

pub struct SeenCache<const N: usize> {
    entries: Vec<Entry, N>,
}

impl<const N: usize> SeenCache<N> {
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name.as_str() == name)
    }

    /// Remember `name`; `card` tells whether it decoded to a card.
    /// Returns false if it was already present.
    pub fn insert(&mut self, name: &BeaconName, card: bool) -> bool {
        if self.contains(name) {
            return false;
        }
        if self.entries.is_full() && !self.entries.is_empty() {
            // Only when every slot holds a card does a card name go
            let victim = self.entries.iter().position(|e| !e.card).unwrap_or(0);
            let evicted = self.entries.remove(victim);
            log::debug!("Seen-cache full, evicting {:?}", evicted.name.as_str());
        }
        // Cannot fail: room was made above (N == 0 aside)
        self.entries
            .push(Entry {
                name: name.clone(),
                card,
            })
            .is_ok()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<const N: usize> Default for SeenCache<N> {
    fn default() -> Self {
        Self::new()
    }
}
