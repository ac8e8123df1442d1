//! Sliding membership window over sequence numbers.

use crate::SeqNo;

/// Number of sequence numbers the window can tell apart.
pub const WINDOW_SLOTS: u32 = 1 << 16;

const WORD_BITS: u32 = u64::BITS;
const WORDS: usize = (WINDOW_SLOTS / WORD_BITS) as usize;

/// Result of looking a sequence number up in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sighting {
    /// Never marked (or ahead of everything marked so far).
    Fresh,
    /// Already marked.
    Seen,
    /// Too far behind the highest marked number to tell.
    Stale,
}

/// Ring bitmap anchored at the highest marked sequence number.
///
/// Covers `highest - WINDOW_SLOTS + 1 ..= highest`. Marking a number ahead of
/// `highest` slides the window forward and clears the slots it passes over,
/// so two distinct sequence numbers never share a live slot.
#[derive(Clone)]
pub struct SeenWindow {
    bits: Vec<u64>,
    highest: Option<SeqNo>,
}

impl SeenWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self {
            bits: vec![0; WORDS],
            highest: None,
        }
    }

    /// Highest sequence number ever marked.
    pub fn highest(&self) -> Option<SeqNo> {
        self.highest
    }

    /// Look up a sequence number without marking it.
    pub fn check(&self, sn: SeqNo) -> Sighting {
        match self.highest {
            None => Sighting::Fresh,
            Some(highest) if sn > highest => Sighting::Fresh,
            Some(highest) if highest - sn >= WINDOW_SLOTS => Sighting::Stale,
            Some(_) if self.bit(sn) => Sighting::Seen,
            Some(_) => Sighting::Fresh,
        }
    }

    /// Mark a sequence number as seen.
    ///
    /// Stale numbers are ignored; they can no longer be represented.
    pub fn mark(&mut self, sn: SeqNo) {
        match self.highest {
            None => self.highest = Some(sn),
            Some(highest) if sn > highest => {
                if sn - highest >= WINDOW_SLOTS {
                    self.bits.fill(0);
                } else {
                    for passed in (highest + 1)..sn {
                        self.clear(passed);
                    }
                }
                self.highest = Some(sn);
            }
            Some(highest) if highest - sn >= WINDOW_SLOTS => return,
            Some(_) => {}
        }
        self.set(sn);
    }

    fn slot(sn: SeqNo) -> (usize, u64) {
        let idx = sn % WINDOW_SLOTS;
        ((idx / WORD_BITS) as usize, 1u64 << (idx % WORD_BITS))
    }

    fn bit(&self, sn: SeqNo) -> bool {
        let (word, mask) = Self::slot(sn);
        self.bits[word] & mask != 0
    }

    fn set(&mut self, sn: SeqNo) {
        let (word, mask) = Self::slot(sn);
        self.bits[word] |= mask;
    }

    fn clear(&mut self, sn: SeqNo) {
        let (word, mask) = Self::slot(sn);
        self.bits[word] &= !mask;
    }
}

impl Default for SeenWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SeenWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let marked: u32 = self.bits.iter().map(|w| w.count_ones()).sum();
        f.debug_struct("SeenWindow")
            .field("highest", &self.highest)
            .field("marked", &marked)
            .finish()
    }
}
