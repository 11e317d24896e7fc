//! Hashed 2-gram shift search with transparent Shift-Or fallback.
//!
//! Shifts are keyed by a hash of two adjacent bytes instead of one byte,
//! which keeps shifts long for patterns whose single-byte classes are too
//! common. The table maps each 2-gram hash to the distance from that gram's
//! closest allowed alignment; a zero shift marks a gram that can end the
//! pattern and triggers verification.
//!
//! Patterns this algorithm cannot serve fall back to Shift-Or:
//! - patterns shorter than the gram length;
//! - patterns whose matcher classes expand to more 2-grams than the table
//!   budget allows (the table would saturate and shifts degenerate);
//! - single-gram patterns (constant bytes), where every shift is zero.
//!
//! The decision is made once, inside the lazily built table, and frozen
//! from then on.

use std::sync::OnceLock;

use crate::io::reader::{ReadError, WindowReader};
use crate::matcher::sequence::SequenceMatcher;
use crate::search::shift_or::ShiftOrSearcher;
use crate::search::{
    clip_backward, clip_forward, reader_search_backwards, reader_search_forwards, Searcher,
};

/// Gram length used by this searcher.
const QGRAM_LEN: usize = 2;

/// Cap on the number of (byte, byte) pairs enumerated into one table.
/// Beyond this the byte classes are too wide for useful shifts.
const MAX_QGRAM_EXPANSION: u64 = 1 << 16;

/// Smallest and largest table sizes (powers of two).
const MIN_TABLE_SIZE: usize = 256;
const MAX_TABLE_SIZE: usize = 65536;

#[inline]
fn gram_hash(first: u8, second: u8) -> usize {
    (first as usize) * 31 + second as usize
}

/// Lazily built search table: either usable hashed shifts or the frozen
/// decision to fall back.
enum QgramTable {
    Hash { shifts: Box<[usize]>, mask: usize },
    Fallback,
}

impl QgramTable {
    /// Builds the shift table for one direction.
    ///
    /// `gram_shift(j)` gives the shift recorded for the gram at positions
    /// `(j, j + 1)`; a zero shift marks the verification gram.
    fn build<S: SequenceMatcher>(
        sequence: &S,
        gram_shift: impl Fn(usize) -> usize,
    ) -> Self {
        let len = sequence.len();
        if len < QGRAM_LEN {
            return Self::Fallback;
        }

        let mut expansion = 0u64;
        for j in 0..len - 1 {
            expansion += sequence.matcher_at(j).num_matching_bytes() as u64
                * sequence.matcher_at(j + 1).num_matching_bytes() as u64;
            if expansion > MAX_QGRAM_EXPANSION {
                return Self::Fallback;
            }
        }

        let table_size = (expansion as usize * 4)
            .next_power_of_two()
            .clamp(MIN_TABLE_SIZE, MAX_TABLE_SIZE);
        let mask = table_size - 1;
        let mut shifts = vec![len - 1; table_size].into_boxed_slice();
        let mut seen = DistinctGrams::default();
        for j in 0..len - 1 {
            let shift = gram_shift(j);
            for first in sequence.matcher_at(j).matching_bytes() {
                for second in sequence.matcher_at(j + 1).matching_bytes() {
                    seen.insert(first, second);
                    let slot = &mut shifts[gram_hash(first, second) & mask];
                    *slot = (*slot).min(shift);
                }
            }
        }
        if seen.count == 1 && len > QGRAM_LEN {
            // A single repeated gram gives zero shifts everywhere it
            // matters; Shift-Or handles these patterns better.
            return Self::Fallback;
        }
        Self::Hash { shifts, mask }
    }
}

/// Tracks distinct (byte, byte) grams during table construction.
struct DistinctGrams {
    bits: Box<[u64; 1024]>,
    count: u32,
}

impl Default for DistinctGrams {
    fn default() -> Self {
        Self {
            bits: Box::new([0; 1024]),
            count: 0,
        }
    }
}

impl DistinctGrams {
    fn insert(&mut self, first: u8, second: u8) {
        let gram = ((first as usize) << 8) | second as usize;
        let word = &mut self.bits[gram >> 6];
        let bit = 1u64 << (gram & 63);
        if *word & bit == 0 {
            *word |= bit;
            self.count += 1;
        }
    }
}

/// Hashed 2-gram searcher with a lazily constructed Shift-Or fallback.
pub struct QgramHashSearcher<S: SequenceMatcher + Clone> {
    sequence: S,
    forward: OnceLock<QgramTable>,
    backward: OnceLock<QgramTable>,
    fallback: OnceLock<ShiftOrSearcher<S>>,
}

impl<S: SequenceMatcher + Clone> QgramHashSearcher<S> {
    #[must_use]
    pub fn new(sequence: S) -> Self {
        Self {
            sequence,
            forward: OnceLock::new(),
            backward: OnceLock::new(),
            fallback: OnceLock::new(),
        }
    }

    /// The sequence this searcher finds.
    pub fn sequence(&self) -> &S {
        &self.sequence
    }

    /// True when forward searches are served by the fallback searcher.
    pub fn falls_back_forwards(&self) -> bool {
        matches!(self.forward_table(), QgramTable::Fallback)
    }

    /// True when backward searches are served by the fallback searcher.
    pub fn falls_back_backwards(&self) -> bool {
        matches!(self.backward_table(), QgramTable::Fallback)
    }

    fn forward_table(&self) -> &QgramTable {
        let len = self.sequence.len();
        // Forward scans read the gram ending the alignment: gram (j, j+1)
        // allows a shift of len - 2 - j; the final gram verifies in place.
        self.forward
            .get_or_init(|| QgramTable::build(&self.sequence, |j| len - QGRAM_LEN - j))
    }

    fn backward_table(&self) -> &QgramTable {
        // Backward scans read the gram starting the alignment: gram
        // (j, j+1) allows a shift of j.
        self.backward
            .get_or_init(|| QgramTable::build(&self.sequence, |j| j))
    }

    fn fallback(&self) -> &ShiftOrSearcher<S> {
        self.fallback
            .get_or_init(|| ShiftOrSearcher::new(self.sequence.clone()))
    }

    fn hash_search_forwards(
        &self,
        shifts: &[usize],
        mask: usize,
        bytes: &[u8],
        from: usize,
        to: usize,
    ) -> Option<usize> {
        let pattern_len = self.sequence.len();
        let (from, to) = clip_forward(bytes.len(), pattern_len, from, to)?;
        let mut pos = from;
        while pos <= to {
            let gram_start = pos + pattern_len - QGRAM_LEN;
            let shift = shifts[gram_hash(bytes[gram_start], bytes[gram_start + 1]) & mask];
            if shift == 0 {
                if self.sequence.matches_no_bounds_check(bytes, pos) {
                    return Some(pos);
                }
                pos += 1;
            } else {
                pos += shift;
            }
        }
        None
    }

    fn hash_search_backwards(
        &self,
        shifts: &[usize],
        mask: usize,
        bytes: &[u8],
        from: usize,
        to: usize,
    ) -> Option<usize> {
        let pattern_len = self.sequence.len();
        let (high, low) = clip_backward(bytes.len(), pattern_len, from, to)?;
        let mut pos = high;
        loop {
            let shift = shifts[gram_hash(bytes[pos], bytes[pos + 1]) & mask];
            if shift == 0 {
                if self.sequence.matches_no_bounds_check(bytes, pos) {
                    return Some(pos);
                }
                if pos == low {
                    return None;
                }
                pos -= 1;
            } else {
                if pos < low + shift {
                    return None;
                }
                pos -= shift;
            }
        }
    }
}

impl<S: SequenceMatcher + Clone> Searcher for QgramHashSearcher<S> {
    fn search_forwards(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize> {
        match self.forward_table() {
            QgramTable::Hash { shifts, mask } => {
                self.hash_search_forwards(shifts, *mask, bytes, from, to)
            }
            QgramTable::Fallback => self.fallback().search_forwards(bytes, from, to),
        }
    }

    fn search_backwards(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize> {
        match self.backward_table() {
            QgramTable::Hash { shifts, mask } => {
                self.hash_search_backwards(shifts, *mask, bytes, from, to)
            }
            QgramTable::Fallback => self.fallback().search_backwards(bytes, from, to),
        }
    }

    fn search_reader_forwards(
        &self,
        reader: &mut dyn WindowReader,
        from: u64,
        to: u64,
    ) -> Result<Option<u64>, ReadError> {
        match self.forward_table() {
            QgramTable::Hash { shifts, mask } => {
                reader_search_forwards(&self.sequence, reader, from, to, |bytes, low, high| {
                    self.hash_search_forwards(shifts, *mask, bytes, low, high)
                })
            }
            QgramTable::Fallback => self.fallback().search_reader_forwards(reader, from, to),
        }
    }

    fn search_reader_backwards(
        &self,
        reader: &mut dyn WindowReader,
        from: u64,
        to: u64,
    ) -> Result<Option<u64>, ReadError> {
        match self.backward_table() {
            QgramTable::Hash { shifts, mask } => {
                reader_search_backwards(&self.sequence, reader, from, to, |bytes, high, low| {
                    self.hash_search_backwards(shifts, *mask, bytes, high, low)
                })
            }
            QgramTable::Fallback => self.fallback().search_reader_backwards(reader, from, to),
        }
    }

    fn prepare_forwards(&self) {
        if self.falls_back_forwards() {
            self.fallback().prepare_forwards();
        }
    }

    fn prepare_backwards(&self) {
        if self.falls_back_backwards() {
            self.fallback().prepare_backwards();
        }
    }
}

impl<S: SequenceMatcher + Clone> std::fmt::Debug for QgramHashSearcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QgramHashSearcher")
            .field("pattern_len", &self.sequence.len())
            .finish()
    }
}
