//! Bit-parallel Shift-Or search.
//!
//! The state word tracks, per pattern prefix length, whether the prefix
//! matches the text ending at the current index: bit `i` is clear when the
//! first `i + 1` pattern positions match. One table entry per byte value
//! folds the whole matcher class in, so byte classes cost nothing at search
//! time. Performance is independent of pattern content, which is what makes
//! this the universal fallback for patterns other algorithms cannot serve.
//!
//! Patterns longer than the 64-bit word match on their first (or last, for
//! backward search) 64 positions and verify the remainder with the sequence
//! matcher.

use std::sync::OnceLock;

use crate::io::reader::{ReadError, WindowReader};
use crate::matcher::sequence::SequenceMatcher;
use crate::search::{
    clip_backward, clip_forward, reader_search_backwards, reader_search_forwards, Searcher,
};

/// Number of pattern positions a state word can track.
const WORD_BITS: usize = 64;

/// Per-byte mask table: bit `i` is clear when the tracked position `i`
/// matches that byte.
struct MaskTable {
    masks: Box<[u64; 256]>,
    /// Tracked positions: `min(pattern_len, WORD_BITS)`.
    check_len: usize,
}

impl MaskTable {
    /// Builds masks for the first `check_len` positions, mapped through
    /// `position` (identity for forward, end-relative for backward).
    fn build<S: SequenceMatcher>(
        sequence: &S,
        position: impl Fn(usize) -> usize,
    ) -> Self {
        let check_len = sequence.len().min(WORD_BITS);
        let mut masks = Box::new([!0u64; 256]);
        for i in 0..check_len {
            let clear = !(1u64 << i);
            for b in sequence.matcher_at(position(i)).matching_bytes() {
                masks[b as usize] &= clear;
            }
        }
        Self { masks, check_len }
    }
}

/// Shift-Or searcher over any sequence matcher.
pub struct ShiftOrSearcher<S: SequenceMatcher> {
    sequence: S,
    forward: OnceLock<MaskTable>,
    backward: OnceLock<MaskTable>,
}

impl<S: SequenceMatcher> ShiftOrSearcher<S> {
    #[must_use]
    pub fn new(sequence: S) -> Self {
        Self {
            sequence,
            forward: OnceLock::new(),
            backward: OnceLock::new(),
        }
    }

    /// The sequence this searcher finds.
    pub fn sequence(&self) -> &S {
        &self.sequence
    }

    fn forward_table(&self) -> &MaskTable {
        self.forward
            .get_or_init(|| MaskTable::build(&self.sequence, |i| i))
    }

    fn backward_table(&self) -> &MaskTable {
        let len = self.sequence.len();
        self.backward
            .get_or_init(|| MaskTable::build(&self.sequence, |i| len - 1 - i))
    }
}

impl<S: SequenceMatcher> Searcher for ShiftOrSearcher<S> {
    fn search_forwards(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize> {
        let pattern_len = self.sequence.len();
        let (from, to) = clip_forward(bytes.len(), pattern_len, from, to)?;
        let table = self.forward_table();
        let check_len = table.check_len;
        let match_bit = 1u64 << (check_len - 1);

        let mut state = !0u64;
        let last_index = to + check_len - 1;
        for index in from..=last_index {
            state = (state << 1) | table.masks[bytes[index] as usize];
            if state & match_bit == 0 {
                let start = index + 1 - check_len;
                if check_len == pattern_len
                    || self.sequence.matches_no_bounds_check(bytes, start)
                {
                    return Some(start);
                }
            }
        }
        None
    }

    fn search_backwards(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize> {
        let pattern_len = self.sequence.len();
        let (high, low) = clip_backward(bytes.len(), pattern_len, from, to)?;
        let table = self.backward_table();
        let check_len = table.check_len;
        let match_bit = 1u64 << (check_len - 1);

        // Scan text indices descending; bit i clears when the last i + 1
        // pattern positions match the text starting at the current index.
        let first_index = low + pattern_len - check_len;
        let mut state = !0u64;
        let mut index = high + pattern_len - 1;
        loop {
            state = (state << 1) | table.masks[bytes[index] as usize];
            if state & match_bit == 0 {
                let start = index - (pattern_len - check_len);
                if check_len == pattern_len
                    || self.sequence.matches_no_bounds_check(bytes, start)
                {
                    return Some(start);
                }
            }
            if index == first_index {
                return None;
            }
            index -= 1;
        }
    }

    fn search_reader_forwards(
        &self,
        reader: &mut dyn WindowReader,
        from: u64,
        to: u64,
    ) -> Result<Option<u64>, ReadError> {
        reader_search_forwards(&self.sequence, reader, from, to, |bytes, low, high| {
            self.search_forwards(bytes, low, high)
        })
    }

    fn search_reader_backwards(
        &self,
        reader: &mut dyn WindowReader,
        from: u64,
        to: u64,
    ) -> Result<Option<u64>, ReadError> {
        reader_search_backwards(&self.sequence, reader, from, to, |bytes, high, low| {
            self.search_backwards(bytes, high, low)
        })
    }

    fn prepare_forwards(&self) {
        self.forward_table();
    }

    fn prepare_backwards(&self) {
        self.backward_table();
    }
}

impl<S: SequenceMatcher> std::fmt::Debug for ShiftOrSearcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShiftOrSearcher")
            .field("pattern_len", &self.sequence.len())
            .finish()
    }
}
