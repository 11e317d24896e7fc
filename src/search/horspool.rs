//! Boyer-Moore-Horspool search over matcher sequences.
//!
//! The forward shift table maps each byte value to the distance between its
//! last occurrence in the pattern (excluding the final position) and the
//! pattern end; bytes not in the pattern shift by the full length. Matcher
//! classes fold in naturally: every byte a position can match contributes an
//! entry. The backward variant mirrors the table around the pattern start.
//!
//! When the scanned position matches exactly one byte value, the scan loop
//! is replaced by a memchr/memrchr jump to the next occurrence of that byte.

use std::sync::OnceLock;

use memchr::{memchr, memrchr};

use crate::io::reader::{ReadError, WindowReader};
use crate::matcher::bytes::ByteMatcher;
use crate::matcher::sequence::SequenceMatcher;
use crate::search::{
    clip_backward, clip_forward, reader_search_backwards, reader_search_forwards, Searcher,
};

/// Shift table plus the matcher scanned at each alignment.
struct ShiftTable {
    shifts: Box<[usize; 256]>,
    /// Matcher at the scanned position (pattern end forward, start
    /// backward).
    scan: ByteMatcher,
    /// Set when `scan` matches exactly one byte: enables the memchr path.
    single: Option<u8>,
}

impl ShiftTable {
    fn forward<S: SequenceMatcher>(sequence: &S) -> Self {
        let len = sequence.len();
        let mut shifts = Box::new([len; 256]);
        for i in 0..len - 1 {
            let distance = len - 1 - i;
            for b in sequence.matcher_at(i).matching_bytes() {
                shifts[b as usize] = distance;
            }
        }
        let scan = sequence.matcher_at(len - 1);
        Self {
            shifts,
            scan,
            single: single_byte(scan),
        }
    }

    fn backward<S: SequenceMatcher>(sequence: &S) -> Self {
        let len = sequence.len();
        let mut shifts = Box::new([len; 256]);
        for i in (1..len).rev() {
            for b in sequence.matcher_at(i).matching_bytes() {
                shifts[b as usize] = i;
            }
        }
        let scan = sequence.matcher_at(0);
        Self {
            shifts,
            scan,
            single: single_byte(scan),
        }
    }
}

fn single_byte(matcher: ByteMatcher) -> Option<u8> {
    if matcher.num_matching_bytes() == 1 {
        Some(matcher.matching_bytes()[0])
    } else {
        None
    }
}

/// Horspool searcher over any sequence matcher.
pub struct HorspoolSearcher<S: SequenceMatcher> {
    sequence: S,
    forward: OnceLock<ShiftTable>,
    backward: OnceLock<ShiftTable>,
}

impl<S: SequenceMatcher> HorspoolSearcher<S> {
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

    fn forward_table(&self) -> &ShiftTable {
        self.forward.get_or_init(|| ShiftTable::forward(&self.sequence))
    }

    fn backward_table(&self) -> &ShiftTable {
        self.backward
            .get_or_init(|| ShiftTable::backward(&self.sequence))
    }
}

impl<S: SequenceMatcher> Searcher for HorspoolSearcher<S> {
    fn search_forwards(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize> {
        let pattern_len = self.sequence.len();
        let (from, to) = clip_forward(bytes.len(), pattern_len, from, to)?;
        let table = self.forward_table();

        if let Some(last_byte) = table.single {
            // Jump straight to occurrences of the single scanned byte.
            let mut pos = from;
            while pos <= to {
                let scan_from = pos + pattern_len - 1;
                let found = memchr(last_byte, &bytes[scan_from..=to + pattern_len - 1])?;
                let candidate = pos + found;
                if self.sequence.matches_no_bounds_check(bytes, candidate) {
                    return Some(candidate);
                }
                pos = candidate + table.shifts[last_byte as usize];
            }
            return None;
        }

        let mut pos = from;
        while pos <= to {
            let scanned = bytes[pos + pattern_len - 1];
            if table.scan.matches_byte(scanned)
                && self.sequence.matches_no_bounds_check(bytes, pos)
            {
                return Some(pos);
            }
            pos += table.shifts[scanned as usize];
        }
        None
    }

    fn search_backwards(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize> {
        let pattern_len = self.sequence.len();
        let (high, low) = clip_backward(bytes.len(), pattern_len, from, to)?;
        let table = self.backward_table();

        if let Some(first_byte) = table.single {
            let mut pos = high;
            loop {
                let found = memrchr(first_byte, &bytes[low..=pos])?;
                let candidate = low + found;
                if self.sequence.matches_no_bounds_check(bytes, candidate) {
                    return Some(candidate);
                }
                let shift = table.shifts[first_byte as usize];
                if candidate < low + shift {
                    return None;
                }
                pos = candidate - shift;
            }
        }

        let mut pos = high;
        loop {
            let scanned = bytes[pos];
            if table.scan.matches_byte(scanned)
                && self.sequence.matches_no_bounds_check(bytes, pos)
            {
                return Some(pos);
            }
            let shift = table.shifts[scanned as usize];
            if pos < low + shift {
                return None;
            }
            pos -= shift;
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

impl<S: SequenceMatcher> std::fmt::Debug for HorspoolSearcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HorspoolSearcher")
            .field("pattern_len", &self.sequence.len())
            .finish()
    }
}
