//! Ordered sequences of byte matchers with shared-array views.
//!
//! A sequence matcher tests a fixed-length run of positions, one
//! [`ByteMatcher`] per position. Subsequences and reversals are cheap views:
//! they share the backing array through an `Arc` and carry only a
//! `(start, end, reversed)` slice descriptor. Repetition and concatenation
//! allocate a fresh backing array.
//!
//! [`ByteSequence`] is the specialization where every position matches
//! exactly one byte; it views a shared `Arc<[u8]>` directly and compares
//! slices instead of dispatching per position.
//!
//! Equality is content-based over the logical (viewed) sequence and the
//! hash is computed once at construction.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::io::reader::{ReadError, WindowReader};
use crate::matcher::bytes::{byte_to_string, ByteMatcher};

/// Errors from constructing specialized sequences.
#[derive(Debug)]
#[non_exhaustive]
pub enum SequenceBuildError {
    /// A position matches more than one byte, so a byte sequence cannot
    /// represent it.
    MultipleMatchingBytes { position: usize, count: u32 },
}

impl fmt::Display for SequenceBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleMatchingBytes { position, count } => write!(
                f,
                "cannot build a byte sequence: position {position} matches {count} bytes"
            ),
        }
    }
}

impl std::error::Error for SequenceBuildError {}

/// An immutable, non-empty, fixed-length run of byte matchers.
pub trait SequenceMatcher {
    /// Number of positions in the sequence. Always greater than zero.
    fn len(&self) -> usize;

    /// The matcher for logical position `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    fn matcher_at(&self, index: usize) -> ByteMatcher;

    /// Provided for completeness; sequences are never empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bounds-checked match of the whole sequence at `position`.
    fn matches(&self, bytes: &[u8], position: usize) -> bool {
        match position.checked_add(self.len()) {
            Some(end) if end <= bytes.len() => self.matches_no_bounds_check(bytes, position),
            _ => false,
        }
    }

    /// Match of the whole sequence without bounds checks.
    ///
    /// Callers must guarantee `position + len() <= bytes.len()`.
    fn matches_no_bounds_check(&self, bytes: &[u8], position: usize) -> bool {
        debug_assert!(position + self.len() <= bytes.len());
        (0..self.len()).all(|i| self.matcher_at(i).matches_no_bounds_check(bytes, position + i))
    }

    /// Match of the whole sequence at an absolute reader position, crossing
    /// window boundaries as needed. False when the source ends mid-sequence.
    fn matches_reader(
        &self,
        reader: &mut dyn WindowReader,
        position: u64,
    ) -> Result<bool, ReadError> {
        let mut index = 0;
        while index < self.len() {
            let pos = position + index as u64;
            let Some(window) = reader.window(pos)? else {
                return Ok(false);
            };
            let offset = (pos - window.position()) as usize;
            let valid = window.length() as usize;
            if offset >= valid {
                return Ok(false);
            }
            let bytes = window.bytes().map_err(ReadError::Io)?;
            let run = (valid - offset).min(self.len() - index);
            for i in 0..run {
                if !self.matcher_at(index + i).matches_byte(bytes[offset + i]) {
                    return Ok(false);
                }
            }
            index += run;
        }
        Ok(true)
    }

    /// Canonical textual form for diagnostics.
    fn to_regex(&self, pretty: bool) -> String {
        let mut parts = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            parts.push(self.matcher_at(i).to_regex(pretty));
        }
        parts.join(if pretty { " " } else { "" })
    }
}

/// Content hash over the logical sequence, fixed at construction.
fn content_hash(len: usize, matcher_at: impl Fn(usize) -> ByteMatcher) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    len.hash(&mut hasher);
    for i in 0..len {
        matcher_at(i).hash(&mut hasher);
    }
    hasher.finish()
}

/// Maps a logical index onto the backing range of a view.
#[inline]
fn backing_index(start: usize, end: usize, reversed: bool, index: usize) -> usize {
    if reversed {
        end - 1 - index
    } else {
        start + index
    }
}

/// Computes the backing range of a sub-view.
fn sub_view_range(
    start: usize,
    end: usize,
    reversed: bool,
    begin: usize,
    sub_end: usize,
) -> (usize, usize) {
    let len = end - start;
    assert!(begin < sub_end, "subsequence must not be empty");
    assert!(
        sub_end <= len,
        "subsequence {begin}..{sub_end} out of range for length {len}"
    );
    if reversed {
        (end - sub_end, end - begin)
    } else {
        (start + begin, start + sub_end)
    }
}

/// A sequence of arbitrary byte matchers over a shared backing array.
#[derive(Clone)]
pub struct MatcherSequence {
    matchers: Arc<[ByteMatcher]>,
    start: usize,
    end: usize,
    reversed: bool,
    hash: u64,
}

impl MatcherSequence {
    /// Builds a sequence from a list of matchers.
    ///
    /// # Panics
    /// Panics if the list is empty.
    #[must_use]
    pub fn new(matchers: impl Into<Arc<[ByteMatcher]>>) -> Self {
        let matchers = matchers.into();
        assert!(!matchers.is_empty(), "sequence must not be empty");
        let end = matchers.len();
        Self::view(matchers, 0, end, false)
    }

    /// Builds a sequence repeating one matcher `count` times.
    ///
    /// # Panics
    /// Panics if `count` is zero.
    #[must_use]
    pub fn repeated(matcher: ByteMatcher, count: usize) -> Self {
        assert!(count > 0, "repeat count must be > 0");
        Self::new(vec![matcher; count])
    }

    /// Concatenates sequences into one with a fresh backing array.
    ///
    /// # Panics
    /// Panics if `parts` is empty.
    #[must_use]
    pub fn concat(parts: &[&dyn SequenceMatcher]) -> Self {
        assert!(!parts.is_empty(), "concatenation must not be empty");
        let total = parts.iter().map(|p| p.len()).sum();
        let mut matchers = Vec::with_capacity(total);
        for part in parts {
            for i in 0..part.len() {
                matchers.push(part.matcher_at(i));
            }
        }
        Self::new(matchers)
    }

    fn view(matchers: Arc<[ByteMatcher]>, start: usize, end: usize, reversed: bool) -> Self {
        let hash = content_hash(end - start, |i| {
            matchers[backing_index(start, end, reversed, i)]
        });
        Self {
            matchers,
            start,
            end,
            reversed,
            hash,
        }
    }

    /// A view over logical positions `begin..end`, sharing the backing
    /// array.
    ///
    /// # Panics
    /// Panics if the range is empty or out of bounds.
    #[must_use]
    pub fn subsequence(&self, begin: usize, end: usize) -> Self {
        if begin == 0 && end == self.len() {
            return self.clone();
        }
        let (start, new_end) = sub_view_range(self.start, self.end, self.reversed, begin, end);
        Self::view(Arc::clone(&self.matchers), start, new_end, self.reversed)
    }

    /// A view from `begin` to the end of the sequence.
    #[must_use]
    pub fn subsequence_from(&self, begin: usize) -> Self {
        self.subsequence(begin, self.len())
    }

    /// A reversed view over the same backing array.
    #[must_use]
    pub fn reverse(&self) -> Self {
        Self::view(
            Arc::clone(&self.matchers),
            self.start,
            self.end,
            !self.reversed,
        )
    }

    /// A sequence of `count` copies of this one, with a fresh backing array.
    ///
    /// # Panics
    /// Panics if `count` is zero.
    #[must_use]
    pub fn repeat(&self, count: usize) -> Self {
        assert!(count > 0, "repeat count must be > 0");
        let mut matchers = Vec::with_capacity(self.len() * count);
        for _ in 0..count {
            for i in 0..self.len() {
                matchers.push(self.matcher_at(i));
            }
        }
        Self::new(matchers)
    }
}

impl SequenceMatcher for MatcherSequence {
    fn len(&self) -> usize {
        self.end - self.start
    }

    fn matcher_at(&self, index: usize) -> ByteMatcher {
        assert!(index < self.len(), "matcher index out of range");
        self.matchers[backing_index(self.start, self.end, self.reversed, index)]
    }
}

impl PartialEq for MatcherSequence {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.hash == other.hash
            && (0..self.len()).all(|i| self.matcher_at(i) == other.matcher_at(i))
    }
}

impl Eq for MatcherSequence {}

impl Hash for MatcherSequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for MatcherSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MatcherSequence({})", self.to_regex(true))
    }
}

impl From<&[u8]> for MatcherSequence {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.iter().map(|&b| ByteMatcher::one(b)).collect::<Vec<_>>())
    }
}

/// A sequence where every position matches exactly one byte.
#[derive(Clone)]
pub struct ByteSequence {
    bytes: Arc<[u8]>,
    start: usize,
    end: usize,
    reversed: bool,
    hash: u64,
}

impl ByteSequence {
    /// Builds a sequence matching `bytes` exactly.
    ///
    /// # Panics
    /// Panics if `bytes` is empty.
    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        assert!(!bytes.is_empty(), "sequence must not be empty");
        let end = bytes.len();
        Self::view(bytes, 0, end, false)
    }

    /// Builds a sequence of `count` copies of one byte.
    ///
    /// # Panics
    /// Panics if `count` is zero.
    #[must_use]
    pub fn repeated(byte: u8, count: usize) -> Self {
        assert!(count > 0, "repeat count must be > 0");
        Self::new(vec![byte; count])
    }

    /// Builds a byte sequence from any sequence matcher, failing on the
    /// first position that matches more than one byte.
    pub fn from_sequence(sequence: &dyn SequenceMatcher) -> Result<Self, SequenceBuildError> {
        let mut bytes = Vec::with_capacity(sequence.len());
        for i in 0..sequence.len() {
            let matcher = sequence.matcher_at(i);
            let count = matcher.num_matching_bytes();
            if count != 1 {
                return Err(SequenceBuildError::MultipleMatchingBytes { position: i, count });
            }
            bytes.push(matcher.matching_bytes()[0]);
        }
        Ok(Self::new(bytes))
    }

    fn view(bytes: Arc<[u8]>, start: usize, end: usize, reversed: bool) -> Self {
        let hash = content_hash(end - start, |i| {
            ByteMatcher::one(bytes[backing_index(start, end, reversed, i)])
        });
        Self {
            bytes,
            start,
            end,
            reversed,
            hash,
        }
    }

    /// The byte matched at logical position `index`.
    #[inline]
    #[must_use]
    pub fn byte_at(&self, index: usize) -> u8 {
        assert!(index < self.len(), "byte index out of range");
        self.bytes[backing_index(self.start, self.end, self.reversed, index)]
    }

    /// A view over logical positions `begin..end`, sharing the backing
    /// array.
    ///
    /// # Panics
    /// Panics if the range is empty or out of bounds.
    #[must_use]
    pub fn subsequence(&self, begin: usize, end: usize) -> Self {
        if begin == 0 && end == self.len() {
            return self.clone();
        }
        let (start, new_end) = sub_view_range(self.start, self.end, self.reversed, begin, end);
        Self::view(Arc::clone(&self.bytes), start, new_end, self.reversed)
    }

    /// A view from `begin` to the end of the sequence.
    #[must_use]
    pub fn subsequence_from(&self, begin: usize) -> Self {
        self.subsequence(begin, self.len())
    }

    /// A reversed view over the same backing array.
    #[must_use]
    pub fn reverse(&self) -> Self {
        Self::view(
            Arc::clone(&self.bytes),
            self.start,
            self.end,
            !self.reversed,
        )
    }

    /// A sequence of `count` copies of this one, with a fresh backing array.
    ///
    /// # Panics
    /// Panics if `count` is zero.
    #[must_use]
    pub fn repeat(&self, count: usize) -> Self {
        assert!(count > 0, "repeat count must be > 0");
        let mut bytes = Vec::with_capacity(self.len() * count);
        for _ in 0..count {
            for i in 0..self.len() {
                bytes.push(self.byte_at(i));
            }
        }
        Self::new(bytes)
    }
}

impl SequenceMatcher for ByteSequence {
    fn len(&self) -> usize {
        self.end - self.start
    }

    fn matcher_at(&self, index: usize) -> ByteMatcher {
        ByteMatcher::one(self.byte_at(index))
    }

    fn matches_no_bounds_check(&self, bytes: &[u8], position: usize) -> bool {
        debug_assert!(position + self.len() <= bytes.len());
        if self.reversed {
            (0..self.len()).all(|i| bytes[position + i] == self.byte_at(i))
        } else {
            // Forward views compare the shared slice directly.
            bytes[position..position + self.len()] == self.bytes[self.start..self.end]
        }
    }

    fn to_regex(&self, pretty: bool) -> String {
        let mut parts = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            parts.push(byte_to_string(pretty, self.byte_at(i)));
        }
        parts.join(if pretty { " " } else { "" })
    }
}

impl PartialEq for ByteSequence {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.hash == other.hash
            && (0..self.len()).all(|i| self.byte_at(i) == other.byte_at(i))
    }
}

impl Eq for ByteSequence {}

impl Hash for ByteSequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for ByteSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteSequence({})", self.to_regex(true))
    }
}

impl From<&[u8]> for ByteSequence {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl From<Vec<u8>> for ByteSequence {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::reader::MemoryReader;
    use crate::io::reader::StreamReader;

    fn digits_then_letter() -> MatcherSequence {
        MatcherSequence::new(vec![
            ByteMatcher::range(b'0', b'9', false),
            ByteMatcher::range(b'0', b'9', false),
            ByteMatcher::one(b'x'),
        ])
    }

    #[test]
    fn matches_agree_with_per_position_matchers() {
        let seq = digits_then_letter();
        assert!(seq.matches(b"42x", 0));
        assert!(seq.matches(b"zz42xzz", 2));
        assert!(!seq.matches(b"4ax", 0));
        // Out of range positions never match.
        assert!(!seq.matches(b"42x", 1));
        assert!(!seq.matches(b"42", 0));
    }

    #[test]
    fn reverse_twice_is_identity() {
        let seq = digits_then_letter();
        assert_eq!(seq.reverse().reverse(), seq);
        let bytes = ByteSequence::new(b"abc".as_slice());
        assert_eq!(bytes.reverse().reverse(), bytes);
    }

    #[test]
    fn reverse_views_share_and_flip() {
        let seq = ByteSequence::new(b"abc".as_slice());
        let rev = seq.reverse();
        assert_eq!(rev.byte_at(0), b'c');
        assert_eq!(rev.byte_at(2), b'a');
        assert!(rev.matches(b"cba", 0));
        assert!(!rev.matches(b"abc", 0));
    }

    #[test]
    fn subsequence_algebra() {
        let seq = ByteSequence::new(b"abcdef".as_slice());
        assert_eq!(seq.subsequence(0, seq.len()), seq);
        let sub = seq.subsequence(1, 5); // "bcde"
        assert_eq!(sub.subsequence(1, 3), seq.subsequence(2, 4));
        // The same law holds through a reversal.
        let rev = seq.reverse(); // "fedcba"
        assert_eq!(rev.subsequence(1, 4).subsequence(1, 2), rev.subsequence(2, 3));
    }

    #[test]
    fn subsequence_of_matcher_sequence() {
        let seq = digits_then_letter();
        let sub = seq.subsequence(2, 3);
        assert_eq!(sub.len(), 1);
        assert_eq!(sub.matcher_at(0), ByteMatcher::one(b'x'));
    }

    #[test]
    fn repeat_copies_content() {
        let seq = ByteSequence::new(b"ab".as_slice());
        let repeated = seq.repeat(3);
        assert_eq!(repeated.len(), 6);
        assert!(repeated.matches(b"ababab", 0));

        let m = ByteMatcher::one(b'z').repeat(4);
        assert_eq!(m.len(), 4);
        assert!(m.matches(b"zzzz", 0));
    }

    #[test]
    fn equality_is_content_based_and_hash_cached() {
        let a = ByteSequence::new(b"xabcx".as_slice()).subsequence(1, 4);
        let b = ByteSequence::new(b"abc".as_slice());
        assert_eq!(a, b);

        use std::collections::hash_map::DefaultHasher;
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn from_sequence_requires_single_byte_positions() {
        let seq = MatcherSequence::from(b"ok".as_slice());
        let bytes = ByteSequence::from_sequence(&seq).expect("single-byte positions");
        assert_eq!(bytes.byte_at(0), b'o');

        let err = ByteSequence::from_sequence(&digits_then_letter()).expect_err("range position");
        assert!(matches!(
            err,
            SequenceBuildError::MultipleMatchingBytes { position: 0, count: 10 }
        ));
    }

    #[test]
    fn reader_matching_crosses_window_boundaries() {
        let data: Vec<u8> = b"....ABCDEF....".to_vec();
        // Window size 4: "ABCDEF" spans windows 1 and 2.
        let mut reader = StreamReader::with_cache(
            std::io::Cursor::new(data),
            4,
            Box::new(crate::io::cache::AllWindowsCache::new()),
        );
        let seq = ByteSequence::new(b"ABCDEF".as_slice());
        assert!(seq.matches_reader(&mut reader, 4).expect("match"));
        assert!(!seq.matches_reader(&mut reader, 5).expect("match"));
    }

    #[test]
    fn reader_matching_ends_mid_sequence_is_no_match() {
        let mut reader = MemoryReader::new(b"ABCD".as_slice());
        let seq = ByteSequence::new(b"CDE".as_slice());
        assert!(!seq.matches_reader(&mut reader, 2).expect("match"));
    }
}
