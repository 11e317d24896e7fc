//! Property tests for the search algorithms.
//!
//! Every algorithm must agree with a naive position-by-position scan on
//! random haystacks, patterns, and bounds, and reader-based searches must
//! agree with array searches on the same data for any window size.

use std::io::Cursor;

use proptest::prelude::*;

use byteseek::io::cache::AllWindowsCache;
use byteseek::io::reader::StreamReader;
use byteseek::search::{HorspoolSearcher, QgramHashSearcher, ShiftOrSearcher};
use byteseek::{ByteSequence, Searcher, SequenceMatcher};

/// Reference scan over every candidate position.
fn naive_forwards(sequence: &ByteSequence, hay: &[u8], from: usize, to: usize) -> Option<usize> {
    if sequence.len() > hay.len() {
        return None;
    }
    let last = hay.len() - sequence.len();
    let to = to.min(last);
    if from > to {
        return None;
    }
    (from..=to).find(|&pos| sequence.matches(hay, pos))
}

fn naive_backwards(sequence: &ByteSequence, hay: &[u8], from: usize, to: usize) -> Option<usize> {
    if sequence.len() > hay.len() || from < to {
        return None;
    }
    let high = from.min(hay.len() - sequence.len());
    if high < to {
        return None;
    }
    (to..=high).rev().find(|&pos| sequence.matches(hay, pos))
}

/// Small alphabets make matches likely; varied lengths cover the fallback
/// and straddle paths.
fn haystack_and_pattern() -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    (
        proptest::collection::vec(0u8..4, 1..200),
        proptest::collection::vec(0u8..4, 1..12),
    )
}

fn check_all_searchers(
    hay: &[u8],
    pattern: &[u8],
    from: usize,
    to: usize,
) -> Result<(), TestCaseError> {
    let sequence = ByteSequence::new(pattern);
    let expected_forward = naive_forwards(&sequence, hay, from, to);
    let expected_backward = naive_backwards(&sequence, hay, to, from.min(to));

    let shift_or = ShiftOrSearcher::new(sequence.clone());
    let horspool = HorspoolSearcher::new(sequence.clone());
    let qgram = QgramHashSearcher::new(sequence.clone());

    prop_assert_eq!(shift_or.search_forwards(hay, from, to), expected_forward);
    prop_assert_eq!(horspool.search_forwards(hay, from, to), expected_forward);
    prop_assert_eq!(qgram.search_forwards(hay, from, to), expected_forward);

    prop_assert_eq!(
        shift_or.search_backwards(hay, to, from.min(to)),
        expected_backward
    );
    prop_assert_eq!(
        horspool.search_backwards(hay, to, from.min(to)),
        expected_backward
    );
    prop_assert_eq!(
        qgram.search_backwards(hay, to, from.min(to)),
        expected_backward
    );
    Ok(())
}

proptest! {
    #[test]
    fn algorithms_agree_with_naive_scan(
        (hay, pattern) in haystack_and_pattern(),
        from_seed in any::<usize>(),
        to_seed in any::<usize>(),
    ) {
        let from = from_seed % hay.len();
        let to = to_seed % hay.len();
        check_all_searchers(&hay, &pattern, from, to)?;
    }

    #[test]
    fn full_range_search_finds_first_and_last(
        (hay, pattern) in haystack_and_pattern(),
    ) {
        check_all_searchers(&hay, &pattern, 0, hay.len().saturating_sub(1))?;
    }

    #[test]
    fn reader_search_agrees_with_array_search(
        (hay, pattern) in haystack_and_pattern(),
        window_size in 1u32..40,
    ) {
        let sequence = ByteSequence::new(pattern.as_slice());
        let expected_forward = naive_forwards(&sequence, &hay, 0, hay.len());
        let expected_backward = naive_backwards(&sequence, &hay, hay.len(), 0);

        let mut reader = StreamReader::with_cache(
            Cursor::new(hay),
            window_size,
            Box::new(AllWindowsCache::new()),
        );

        let shift_or = ShiftOrSearcher::new(sequence.clone());
        let horspool = HorspoolSearcher::new(sequence.clone());
        let qgram = QgramHashSearcher::new(sequence);

        prop_assert_eq!(
            shift_or.search_reader_forwards(&mut reader, 0, u64::MAX).unwrap(),
            expected_forward.map(|p| p as u64)
        );
        prop_assert_eq!(
            horspool.search_reader_forwards(&mut reader, 0, u64::MAX).unwrap(),
            expected_forward.map(|p| p as u64)
        );
        prop_assert_eq!(
            qgram.search_reader_forwards(&mut reader, 0, u64::MAX).unwrap(),
            expected_forward.map(|p| p as u64)
        );

        prop_assert_eq!(
            shift_or.search_reader_backwards(&mut reader, u64::MAX, 0).unwrap(),
            expected_backward.map(|p| p as u64)
        );
        prop_assert_eq!(
            horspool.search_reader_backwards(&mut reader, u64::MAX, 0).unwrap(),
            expected_backward.map(|p| p as u64)
        );
        prop_assert_eq!(
            qgram.search_reader_backwards(&mut reader, u64::MAX, 0).unwrap(),
            expected_backward.map(|p| p as u64)
        );
    }

    #[test]
    fn found_positions_are_real_matches(
        (hay, pattern) in haystack_and_pattern(),
    ) {
        let sequence = ByteSequence::new(pattern.as_slice());
        let searcher = HorspoolSearcher::new(sequence.clone());
        if let Some(found) = searcher.search_forwards(&hay, 0, hay.len()) {
            prop_assert!(sequence.matches(&hay, found));
            for earlier in 0..found {
                prop_assert!(!sequence.matches(&hay, earlier));
            }
        }
    }
}
