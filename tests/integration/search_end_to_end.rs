//! End-to-end searches over arrays and readers.

use std::io::{Cursor, Write};

use tempfile::TempDir;

use byteseek::io::cache::{AllWindowsCache, MostRecentlyUsedCache};
use byteseek::io::reader::{FileReader, MemoryReader, StreamReader};
use byteseek::matcher::bytes::ByteMatcher;
use byteseek::matcher::sequence::MatcherSequence;
use byteseek::search::{HorspoolSearcher, QgramHashSearcher, ShiftOrSearcher};
use byteseek::{ByteSequence, Searcher, SequenceMatcher};

fn searchers_for(pattern: &[u8]) -> Vec<(&'static str, Box<dyn Searcher>)> {
    vec![
        (
            "shift-or",
            Box::new(ShiftOrSearcher::new(ByteSequence::new(pattern))),
        ),
        (
            "horspool",
            Box::new(HorspoolSearcher::new(ByteSequence::new(pattern))),
        ),
        (
            "qgram",
            Box::new(QgramHashSearcher::new(ByteSequence::new(pattern))),
        ),
    ]
}

#[test]
fn ascii_sequence_in_array() {
    for (name, searcher) in searchers_for(b"ABCDEF") {
        let hay = b"xxABCDEFyy";
        assert_eq!(searcher.search_forwards(hay, 0, 9), Some(2), "{name}");
        let miss = b"xxABCEFFyy";
        assert_eq!(searcher.search_forwards(miss, 0, 9), None, "{name}");
    }
}

#[test]
fn search_results_are_matches_within_bounds() {
    let hay = b"abcabdabcabdabc";
    let pattern = ByteSequence::new(b"abc".as_slice());
    for (name, searcher) in searchers_for(b"abc") {
        for from in 0..hay.len() {
            for to in 0..hay.len() {
                if let Some(found) = searcher.search_forwards(hay, from, to) {
                    assert!(pattern.matches(hay, found), "{name}");
                    assert!(found >= from && found <= to, "{name}");
                    // First match: nothing earlier in range.
                    for earlier in from..found {
                        assert!(!pattern.matches(hay, earlier), "{name}");
                    }
                }
                if let Some(found) = searcher.search_backwards(hay, from, to) {
                    assert!(pattern.matches(hay, found), "{name}");
                    assert!(found <= from && found >= to, "{name}");
                    for later in found + 1..=from.min(hay.len() - 3) {
                        assert!(!pattern.matches(hay, later), "{name}");
                    }
                }
            }
        }
    }
}

#[test]
fn exact_span_tests_exactly_one_position() {
    let hay = b"....match....";
    for (name, searcher) in searchers_for(b"match") {
        assert_eq!(searcher.search_forwards(hay, 4, 4), Some(4), "{name}");
        assert_eq!(searcher.search_forwards(hay, 5, 5), None, "{name}");
        assert_eq!(searcher.search_backwards(hay, 4, 4), Some(4), "{name}");
    }
}

#[test]
fn one_byte_pattern_in_large_input_falls_back_transparently() {
    let mut hay = vec![0u8; 10 * 1024];
    hay[1234] = b'!';
    hay[8765] = b'!';

    let searcher = QgramHashSearcher::new(ByteSequence::new(b"!".as_slice()));
    assert!(searcher.falls_back_forwards());
    assert_eq!(searcher.search_forwards(&hay, 0, hay.len()), Some(1234));
    assert_eq!(searcher.search_backwards(&hay, hay.len(), 0), Some(8765));

    let mut reader = MemoryReader::new(hay);
    assert_eq!(
        searcher
            .search_reader_forwards(&mut reader, 0, u64::MAX)
            .expect("search"),
        Some(1234)
    );
    assert_eq!(
        searcher
            .search_reader_backwards(&mut reader, u64::MAX, 0)
            .expect("search"),
        Some(8765)
    );
}

#[test]
fn reader_and_array_searches_agree_across_window_sizes() {
    let mut hay = vec![b'-'; 4000];
    hay[5..11].copy_from_slice(b"needle");
    hay[1021..1027].copy_from_slice(b"needle");
    hay[3500..3506].copy_from_slice(b"needle");

    for window_size in [32u32, 127, 512, 1024, 4096] {
        for (name, searcher) in searchers_for(b"needle") {
            let mut reader = StreamReader::with_cache(
                Cursor::new(hay.clone()),
                window_size,
                Box::new(AllWindowsCache::new()),
            );
            let mut found = Vec::new();
            let mut from = 0u64;
            while let Some(at) = searcher
                .search_reader_forwards(&mut reader, from, u64::MAX)
                .expect("search")
            {
                found.push(at);
                from = at + 1;
            }
            assert_eq!(found, vec![5, 1021, 3500], "{name} ws={window_size}");

            assert_eq!(
                searcher
                    .search_reader_backwards(&mut reader, u64::MAX, 0)
                    .expect("search"),
                Some(3500),
                "{name} ws={window_size}"
            );
            assert_eq!(
                searcher
                    .search_reader_backwards(&mut reader, 3499, 0)
                    .expect("search"),
                Some(1021),
                "{name} ws={window_size}"
            );
        }
    }
}

#[test]
fn searches_a_file_on_disk() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("hay.bin");
    let mut hay = vec![0xeeu8; 100_000];
    hay[72_000..72_004].copy_from_slice(b"\xca\xfe\xba\xbe");
    std::fs::File::create(&path)
        .and_then(|mut f| f.write_all(&hay))
        .expect("write");

    let mut reader =
        FileReader::open_with(&path, 4096, Box::new(MostRecentlyUsedCache::new(4))).expect("open");
    let searcher = HorspoolSearcher::new(ByteSequence::new(b"\xca\xfe\xba\xbe".as_slice()));
    assert_eq!(
        searcher
            .search_reader_forwards(&mut reader, 0, u64::MAX)
            .expect("search"),
        Some(72_000)
    );
}

#[test]
fn class_patterns_search_readers() {
    // "<" then a digit then ">" anywhere in the input.
    let sequence = MatcherSequence::new(vec![
        ByteMatcher::one(b'<'),
        ByteMatcher::range(b'0', b'9', false),
        ByteMatcher::one(b'>'),
    ]);
    let hay = b"..<a>..<5>..<9>..".to_vec();
    let expected_first = 7u64;
    let expected_last = 12u64;

    let shift_or = ShiftOrSearcher::new(sequence.clone());
    let horspool = HorspoolSearcher::new(sequence.clone());
    let qgram = QgramHashSearcher::new(sequence);

    let mut reader = MemoryReader::new(hay);
    assert_eq!(
        shift_or
            .search_reader_forwards(&mut reader, 0, u64::MAX)
            .expect("search"),
        Some(expected_first)
    );
    assert_eq!(
        horspool
            .search_reader_forwards(&mut reader, 0, u64::MAX)
            .expect("search"),
        Some(expected_first)
    );
    assert_eq!(
        qgram
            .search_reader_backwards(&mut reader, u64::MAX, 0)
            .expect("search"),
        Some(expected_last)
    );
}

#[test]
fn reversed_views_search_for_the_reversed_pattern() {
    let pattern = ByteSequence::new(b"fedcba".as_slice());
    let reversed = pattern.reverse();
    let searcher = HorspoolSearcher::new(reversed);
    let hay = b"...abcdef...";
    assert_eq!(searcher.search_forwards(hay, 0, hay.len()), Some(3));
}
