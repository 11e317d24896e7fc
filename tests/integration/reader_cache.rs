//! End-to-end reader and cache behavior.
//!
//! # Invariants
//! - Bytes read through any reader equal the origin bytes at the same
//!   position regardless of cache strategy or window size.
//! - Temp-file spill caches accept only gap-free sequential adds and delete
//!   their file on clear.
//! - Stream views return to a marked position across skips for any window
//!   size.

use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use tempfile::TempDir;

use byteseek::io::cache::{
    AllWindowsCache, CacheError, LeastFrequentlyUsedCache, LeastRecentlyUsedCache,
    MostRecentlyUsedCache, NoCache, SharedWindowCache, TempFileStreamCache, TwoLevelCache,
    WindowCache, WriteAroundCache,
};
use byteseek::io::reader::{FileReader, MemoryReader, StreamReader, WindowInputStream};
use byteseek::io::window::Window;
use byteseek::WindowReader;

/// Deterministic pseudo-random test data.
fn test_data(len: usize) -> Vec<u8> {
    let mut state = 0x2545f491_4f6cdd1du64;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

fn cache_strategies() -> Vec<(&'static str, Box<dyn WindowCache>)> {
    vec![
        ("all", Box::new(AllWindowsCache::new())),
        ("mru", Box::new(MostRecentlyUsedCache::new(3))),
        ("lru", Box::new(LeastRecentlyUsedCache::new(3))),
        ("lfu", Box::new(LeastFrequentlyUsedCache::new(3))),
        (
            "two-level",
            Box::new(TwoLevelCache::new(
                Box::new(MostRecentlyUsedCache::new(2)),
                Box::new(AllWindowsCache::new()),
            )),
        ),
        (
            "write-around",
            Box::new(WriteAroundCache::new(
                Box::new(MostRecentlyUsedCache::new(2)),
                Box::new(AllWindowsCache::new()),
            )),
        ),
    ]
}

#[test]
fn file_reader_round_trips_across_cache_strategies() {
    let data = test_data(3000);
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("data.bin");
    std::fs::File::create(&path)
        .and_then(|mut f| f.write_all(&data))
        .expect("write data");

    let window_size = 256u32;
    for (name, cache) in cache_strategies() {
        let mut reader =
            FileReader::open_with(&path, window_size, cache).expect("open");
        assert_eq!(reader.length().expect("length"), data.len() as u64, "{name}");
        // Scattered positions, some revisited to exercise hits and
        // promotions.
        for &pos in &[0u64, 1, 255, 256, 257, 2999, 1500, 256, 0, 2999, 700] {
            assert_eq!(
                reader.byte(pos).expect("byte"),
                data[pos as usize],
                "{name} at {pos}"
            );
        }
        assert!(
            matches!(reader.byte(3000), Err(byteseek::ReadError::NoByteAtPosition { .. })),
            "{name}"
        );
    }
}

#[test]
fn stream_reader_round_trips_across_window_sizes() {
    let data = test_data(5000);
    for window_size in [32u32, 127, 512, 1024, 4096] {
        let mut reader = StreamReader::with_cache(
            Cursor::new(data.clone()),
            window_size,
            Box::new(AllWindowsCache::new()),
        );
        for &pos in &[4999u64, 0, 2500, 4096, 31, 32, 126, 127] {
            assert_eq!(
                reader.byte(pos).expect("byte"),
                data[pos as usize],
                "window size {window_size} at {pos}"
            );
        }
        assert_eq!(reader.length().expect("length"), 5000);
    }
}

#[test]
fn readers_agree_with_each_other() {
    let data = test_data(2048);
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("data.bin");
    std::fs::File::create(&path)
        .and_then(|mut f| f.write_all(&data))
        .expect("write data");

    let mut file = FileReader::open_with(&path, 100, Box::new(MostRecentlyUsedCache::new(2)))
        .expect("open");
    let mut memory = MemoryReader::new(data.clone());
    let mut stream = StreamReader::new(Cursor::new(data));

    let mut file_buf = vec![0u8; 600];
    let mut memory_buf = vec![0u8; 600];
    let mut stream_buf = vec![0u8; 600];
    for pos in [0u64, 99, 100, 1500, 2000] {
        let n1 = file.read_at(pos, &mut file_buf).expect("read");
        let n2 = memory.read_at(pos, &mut memory_buf).expect("read");
        let n3 = stream.read_at(pos, &mut stream_buf).expect("read");
        assert_eq!(n1, n2);
        assert_eq!(n2, n3);
        assert_eq!(file_buf[..n1], memory_buf[..n2]);
        assert_eq!(memory_buf[..n2], stream_buf[..n3]);
    }
}

#[test]
fn stream_reader_over_a_spill_cache_round_trips() {
    // A stream reader produces windows strictly in order, which is exactly
    // the contract the spill cache requires.
    let data = test_data(5000);
    let dir = TempDir::new().expect("temp dir");
    let window_size = 512u32;
    let mut reader = StreamReader::with_cache(
        Cursor::new(data.clone()),
        window_size,
        Box::new(TempFileStreamCache::with_dir(
            window_size,
            dir.path().to_path_buf(),
        )),
    );

    // Jump to the end first, then revisit earlier positions from the file.
    assert_eq!(reader.byte(4999).expect("byte"), data[4999]);
    for &pos in &[0u64, 511, 512, 2500, 4999] {
        assert_eq!(reader.byte(pos).expect("byte"), data[pos as usize]);
    }
}

#[test]
fn temp_file_cache_scenario() {
    let dir = TempDir::new().expect("temp dir");
    let window_size = 4096u32;
    let mut cache = TempFileStreamCache::with_dir(window_size, dir.path().to_path_buf());

    for pos in [0u64, 4096, 8192] {
        let window = Arc::new(Window::hard(
            vec![(pos / 4096) as u8; window_size as usize],
            pos,
            window_size,
        ));
        cache.add(window).expect("sequential add");
    }
    let gap = Arc::new(Window::hard(
        vec![9u8; window_size as usize],
        16384,
        window_size,
    ));
    assert!(matches!(
        cache.add(gap).expect_err("gap rejected"),
        CacheError::NonSequentialWindow {
            expected: 12288,
            got: 16384
        }
    ));

    // Soft windows recover the exact bytes added, even after a reclaim.
    let window = cache.window(4096).expect("window").expect("hit");
    window.reclaim();
    assert_eq!(
        window.bytes().expect("recovered").as_ref(),
        &[1u8; 4096][..]
    );

    let path = cache.temp_file_path().expect("file exists");
    assert!(path.exists());
    cache.clear().expect("clear");
    assert!(!path.exists());
}

#[test]
fn two_level_cache_restores_evicted_windows_to_primary() {
    let mut cache = TwoLevelCache::new(
        Box::new(MostRecentlyUsedCache::new(1)),
        Box::new(AllWindowsCache::new()),
    );
    let first = Arc::new(Window::hard(vec![1u8; 8], 0, 8));
    cache.add(Arc::clone(&first)).expect("add");
    cache
        .add(Arc::new(Window::hard(vec![2u8; 8], 8, 8)))
        .expect("add");

    // Evicted from the primary, served from the secondary, and present in
    // the primary again after the lookup.
    assert!(cache.primary_mut().window(0).expect("window").is_none());
    let hit = cache.window(0).expect("window").expect("hit");
    assert!(Arc::ptr_eq(&hit, &first));
    assert!(cache.primary_mut().window(0).expect("window").is_some());
}

#[test]
fn window_input_stream_mark_reset_across_window_sizes() {
    let data = test_data(1024);
    for window_size in [32u32, 127, 512, 1024, 4096] {
        let reader = StreamReader::with_cache(
            Cursor::new(data.clone()),
            window_size,
            Box::new(AllWindowsCache::new()),
        );
        let mut stream = WindowInputStream::new(reader);

        let mut prefix = [0u8; 100];
        stream.read_exact(&mut prefix).expect("read prefix");
        stream.mark(0);
        assert_eq!(stream.skip(500).expect("skip"), 500);
        stream.reset().expect("reset");

        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte).expect("read after reset");
        assert_eq!(byte[0], data[100], "window size {window_size}");
    }
}

#[test]
fn readers_share_a_cache_and_closing_one_leaves_it_intact() {
    let data = test_data(1024);
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("data.bin");
    std::fs::File::create(&path)
        .and_then(|mut f| f.write_all(&data))
        .expect("write data");

    let shared = SharedWindowCache::new(Box::new(AllWindowsCache::new()));
    let mut first = FileReader::open_shared(&path, 128, shared.clone()).expect("open");
    let mut second = FileReader::open_shared(&path, 128, shared.clone()).expect("open");

    // Windows produced through one reader are served to the other.
    assert_eq!(first.byte(500).expect("byte"), data[500]);
    let mut probe = shared.clone();
    assert!(probe.window(384).expect("window").is_some());

    first.close().expect("close");
    // Closing one reader does not cascade to the shared cache.
    assert!(probe.window(384).expect("window").is_some());
    assert_eq!(second.byte(500).expect("byte"), data[500]);
    assert_eq!(second.byte(1023).expect("byte"), data[1023]);
}

#[test]
fn no_cache_reader_still_serves_files() {
    let data = test_data(300);
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("data.bin");
    std::fs::File::create(&path)
        .and_then(|mut f| f.write_all(&data))
        .expect("write data");

    let mut reader = FileReader::open_with(&path, 64, Box::new(NoCache::new())).expect("open");
    for pos in [299u64, 0, 150, 63, 64] {
        assert_eq!(reader.byte(pos).expect("byte"), data[pos as usize]);
    }
}
