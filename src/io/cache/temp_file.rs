//! Temp-file spill cache for sequentially produced windows.
//!
//! Windows are appended to a lazily created temp file in strictly increasing
//! position order with no gaps. The first add fixes the cache's start offset;
//! every later add must land at `start_offset + length`, so the file offset
//! of any window is just `position - start_offset` and no position map is
//! needed. The file layout is private: windows are written back to back with
//! no header.
//!
//! Windows handed out are soft: their arrays can be reclaimed under memory
//! pressure and are restored by re-reading the temp file. Once the cache is
//! cleared the file is deleted and recovery of still-live soft windows fails
//! with [`CacheError::WindowMissing`].
//!
//! # Invariants
//! - `length` equals the number of bytes written to the file.
//! - The temp file exists iff at least one window was added since the last
//!   `clear`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::io::cache::{CacheError, ObserverList, WindowCache, WindowObserver};
use crate::io::read_file_at;
use crate::io::window::{Window, WindowRecovery};

static SPILL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Constructs a unique temp file path within `dir`.
///
/// Includes PID, timestamp, and a monotonic counter to avoid collisions.
fn make_temp_path(dir: &Path) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let counter = SPILL_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(
        "byteseek_cache_{}_{}_{}",
        std::process::id(),
        now.as_nanos(),
        counter
    ))
}

#[derive(Debug, Default)]
struct SpillState {
    file: Option<File>,
    path: Option<PathBuf>,
    start_offset: u64,
    length: u64,
}

/// Shared spill file state: the cache writes through it and soft windows
/// recover their bytes from it.
#[derive(Debug)]
struct SpillFile {
    window_size: u32,
    state: Mutex<SpillState>,
}

impl SpillFile {
    fn lock(&self) -> std::sync::MutexGuard<'_, SpillState> {
        self.state.lock().expect("spill state poisoned")
    }

    /// Closes and deletes the temp file if it exists.
    ///
    /// A failed delete is reported with the path and any close error; a
    /// failed close alone surfaces as an I/O error after the file is gone.
    fn delete_file(state: &mut SpillState) -> Result<(), CacheError> {
        let Some(path) = state.path.take() else {
            return Ok(());
        };
        let close_error = match state.file.take() {
            Some(file) => file.sync_all().err(),
            None => None,
        };
        if let Err(_delete_error) = fs::remove_file(&path) {
            return Err(CacheError::TempFileNotDeleted { path, close_error });
        }
        match close_error {
            Some(err) => Err(CacheError::Io(err)),
            None => Ok(()),
        }
    }
}

impl WindowRecovery for SpillFile {
    fn recover_window_bytes(&self, position: u64) -> io::Result<Arc<[u8]>> {
        let mut state = self.lock();
        let start_offset = state.start_offset;
        let Some(file) = state.file.as_mut() else {
            return Err(io::Error::other(CacheError::WindowMissing { position }));
        };
        let file_pos = position - start_offset;
        let mut buf = vec![0u8; self.window_size as usize];
        read_file_at(file, file_pos, &mut buf)?;
        Ok(buf.into())
    }
}

impl Drop for SpillFile {
    fn drop(&mut self) {
        // Last reference (cache and all soft windows) gone: best effort.
        let mut state = self.lock();
        state.file = None;
        if let Some(path) = state.path.take() {
            let _ = fs::remove_file(&path);
        }
    }
}

/// A cache that spills sequentially added windows to a temp file.
#[derive(Debug)]
pub struct TempFileStreamCache {
    spill: Arc<SpillFile>,
    temp_dir: PathBuf,
    observers: ObserverList,
}

impl TempFileStreamCache {
    /// Creates a cache for windows of `window_size` bytes, spilling into the
    /// system temp directory.
    ///
    /// # Panics
    /// Panics if `window_size` is zero.
    #[must_use]
    pub fn new(window_size: u32) -> Self {
        Self::with_dir(window_size, std::env::temp_dir())
    }

    /// Creates a cache spilling into `temp_dir`.
    ///
    /// # Panics
    /// Panics if `window_size` is zero or `temp_dir` is not a directory.
    #[must_use]
    pub fn with_dir(window_size: u32, temp_dir: PathBuf) -> Self {
        assert!(window_size > 0, "window size must be > 0");
        assert!(
            temp_dir.is_dir(),
            "temp dir is not a directory: {}",
            temp_dir.display()
        );
        Self {
            spill: Arc::new(SpillFile {
                window_size,
                state: Mutex::new(SpillState::default()),
            }),
            temp_dir,
            observers: ObserverList::default(),
        }
    }

    /// The window size this cache was built for.
    #[must_use]
    pub fn window_size(&self) -> u32 {
        self.spill.window_size
    }

    /// Path of the temp file backing this cache, if one has been created.
    #[must_use]
    pub fn temp_file_path(&self) -> Option<PathBuf> {
        self.spill.lock().path.clone()
    }
}

impl WindowCache for TempFileStreamCache {
    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, CacheError> {
        let window_size = self.spill.window_size;
        let mut state = self.spill.lock();
        let start_offset = state.start_offset;
        let length = state.length;
        let Some(file) = state.file.as_mut() else {
            return Ok(None);
        };
        let Some(file_pos) = position.checked_sub(start_offset) else {
            return Ok(None);
        };
        if file_pos >= length || position % window_size as u64 != 0 {
            return Ok(None);
        }
        let mut buf = vec![0u8; window_size as usize];
        let read_length = read_file_at(file, file_pos, &mut buf)?;
        drop(state);
        Ok(Some(Arc::new(Window::soft(
            buf,
            position,
            read_length as u32,
            Arc::clone(&self.spill) as Arc<dyn WindowRecovery>,
        ))))
    }

    fn add(&mut self, window: Arc<Window>) -> Result<(), CacheError> {
        let position = window.position();
        let mut state = self.spill.lock();
        let file_pos = if state.file.is_some() {
            let expected = state.start_offset + state.length;
            if position != expected {
                return Err(CacheError::NonSequentialWindow {
                    expected,
                    got: position,
                });
            }
            state.length
        } else {
            // First window added fixes the start offset of the stream.
            let path = make_temp_path(&self.temp_dir);
            let file = OpenOptions::new()
                .create_new(true)
                .read(true)
                .write(true)
                .open(&path)?;
            state.file = Some(file);
            state.path = Some(path);
            state.start_offset = position;
            state.length = 0;
            0
        };

        let bytes = window.bytes()?;
        let window_length = window.length() as usize;
        let file = state.file.as_mut().expect("spill file present after add");
        file.seek(SeekFrom::Start(file_pos))?;
        file.write_all(&bytes[..window_length])?;
        state.length += window_length as u64;
        Ok(())
    }

    fn read(&mut self, window_pos: u64, offset: u32, dst: &mut [u8]) -> Result<usize, CacheError> {
        let mut state = self.spill.lock();
        let start_offset = state.start_offset;
        let length = state.length;
        let Some(file) = state.file.as_mut() else {
            return Ok(0);
        };
        let Some(file_pos) = (window_pos + offset as u64).checked_sub(start_offset) else {
            return Ok(0);
        };
        if file_pos >= length {
            return Ok(0);
        }
        let wanted = dst.len().min((length - file_pos) as usize);
        let n = read_file_at(file, file_pos, &mut dst[..wanted])?;
        Ok(n)
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        let mut state = self.spill.lock();
        state.start_offset = 0;
        state.length = 0;
        SpillFile::delete_file(&mut state)
    }

    fn subscribe(&mut self, observer: Arc<dyn WindowObserver>) {
        self.observers.subscribe(observer);
    }

    fn unsubscribe(&mut self, observer: &Arc<dyn WindowObserver>) -> bool {
        self.observers.unsubscribe(observer)
    }
}
