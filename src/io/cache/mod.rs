//! Pluggable window stores keyed by absolute window position.
//!
//! A [`WindowCache`] holds windows a reader has already produced so that
//! revisiting a position does not touch the origin again. Strategies range
//! from storing nothing ([`NoCache`]) through bounded in-memory stores
//! ([`bounded`]) to composed tiers ([`two_level`], [`write_around`]) and a
//! sequential temp-file spill log ([`temp_file`]).
//!
//! Observers subscribed to a cache are told about a window *before* it is
//! removed from internal storage, so a tiered cache can hand the window to
//! its next level without the window ever being unreachable. Errors raised
//! by observers never prevent the eviction itself: the cache completes the
//! removal and surfaces the first observer error afterwards.
//!
//! # Concurrency
//! Caches are single-writer: every operation takes `&mut self`. Windows
//! handed out are `Arc`-shared and may outlive their cache entry.

pub mod bounded;
pub mod temp_file;
pub mod two_level;
pub mod write_around;

pub use bounded::{LeastFrequentlyUsedCache, LeastRecentlyUsedCache, MostRecentlyUsedCache};
pub use temp_file::TempFileStreamCache;
pub use two_level::TwoLevelCache;
pub use write_around::WriteAroundCache;

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use ahash::AHashMap;

use crate::io::window::Window;

/// Errors from window cache operations.
#[derive(Debug)]
#[non_exhaustive]
pub enum CacheError {
    /// Underlying I/O failed.
    Io(io::Error),
    /// A window was added to a stream cache out of sequence.
    NonSequentialWindow { expected: u64, got: u64 },
    /// The temp file backing a spill cache could not be deleted.
    ///
    /// Preserves any error raised while closing the file before the delete.
    TempFileNotDeleted {
        path: PathBuf,
        close_error: Option<io::Error>,
    },
    /// A soft window's backing store is gone and its bytes cannot be
    /// recovered.
    WindowMissing { position: u64 },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cache I/O error: {err}"),
            Self::NonSequentialWindow { expected, got } => write!(
                f,
                "window not added sequentially: next valid position is {expected}, got {got}"
            ),
            Self::TempFileNotDeleted { path, .. } => {
                write!(f, "cache temp file not deleted: {}", path.display())
            }
            Self::WindowMissing { position } => {
                write!(f, "cache temp file does not exist: cannot recover window at {position}")
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::TempFileNotDeleted {
                close_error: Some(err),
                ..
            } => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for CacheError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// A subscriber told about windows that are about to leave a cache.
///
/// The callback runs before the window is removed from the cache's internal
/// storage. Observers must not retain the window beyond the call unless they
/// deliberately re-cache it elsewhere.
pub trait WindowObserver {
    /// Called with a window that is leaving the notifying cache.
    fn on_window_free(&self, window: &Arc<Window>) -> Result<(), CacheError>;
}

/// Registered observers of a single cache, notified in subscription order.
#[derive(Default)]
pub(crate) struct ObserverList {
    observers: Vec<Arc<dyn WindowObserver>>,
}

impl ObserverList {
    pub(crate) fn subscribe(&mut self, observer: Arc<dyn WindowObserver>) {
        self.observers.push(observer);
    }

    /// Removes an observer by identity. Returns true if it was subscribed.
    pub(crate) fn unsubscribe(&mut self, observer: &Arc<dyn WindowObserver>) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| !Arc::ptr_eq(o, observer));
        self.observers.len() != before
    }

    /// Notifies every observer, returning the first error after all ran.
    pub(crate) fn notify(&self, window: &Arc<Window>) -> Result<(), CacheError> {
        let mut first_error = None;
        for observer in &self.observers {
            if let Err(err) = observer.on_window_free(window) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("len", &self.observers.len())
            .finish()
    }
}

/// A store of windows keyed by their absolute position.
pub trait WindowCache {
    /// Returns the cached window at `position`, or `None` on a miss.
    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, CacheError>;

    /// Offers a window to the cache. The cache may evict others to make room
    /// or decline to store it at all.
    fn add(&mut self, window: Arc<Window>) -> Result<(), CacheError>;

    /// Copies bytes from the window at `window_pos`, starting `offset` bytes
    /// in, into `dst`. Returns the number of bytes copied, 0 when the cache
    /// cannot satisfy the read.
    ///
    /// The default reads through [`window`](Self::window); caches that store
    /// bytes directly override this to skip materializing a window.
    fn read(&mut self, window_pos: u64, offset: u32, dst: &mut [u8]) -> Result<usize, CacheError> {
        match self.window(window_pos)? {
            Some(w) if offset < w.length() => {
                let bytes = w.bytes()?;
                let n = ((w.length() - offset) as usize).min(dst.len());
                dst[..n].copy_from_slice(&bytes[offset as usize..offset as usize + n]);
                Ok(n)
            }
            _ => Ok(0),
        }
    }

    /// Discards all cached windows and releases any backing resources.
    ///
    /// Clearing does not notify observers: it is a reset of the whole cache,
    /// not an eviction of live windows.
    fn clear(&mut self) -> Result<(), CacheError>;

    /// Registers an observer for windows leaving this cache.
    fn subscribe(&mut self, observer: Arc<dyn WindowObserver>);

    /// Removes a previously registered observer by identity.
    fn unsubscribe(&mut self, observer: &Arc<dyn WindowObserver>) -> bool;
}

/// A cache handle that any number of readers can hold at once.
///
/// Clones refer to the same underlying cache; every operation locks it for
/// the duration of the call. Readers attached through a shared handle leave
/// the cache untouched when they close, since other holders may still be
/// using it.
#[derive(Clone)]
pub struct SharedWindowCache {
    inner: Arc<Mutex<Box<dyn WindowCache>>>,
}

impl SharedWindowCache {
    #[must_use]
    pub fn new(cache: Box<dyn WindowCache>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn WindowCache>> {
        self.inner.lock().expect("shared cache poisoned")
    }
}

impl WindowCache for SharedWindowCache {
    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, CacheError> {
        self.lock().window(position)
    }

    fn add(&mut self, window: Arc<Window>) -> Result<(), CacheError> {
        self.lock().add(window)
    }

    fn read(&mut self, window_pos: u64, offset: u32, dst: &mut [u8]) -> Result<usize, CacheError> {
        self.lock().read(window_pos, offset, dst)
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        self.lock().clear()
    }

    fn subscribe(&mut self, observer: Arc<dyn WindowObserver>) {
        self.lock().subscribe(observer);
    }

    fn unsubscribe(&mut self, observer: &Arc<dyn WindowObserver>) -> bool {
        self.lock().unsubscribe(observer)
    }
}

impl fmt::Debug for SharedWindowCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedWindowCache")
            .field("holders", &Arc::strong_count(&self.inner))
            .finish()
    }
}

/// A cache that stores nothing: every lookup misses and adds are discarded.
#[derive(Debug, Default)]
pub struct NoCache {
    observers: ObserverList,
}

impl NoCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WindowCache for NoCache {
    fn window(&mut self, _position: u64) -> Result<Option<Arc<Window>>, CacheError> {
        Ok(None)
    }

    fn add(&mut self, _window: Arc<Window>) -> Result<(), CacheError> {
        Ok(())
    }

    fn read(&mut self, _window_pos: u64, _offset: u32, _dst: &mut [u8]) -> Result<usize, CacheError> {
        Ok(0)
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        Ok(())
    }

    fn subscribe(&mut self, observer: Arc<dyn WindowObserver>) {
        self.observers.subscribe(observer);
    }

    fn unsubscribe(&mut self, observer: &Arc<dyn WindowObserver>) -> bool {
        self.observers.unsubscribe(observer)
    }
}

/// An unbounded cache that keeps every window it is given.
#[derive(Debug, Default)]
pub struct AllWindowsCache {
    windows: AHashMap<u64, Arc<Window>>,
    observers: ObserverList,
}

impl AllWindowsCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of windows currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Returns true when no windows are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl WindowCache for AllWindowsCache {
    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, CacheError> {
        Ok(self.windows.get(&position).cloned())
    }

    fn add(&mut self, window: Arc<Window>) -> Result<(), CacheError> {
        self.windows.insert(window.position(), window);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        self.windows.clear();
        Ok(())
    }

    fn subscribe(&mut self, observer: Arc<dyn WindowObserver>) {
        self.observers.subscribe(observer);
    }

    fn unsubscribe(&mut self, observer: &Arc<dyn WindowObserver>) -> bool {
        self.observers.unsubscribe(observer)
    }
}
