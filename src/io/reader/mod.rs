//! Random-access readers over windowed byte sources.
//!
//! A [`WindowReader`] exposes an absolute, byte-addressable view of its
//! origin as a lazy sequence of windows. Lookups consult the attached cache
//! first; on a miss the reader produces the window from the origin and
//! offers it to the cache. End of source is signalled consistently: `None`
//! window, a `NoByteAtPosition` error from [`byte`](WindowReader::byte), and
//! `0` from [`read_at`](WindowReader::read_at).
//!
//! # Concurrency
//! Readers are single-writer: all operations take `&mut self` and may block
//! on origin I/O. No operation is cancellable mid-I/O; close the reader to
//! interrupt long-running work, after which further calls fail with
//! [`ReadError::Closed`].

pub mod adapters;
pub mod file;
pub mod memory;
pub mod stream;

pub use adapters::{ReaderByteChannel, WindowInputStream};
pub use file::{FileReader, MappedFileReader};
pub use memory::MemoryReader;
pub use stream::StreamReader;

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::io::cache::{CacheError, SharedWindowCache, WindowCache, WindowObserver};
use crate::io::window::Window;

/// A reader's attachment to its cache: exclusively owned, or a handle
/// shared with other readers.
///
/// Releasing the attachment on close clears an owned cache with its reader;
/// a shared cache is left to its remaining holders.
pub(crate) enum CacheHandle {
    Owned(Box<dyn WindowCache>),
    Shared(SharedWindowCache),
}

impl CacheHandle {
    pub(crate) fn as_cache(&mut self) -> &mut dyn WindowCache {
        match self {
            Self::Owned(cache) => cache.as_mut(),
            Self::Shared(cache) => cache,
        }
    }

    /// Called on reader close.
    pub(crate) fn release(&mut self) -> Result<(), CacheError> {
        match self {
            Self::Owned(cache) => cache.clear(),
            Self::Shared(_) => Ok(()),
        }
    }
}

impl WindowCache for CacheHandle {
    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, CacheError> {
        self.as_cache().window(position)
    }

    fn add(&mut self, window: Arc<Window>) -> Result<(), CacheError> {
        self.as_cache().add(window)
    }

    fn read(&mut self, window_pos: u64, offset: u32, dst: &mut [u8]) -> Result<usize, CacheError> {
        self.as_cache().read(window_pos, offset, dst)
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        self.as_cache().clear()
    }

    fn subscribe(&mut self, observer: Arc<dyn WindowObserver>) {
        self.as_cache().subscribe(observer);
    }

    fn unsubscribe(&mut self, observer: &Arc<dyn WindowObserver>) -> bool {
        self.as_cache().unsubscribe(observer)
    }
}

impl From<Box<dyn WindowCache>> for CacheHandle {
    fn from(cache: Box<dyn WindowCache>) -> Self {
        Self::Owned(cache)
    }
}

impl From<SharedWindowCache> for CacheHandle {
    fn from(cache: SharedWindowCache) -> Self {
        Self::Shared(cache)
    }
}

/// Default window size for readers that do not specify one.
pub const DEFAULT_WINDOW_SIZE: u32 = 4096;

/// Default number of windows held by a reader's bundled cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 32;

/// Errors from window reader operations.
#[derive(Debug)]
#[non_exhaustive]
pub enum ReadError {
    /// Underlying origin I/O failed.
    Io(io::Error),
    /// The reader has been closed.
    Closed,
    /// The requested position is outside the source.
    NoByteAtPosition { position: u64 },
    /// The attached cache failed.
    Cache(CacheError),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "reader I/O error: {err}"),
            Self::Closed => write!(f, "reader is closed"),
            Self::NoByteAtPosition { position } => {
                write!(f, "no byte at position {position}")
            }
            Self::Cache(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Cache(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<CacheError> for ReadError {
    fn from(err: CacheError) -> Self {
        Self::Cache(err)
    }
}

impl From<ReadError> for io::Error {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Io(err) => err,
            other => io::Error::other(other),
        }
    }
}

/// A byte source exposed as a lazy sequence of fixed-size windows.
///
/// For any position `p` inside the source, [`window`](Self::window) yields
/// the window starting at `p - (p % window_size)` whose valid length covers
/// `p`, and [`byte`](Self::byte) equals that window's byte at
/// `p - window.position()`.
pub trait WindowReader {
    /// The fixed window size of this reader.
    fn window_size(&self) -> u32;

    /// Returns the window containing `position`, or `None` past the end of
    /// the source.
    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, ReadError>;

    /// Total length of the source in bytes.
    ///
    /// Exact for file- and memory-backed readers. Stream-backed readers
    /// drain the remainder of their origin (blocking) and cache the result.
    fn length(&mut self) -> Result<u64, ReadError>;

    /// Releases the origin handle and the reader's cache attachment.
    ///
    /// A cache owned exclusively by this reader is cleared with it; a cache
    /// attached through a [`SharedWindowCache`] handle is left untouched for
    /// the readers still holding it. Idempotent.
    fn close(&mut self) -> Result<(), ReadError>;

    /// Offset of `position` within its containing window.
    #[inline]
    fn window_offset(&self, position: u64) -> u32 {
        (position % self.window_size() as u64) as u32
    }

    /// Returns the byte at `position`, or `NoByteAtPosition` when the
    /// position is outside the source.
    fn byte(&mut self, position: u64) -> Result<u8, ReadError> {
        let window = self
            .window(position)?
            .ok_or(ReadError::NoByteAtPosition { position })?;
        let offset = (position - window.position()) as u32;
        if offset >= window.length() {
            return Err(ReadError::NoByteAtPosition { position });
        }
        Ok(window.byte(offset)?)
    }

    /// Copies bytes starting at `position` into `dst`, crossing window
    /// boundaries as needed. Returns the number of bytes copied; `0` at end
    /// of source.
    fn read_at(&mut self, position: u64, dst: &mut [u8]) -> Result<usize, ReadError> {
        let mut copied = 0;
        while copied < dst.len() {
            let pos = position + copied as u64;
            let Some(window) = self.window(pos)? else {
                break;
            };
            let offset = (pos - window.position()) as usize;
            if offset >= window.length() as usize {
                break;
            }
            let bytes = window.bytes().map_err(ReadError::Io)?;
            let n = (window.length() as usize - offset).min(dst.len() - copied);
            dst[copied..copied + n].copy_from_slice(&bytes[offset..offset + n]);
            copied += n;
        }
        Ok(copied)
    }
}

impl<R: WindowReader + ?Sized> WindowReader for Box<R> {
    fn window_size(&self) -> u32 {
        (**self).window_size()
    }

    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, ReadError> {
        (**self).window(position)
    }

    fn length(&mut self) -> Result<u64, ReadError> {
        (**self).length()
    }

    fn close(&mut self) -> Result<(), ReadError> {
        (**self).close()
    }

    fn window_offset(&self, position: u64) -> u32 {
        (**self).window_offset(position)
    }

    fn byte(&mut self, position: u64) -> Result<u8, ReadError> {
        (**self).byte(position)
    }

    fn read_at(&mut self, position: u64, dst: &mut [u8]) -> Result<usize, ReadError> {
        (**self).read_at(position, dst)
    }
}

impl<R: WindowReader + ?Sized> WindowReader for &mut R {
    fn window_size(&self) -> u32 {
        (**self).window_size()
    }

    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, ReadError> {
        (**self).window(position)
    }

    fn length(&mut self) -> Result<u64, ReadError> {
        (**self).length()
    }

    fn close(&mut self) -> Result<(), ReadError> {
        (**self).close()
    }

    fn window_offset(&self, position: u64) -> u32 {
        (**self).window_offset(position)
    }

    fn byte(&mut self, position: u64) -> Result<u8, ReadError> {
        (**self).byte(position)
    }

    fn read_at(&mut self, position: u64, dst: &mut [u8]) -> Result<usize, ReadError> {
        (**self).read_at(position, dst)
    }
}
