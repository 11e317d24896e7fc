//! Readers over files: seek/read backed and memory-map backed.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;

use crate::io::cache::{MostRecentlyUsedCache, SharedWindowCache, WindowCache};
use crate::io::read_file_at;
use crate::io::reader::{
    CacheHandle, ReadError, WindowReader, DEFAULT_CACHE_CAPACITY, DEFAULT_WINDOW_SIZE,
};
use crate::io::window::Window;

/// A reader that seeks and reads windows from an open file.
pub struct FileReader {
    file: Option<File>,
    length: u64,
    window_size: u32,
    cache: CacheHandle,
}

impl FileReader {
    /// Opens `path` with the default window size and a bounded
    /// most-recently-used cache.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        Self::open_with(
            path,
            DEFAULT_WINDOW_SIZE,
            Box::new(MostRecentlyUsedCache::new(DEFAULT_CACHE_CAPACITY)),
        )
    }

    /// Opens `path` with an explicit window size and an exclusively owned
    /// cache, cleared when the reader closes.
    ///
    /// # Panics
    /// Panics if `window_size` is zero.
    pub fn open_with(
        path: impl AsRef<Path>,
        window_size: u32,
        cache: Box<dyn WindowCache>,
    ) -> Result<Self, ReadError> {
        let file = File::open(path).map_err(ReadError::Io)?;
        Self::with_handle(file, window_size, cache.into())
    }

    /// Opens `path` attached to a cache shared with other readers.
    ///
    /// Closing this reader leaves the shared cache untouched.
    ///
    /// # Panics
    /// Panics if `window_size` is zero.
    pub fn open_shared(
        path: impl AsRef<Path>,
        window_size: u32,
        cache: SharedWindowCache,
    ) -> Result<Self, ReadError> {
        let file = File::open(path).map_err(ReadError::Io)?;
        Self::with_handle(file, window_size, cache.into())
    }

    /// Wraps an already open file with an exclusively owned cache.
    ///
    /// # Panics
    /// Panics if `window_size` is zero.
    pub fn from_file(
        file: File,
        window_size: u32,
        cache: Box<dyn WindowCache>,
    ) -> Result<Self, ReadError> {
        Self::with_handle(file, window_size, cache.into())
    }

    fn with_handle(file: File, window_size: u32, cache: CacheHandle) -> Result<Self, ReadError> {
        assert!(window_size > 0, "window size must be > 0");
        let length = file.metadata().map_err(ReadError::Io)?.len();
        Ok(Self {
            file: Some(file),
            length,
            window_size,
            cache,
        })
    }

    /// The cache attached to this reader.
    pub fn cache_mut(&mut self) -> &mut dyn WindowCache {
        self.cache.as_cache()
    }
}

impl WindowReader for FileReader {
    fn window_size(&self) -> u32 {
        self.window_size
    }

    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, ReadError> {
        let file = self.file.as_mut().ok_or(ReadError::Closed)?;
        if position >= self.length {
            return Ok(None);
        }
        let aligned = position - position % self.window_size as u64;
        if let Some(window) = self.cache.window(aligned)? {
            return Ok(Some(window));
        }
        let mut buf = vec![0u8; self.window_size as usize];
        let n = read_file_at(file, aligned, &mut buf)?;
        debug_assert!(n > 0, "aligned position below length reads at least one byte");
        let window = Arc::new(Window::hard(buf, aligned, n as u32));
        self.cache.add(Arc::clone(&window))?;
        Ok(Some(window))
    }

    fn length(&mut self) -> Result<u64, ReadError> {
        if self.file.is_none() {
            return Err(ReadError::Closed);
        }
        Ok(self.length)
    }

    fn close(&mut self) -> Result<(), ReadError> {
        self.file = None;
        self.cache.release()?;
        Ok(())
    }
}

impl std::fmt::Debug for FileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileReader")
            .field("length", &self.length)
            .field("window_size", &self.window_size)
            .field("closed", &self.file.is_none())
            .finish()
    }
}

/// A reader over a memory-mapped file.
///
/// Windows are copied out of the map on demand, so a window lookup never
/// issues a read syscall. The map is shared with windows only through the
/// copies; remapping or truncation concerns stay inside this reader.
pub struct MappedFileReader {
    map: Option<Arc<Mmap>>,
    window_size: u32,
    cache: CacheHandle,
}

impl MappedFileReader {
    /// Maps `path` with the default window size and a bounded
    /// most-recently-used cache.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        Self::open_with(
            path,
            DEFAULT_WINDOW_SIZE,
            Box::new(MostRecentlyUsedCache::new(DEFAULT_CACHE_CAPACITY)),
        )
    }

    /// Maps `path` with an explicit window size and an exclusively owned
    /// cache, cleared when the reader closes.
    ///
    /// # Panics
    /// Panics if `window_size` is zero.
    pub fn open_with(
        path: impl AsRef<Path>,
        window_size: u32,
        cache: Box<dyn WindowCache>,
    ) -> Result<Self, ReadError> {
        Self::with_handle(path, window_size, cache.into())
    }

    /// Maps `path` attached to a cache shared with other readers.
    ///
    /// Closing this reader leaves the shared cache untouched.
    ///
    /// # Panics
    /// Panics if `window_size` is zero.
    pub fn open_shared(
        path: impl AsRef<Path>,
        window_size: u32,
        cache: SharedWindowCache,
    ) -> Result<Self, ReadError> {
        Self::with_handle(path, window_size, cache.into())
    }

    fn with_handle(
        path: impl AsRef<Path>,
        window_size: u32,
        cache: CacheHandle,
    ) -> Result<Self, ReadError> {
        assert!(window_size > 0, "window size must be > 0");
        let file = File::open(path).map_err(ReadError::Io)?;
        // SAFETY: Read-only map of a file we opened read-only. Concurrent
        // truncation by another process is outside this reader's contract.
        let map = unsafe { Mmap::map(&file) }.map_err(ReadError::Io)?;
        Ok(Self {
            map: Some(Arc::new(map)),
            window_size,
            cache,
        })
    }
}

impl WindowReader for MappedFileReader {
    fn window_size(&self) -> u32 {
        self.window_size
    }

    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, ReadError> {
        let map = self.map.as_ref().ok_or(ReadError::Closed)?;
        let len = map.len() as u64;
        if position >= len {
            return Ok(None);
        }
        let aligned = position - position % self.window_size as u64;
        if let Some(window) = self.cache.window(aligned)? {
            return Ok(Some(window));
        }
        let valid = (len - aligned).min(self.window_size as u64) as usize;
        let mut buf = vec![0u8; self.window_size as usize];
        buf[..valid].copy_from_slice(&map[aligned as usize..aligned as usize + valid]);
        let window = Arc::new(Window::hard(buf, aligned, valid as u32));
        self.cache.add(Arc::clone(&window))?;
        Ok(Some(window))
    }

    fn length(&mut self) -> Result<u64, ReadError> {
        let map = self.map.as_ref().ok_or(ReadError::Closed)?;
        Ok(map.len() as u64)
    }

    fn close(&mut self) -> Result<(), ReadError> {
        self.map = None;
        self.cache.release()?;
        Ok(())
    }
}

impl std::fmt::Debug for MappedFileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedFileReader")
            .field("window_size", &self.window_size)
            .field("closed", &self.map.is_none())
            .finish()
    }
}
