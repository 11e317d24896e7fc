//! Reader over a forward-only byte stream.
//!
//! Windows are produced from the origin strictly in order and every produced
//! window is offered to the cache: the cache is the only way back to earlier
//! positions, since the origin cannot be rewound. A request ahead of the
//! read point advances the stream, producing and caching every intermediate
//! window on the way.
//!
//! The source length is unknown until the stream is exhausted. Asking for
//! [`length`](crate::io::reader::WindowReader::length) drains the remainder
//! of the stream (blocking), caching the windows it produces, and the result
//! is retained from then on.

use std::io::Read;
use std::sync::Arc;

use crate::io::cache::{
    MostRecentlyUsedCache, SharedWindowCache, TempFileStreamCache, TwoLevelCache, WindowCache,
};
use crate::io::read_stream_full;
use crate::io::reader::{
    CacheHandle, ReadError, WindowReader, DEFAULT_CACHE_CAPACITY, DEFAULT_WINDOW_SIZE,
};
use crate::io::window::Window;

/// A reader over a forward-only stream, caching windows as they are read.
pub struct StreamReader<R: Read> {
    source: Option<R>,
    cache: CacheHandle,
    window_size: u32,
    /// Next origin position to read; windows below this come from the cache.
    stream_pos: u64,
    /// Known once the origin is exhausted.
    length: Option<u64>,
}

impl<R: Read> StreamReader<R> {
    /// Wraps `source` with the default window size and a two-level cache:
    /// a bounded most-recently-used tier spilling into a temp-file stream
    /// cache, so every position read remains reachable.
    #[must_use]
    pub fn new(source: R) -> Self {
        let spill = TempFileStreamCache::new(DEFAULT_WINDOW_SIZE);
        let cache = TwoLevelCache::new(
            Box::new(MostRecentlyUsedCache::new(DEFAULT_CACHE_CAPACITY)),
            Box::new(spill),
        );
        Self::with_cache(source, DEFAULT_WINDOW_SIZE, Box::new(cache))
    }

    /// Wraps `source` with an explicit window size and an exclusively owned
    /// cache, cleared when the reader closes.
    ///
    /// Positions evicted from the cache and already consumed from the origin
    /// become unreachable; choose a cache that retains what will be
    /// revisited.
    ///
    /// # Panics
    /// Panics if `window_size` is zero.
    #[must_use]
    pub fn with_cache(source: R, window_size: u32, cache: Box<dyn WindowCache>) -> Self {
        Self::with_handle(source, window_size, cache.into())
    }

    /// Wraps `source` attached to a cache shared with other readers.
    ///
    /// Closing this reader leaves the shared cache untouched.
    ///
    /// # Panics
    /// Panics if `window_size` is zero.
    #[must_use]
    pub fn with_shared_cache(source: R, window_size: u32, cache: SharedWindowCache) -> Self {
        Self::with_handle(source, window_size, cache.into())
    }

    fn with_handle(source: R, window_size: u32, cache: CacheHandle) -> Self {
        assert!(window_size > 0, "window size must be > 0");
        Self {
            source: Some(source),
            cache,
            window_size,
            stream_pos: 0,
            length: None,
        }
    }

    /// Source length if the stream has been exhausted, without reading.
    #[must_use]
    pub fn known_length(&self) -> Option<u64> {
        self.length
    }

    /// Reads the next window from the origin, caches it, and advances.
    ///
    /// Returns `None` at end of stream (recording the final length).
    fn produce_next(&mut self) -> Result<Option<Arc<Window>>, ReadError> {
        if self.length.is_some() {
            return Ok(None);
        }
        let source = self.source.as_mut().ok_or(ReadError::Closed)?;
        let mut buf = vec![0u8; self.window_size as usize];
        let n = read_stream_full(source, &mut buf)?;
        if n == 0 {
            self.length = Some(self.stream_pos);
            return Ok(None);
        }
        let window = Arc::new(Window::hard(buf, self.stream_pos, n as u32));
        self.cache.add(Arc::clone(&window))?;
        self.stream_pos += n as u64;
        if n < self.window_size as usize {
            self.length = Some(self.stream_pos);
        }
        Ok(Some(window))
    }
}

impl<R: Read> WindowReader for StreamReader<R> {
    fn window_size(&self) -> u32 {
        self.window_size
    }

    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, ReadError> {
        if self.source.is_none() {
            return Err(ReadError::Closed);
        }
        if let Some(length) = self.length {
            if position >= length {
                return Ok(None);
            }
        }
        let aligned = position - position % self.window_size as u64;
        if let Some(window) = self.cache.window(aligned)? {
            return Ok(Some(window));
        }
        if aligned < self.stream_pos {
            // Already consumed from the origin and since evicted; only
            // forward re-reads are possible on a stream.
            return Ok(None);
        }
        loop {
            let Some(window) = self.produce_next()? else {
                return Ok(None);
            };
            if window.position() == aligned {
                return Ok(Some(window));
            }
        }
    }

    fn length(&mut self) -> Result<u64, ReadError> {
        if self.source.is_none() {
            return Err(ReadError::Closed);
        }
        while self.length.is_none() {
            self.produce_next()?;
        }
        Ok(self.length.expect("length recorded at end of stream"))
    }

    fn close(&mut self) -> Result<(), ReadError> {
        self.source = None;
        self.cache.release()?;
        Ok(())
    }
}

impl<R: Read> std::fmt::Debug for StreamReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamReader")
            .field("window_size", &self.window_size)
            .field("stream_pos", &self.stream_pos)
            .field("length", &self.length)
            .field("closed", &self.source.is_none())
            .finish()
    }
}
