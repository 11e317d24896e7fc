//! Standard-library I/O views over a window reader.
//!
//! [`ReaderByteChannel`] is a read-only `Read + Seek` view; there is no
//! write surface at all, so the "not writable" contract holds by
//! construction. [`WindowInputStream`] is a forward `Read` view with
//! `skip`/`available` and optional mark/reset.
//!
//! Neither adapter is thread-safe, and closing an adapter does not close the
//! underlying reader unless explicitly configured
//! ([`WindowInputStream::with_options`]).

use std::io::{self, Read, Seek, SeekFrom};

use crate::io::reader::WindowReader;

fn closed_error(what: &str) -> io::Error {
    io::Error::other(format!("{what} is closed"))
}

/// A seekable, read-only channel view over a window reader.
///
/// Multiple channels may be created over one reader in sequence (the channel
/// borrows or owns the reader depending on `R`); positioning past the end is
/// allowed and reads there return 0.
#[derive(Debug)]
pub struct ReaderByteChannel<R: WindowReader> {
    reader: R,
    position: u64,
    closed: bool,
}

impl<R: WindowReader> ReaderByteChannel<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            position: 0,
            closed: false,
        }
    }

    /// Current read position.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Source size in bytes.
    pub fn size(&mut self) -> io::Result<u64> {
        self.ensure_open()?;
        Ok(self.reader.length()?)
    }

    /// Returns true until [`close`](Self::close) is called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.closed
    }

    /// Marks the channel closed. The underlying reader stays open.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Releases the adapter, returning the reader.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed {
            return Err(closed_error("channel"));
        }
        Ok(())
    }
}

impl<R: WindowReader> Read for ReaderByteChannel<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.ensure_open()?;
        let n = self.reader.read_at(self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: WindowReader> Seek for ReaderByteChannel<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.ensure_open()?;
        let new_position = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => {
                let length = self.reader.length()?;
                length.checked_add_signed(delta)
            }
        };
        match new_position {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )),
        }
    }
}

/// A forward input-stream view over a window reader.
pub struct WindowInputStream<R: WindowReader> {
    reader: R,
    position: u64,
    mark: Option<u64>,
    mark_supported: bool,
    close_reader_on_close: bool,
    closed: bool,
}

impl<R: WindowReader> WindowInputStream<R> {
    /// Creates a stream view with mark/reset enabled that leaves the reader
    /// open when the stream is closed.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, true, false)
    }

    /// Creates a stream view choosing mark support and whether closing the
    /// stream also closes the reader.
    #[must_use]
    pub fn with_options(reader: R, mark_supported: bool, close_reader_on_close: bool) -> Self {
        Self {
            reader,
            position: 0,
            mark: None,
            mark_supported,
            close_reader_on_close,
            closed: false,
        }
    }

    /// Whether [`mark`](Self::mark) and [`reset`](Self::reset) work.
    #[must_use]
    pub fn mark_supported(&self) -> bool {
        self.mark_supported
    }

    /// Records the current position for a later [`reset`](Self::reset).
    ///
    /// The conventional read-ahead limit is ignored: the reader retains
    /// windows through its cache, so any marked position stays reachable.
    /// No-op when mark support is disabled.
    pub fn mark(&mut self, _read_limit: usize) {
        if self.mark_supported && !self.closed {
            self.mark = Some(self.position);
        }
    }

    /// Returns to the position recorded by [`mark`](Self::mark).
    pub fn reset(&mut self) -> io::Result<()> {
        self.ensure_open()?;
        if !self.mark_supported {
            return Err(io::Error::other("mark/reset not supported"));
        }
        match self.mark {
            Some(position) => {
                self.position = position;
                Ok(())
            }
            None => Err(io::Error::other("reset called without a mark")),
        }
    }

    /// Skips up to `n` bytes, returning how many were skipped.
    ///
    /// Skipping past the end skips only the remaining bytes.
    pub fn skip(&mut self, n: u64) -> io::Result<u64> {
        self.ensure_open()?;
        let length = self.reader.length()?;
        let skipped = n.min(length.saturating_sub(self.position));
        self.position += skipped;
        Ok(skipped)
    }

    /// Bytes remaining before end of source.
    pub fn available(&mut self) -> io::Result<usize> {
        self.ensure_open()?;
        let length = self.reader.length()?;
        Ok(usize::try_from(length.saturating_sub(self.position)).unwrap_or(usize::MAX))
    }

    /// Marks the stream closed, closing the reader too when configured.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.close_reader_on_close {
            self.reader.close()?;
        }
        Ok(())
    }

    /// Releases the adapter, returning the reader.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed {
            return Err(closed_error("stream"));
        }
        Ok(())
    }
}

impl<R: WindowReader> Read for WindowInputStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.ensure_open()?;
        let n = self.reader.read_at(self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: WindowReader> std::fmt::Debug for WindowInputStream<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowInputStream")
            .field("position", &self.position)
            .field("mark", &self.mark)
            .field("mark_supported", &self.mark_supported)
            .field("closed", &self.closed)
            .finish()
    }
}
