//! Reader over bytes already in memory.

use std::sync::Arc;

use crate::io::reader::{ReadError, WindowReader};
use crate::io::window::Window;

/// A reader over an in-memory byte buffer.
///
/// The whole source fits in one hard window, so no cache is involved: the
/// window size equals the source length and the single window is built once
/// and shared on every lookup.
#[derive(Debug)]
pub struct MemoryReader {
    bytes: Arc<[u8]>,
    window: Option<Arc<Window>>,
    closed: bool,
}

impl MemoryReader {
    /// Creates a reader over `bytes`.
    ///
    /// # Panics
    /// Panics if the buffer is longer than `u32::MAX` bytes (use a file
    /// reader for larger sources).
    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        assert!(
            bytes.len() <= u32::MAX as usize,
            "memory source too large for a single window"
        );
        Self {
            bytes,
            window: None,
            closed: false,
        }
    }

    /// The source bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for MemoryReader {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for MemoryReader {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl WindowReader for MemoryReader {
    fn window_size(&self) -> u32 {
        (self.bytes.len() as u32).max(1)
    }

    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, ReadError> {
        if self.closed {
            return Err(ReadError::Closed);
        }
        if position >= self.bytes.len() as u64 {
            return Ok(None);
        }
        let window = self.window.get_or_insert_with(|| {
            Arc::new(Window::hard(
                Arc::clone(&self.bytes),
                0,
                self.bytes.len() as u32,
            ))
        });
        Ok(Some(Arc::clone(window)))
    }

    fn length(&mut self) -> Result<u64, ReadError> {
        if self.closed {
            return Err(ReadError::Closed);
        }
        Ok(self.bytes.len() as u64)
    }

    fn close(&mut self) -> Result<(), ReadError> {
        self.closed = true;
        self.window = None;
        Ok(())
    }
}
