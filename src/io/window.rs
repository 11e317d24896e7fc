//! Fixed-size byte windows over an absolute source position.
//!
//! A [`Window`] is a chunk of bytes tagged with the absolute position of its
//! first byte and a valid length. Window positions produced by one reader are
//! aligned to that reader's window size; the backing buffer is always a full
//! window long, but only the first `length` bytes are valid (a window is
//! shorter than the window size only at end of source).
//!
//! Windows come in two flavours behind the same type:
//! - **hard** windows own their bytes for as long as the window is alive;
//! - **soft** windows may have their bytes reclaimed under memory pressure
//!   and restored on demand through a [`WindowRecovery`] provider.
//!
//! The distinction is invisible to callers: [`Window::bytes`] and
//! [`Window::byte`] re-materialize reclaimed arrays transparently. A recovery
//! provider must return the identical byte sequence for the window's lifetime;
//! a provider whose backing store is gone reports the failure as an I/O error.
//!
//! # Concurrency
//! Windows are shared between caches and readers via `Arc<Window>` and are
//! safe to read from multiple threads. Reclaim and recovery race benignly: the
//! soft cell is guarded by a mutex, and recovery is content-stable.

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};

/// Restores the byte array of a soft window whose bytes were reclaimed.
///
/// Implementations must return exactly the bytes the window was created with.
/// The returned buffer must be the full window size long (the valid prefix is
/// given by the window's `length`).
pub trait WindowRecovery: Send + Sync {
    /// Re-reads the bytes for the window starting at `position`.
    fn recover_window_bytes(&self, position: u64) -> io::Result<Arc<[u8]>>;
}

enum WindowBytes {
    Hard(Arc<[u8]>),
    Soft {
        cell: Mutex<Option<Arc<[u8]>>>,
        recovery: Arc<dyn WindowRecovery>,
    },
}

/// A fixed-size chunk of bytes at an absolute source position.
pub struct Window {
    position: u64,
    length: u32,
    bytes: WindowBytes,
}

impl Window {
    /// Creates a window that owns its bytes for its lifetime.
    ///
    /// # Panics
    /// Panics if `length` is zero or exceeds the buffer length.
    #[must_use]
    pub fn hard(bytes: impl Into<Arc<[u8]>>, position: u64, length: u32) -> Self {
        let bytes = bytes.into();
        assert!(length > 0, "window length must be > 0");
        assert!(
            length as usize <= bytes.len(),
            "window length {} exceeds buffer length {}",
            length,
            bytes.len()
        );
        Self {
            position,
            length,
            bytes: WindowBytes::Hard(bytes),
        }
    }

    /// Creates a window whose bytes can be reclaimed and later restored
    /// through `recovery`.
    ///
    /// # Panics
    /// Panics if `length` is zero or exceeds the buffer length.
    #[must_use]
    pub fn soft(
        bytes: impl Into<Arc<[u8]>>,
        position: u64,
        length: u32,
        recovery: Arc<dyn WindowRecovery>,
    ) -> Self {
        let bytes = bytes.into();
        assert!(length > 0, "window length must be > 0");
        assert!(
            length as usize <= bytes.len(),
            "window length {} exceeds buffer length {}",
            length,
            bytes.len()
        );
        Self {
            position,
            length,
            bytes: WindowBytes::Soft {
                cell: Mutex::new(Some(bytes)),
                recovery,
            },
        }
    }

    /// Absolute position of the first byte of this window in its source.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Number of valid bytes in this window. Always greater than zero.
    #[inline]
    #[must_use]
    pub const fn length(&self) -> u32 {
        self.length
    }

    /// Absolute position one past the last valid byte.
    #[inline]
    #[must_use]
    pub const fn end_position(&self) -> u64 {
        self.position + self.length as u64
    }

    /// Returns the backing byte array, restoring it first if it was
    /// reclaimed.
    ///
    /// Only the first [`length`](Self::length) bytes are valid source data.
    pub fn bytes(&self) -> io::Result<Arc<[u8]>> {
        match &self.bytes {
            WindowBytes::Hard(bytes) => Ok(Arc::clone(bytes)),
            WindowBytes::Soft { cell, recovery } => {
                let mut guard = cell.lock().expect("window cell poisoned");
                if let Some(bytes) = guard.as_ref() {
                    return Ok(Arc::clone(bytes));
                }
                let restored = recovery.recover_window_bytes(self.position)?;
                *guard = Some(Arc::clone(&restored));
                Ok(restored)
            }
        }
    }

    /// Returns the byte at `offset` within this window.
    ///
    /// # Panics
    /// Panics if `offset` is not less than [`length`](Self::length).
    pub fn byte(&self, offset: u32) -> io::Result<u8> {
        assert!(
            offset < self.length,
            "window offset {} out of bounds (length {})",
            offset,
            self.length
        );
        Ok(self.bytes()?[offset as usize])
    }

    /// Releases the bytes of a soft window. No-op on hard windows.
    ///
    /// A subsequent [`bytes`](Self::bytes) or [`byte`](Self::byte) restores
    /// the array through the recovery provider.
    pub fn reclaim(&self) {
        if let WindowBytes::Soft { cell, .. } = &self.bytes {
            *cell.lock().expect("window cell poisoned") = None;
        }
    }

    /// Returns true if this window restores reclaimed bytes on demand.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        matches!(self.bytes, WindowBytes::Soft { .. })
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("position", &self.position)
            .field("length", &self.length)
            .field("soft", &self.is_soft())
            .finish()
    }
}
