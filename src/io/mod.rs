//! Windowed byte sources: windows, caches, readers, and stream adapters.
//!
//! # Module map
//! - `window`: fixed-size byte chunks with hard or softly-reclaimable arrays.
//! - `cache`: pluggable window stores (bounded, tiered, temp-file spill).
//! - `reader`: random-access readers over files, memory, and streams, plus
//!   `Read`/`Seek` adapter views.

pub mod cache;
pub mod reader;
pub mod window;

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

/// Reads up to `dst.len()` bytes from `file` starting at `offset`.
///
/// Loops over short reads; returns the number of bytes read, which is less
/// than `dst.len()` only at end of file.
pub(crate) fn read_file_at(file: &mut File, offset: u64, dst: &mut [u8]) -> io::Result<usize> {
    file.seek(SeekFrom::Start(offset))?;
    let mut filled = 0;
    while filled < dst.len() {
        let n = file.read(&mut dst[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Fills `dst` from `source`, looping over short reads.
///
/// Returns the number of bytes read; less than `dst.len()` only when the
/// source is exhausted.
pub(crate) fn read_stream_full<R: Read>(source: &mut R, dst: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < dst.len() {
        let n = source.read(&mut dst[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
