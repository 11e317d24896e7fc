//! Forward and backward sequence search over byte slices and readers.
//!
//! Every algorithm implements [`Searcher`]. Array searches work on byte
//! slices with inclusive `from`/`to` bounds on the *match start position*;
//! reader searches run the same array algorithm window by window and verify
//! candidates that straddle a window boundary through the sequence's
//! reader-based matching, which crosses windows transparently.
//!
//! Search index tables are built lazily behind `OnceLock` on first use (or
//! eagerly via `prepare_forwards`/`prepare_backwards`); a built table is
//! immutable and safely shared across threads. Forward and backward tables
//! are independent.
//!
//! # Module map
//! - `shift_or`: bit-parallel Shift-Or; the universal fallback.
//! - `horspool`: Boyer-Moore-Horspool with matcher-class shift tables.
//! - `qgram`: hashed 2-gram shift search with transparent fallback.

pub mod horspool;
pub mod qgram;
pub mod shift_or;

pub use horspool::HorspoolSearcher;
pub use qgram::QgramHashSearcher;
pub use shift_or::ShiftOrSearcher;

use crate::io::reader::{ReadError, WindowReader};
use crate::matcher::sequence::SequenceMatcher;

/// Forward and backward search for a fixed sequence.
///
/// `from`/`to` bound the match start position inclusively. Forward searches
/// return the first (lowest) match start in `[from, to]`; backward searches
/// scan from `from` down to `to` and return the first match found (the
/// highest). A result is never outside the bounds, and positions where the
/// pattern would overrun the source are never reported.
pub trait Searcher {
    /// First match start in `[from, to]`, scanning forward. `from > to`
    /// finds nothing without reading.
    fn search_forwards(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize>;

    /// Highest match start in `[to, from]`, scanning backward from `from`.
    /// `from < to` finds nothing without reading.
    fn search_backwards(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize>;

    /// Forward search over a reader, crossing window boundaries.
    fn search_reader_forwards(
        &self,
        reader: &mut dyn WindowReader,
        from: u64,
        to: u64,
    ) -> Result<Option<u64>, ReadError>;

    /// Backward search over a reader, crossing window boundaries.
    fn search_reader_backwards(
        &self,
        reader: &mut dyn WindowReader,
        from: u64,
        to: u64,
    ) -> Result<Option<u64>, ReadError>;

    /// Builds the forward search tables now instead of on first search.
    fn prepare_forwards(&self) {}

    /// Builds the backward search tables now instead of on first search.
    fn prepare_backwards(&self) {}
}

/// Clips forward array-search bounds to positions where the whole pattern
/// fits. Returns `None` when nothing can match.
pub(crate) fn clip_forward(
    source_len: usize,
    pattern_len: usize,
    from: usize,
    to: usize,
) -> Option<(usize, usize)> {
    if pattern_len == 0 || pattern_len > source_len {
        return None;
    }
    let last = source_len - pattern_len;
    let to = to.min(last);
    if from > to {
        return None;
    }
    Some((from, to))
}

/// Clips backward array-search bounds, returning `(high, low)` match start
/// positions. Returns `None` when nothing can match.
pub(crate) fn clip_backward(
    source_len: usize,
    pattern_len: usize,
    from: usize,
    to: usize,
) -> Option<(usize, usize)> {
    if pattern_len == 0 || pattern_len > source_len || from < to {
        return None;
    }
    let high = from.min(source_len - pattern_len);
    if high < to {
        return None;
    }
    Some((high, to))
}

/// Window-by-window forward search driver.
///
/// Runs `search_array` over each window clipped so matches lie fully inside
/// it, then tests the boundary-straddling tail positions through
/// `matches_reader`. Terminates with `None` when the reader runs out of
/// windows.
pub(crate) fn reader_search_forwards<S: SequenceMatcher + ?Sized>(
    sequence: &S,
    reader: &mut dyn WindowReader,
    from: u64,
    to: u64,
    mut search_array: impl FnMut(&[u8], usize, usize) -> Option<usize>,
) -> Result<Option<u64>, ReadError> {
    if from > to {
        return Ok(None);
    }
    let pattern_len = sequence.len() as u64;
    let mut pos = from;
    loop {
        let Some(window) = reader.window(pos)? else {
            return Ok(None);
        };
        let window_pos = window.position();
        let window_len = window.length() as u64;
        let window_end = window_pos + window_len;

        // Match starts that fit entirely inside this window.
        if window_len >= pattern_len {
            let last_inside = window_pos + window_len - pattern_len;
            let high = last_inside.min(to);
            if pos <= high {
                let bytes = window.bytes().map_err(ReadError::Io)?;
                let from_idx = (pos - window_pos) as usize;
                let to_idx = (high - window_pos) as usize;
                if let Some(found) =
                    search_array(&bytes[..window_len as usize], from_idx, to_idx)
                {
                    return Ok(Some(window_pos + found as u64));
                }
            }
        }

        // Starts whose match would cross into the next window.
        let straddle_low = if window_len >= pattern_len {
            window_pos + window_len - pattern_len + 1
        } else {
            window_pos
        };
        let mut candidate = straddle_low.max(pos);
        while candidate < window_end && candidate <= to {
            if sequence.matches_reader(reader, candidate)? {
                return Ok(Some(candidate));
            }
            candidate += 1;
        }

        if window_end > to {
            return Ok(None);
        }
        pos = window_end;
    }
}

/// Window-by-window backward search driver.
///
/// Visits windows from the one containing `from` down to the one containing
/// `to`, testing straddling positions first (they are the highest in each
/// window), then running `search_array` over the fully-inside range with
/// `(high, low)` bounds.
pub(crate) fn reader_search_backwards<S: SequenceMatcher + ?Sized>(
    sequence: &S,
    reader: &mut dyn WindowReader,
    from: u64,
    to: u64,
    mut search_array: impl FnMut(&[u8], usize, usize) -> Option<usize>,
) -> Result<Option<u64>, ReadError> {
    if from < to {
        return Ok(None);
    }
    let pattern_len = sequence.len() as u64;
    let source_len = reader.length()?;
    if source_len < pattern_len {
        return Ok(None);
    }
    let mut pos = from.min(source_len - pattern_len);
    if pos < to {
        return Ok(None);
    }
    loop {
        let Some(window) = reader.window(pos)? else {
            return Ok(None);
        };
        let window_pos = window.position();
        let window_len = window.length() as u64;

        // Straddling starts first: they are above every fully-inside start.
        let straddle_low = if window_len >= pattern_len {
            window_pos + window_len - pattern_len + 1
        } else {
            window_pos
        };
        if pos >= straddle_low {
            let low = straddle_low.max(to);
            let mut candidate = pos;
            loop {
                if sequence.matches_reader(reader, candidate)? {
                    return Ok(Some(candidate));
                }
                if candidate == low {
                    break;
                }
                candidate -= 1;
            }
        }

        // Starts that fit entirely inside this window.
        if window_len >= pattern_len {
            let high = pos.min(window_pos + window_len - pattern_len);
            let low = to.max(window_pos);
            if high >= low {
                let bytes = window.bytes().map_err(ReadError::Io)?;
                let high_idx = (high - window_pos) as usize;
                let low_idx = (low - window_pos) as usize;
                if let Some(found) =
                    search_array(&bytes[..window_len as usize], high_idx, low_idx)
                {
                    return Ok(Some(window_pos + found as u64));
                }
            }
        }

        if window_pos == 0 || window_pos <= to {
            return Ok(None);
        }
        pos = window_pos - 1;
    }
}
