//! Binary pattern matching and search over arbitrarily large byte sources.
//!
//! The crate is organized around two subsystems:
//! - Windowed I/O: readers divide a byte source (file, memory, stream) into
//!   fixed-size [`Window`](io::window::Window)s served through a pluggable,
//!   composable [`WindowCache`](io::cache::WindowCache) layer with temp-file
//!   spill and softly-reclaimable window arrays.
//! - Matching and search: a closed algebra of single-byte matchers, sequence
//!   matchers that view shared backing arrays forwards or in reverse, and
//!   forward/backward sequence searchers (Shift-Or, Horspool, hashed q-gram)
//!   that run uniformly over byte slices and windowed readers.
//!
//! High-level flow (searching a file):
//! 1) Open a [`FileReader`](io::reader::FileReader); windows are produced on
//!    demand and offered to its cache.
//! 2) Build a sequence matcher from bytes or byte matchers.
//! 3) Drive a [`Searcher`](search::Searcher) over the reader; the search loop
//!    runs the array algorithm inside each window and verifies candidates that
//!    straddle a window boundary through the reader.
//!
//! Matchers and prepared searchers are immutable and may be shared across
//! threads. Readers and caches are single-writer: all their operations take
//! `&mut self`, and an instance must not be driven from multiple threads
//! without external synchronization.

pub mod io;
pub mod matcher;
pub mod search;

pub use crate::io::cache::{CacheError, WindowCache, WindowObserver};
pub use crate::io::reader::{ReadError, WindowReader};
pub use crate::io::window::Window;
pub use crate::matcher::bytes::ByteMatcher;
pub use crate::matcher::sequence::{ByteSequence, MatcherSequence, SequenceMatcher};
pub use crate::search::Searcher;
