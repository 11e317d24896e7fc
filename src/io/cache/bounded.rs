//! Bounded in-memory caches with recency- and frequency-based eviction.
//!
//! All three caches hold at most `capacity` windows. When an add would exceed
//! the bound, a victim is chosen by the eviction discipline, observers are
//! notified, and only then is the victim dropped from storage.
//!
//! # Invariants
//! - `order` contains exactly the keys of `windows`, least recently used at
//!   the front.
//! - Observer notification for a victim completes before its removal.

use std::sync::Arc;

use ahash::AHashMap;

use crate::io::cache::{CacheError, ObserverList, WindowCache, WindowObserver};
use crate::io::window::Window;

/// Which end of the usage order to evict from.
#[derive(Clone, Copy, Debug)]
enum EvictEnd {
    /// Evict the least recently used window (keeps the most recent ones).
    LeastRecent,
    /// Evict the most recently used window (keeps the least recent ones).
    MostRecent,
}

/// Shared core for the recency-ordered caches.
#[derive(Debug)]
struct UsageOrderCache {
    capacity: usize,
    windows: AHashMap<u64, Arc<Window>>,
    order: Vec<u64>,
    evict: EvictEnd,
    observers: ObserverList,
}

impl UsageOrderCache {
    fn new(capacity: usize, evict: EvictEnd) -> Self {
        assert!(capacity > 0, "cache capacity must be > 0");
        Self {
            capacity,
            windows: AHashMap::with_capacity(capacity),
            order: Vec::with_capacity(capacity),
            evict,
            observers: ObserverList::default(),
        }
    }

    fn touch(&mut self, position: u64) {
        if let Some(idx) = self.order.iter().position(|&p| p == position) {
            self.order.remove(idx);
            self.order.push(position);
        }
    }

    fn window(&mut self, position: u64) -> Option<Arc<Window>> {
        let hit = self.windows.get(&position).cloned();
        if hit.is_some() {
            self.touch(position);
        }
        hit
    }

    fn add(&mut self, window: Arc<Window>) -> Result<(), CacheError> {
        let position = window.position();
        if self.windows.insert(position, window).is_some() {
            self.touch(position);
            return Ok(());
        }
        self.order.push(position);

        let mut first_error = None;
        while self.windows.len() > self.capacity {
            let victim_idx = match self.evict {
                EvictEnd::LeastRecent => 0,
                // The newly added window sits at the back; the victim is the
                // most recently used of the rest.
                EvictEnd::MostRecent => self.order.len() - 2,
            };
            let victim_pos = self.order[victim_idx];
            let victim = self.windows[&victim_pos].clone();
            // Observers run while the victim is still present in storage.
            if let Err(err) = self.observers.notify(&victim) {
                first_error.get_or_insert(err);
            }
            self.order.remove(victim_idx);
            self.windows.remove(&victim_pos);
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn clear(&mut self) {
        self.windows.clear();
        self.order.clear();
    }
}

macro_rules! usage_cache_impl {
    ($name:ident) => {
        impl $name {
            /// Number of windows currently held.
            #[must_use]
            pub fn len(&self) -> usize {
                self.inner.windows.len()
            }

            /// Returns true when no windows are held.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.inner.windows.is_empty()
            }
        }

        impl WindowCache for $name {
            fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, CacheError> {
                Ok(self.inner.window(position))
            }

            fn add(&mut self, window: Arc<Window>) -> Result<(), CacheError> {
                self.inner.add(window)
            }

            fn clear(&mut self) -> Result<(), CacheError> {
                self.inner.clear();
                Ok(())
            }

            fn subscribe(&mut self, observer: Arc<dyn WindowObserver>) {
                self.inner.observers.subscribe(observer);
            }

            fn unsubscribe(&mut self, observer: &Arc<dyn WindowObserver>) -> bool {
                self.inner.observers.unsubscribe(observer)
            }
        }
    };
}

/// Keeps the `capacity` most recently used windows, evicting the least
/// recently used.
#[derive(Debug)]
pub struct MostRecentlyUsedCache {
    inner: UsageOrderCache,
}

impl MostRecentlyUsedCache {
    /// Creates a cache holding at most `capacity` windows.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: UsageOrderCache::new(capacity, EvictEnd::LeastRecent),
        }
    }
}

usage_cache_impl!(MostRecentlyUsedCache);

/// Keeps the `capacity` least recently used windows, evicting the most
/// recently used.
///
/// Useful in front of a spill tier when the access pattern revisits old
/// positions: recently touched windows are the ones pushed down.
#[derive(Debug)]
pub struct LeastRecentlyUsedCache {
    inner: UsageOrderCache,
}

impl LeastRecentlyUsedCache {
    /// Creates a cache holding at most `capacity` windows.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: UsageOrderCache::new(capacity, EvictEnd::MostRecent),
        }
    }
}

usage_cache_impl!(LeastRecentlyUsedCache);

/// Keeps the `capacity` most frequently used windows, evicting the least
/// frequently used.
///
/// Access counts survive for as long as the window stays cached; ties are
/// broken arbitrarily.
#[derive(Debug)]
pub struct LeastFrequentlyUsedCache {
    capacity: usize,
    windows: AHashMap<u64, (Arc<Window>, u64)>,
    observers: ObserverList,
}

impl LeastFrequentlyUsedCache {
    /// Creates a cache holding at most `capacity` windows.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be > 0");
        Self {
            capacity,
            windows: AHashMap::with_capacity(capacity),
            observers: ObserverList::default(),
        }
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

    fn least_used(&self, exclude: u64) -> Option<u64> {
        self.windows
            .iter()
            .filter(|(&pos, _)| pos != exclude)
            .min_by_key(|(_, (_, count))| *count)
            .map(|(&pos, _)| pos)
    }
}

impl WindowCache for LeastFrequentlyUsedCache {
    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, CacheError> {
        Ok(self.windows.get_mut(&position).map(|(window, count)| {
            *count += 1;
            Arc::clone(window)
        }))
    }

    fn add(&mut self, window: Arc<Window>) -> Result<(), CacheError> {
        let position = window.position();
        if let Some((slot, count)) = self.windows.get_mut(&position) {
            *slot = window;
            *count += 1;
            return Ok(());
        }
        self.windows.insert(position, (window, 1));

        let mut first_error = None;
        while self.windows.len() > self.capacity {
            let victim_pos = self
                .least_used(position)
                .expect("over-capacity cache has a victim");
            let victim = self.windows[&victim_pos].0.clone();
            if let Err(err) = self.observers.notify(&victim) {
                first_error.get_or_insert(err);
            }
            self.windows.remove(&victim_pos);
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
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
