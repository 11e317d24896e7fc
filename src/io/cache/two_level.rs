//! Two-level cache: a primary tier spilling evictions into a secondary tier.
//!
//! Adds go to the primary cache. When the primary evicts a window, the
//! two-level cache moves it into the secondary, so a window only ever leaves
//! the pair entirely when the secondary evicts it, and only then are this
//! cache's own observers notified. Lookups try the primary, then the
//! secondary; a secondary hit promotes the window back into the primary.
//!
//! The eviction flow is wired in the constructor: queue observers are
//! subscribed to both children in one initialization routine, and every
//! operation that can trigger evictions drains the queues afterwards.
//! Notifications run child -> parent only; the graph is acyclic.

use std::sync::{Arc, Mutex};

use crate::io::cache::{CacheError, ObserverList, WindowCache, WindowObserver};
use crate::io::window::Window;

/// Collects windows freed by a child cache for the parent to process.
///
/// The child notifies the queue before removing the window from its own
/// storage, so the window is always reachable from either the child or the
/// queue.
#[derive(Default)]
struct EvictionQueue {
    windows: Mutex<Vec<Arc<Window>>>,
}

impl EvictionQueue {
    fn drain(&self) -> Vec<Arc<Window>> {
        std::mem::take(&mut *self.windows.lock().expect("eviction queue poisoned"))
    }
}

impl WindowObserver for EvictionQueue {
    fn on_window_free(&self, window: &Arc<Window>) -> Result<(), CacheError> {
        self.windows
            .lock()
            .expect("eviction queue poisoned")
            .push(Arc::clone(window));
        Ok(())
    }
}

/// A cache composed of a primary tier over a secondary tier.
pub struct TwoLevelCache {
    primary: Box<dyn WindowCache>,
    secondary: Box<dyn WindowCache>,
    from_primary: Arc<EvictionQueue>,
    from_secondary: Arc<EvictionQueue>,
    observers: ObserverList,
}

impl TwoLevelCache {
    /// Builds a two-level cache over `primary` and `secondary`, wiring the
    /// eviction flow between them.
    #[must_use]
    pub fn new(
        mut primary: Box<dyn WindowCache>,
        mut secondary: Box<dyn WindowCache>,
    ) -> Self {
        let from_primary = Arc::new(EvictionQueue::default());
        let from_secondary = Arc::new(EvictionQueue::default());
        primary.subscribe(Arc::clone(&from_primary) as Arc<dyn WindowObserver>);
        secondary.subscribe(Arc::clone(&from_secondary) as Arc<dyn WindowObserver>);
        Self {
            primary,
            secondary,
            from_primary,
            from_secondary,
            observers: ObserverList::default(),
        }
    }

    /// The primary (top) tier.
    pub fn primary_mut(&mut self) -> &mut dyn WindowCache {
        self.primary.as_mut()
    }

    /// The secondary (bottom) tier.
    pub fn secondary_mut(&mut self) -> &mut dyn WindowCache {
        self.secondary.as_mut()
    }

    /// Moves primary evictions into the secondary and reports windows that
    /// left the secondary to this cache's observers.
    fn flow_evictions(&mut self) -> Result<(), CacheError> {
        let mut first_error = None;
        loop {
            let evicted = self.from_primary.drain();
            if evicted.is_empty() {
                break;
            }
            for window in evicted {
                // May evict from the secondary in turn, feeding
                // `from_secondary`.
                if let Err(err) = self.secondary.add(window) {
                    first_error.get_or_insert(err);
                }
            }
        }
        for window in self.from_secondary.drain() {
            if let Err(err) = self.observers.notify(&window) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl WindowCache for TwoLevelCache {
    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, CacheError> {
        if let Some(window) = self.primary.window(position)? {
            return Ok(Some(window));
        }
        match self.secondary.window(position)? {
            Some(window) => {
                // Promote back into the primary.
                self.primary.add(Arc::clone(&window))?;
                self.flow_evictions()?;
                Ok(Some(window))
            }
            None => Ok(None),
        }
    }

    fn add(&mut self, window: Arc<Window>) -> Result<(), CacheError> {
        self.primary.add(window)?;
        self.flow_evictions()
    }

    fn read(&mut self, window_pos: u64, offset: u32, dst: &mut [u8]) -> Result<usize, CacheError> {
        let n = self.primary.read(window_pos, offset, dst)?;
        if n > 0 {
            return Ok(n);
        }
        self.secondary.read(window_pos, offset, dst)
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        let primary = self.primary.clear();
        let secondary = self.secondary.clear();
        primary.and(secondary)
    }

    fn subscribe(&mut self, observer: Arc<dyn WindowObserver>) {
        self.observers.subscribe(observer);
    }

    fn unsubscribe(&mut self, observer: &Arc<dyn WindowObserver>) -> bool {
        self.observers.unsubscribe(observer)
    }
}

impl std::fmt::Debug for TwoLevelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwoLevelCache").finish_non_exhaustive()
    }
}
