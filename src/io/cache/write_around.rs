//! Write-around cache: adds bypass the memory tier.
//!
//! Additions are routed directly to the persistent cache; the memory tier is
//! populated only on a read that misses memory and hits the persistent tier.
//! This keeps a sequential producer (a stream reader spilling every window)
//! from churning the memory tier with windows that are never revisited.

use std::sync::Arc;

use crate::io::cache::{CacheError, ObserverList, WindowCache, WindowObserver};
use crate::io::window::Window;

/// A memory tier in front of a persistent tier, written around on add.
pub struct WriteAroundCache {
    memory: Box<dyn WindowCache>,
    persistent: Box<dyn WindowCache>,
    observers: ObserverList,
}

impl WriteAroundCache {
    #[must_use]
    pub fn new(memory: Box<dyn WindowCache>, persistent: Box<dyn WindowCache>) -> Self {
        Self {
            memory,
            persistent,
            observers: ObserverList::default(),
        }
    }

    /// The memory (read) tier.
    pub fn memory_mut(&mut self) -> &mut dyn WindowCache {
        self.memory.as_mut()
    }

    /// The persistent (write) tier.
    pub fn persistent_mut(&mut self) -> &mut dyn WindowCache {
        self.persistent.as_mut()
    }
}

impl WindowCache for WriteAroundCache {
    fn window(&mut self, position: u64) -> Result<Option<Arc<Window>>, CacheError> {
        if let Some(window) = self.memory.window(position)? {
            return Ok(Some(window));
        }
        match self.persistent.window(position)? {
            Some(window) => {
                // Pull the window up into the memory tier for later reads.
                self.memory.add(Arc::clone(&window))?;
                Ok(Some(window))
            }
            None => Ok(None),
        }
    }

    fn add(&mut self, window: Arc<Window>) -> Result<(), CacheError> {
        self.persistent.add(window)
    }

    fn read(&mut self, window_pos: u64, offset: u32, dst: &mut [u8]) -> Result<usize, CacheError> {
        let n = self.memory.read(window_pos, offset, dst)?;
        if n > 0 {
            return Ok(n);
        }
        self.persistent.read(window_pos, offset, dst)
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        // The persistent tier is cleared even when clearing memory fails;
        // the memory error is the one surfaced.
        let memory = self.memory.clear();
        let persistent = self.persistent.clear();
        memory.and(persistent)
    }

    fn subscribe(&mut self, observer: Arc<dyn WindowObserver>) {
        self.observers.subscribe(observer);
    }

    fn unsubscribe(&mut self, observer: &Arc<dyn WindowObserver>) -> bool {
        self.observers.unsubscribe(observer)
    }
}

impl std::fmt::Debug for WriteAroundCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteAroundCache").finish_non_exhaustive()
    }
}
