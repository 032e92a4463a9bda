//! Per-container serialization of publish and teardown
//!
//! Publish and teardown of the same container never overlap; different
//! containers still proceed in parallel. A lock entry is dropped once no
//! caller holds or waits on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct ContainerLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ContainerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` while holding the lock of `container_id`
    pub fn with<T>(&self, container_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = Arc::clone(
            self.map()
                .entry(container_id.to_string())
                .or_default(),
        );

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        drop(lock);
        self.prune(container_id);
        result
    }

    // Clones are only handed out under the map lock, so a count of one
    // means nobody else holds or waits on this entry.
    fn prune(&self, container_id: &str) {
        let mut map = self.map();
        if map
            .get(container_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(container_id);
        }
    }

    /// Number of containers with a live lock entry
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }
}
