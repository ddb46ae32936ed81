//! Per-unit serialization of read-modify-write cycles.
//!
//! Every mutation of an inventory unit and every loan admission against it
//! runs while holding that unit's lock, from the initial load until the write
//! has been persisted. Different units never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use stowage_core::InventoryId;

/// Entries above this count trigger a sweep of idle locks.
const PRUNE_THRESHOLD: usize = 1024;

/// Process-wide map from unit id to its async mutex.
#[derive(Debug, Default)]
pub struct UnitLocks {
    locks: Mutex<HashMap<InventoryId, Arc<AsyncMutex<()>>>>,
}

impl UnitLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Released when the guard drops.
    pub async fn lock(&self, id: InventoryId) -> OwnedMutexGuard<()> {
        let lock = {
            // The map only holds Arcs, so a poisoned guard is still consistent.
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() > PRUNE_THRESHOLD {
                // Only this map holds idle entries.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
