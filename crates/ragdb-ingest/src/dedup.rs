//! Per-content-hash serialization of concurrent ingests.
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Hands out one async lock per content hash. Ingests of identical bytes
/// queue behind each other; different hashes never contend.
#[derive(Debug, Default, Clone)]
pub struct Deduplicator {
    slots: Slots,
}

/// Held for the duration of one ingest. Dropping the last guard for a hash
/// frees its slot.
#[derive(Debug)]
pub struct HashGuard {
    hash: String,
    slot: Arc<AsyncMutex<()>>,
    slots: Slots,
    _guard: OwnedMutexGuard<()>,
}

impl Deduplicator {
    pub fn new() -> Self { Self::default() }

    pub async fn acquire(&self, hash: &str) -> HashGuard {
        let slot = Arc::clone(self.slots.lock().entry(hash.to_string()).or_default());
        let guard = Arc::clone(&slot).lock_owned().await;
        HashGuard { hash: hash.to_string(), slot, slots: Arc::clone(&self.slots), _guard: guard }
    }

    /// Hashes with a live or queued ingest.
    pub fn in_flight(&self) -> usize { self.slots.lock().len() }
}

impl Drop for HashGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        // The map, `slot` and the owned guard; anything more is a waiter.
        if Arc::strong_count(&self.slot) <= 3 {
            slots.remove(&self.hash);
        }
    }
}
