//! In-memory nonce store
//!
//! Suitable for a single process. Receivers behind a load balancer need a
//! shared [`NonceStore`] backend instead.

use std::{
    collections::{HashMap, VecDeque},
    sync::{LazyLock, Mutex, MutexGuard, PoisonError},
};

use super::{NONCE_SIZE, NonceRecord, NonceStore};

/// Process-wide store used when the caller does not inject one
static DEFAULT_NONCE_STORE: LazyLock<MemoryNonceStore> = LazyLock::new(MemoryNonceStore::new);

/// The process-wide in-memory nonce store, created on first use.
pub fn default_nonce_store() -> &'static MemoryNonceStore {
    &DEFAULT_NONCE_STORE
}

/// In-memory nonce store
///
/// A `VecDeque` keeps insertion order for expiry and a counted index makes
/// presence checks O(1). Both live under one mutex, so
/// [`enqueue_if_absent`](NonceStore::enqueue_if_absent) and
/// [`purge_expired`](NonceStore::purge_expired) are atomic: of two concurrent
/// verifications of the same message exactly one is accepted.
///
/// A poisoned mutex is recovered rather than propagated; every operation
/// leaves the queue and index consistent before it can panic.
#[derive(Debug, Default)]
pub struct MemoryNonceStore {
    inner: Mutex<MemoryNonceStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryNonceStoreInner {
    /// Records in insertion order
    queue: VecDeque<NonceRecord>,

    /// Nonce -> number of queued records carrying it
    index: HashMap<[u8; NONCE_SIZE], usize>,
}

impl MemoryNonceStoreInner {
    fn push(&mut self, record: NonceRecord) {
        *self.index.entry(record.nonce).or_insert(0) += 1;
        self.queue.push_back(record);
    }

    fn pop(&mut self) -> Option<NonceRecord> {
        let record = self.queue.pop_front()?;
        if let Some(count) = self.index.get_mut(&record.nonce) {
            *count -= 1;
            if *count == 0 {
                self.index.remove(&record.nonce);
            }
        }
        Some(record)
    }

    /// Every queued record is counted in the index exactly once.
    #[cfg(test)]
    fn assert_consistent(&self) {
        assert_eq!(self.index.values().sum::<usize>(), self.queue.len());
        for record in &self.queue {
            assert!(self.index.contains_key(&record.nonce));
        }
    }
}

impl MemoryNonceStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every record.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.queue.clear();
        inner.index.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MemoryNonceStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NonceStore for MemoryNonceStore {
    fn enqueue(&self, record: NonceRecord) {
        self.lock().push(record);
    }

    fn try_dequeue(&self) -> Option<NonceRecord> {
        self.lock().pop()
    }

    fn try_peek(&self) -> Option<NonceRecord> {
        self.lock().queue.front().copied()
    }

    fn len(&self) -> usize {
        self.lock().queue.len()
    }

    fn contains(&self, nonce: &[u8; NONCE_SIZE]) -> bool {
        self.lock().index.contains_key(nonce)
    }

    fn enqueue_if_absent(&self, record: NonceRecord) -> bool {
        let mut inner = self.lock();
        if inner.index.contains_key(&record.nonce) {
            return false;
        }
        inner.push(record);
        true
    }

    fn purge_expired(&self, is_expired: &dyn Fn(&NonceRecord) -> bool) -> usize {
        let mut inner = self.lock();
        let mut purged = 0;
        while inner.queue.front().is_some_and(is_expired) {
            inner.pop();
            purged += 1;
        }
        purged
    }
}
