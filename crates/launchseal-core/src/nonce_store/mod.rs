//! Used-nonce storage for replay protection
//!
//! A verifier remembers every nonce it has accepted until the nonce's
//! timestamp falls out of the freshness window; after that the timestamp check
//! alone rejects the message. The store is a FIFO queue ordered by insertion,
//! which is close to timestamp order, so expiry only ever inspects the front.
//!
//! Deployments with several verifiers behind a load balancer share one store
//! by implementing [`NonceStore`] over their shared backend.

mod memory;

use std::{sync::Arc, time::Duration};

pub use memory::{MemoryNonceStore, default_nonce_store};

use crate::timestamp::Timestamp;

/// Size of the per-signature nonce
pub const NONCE_SIZE: usize = 32;

/// A nonce accepted by a verifier, with the timestamp it was signed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NonceRecord {
    /// Random nonce from the signature
    pub nonce: [u8; NONCE_SIZE],
    /// Signature timestamp
    pub timestamp: Timestamp,
}

impl NonceRecord {
    /// Returns true once the record is older than `max_age` at `now`.
    pub fn is_expired(&self, now: Timestamp, max_age: Duration) -> bool {
        self.timestamp.age_at(now).is_some_and(|age| age > max_age)
    }
}

/// FIFO store of used nonces.
///
/// Must be `Send + Sync`: one store is shared by every verification in the
/// process (or, for custom implementations, across processes).
///
/// The provided methods are correct but not atomic. Implementations that can
/// be called concurrently SHOULD override [`enqueue_if_absent`] and
/// [`purge_expired`] so that two verifications of the same message cannot
/// both succeed.
///
/// [`enqueue_if_absent`]: NonceStore::enqueue_if_absent
/// [`purge_expired`]: NonceStore::purge_expired
pub trait NonceStore: Send + Sync {
    /// Append a record at the back of the queue.
    fn enqueue(&self, record: NonceRecord);

    /// Remove and return the front record.
    fn try_dequeue(&self) -> Option<NonceRecord>;

    /// Return the front record without removing it.
    fn try_peek(&self) -> Option<NonceRecord>;

    /// Number of stored records.
    fn len(&self) -> usize;

    /// Returns true if any stored record carries `nonce`.
    fn contains(&self, nonce: &[u8; NONCE_SIZE]) -> bool;

    /// Returns true if the store holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert `record` unless its nonce is already present.
    ///
    /// Returns `false` (and stores nothing) if the nonce was present.
    fn enqueue_if_absent(&self, record: NonceRecord) -> bool {
        if self.contains(&record.nonce) {
            return false;
        }
        self.enqueue(record);
        true
    }

    /// Dequeue records from the front while `is_expired` holds.
    ///
    /// Stops at the first unexpired record. Returns how many were removed.
    fn purge_expired(&self, is_expired: &dyn Fn(&NonceRecord) -> bool) -> usize {
        let mut purged = 0;
        while let Some(front) = self.try_peek() {
            if !is_expired(&front) {
                break;
            }
            if self.try_dequeue().is_none() {
                break;
            }
            purged += 1;
        }
        purged
    }
}

impl<T: NonceStore + ?Sized> NonceStore for &T {
    fn enqueue(&self, record: NonceRecord) {
        (**self).enqueue(record);
    }

    fn try_dequeue(&self) -> Option<NonceRecord> {
        (**self).try_dequeue()
    }

    fn try_peek(&self) -> Option<NonceRecord> {
        (**self).try_peek()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn contains(&self, nonce: &[u8; NONCE_SIZE]) -> bool {
        (**self).contains(nonce)
    }

    fn enqueue_if_absent(&self, record: NonceRecord) -> bool {
        (**self).enqueue_if_absent(record)
    }

    fn purge_expired(&self, is_expired: &dyn Fn(&NonceRecord) -> bool) -> usize {
        (**self).purge_expired(is_expired)
    }
}

impl<T: NonceStore + ?Sized> NonceStore for Arc<T> {
    fn enqueue(&self, record: NonceRecord) {
        (**self).enqueue(record);
    }

    fn try_dequeue(&self) -> Option<NonceRecord> {
        (**self).try_dequeue()
    }

    fn try_peek(&self) -> Option<NonceRecord> {
        (**self).try_peek()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn contains(&self, nonce: &[u8; NONCE_SIZE]) -> bool {
        (**self).contains(nonce)
    }

    fn enqueue_if_absent(&self, record: NonceRecord) -> bool {
        (**self).enqueue_if_absent(record)
    }

    fn purge_expired(&self, is_expired: &dyn Fn(&NonceRecord) -> bool) -> usize {
        (**self).purge_expired(is_expired)
    }
}
