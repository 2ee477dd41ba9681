//! Configuration for one-time signature verification

use std::time::Duration;

/// Default freshness window for one-time signatures
pub const MAX_SIGNATURE_AGE: Duration = Duration::from_secs(30);

/// One-time signature configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureConfig {
    /// Signatures older than this are rejected as stale, and nonces older
    /// than this are purged from the store.
    pub max_age: Duration,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self { max_age: MAX_SIGNATURE_AGE }
    }
}
