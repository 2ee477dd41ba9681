//! Fuzz target for one-time signature verification
//!
//! Arbitrary signed blobs are verified against a fixed key and clock.
//!
//! # Invariants
//!
//! - Unpacking never panics on truncated or oversized input
//! - Timestamps with any kind bits are handled without overflow
//! - Unauthenticated input never records a nonce

#![no_main]

use launchseal_core::{
    MemoryNonceStore, NonceStore, OneTimeSignature, env::test_utils::MockEnv,
    one_time_signature::unpack,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = unpack(data);

    let signer = OneTimeSignature::new(MockEnv::at_unix(1_792_065_600));
    let store = MemoryNonceStore::new();
    assert!(signer.verify(data, &[0x44; 32], &store).is_err());
    assert!(store.is_empty());
});
