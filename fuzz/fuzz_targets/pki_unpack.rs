//! Fuzz target for the PKI signature-length unpacker
//!
//! Decrypted PKI payloads start with an untrusted length prefix. The fuzzer
//! should NEVER panic or allocate by the declared length; every accepted
//! buffer must split exactly into signature and payload.

#![no_main]

use launchseal_core::pki::{MAX_SIGNATURE_LENGTH, envelope};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = envelope::unpack(data) {
        assert!(message.signature.len() <= MAX_SIGNATURE_LENGTH);
        assert_eq!(4 + message.signature.len() + message.payload.len(), data.len());
        assert_eq!(envelope::pack(&message).as_deref().ok(), Some(data));
    }
});
