//! Fuzz target for the versioned symmetric envelope
//!
//! Feeds arbitrary envelopes to both decoders under a fixed key.
//!
//! # Invariants
//!
//! - Parsing never panics, whatever the version byte or length
//! - Forged input never authenticates (the key is never used to encrypt
//!   the fuzzer's bytes, so any success is a forgery)
//! - Re-encoding a parsed envelope reproduces the input

#![no_main]

use arbitrary::Arbitrary;
use launchseal_crypto::{Envelope, decrypt, symmetric::legacy};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    legacy_key: bool,
    envelope: Vec<u8>,
}

fuzz_target!(|input: Input| {
    if let Ok(parsed) = Envelope::parse(&input.envelope) {
        assert_eq!(parsed.encode(), input.envelope);
    }

    let key: &[u8] = if input.legacy_key { &[0x33; 48] } else { &[0x33; 32] };
    assert!(decrypt(&input.envelope, key).is_err());
    assert!(legacy::decrypt(&input.envelope, key).is_err());
});
