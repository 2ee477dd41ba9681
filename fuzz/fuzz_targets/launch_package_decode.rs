//! Fuzz target for EncryptedLaunchPackage::deserialize
//!
//! Tests query-string parsing of `SEUS`/`ESP`/`IV`/`V` with arbitrary input
//! to find panics in form decoding, base64 decoding and version parsing.
//! Whatever parses must survive a serialize/deserialize round trip.

#![no_main]

use launchseal_core::{EncryptedLaunchPackage, is_pki_encrypted};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|query: &str| {
    let _ = is_pki_encrypted(query);

    if let Ok(package) = EncryptedLaunchPackage::deserialize(query) {
        let reparsed = EncryptedLaunchPackage::deserialize(&package.serialize());
        assert_eq!(reparsed.as_ref(), Ok(&package));
    }
});
