//! Launchseal Cryptographic Primitives
//!
//! Building blocks shared by the launchseal URL protection protocols. Nothing
//! in this crate knows about query strings, timestamps or certificates; those
//! live in `launchseal-core`.
//!
//! # Layers
//!
//! ```text
//! random / constant_time / kdf / mac      primitive toolkit
//!        │
//!        ├──▶ block       raw AES-CBC + PKCS#7 (no integrity)
//!        │
//!        ▼
//! symmetric               versioned envelope
//!   ├─ v2 modern          AES-256-GCM
//!   └─ v1 legacy          AES-256-CBC + HMAC-SHA256 (read-compatible)
//! ```
//!
//! # Security
//!
//! Key derivation:
//! - HKDF-SHA256 with a zero salt; every derived key is bound to a domain
//!   label and a per-message nonce
//! - Derived key material is zeroized when dropped
//!
//! Authenticity:
//! - v2 envelopes rely on the GCM tag; v1 envelopes on encrypt-then-MAC with
//!   the MAC checked in constant time before any decryption
//! - Failed authentication never releases partial plaintext
//!
//! Versioning:
//! - The leading byte selects the decoder; unknown bytes fail closed with
//!   [`CryptoError::UnsupportedCipher`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod block;
pub mod constant_time;
mod error;
pub mod kdf;
pub mod mac;
pub mod random;
pub mod symmetric;

pub use constant_time::{constant_time_eq, constant_time_str_eq};
pub use error::CryptoError;
pub use kdf::{HASH_LEN, derive_key, derive_purpose_key, domain_info};
pub use mac::{MAC_LEN, hmac_sha256};
pub use random::{fill_random, random_array, random_bytes};
pub use symmetric::{Envelope, FormatVersion, decrypt, decrypt_modern, encrypt, generate_key};
