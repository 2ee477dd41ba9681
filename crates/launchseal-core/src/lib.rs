//! Launchseal Protocols
//!
//! Protects the query string of a "launch URL" so an integrating application
//! can hand parameters to a launch system through an untrusted browser.
//!
//! # Protocols
//!
//! ```text
//! Shared secret                          PKI
//!
//! key ──HKDF(outerNonce)──┐              sender RSA key ──sign──┐
//!                         ▼                                     ▼
//!          AES-256-GCM envelope              [sigLen][sig][plaintext]
//!                         │                                     │
//!                         ▼                     AES-256-CBC (session key)
//!     one-time signature (mac, ts, nonce)                       │
//!                         │                  RSA-OAEP(recipient, session key)
//!                         ▼                                     ▼
//!   sharedSecretEncryptedUrlQuery=...            SEUS=..&ESP=..&IV=..&V=1
//! ```
//!
//! # Security
//!
//! Shared secret:
//! - Fresh keys per message, bound to a random outer nonce
//! - Signatures older than [`MAX_SIGNATURE_AGE`] are rejected as stale
//! - Every signature nonce is accepted once per [`NonceStore`]
//!
//! PKI:
//! - Sign-then-encrypt; the signature is checked after decryption
//! - Packages with an unknown protocol version fail closed
//! - No freshness or replay protection
//!
//! Errors are classified by [`ErrorKind`]; only
//! [`LaunchError::public_message`] should reach an untrusted client.
//!
//! # Determinism
//!
//! Time and randomness come from an [`Environment`]. Production code uses
//! [`SystemEnv`]; tests substitute fixed clocks and scripted bytes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod env;
pub mod error;
pub mod nonce_store;
pub mod one_time_signature;
pub mod pki;
pub mod query;
pub mod shared_secret;
pub mod system_env;
pub mod timestamp;

pub use config::{MAX_SIGNATURE_AGE, SignatureConfig};
pub use env::Environment;
pub use error::{ErrorKind, LaunchError, PUBLIC_ERROR_MESSAGE};
pub use nonce_store::{
    MemoryNonceStore, NONCE_SIZE, NonceRecord, NonceStore, default_nonce_store,
};
pub use one_time_signature::OneTimeSignature;
pub use pki::{
    EncryptedLaunchPackage, PROTOCOL_VERSION, PartyCertificate, PkiProtocol, SignedMessage,
    is_pki_encrypted,
};
pub use shared_secret::{SharedSecretProtocol, is_shared_secret_encrypted};
pub use system_env::SystemEnv;
pub use timestamp::Timestamp;
