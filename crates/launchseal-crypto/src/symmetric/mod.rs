//! Versioned authenticated symmetric encryption
//!
//! Ciphertexts are self-describing: the first byte names the format, so a
//! receiver keeps reading envelopes from peers that still produce the old
//! format while it writes only the new one.
//!
//! ```text
//! v2 (modern)  | 0x02 | nonce (12) | tag (16) | ciphertext |   AES-256-GCM
//! v1 (legacy)  | 0x01 | mac (32)   | nonce (16) | ciphertext | AES-256-CBC + HMAC-SHA256
//! ```
//!
//! Everything after the version byte is opaque to callers.

pub mod legacy;
mod modern;

use crate::{CryptoError, random::random_array};

/// Symmetric key size for both formats
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce size
pub const NONCE_LEN: usize = 12;

/// AES-GCM tag size
pub const TAG_LEN: usize = 16;

/// Legacy per-message nonce size (matches the CBC block size)
pub const LEGACY_NONCE_LEN: usize = 16;

/// Legacy HMAC-SHA256 size
pub const LEGACY_MAC_LEN: usize = 32;

/// Envelope format, read from the leading byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FormatVersion {
    /// AES-256-CBC + HMAC-SHA256, encrypt-then-MAC. Read-compatible only.
    Legacy = 1,
    /// AES-256-GCM
    Modern = 2,
}

impl FormatVersion {
    /// Map a version byte to a known format.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Legacy),
            2 => Some(Self::Modern),
            _ => None,
        }
    }

    /// Wire value of this format.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A parsed envelope borrowing from the input buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope<'a> {
    /// Format v1
    Legacy {
        /// HMAC-SHA256 over `ciphertext`
        mac: &'a [u8; LEGACY_MAC_LEN],
        /// Nonce the per-message keys and IV were derived from
        nonce: &'a [u8; LEGACY_NONCE_LEN],
        /// AES-CBC ciphertext
        ciphertext: &'a [u8],
    },
    /// Format v2
    Modern {
        /// AES-GCM nonce
        nonce: &'a [u8; NONCE_LEN],
        /// AES-GCM authentication tag
        tag: &'a [u8; TAG_LEN],
        /// AES-GCM ciphertext, same length as the plaintext
        ciphertext: &'a [u8],
    },
}

impl<'a> Envelope<'a> {
    /// Split an envelope into its fields.
    ///
    /// Only structure is checked here; nothing is authenticated.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, CryptoError> {
        let Some((&version, body)) = bytes.split_first() else {
            return Err(CryptoError::malformed("empty envelope"));
        };

        match FormatVersion::from_byte(version) {
            Some(FormatVersion::Modern) => {
                let (nonce, rest) = body
                    .split_first_chunk::<NONCE_LEN>()
                    .ok_or_else(|| truncated(FormatVersion::Modern, bytes.len()))?;
                let (tag, ciphertext) = rest
                    .split_first_chunk::<TAG_LEN>()
                    .ok_or_else(|| truncated(FormatVersion::Modern, bytes.len()))?;
                Ok(Self::Modern { nonce, tag, ciphertext })
            },
            Some(FormatVersion::Legacy) => {
                let (mac, rest) = body
                    .split_first_chunk::<LEGACY_MAC_LEN>()
                    .ok_or_else(|| truncated(FormatVersion::Legacy, bytes.len()))?;
                let (nonce, ciphertext) = rest
                    .split_first_chunk::<LEGACY_NONCE_LEN>()
                    .ok_or_else(|| truncated(FormatVersion::Legacy, bytes.len()))?;
                Ok(Self::Legacy { mac, nonce, ciphertext })
            },
            None => Err(CryptoError::UnsupportedCipher {
                expected: FormatVersion::Modern.as_byte(),
                actual: version,
            }),
        }
    }

    /// Format of this envelope.
    pub fn version(&self) -> FormatVersion {
        match self {
            Self::Legacy { .. } => FormatVersion::Legacy,
            Self::Modern { .. } => FormatVersion::Modern,
        }
    }

    /// Serialize back to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Legacy { mac, nonce, ciphertext } => {
                let mut out = Vec::with_capacity(
                    1 + LEGACY_MAC_LEN + LEGACY_NONCE_LEN + ciphertext.len(),
                );
                out.push(FormatVersion::Legacy.as_byte());
                out.extend_from_slice(mac.as_slice());
                out.extend_from_slice(nonce.as_slice());
                out.extend_from_slice(ciphertext);
                out
            },
            Self::Modern { nonce, tag, ciphertext } => {
                let mut out = Vec::with_capacity(1 + NONCE_LEN + TAG_LEN + ciphertext.len());
                out.push(FormatVersion::Modern.as_byte());
                out.extend_from_slice(nonce.as_slice());
                out.extend_from_slice(tag.as_slice());
                out.extend_from_slice(ciphertext);
                out
            },
        }
    }
}

fn truncated(version: FormatVersion, len: usize) -> CryptoError {
    let header = match version {
        FormatVersion::Legacy => 1 + LEGACY_MAC_LEN + LEGACY_NONCE_LEN,
        FormatVersion::Modern => 1 + NONCE_LEN + TAG_LEN,
    };
    CryptoError::malformed(format!(
        "{version:?} envelope needs at least {header} bytes, got {len}"
    ))
}

/// Generate a fresh random key suitable for [`encrypt`].
pub fn generate_key() -> Result<[u8; KEY_LEN], CryptoError> {
    random_array()
}

/// Encrypt with AES-256-GCM under a fresh random nonce.
///
/// Always produces the modern format.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let nonce = random_array::<NONCE_LEN>()?;
    encrypt_with_nonce(plaintext, key, &nonce)
}

/// Encrypt with AES-256-GCM under a caller-provided nonce.
///
/// The caller MUST never reuse a nonce with the same key.
pub fn encrypt_with_nonce(
    plaintext: &[u8],
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>, CryptoError> {
    let (tag, ciphertext) = modern::seal(plaintext, key, nonce)?;
    Ok(Envelope::Modern { nonce, tag: &tag, ciphertext: &ciphertext }.encode())
}

/// Decrypt an envelope of either format.
///
/// # Errors
///
/// - `Malformed`: empty or truncated envelope
/// - `UnsupportedCipher`: unknown version byte
/// - `InvalidKeyLength`: key too short for the envelope's format
/// - `AuthenticationFailed`: tag or MAC mismatch; no plaintext is released
pub fn decrypt(envelope: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match Envelope::parse(envelope)? {
        Envelope::Modern { nonce, tag, ciphertext } => modern::open(key, nonce, tag, ciphertext),
        Envelope::Legacy { mac, nonce, ciphertext } => legacy::open(key, mac, nonce, ciphertext),
    }
}

/// Decrypt a modern envelope only.
///
/// For receivers that have retired the legacy format: a v1 envelope fails
/// with `UnsupportedCipher` instead of being decrypted.
pub fn decrypt_modern(envelope: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match Envelope::parse(envelope)? {
        Envelope::Modern { nonce, tag, ciphertext } => modern::open(key, nonce, tag, ciphertext),
        Envelope::Legacy { .. } => Err(CryptoError::UnsupportedCipher {
            expected: FormatVersion::Modern.as_byte(),
            actual: FormatVersion::Legacy.as_byte(),
        }),
    }
}
