//! Key derivation using HKDF-SHA256
//!
//! Every protocol key is derived from a long-term secret, a per-message nonce
//! and a domain label, so that one nonce never yields the same bytes for two
//! purposes (cipher key vs. MAC key vs. IV).

use hkdf::Hkdf;
use sha2::Sha256;

use crate::CryptoError;

/// HMAC-SHA256 output size
pub const HASH_LEN: usize = 32;

/// Largest output HKDF-SHA256 can produce (RFC 5869, section 2.3)
pub const MAX_OUTPUT_LEN: usize = 255 * HASH_LEN;

/// Derive `output_len` bytes from `secret` and `info`.
///
/// Extract runs with an all-zero salt, which RFC 5869 specifies for the
/// no-salt case. Outputs shorter than one hash block are refused.
pub fn derive_key(secret: &[u8], output_len: usize, info: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if !(HASH_LEN..=MAX_OUTPUT_LEN).contains(&output_len) {
        return Err(CryptoError::InvalidOutputLength {
            requested: output_len,
            min: HASH_LEN,
            max: MAX_OUTPUT_LEN,
        });
    }

    let hkdf = Hkdf::<Sha256>::new(None, secret);
    let mut okm = vec![0u8; output_len];
    hkdf.expand(info, &mut okm).map_err(|_| CryptoError::InvalidOutputLength {
        requested: output_len,
        min: HASH_LEN,
        max: MAX_OUTPUT_LEN,
    })?;

    Ok(okm)
}

/// Build the HKDF info parameter: `utf8(label) || nonce`
pub fn domain_info(label: &str, nonce: &[u8]) -> Vec<u8> {
    let mut info = Vec::with_capacity(label.len() + nonce.len());
    info.extend_from_slice(label.as_bytes());
    info.extend_from_slice(nonce);
    info
}

/// Derive a 32-byte key bound to `label` and `nonce`.
pub fn derive_purpose_key(secret: &[u8], label: &str, nonce: &[u8]) -> [u8; 32] {
    let hkdf = Hkdf::<Sha256>::new(None, secret);
    let info = domain_info(label, nonce);

    let mut key = [0u8; 32];
    let Ok(()) = hkdf.expand(&info, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    key
}
