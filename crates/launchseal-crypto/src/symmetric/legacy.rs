//! Legacy v1 envelope: AES-256-CBC, then HMAC-SHA256 over the ciphertext
//!
//! Kept so that receivers can read envelopes from peers that cannot produce
//! AES-GCM. New messages should use [`super::encrypt`].
//!
//! Per-message keys come from HKDF over the caller's key and a random 16-byte
//! nonce, one label per purpose. The IV is the first 16 bytes of a 32-byte
//! derivation, matching the existing peers.

use zeroize::Zeroize;

use super::{Envelope, FormatVersion, KEY_LEN, LEGACY_MAC_LEN, LEGACY_NONCE_LEN};
use crate::{
    CryptoError, block,
    constant_time::constant_time_eq,
    kdf::derive_purpose_key,
    mac::hmac_sha256,
    random::random_array,
};

/// HKDF label for the CBC key
pub const CIPHER_KEY_LABEL: &str = "sectra/symmetricencryption/cipherkey";

/// HKDF label for the CBC IV
pub const CIPHER_IV_LABEL: &str = "sectra/symmetricencryption/cipheriv";

/// HKDF label for the HMAC key
pub const MAC_KEY_LABEL: &str = "sectra/symmetricencryption/mackey";

struct LegacyKeys {
    cipher_key: [u8; 32],
    cipher_iv: [u8; block::BLOCK_SIZE],
    mac_key: [u8; 32],
}

impl LegacyKeys {
    fn derive(key: &[u8], nonce: &[u8; LEGACY_NONCE_LEN]) -> Self {
        let mut iv_material = derive_purpose_key(key, CIPHER_IV_LABEL, nonce);
        let mut cipher_iv = [0u8; block::BLOCK_SIZE];
        cipher_iv.copy_from_slice(&iv_material[..block::BLOCK_SIZE]);
        iv_material.zeroize();

        Self {
            cipher_key: derive_purpose_key(key, CIPHER_KEY_LABEL, nonce),
            cipher_iv,
            mac_key: derive_purpose_key(key, MAC_KEY_LABEL, nonce),
        }
    }
}

impl Drop for LegacyKeys {
    fn drop(&mut self) {
        self.cipher_key.zeroize();
        self.cipher_iv.zeroize();
        self.mac_key.zeroize();
    }
}

fn check_key(key: &[u8]) -> Result<(), CryptoError> {
    if key.len() < KEY_LEN {
        return Err(CryptoError::InvalidKeyLength { expected: KEY_LEN, actual: key.len() });
    }
    Ok(())
}

/// Produce a v1 envelope under a fresh random nonce.
///
/// Only for peers that cannot read v2.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let nonce = random_array::<LEGACY_NONCE_LEN>()?;
    encrypt_with_nonce(plaintext, key, &nonce)
}

/// Produce a v1 envelope under a caller-provided nonce.
pub fn encrypt_with_nonce(
    plaintext: &[u8],
    key: &[u8],
    nonce: &[u8; LEGACY_NONCE_LEN],
) -> Result<Vec<u8>, CryptoError> {
    check_key(key)?;
    let keys = LegacyKeys::derive(key, nonce);

    let ciphertext = block::cbc_encrypt(&keys.cipher_key, &keys.cipher_iv, plaintext)?;
    let mac = hmac_sha256(&keys.mac_key, &ciphertext);

    Ok(Envelope::Legacy { mac: &mac, nonce, ciphertext: &ciphertext }.encode())
}

/// Decrypt a v1 envelope; v2 input is refused with `UnsupportedCipher`.
pub fn decrypt(envelope: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match Envelope::parse(envelope)? {
        Envelope::Legacy { mac, nonce, ciphertext } => open(key, mac, nonce, ciphertext),
        Envelope::Modern { .. } => Err(CryptoError::UnsupportedCipher {
            expected: FormatVersion::Legacy.as_byte(),
            actual: FormatVersion::Modern.as_byte(),
        }),
    }
}

/// Check the MAC in constant time, then decrypt.
pub(super) fn open(
    key: &[u8],
    mac: &[u8; LEGACY_MAC_LEN],
    nonce: &[u8; LEGACY_NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    check_key(key)?;
    let keys = LegacyKeys::derive(key, nonce);

    let expected = hmac_sha256(&keys.mac_key, ciphertext);
    if !constant_time_eq(&expected, mac, LEGACY_MAC_LEN)? {
        return Err(CryptoError::AuthenticationFailed { reason: "MAC mismatch" });
    }

    block::cbc_decrypt(&keys.cipher_key, &keys.cipher_iv, ciphertext)
}

#[cfg(test)]
mod tests {
    use base64::{Engine, engine::general_purpose::STANDARD};

    use super::*;

    const FOX: &[u8] = b"The quick brown fox jumps over the lazy dog";

    // Produced by an existing v1 peer
    const PEER_ENVELOPE: &str = "AYzB8TSRbhdsSudz0RhqciOa/zcU8H7ofC4JqrPfib+eCBzUHXNnRsAJjPp+TtuL3Qj3OhpP2fmO5cudnzUna2sxZixuGP0AvFpD9q3YfgNlEr/Q2hRL+ObFinn4PRCSbg==";
    const PEER_KEY: &str = "wAx4qO+azccfOP8/PS5z6do5iHW7QxMUmf105Z4xHO0=";

    #[test]
    fn reads_peer_envelope() {
        let envelope = STANDARD.decode(PEER_ENVELOPE).unwrap();
        let key = STANDARD.decode(PEER_KEY).unwrap();

        assert_eq!(decrypt(&envelope, &key).unwrap(), FOX);
        assert_eq!(super::super::decrypt(&envelope, &key).unwrap(), FOX);
    }

    #[test]
    fn deterministic_with_fixed_nonce() {
        let key = [7u8; 32];
        let nonce = [9u8; LEGACY_NONCE_LEN];

        let a = encrypt_with_nonce(FOX, &key, &nonce).unwrap();
        let b = encrypt_with_nonce(FOX, &key, &nonce).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0], FormatVersion::Legacy.as_byte());
        assert_eq!(&a[1 + LEGACY_MAC_LEN..1 + LEGACY_MAC_LEN + LEGACY_NONCE_LEN], &nonce);
    }

    #[test]
    fn round_trip() {
        let key = [7u8; 32];
        let envelope = encrypt(FOX, &key).unwrap();
        assert_eq!(decrypt(&envelope, &key).unwrap(), FOX);
    }

    #[test]
    fn accepts_keys_longer_than_32_bytes() {
        let key = [7u8; 48];
        let envelope = encrypt(FOX, &key).unwrap();
        assert_eq!(decrypt(&envelope, &key).unwrap(), FOX);
    }

    #[test]
    fn short_key_rejected() {
        let err = encrypt(FOX, &[7u8; 31]).unwrap_err();
        assert_eq!(err, CryptoError::InvalidKeyLength { expected: 32, actual: 31 });
    }

    #[test]
    fn tampered_mac_is_authentication_failure() {
        let key = [7u8; 32];
        let mut envelope = encrypt(FOX, &key).unwrap();
        envelope[1] ^= 0x80;

        let err = decrypt(&envelope, &key).unwrap_err();
        assert_eq!(err, CryptoError::AuthenticationFailed { reason: "MAC mismatch" });
    }

    #[test]
    fn tampered_ciphertext_is_authentication_failure() {
        let key = [7u8; 32];
        let mut envelope = encrypt(FOX, &key).unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0x01;

        assert!(decrypt(&envelope, &key).unwrap_err().is_authentication_failure());
    }

    #[test]
    fn tampered_nonce_is_authentication_failure() {
        let key = [7u8; 32];
        let mut envelope = encrypt(FOX, &key).unwrap();
        envelope[1 + LEGACY_MAC_LEN] ^= 0x01;

        assert!(decrypt(&envelope, &key).unwrap_err().is_authentication_failure());
    }

    #[test]
    fn refuses_modern_envelope() {
        let key = [7u8; 32];
        let envelope = super::super::encrypt(FOX, &key).unwrap();

        let err = decrypt(&envelope, &key).unwrap_err();
        assert_eq!(err, CryptoError::UnsupportedCipher { expected: 1, actual: 2 });
    }
}
