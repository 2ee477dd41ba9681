//! AES-256-GCM body of the v2 envelope

use aes_gcm::{
    Aes256Gcm,
    aead::{AeadInPlace, KeyInit, generic_array::GenericArray},
};

use super::{KEY_LEN, NONCE_LEN, TAG_LEN};
use crate::CryptoError;

fn cipher(key: &[u8]) -> Result<Aes256Gcm, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKeyLength { expected: KEY_LEN, actual: key.len() });
    }
    Aes256Gcm::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidKeyLength { expected: KEY_LEN, actual: key.len() })
}

/// Encrypt without associated data. Returns `(tag, ciphertext)`.
pub(super) fn seal(
    plaintext: &[u8],
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
) -> Result<([u8; TAG_LEN], Vec<u8>), CryptoError> {
    let cipher = cipher(key)?;

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), &[], &mut buffer)
        .map_err(|_| CryptoError::malformed("plaintext too long for AES-GCM"))?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);
    Ok((tag_bytes, buffer))
}

/// Verify the tag and decrypt. Nothing is returned unless the tag verifies.
pub(super) fn open(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    tag: &[u8; TAG_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher(key)?;

    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            &[],
            &mut buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| CryptoError::AuthenticationFailed { reason: "AEAD tag mismatch" })?;

    Ok(buffer)
}
