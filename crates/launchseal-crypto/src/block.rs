//! Raw AES-CBC with PKCS#7 padding
//!
//! Confidentiality only. Callers must authenticate the ciphertext some other
//! way: an HMAC in the legacy envelope, an RSA signature over the plaintext
//! in the PKI protocol.

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};

use crate::CryptoError;

/// AES block size, and therefore the CBC IV size
pub const BLOCK_SIZE: usize = 16;

/// Encrypt `plaintext` with AES-CBC; the AES variant follows the key length.
pub fn cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_iv(iv)?;

    let ciphertext = match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        actual => return Err(CryptoError::InvalidKeyLength { expected: 32, actual }),
    };

    ciphertext.map_err(|_| CryptoError::InvalidKeyLength { expected: 32, actual: key.len() })
}

/// Decrypt AES-CBC `ciphertext` and strip the PKCS#7 padding.
///
/// A wrong key usually shows up here as a padding error.
pub fn cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_iv(iv)?;

    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::malformed(format!(
            "ciphertext length {} is not a positive multiple of {BLOCK_SIZE}",
            ciphertext.len()
        )));
    }

    let invalid_key = |_| CryptoError::InvalidKeyLength { expected: 32, actual: key.len() };
    let plaintext = match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(invalid_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(invalid_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(invalid_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        actual => return Err(CryptoError::InvalidKeyLength { expected: 32, actual }),
    };

    plaintext.map_err(|_| CryptoError::malformed("invalid padding"))
}

fn check_iv(iv: &[u8]) -> Result<(), CryptoError> {
    if iv.len() == BLOCK_SIZE {
        Ok(())
    } else {
        Err(CryptoError::malformed(format!("IV must be {BLOCK_SIZE} bytes, got {}", iv.len())))
    }
}
