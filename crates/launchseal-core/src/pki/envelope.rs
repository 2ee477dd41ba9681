//! Hybrid encryption of a signed message
//!
//! The signature and payload are packed, encrypted with a fresh AES-256-CBC
//! session key, and the session key is wrapped for the recipient with
//! RSA-OAEP-SHA1.
//!
//! ```text
//! packed = | sigLen (u32 LE) | signature (sigLen) | payload |
//! ```
//!
//! The CBC layer carries no MAC of its own; integrity comes from the RSA
//! signature over the payload, which is checked after decryption.

use launchseal_crypto::block;
use rand::rngs::OsRng;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use zeroize::Zeroizing;

use super::{EncryptedLaunchPackage, PROTOCOL_VERSION, SignedMessage, package};
use crate::{Environment, LaunchError};

/// Largest signature accepted in either direction
pub const MAX_SIGNATURE_LENGTH: usize = 1024;

/// Size of the signature length prefix
pub const SIGNATURE_LENGTH_SIZE: usize = 4;

/// AES-256 session key size
pub const SESSION_KEY_LEN: usize = 32;

/// AES-CBC IV size
pub const IV_LEN: usize = block::BLOCK_SIZE;

/// Reason reported when decrypted bytes are not a packed signed message
pub const MALFORMED_SIGNATURE_PREFIX: &str = "malformed signature length prefix";

/// Pack `[sigLen][signature][payload]`.
pub fn pack(message: &SignedMessage) -> Result<Vec<u8>, LaunchError> {
    let sig_len = message.signature.len();
    if sig_len > MAX_SIGNATURE_LENGTH {
        return Err(LaunchError::SignatureLengthExceeded {
            len: sig_len,
            max: MAX_SIGNATURE_LENGTH,
        });
    }

    let mut packed =
        Vec::with_capacity(SIGNATURE_LENGTH_SIZE + sig_len + message.payload.len());
    packed.extend_from_slice(&(sig_len as u32).to_le_bytes());
    packed.extend_from_slice(&message.signature);
    packed.extend_from_slice(&message.payload);
    Ok(packed)
}

/// Split a packed buffer back into signature and payload.
///
/// # Errors
///
/// - `InvalidInput`: fewer than 4 bytes, or a declared signature length
///   larger than the remaining data
/// - `SignatureLengthExceeded`: declared length above the maximum
pub fn unpack(packed: &[u8]) -> Result<SignedMessage, LaunchError> {
    let (len_bytes, rest) = packed.split_first_chunk::<SIGNATURE_LENGTH_SIZE>().ok_or_else(|| {
        LaunchError::invalid(
            "decrypted data",
            "contains no or insufficient signature length information",
        )
    })?;

    let sig_len = u32::from_le_bytes(*len_bytes) as usize;
    if sig_len > MAX_SIGNATURE_LENGTH {
        return Err(LaunchError::SignatureLengthExceeded {
            len: sig_len,
            max: MAX_SIGNATURE_LENGTH,
        });
    }
    if sig_len > rest.len() {
        return Err(LaunchError::invalid(
            "signature",
            format!(
                "declared signature length {sig_len} exceeds the {} bytes of signature and payload",
                rest.len()
            ),
        ));
    }

    let (signature, payload) = rest.split_at(sig_len);
    Ok(SignedMessage { payload: payload.to_vec(), signature: signature.to_vec() })
}

/// Encrypt `message` for the holder of `recipient`.
///
/// The session key and IV come from `env`; OAEP padding uses the OS RNG.
pub fn encrypt<E: Environment>(
    env: &E,
    message: &SignedMessage,
    recipient: &RsaPublicKey,
) -> Result<EncryptedLaunchPackage, LaunchError> {
    let packed = Zeroizing::new(pack(message)?);

    let session_key = Zeroizing::new(env.random_array::<SESSION_KEY_LEN>()?);
    let iv = env.random_array::<IV_LEN>()?;

    let cipher_payload = block::cbc_encrypt(session_key.as_slice(), &iv, &packed)?;
    let wrapped_key = recipient
        .encrypt(&mut OsRng, Oaep::new::<Sha1>(), session_key.as_slice())
        .map_err(|e| LaunchError::invalid("recipient public key", e.to_string()))?;

    Ok(EncryptedLaunchPackage {
        cipher_payload,
        wrapped_key,
        iv: iv.to_vec(),
        protocol_version: PROTOCOL_VERSION,
    })
}

/// Unwrap the session key and decrypt the signed message.
///
/// Does not check the protocol version and does not verify the signature;
/// [`super::PkiProtocol::view`] does both.
///
/// # Errors
///
/// - `InvalidInput`: empty field or an IV that is not one block long
/// - `DecryptionFailed`: session key unwrap or payload padding failed
/// - `AuthenticationFailed`: the decrypted bytes do not split into signature
///   and payload
pub fn decrypt(
    package: &EncryptedLaunchPackage,
    recipient: &RsaPrivateKey,
) -> Result<SignedMessage, LaunchError> {
    for (field, value) in [
        (package::PAYLOAD_FIELD, &package.cipher_payload),
        (package::WRAPPED_KEY_FIELD, &package.wrapped_key),
        (package::IV_FIELD, &package.iv),
    ] {
        if value.is_empty() {
            return Err(LaunchError::invalid(field, "must not be empty"));
        }
    }
    if package.iv.len() != IV_LEN {
        return Err(LaunchError::invalid(
            package::IV_FIELD,
            format!("expected {IV_LEN} bytes, got {}", package.iv.len()),
        ));
    }

    let session_key = recipient
        .decrypt_blinded(&mut OsRng, Oaep::new::<Sha1>(), &package.wrapped_key)
        .map(Zeroizing::new)
        .map_err(|_| {
            tracing::warn!("could not unwrap launch package session key");
            LaunchError::DecryptionFailed
        })?;

    let packed = block::cbc_decrypt(&session_key, &package.iv, &package.cipher_payload)
        .map(Zeroizing::new)
        .map_err(|_| {
            tracing::warn!("could not decrypt launch package payload");
            LaunchError::DecryptionFailed
        })?;

    // A corrupted length prefix is tampering; its value must not leak
    unpack(&packed).map_err(|_| {
        tracing::warn!("decrypted launch package is not a signed payload");
        LaunchError::AuthenticationFailed { reason: MALFORMED_SIGNATURE_PREFIX }
    })
}
