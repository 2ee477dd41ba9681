//! RSA PKCS#1 v1.5 signatures over SHA-256

use rand::rngs::OsRng;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::LaunchError;

/// A payload and the sender's signature over it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    /// UTF-8 bytes of the plaintext query string
    pub payload: Vec<u8>,
    /// RSA-PKCS1v15-SHA256 signature over `payload`
    pub signature: Vec<u8>,
}

/// Sign `payload` with the sender's private key.
pub fn sign(payload: &[u8], sender_key: &RsaPrivateKey) -> Result<SignedMessage, LaunchError> {
    let digest = Sha256::digest(payload);
    let signature = sender_key
        .sign_with_rng(&mut OsRng, Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| LaunchError::invalid("sender private key", e.to_string()))?;

    Ok(SignedMessage { payload: payload.to_vec(), signature })
}

/// Verify `message` against the sender's public key.
pub fn verify(message: &SignedMessage, sender_key: &RsaPublicKey) -> Result<(), LaunchError> {
    let digest = Sha256::digest(&message.payload);
    sender_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &message.signature)
        .map_err(|_| LaunchError::AuthenticationFailed { reason: "RSA signature mismatch" })
}
