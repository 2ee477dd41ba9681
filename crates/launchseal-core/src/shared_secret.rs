//! Shared-secret protection of launch URLs
//!
//! Both parties hold one symmetric key. Per message, two independent keys are
//! derived from it and a fresh 12-byte outer nonce; the payload is encrypted
//! with one and the ciphertext one-time-signed with the other.
//!
//! ```text
//! cipherKey    = HKDF(key, "sectra/encryptedonetimesignature/cipherkey"    || outerNonce)
//! signatureKey = HKDF(key, "sectra/encryptedonetimesignature/signaturekey" || outerNonce)
//!
//! sharedSecretEncryptedUrlQuery = urlencode(base64(
//!     outerNonce (12) || sign(encrypt(plaintext, cipherKey), signatureKey)))
//! ```

use base64::{Engine, engine::general_purpose::STANDARD};
use launchseal_crypto::{derive_purpose_key, symmetric};
use zeroize::Zeroize;

use crate::{
    Environment, LaunchError, SystemEnv,
    config::SignatureConfig,
    nonce_store::{MemoryNonceStore, NonceStore, default_nonce_store},
    one_time_signature::OneTimeSignature,
    query,
};

/// Query parameter carrying the protected payload
pub const QUERY_PARAMETER: &str = "sharedSecretEncryptedUrlQuery";

/// HKDF label for the payload encryption key
pub const CIPHER_KEY_LABEL: &str = "sectra/encryptedonetimesignature/cipherkey";

/// HKDF label for the one-time signature key
pub const SIGNATURE_KEY_LABEL: &str = "sectra/encryptedonetimesignature/signaturekey";

/// Size of the per-message outer nonce
pub const OUTER_NONCE_SIZE: usize = 12;

/// Per-message keys, zeroized on drop
struct EphemeralKeys {
    cipher_key: [u8; 32],
    signature_key: [u8; 32],
}

impl EphemeralKeys {
    fn derive(key: &[u8], outer_nonce: &[u8; OUTER_NONCE_SIZE]) -> Self {
        Self {
            cipher_key: derive_purpose_key(key, CIPHER_KEY_LABEL, outer_nonce),
            signature_key: derive_purpose_key(key, SIGNATURE_KEY_LABEL, outer_nonce),
        }
    }
}

impl Drop for EphemeralKeys {
    fn drop(&mut self) {
        self.cipher_key.zeroize();
        self.signature_key.zeroize();
    }
}

/// Shared-secret launch protocol.
///
/// `S` remembers used nonces; every receiver that may see the same link must
/// share one store.
#[derive(Debug, Clone)]
pub struct SharedSecretProtocol<E, S> {
    signer: OneTimeSignature<E>,
    store: S,
}

impl SharedSecretProtocol<SystemEnv, &'static MemoryNonceStore> {
    /// Protocol on the system clock and RNG with the process-wide nonce store.
    pub fn system() -> Self {
        Self::new(SystemEnv::new(), default_nonce_store())
    }
}

impl<E: Environment, S: NonceStore> SharedSecretProtocol<E, S> {
    /// Create a protocol instance with the default 30 second window.
    pub fn new(env: E, store: S) -> Self {
        Self::with_config(env, store, SignatureConfig::default())
    }

    /// Create a protocol instance with a custom signature configuration.
    pub fn with_config(env: E, store: S, config: SignatureConfig) -> Self {
        Self { signer: OneTimeSignature::with_config(env, config), store }
    }

    /// Nonce store used by [`view`](Self::view).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Encrypt and sign `plaintext`, returning the raw wire bytes
    /// `outerNonce || signed envelope`.
    pub fn secure_bytes(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, LaunchError> {
        check_key(key)?;
        let env = self.signer.env();

        let outer_nonce = env.random_array::<OUTER_NONCE_SIZE>()?;
        let keys = EphemeralKeys::derive(key, &outer_nonce);

        let aead_nonce = env.random_array::<{ symmetric::NONCE_LEN }>()?;
        let envelope = symmetric::encrypt_with_nonce(plaintext, &keys.cipher_key, &aead_nonce)?;
        let signed = self.signer.sign(&envelope, &keys.signature_key)?;

        let mut wire = Vec::with_capacity(OUTER_NONCE_SIZE + signed.len());
        wire.extend_from_slice(&outer_nonce);
        wire.extend_from_slice(&signed);
        Ok(wire)
    }

    /// Secure a plaintext query string.
    ///
    /// Returns `sharedSecretEncryptedUrlQuery=<value>`, ready to append to a
    /// launch URL.
    pub fn secure(&self, plaintext: &str, key: &[u8]) -> Result<String, LaunchError> {
        let wire = self.secure_bytes(plaintext.as_bytes(), key)?;
        let value = STANDARD.encode(wire);

        tracing::debug!(plaintext_len = plaintext.len(), "secured shared-secret launch query");
        Ok(format!("{QUERY_PARAMETER}={}", query::encode_value(&value)))
    }

    /// [`secure`](Self::secure) with the key given as standard base64.
    pub fn secure_with_base64_key(
        &self,
        plaintext: &str,
        base64_key: &str,
    ) -> Result<String, LaunchError> {
        let key = decode_key(base64_key)?;
        self.secure(plaintext, &key)
    }

    /// Verify and decrypt raw wire bytes produced by
    /// [`secure_bytes`](Self::secure_bytes).
    ///
    /// Records the signature nonce in this protocol's store on success.
    pub fn view_bytes(&self, wire: &[u8], key: &[u8]) -> Result<Vec<u8>, LaunchError> {
        check_key(key)?;

        let (outer_nonce, signed) = wire.split_first_chunk::<OUTER_NONCE_SIZE>().ok_or_else(|| {
            LaunchError::invalid(QUERY_PARAMETER, "shorter than the outer nonce")
        })?;
        let keys = EphemeralKeys::derive(key, outer_nonce);

        let envelope = self.signer.verify(signed, &keys.signature_key, &self.store)?;
        let plaintext = symmetric::decrypt(&envelope, &keys.cipher_key).inspect_err(|err| {
            if err.is_authentication_failure() {
                tracing::warn!("signed envelope failed AEAD authentication");
            }
        })?;

        Ok(plaintext)
    }

    /// Verify and decrypt a query produced by [`secure`](Self::secure).
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: parameter missing or empty, bad base64, non-UTF-8
    ///   plaintext
    /// - `Stale`: link older than the signature window
    /// - `Replay`: link already viewed
    /// - `AuthenticationFailed` / `Crypto`: wrong key or tampered link
    pub fn view(&self, encrypted_query: &str, key: &[u8]) -> Result<String, LaunchError> {
        let value = query::get(encrypted_query, QUERY_PARAMETER)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                LaunchError::invalid(QUERY_PARAMETER, "value either does not exist or is not set")
            })?;

        let wire = STANDARD
            .decode(value.as_bytes())
            .map_err(|e| LaunchError::invalid(QUERY_PARAMETER, format!("invalid base64: {e}")))?;

        let plaintext = self.view_bytes(&wire, key)?;
        tracing::debug!(plaintext_len = plaintext.len(), "viewed shared-secret launch query");

        String::from_utf8(plaintext)
            .map_err(|_| LaunchError::invalid("plaintext", "not valid UTF-8"))
    }

    /// [`view`](Self::view) with the key given as standard base64.
    pub fn view_with_base64_key(
        &self,
        encrypted_query: &str,
        base64_key: &str,
    ) -> Result<String, LaunchError> {
        let key = decode_key(base64_key)?;
        self.view(encrypted_query, &key)
    }
}

/// Returns true if `query` carries a non-empty shared-secret payload.
pub fn is_shared_secret_encrypted(query: &str) -> bool {
    query::has_value(query, QUERY_PARAMETER)
}

/// Secure `plaintext` with the system environment.
pub fn secure(plaintext: &str, key: &[u8]) -> Result<String, LaunchError> {
    SharedSecretProtocol::system().secure(plaintext, key)
}

/// View `encrypted_query` with the system environment and the process-wide
/// nonce store.
pub fn view(encrypted_query: &str, key: &[u8]) -> Result<String, LaunchError> {
    SharedSecretProtocol::system().view(encrypted_query, key)
}

fn check_key(key: &[u8]) -> Result<(), LaunchError> {
    if key.is_empty() {
        return Err(LaunchError::invalid("key", "must not be empty"));
    }
    Ok(())
}

fn decode_key(base64_key: &str) -> Result<zeroize::Zeroizing<Vec<u8>>, LaunchError> {
    STANDARD
        .decode(base64_key.trim())
        .map(zeroize::Zeroizing::new)
        .map_err(|e| LaunchError::invalid("key", format!("invalid base64: {e}")))
}
