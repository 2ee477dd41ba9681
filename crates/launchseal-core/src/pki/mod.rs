//! PKI sign-and-encrypt protection of launch URLs
//!
//! The integrating party signs the plaintext with its RSA key, encrypts
//! signature and plaintext under a fresh AES session key, and wraps that key
//! for the launch system's RSA key.
//!
//! ```text
//! signature = RSA-PKCS1v15-SHA256(senderKey, plaintext)
//! packed    = sigLen (u32 LE) || signature || plaintext
//! SEUS      = AES-256-CBC(sessionKey, IV, packed)
//! ESP       = RSA-OAEP-SHA1(recipientKey, sessionKey)
//!
//! SEUS=<b64>&ESP=<b64>&IV=<b64>&V=1
//! ```
//!
//! There is no freshness or replay protection in this protocol.

mod credentials;
pub mod envelope;
mod package;
mod signing;

pub use credentials::{PartyCertificate, load_private_key_pem, load_public_key_pem};
pub use envelope::MAX_SIGNATURE_LENGTH;
pub use package::{
    EncryptedLaunchPackage, IV_FIELD, PAYLOAD_FIELD, VERSION_FIELD, WRAPPED_KEY_FIELD,
    is_pki_encrypted,
};
pub use signing::{SignedMessage, sign, verify};

use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::{Environment, LaunchError, SystemEnv};

/// Protocol version written to and required in the `V` field
pub const PROTOCOL_VERSION: u16 = 1;

/// Party name of the sender in certificate errors
pub const INTEGRATING_PARTY: &str = "integrating party";

/// Party name of the receiver in certificate errors
pub const LAUNCH_SYSTEM: &str = "launch system";

/// PKI launch protocol.
///
/// `E` supplies the session key and IV; RSA padding and blinding always use
/// the OS RNG.
#[derive(Debug, Clone)]
pub struct PkiProtocol<E> {
    env: E,
}

impl PkiProtocol<SystemEnv> {
    /// Protocol on the system RNG.
    pub fn system() -> Self {
        Self::new(SystemEnv::new())
    }
}

impl<E: Environment> PkiProtocol<E> {
    /// Create a protocol instance.
    pub fn new(env: E) -> Self {
        Self { env }
    }

    /// Sign `plaintext` with `sender_key` and encrypt it for `recipient_key`.
    ///
    /// Returns the serialized package, ready to append to a launch URL.
    pub fn secure(
        &self,
        plaintext: &str,
        sender_key: &RsaPrivateKey,
        recipient_key: &RsaPublicKey,
    ) -> Result<String, LaunchError> {
        let signed = sign(plaintext.as_bytes(), sender_key)?;
        let package = envelope::encrypt(&self.env, &signed, recipient_key)?;

        tracing::debug!(
            plaintext_len = plaintext.len(),
            signature_len = signed.signature.len(),
            "secured PKI launch query"
        );
        Ok(package.serialize())
    }

    /// Decrypt a package with `recipient_key` and verify it against
    /// `sender_key`.
    ///
    /// # Errors
    ///
    /// - `UnsupportedVersion`: `V` is anything but [`PROTOCOL_VERSION`]
    /// - `InvalidInput`: malformed or empty field, non-UTF-8 plaintext
    /// - `DecryptionFailed`: session key unwrap or payload padding failed
    /// - `AuthenticationFailed`: decrypted bytes carry no well-formed
    ///   signature, or the signature does not verify
    pub fn view(
        &self,
        encrypted_query: &str,
        recipient_key: &RsaPrivateKey,
        sender_key: &RsaPublicKey,
    ) -> Result<String, LaunchError> {
        let package = EncryptedLaunchPackage::deserialize(encrypted_query)?;
        if package.protocol_version != PROTOCOL_VERSION {
            return Err(LaunchError::UnsupportedVersion {
                version: package.protocol_version,
                supported: PROTOCOL_VERSION,
            });
        }

        let signed = envelope::decrypt(&package, recipient_key)?;
        verify(&signed, sender_key).inspect_err(|_| {
            tracing::warn!("PKI launch query signature did not verify, possible attack");
        })?;

        tracing::debug!(plaintext_len = signed.payload.len(), "viewed PKI launch query");
        String::from_utf8(signed.payload)
            .map_err(|_| LaunchError::invalid("plaintext", "not valid UTF-8"))
    }

    /// [`secure`](Self::secure) with keys taken from certificates.
    ///
    /// `integrating_party` must carry a private key and `launch_system` an
    /// RSA public key.
    pub fn secure_with_certificates(
        &self,
        plaintext: &str,
        integrating_party: &PartyCertificate,
        launch_system: &PartyCertificate,
    ) -> Result<String, LaunchError> {
        let recipient_key = launch_system.require_public_key(LAUNCH_SYSTEM)?;
        let sender_key = integrating_party.require_private_key(INTEGRATING_PARTY)?;
        self.secure(plaintext, sender_key, recipient_key)
    }

    /// [`view`](Self::view) with keys taken from certificates.
    ///
    /// `launch_system` must carry a private key and `integrating_party` an
    /// RSA public key.
    pub fn view_with_certificates(
        &self,
        encrypted_query: &str,
        launch_system: &PartyCertificate,
        integrating_party: &PartyCertificate,
    ) -> Result<String, LaunchError> {
        let recipient_key = launch_system.require_private_key(LAUNCH_SYSTEM)?;
        let sender_key = integrating_party.require_public_key(INTEGRATING_PARTY)?;
        self.view(encrypted_query, recipient_key, sender_key)
    }
}

/// Secure `plaintext` with the system RNG.
pub fn secure(
    plaintext: &str,
    sender_key: &RsaPrivateKey,
    recipient_key: &RsaPublicKey,
) -> Result<String, LaunchError> {
    PkiProtocol::system().secure(plaintext, sender_key, recipient_key)
}

/// View `encrypted_query` with the system RNG.
pub fn view(
    encrypted_query: &str,
    recipient_key: &RsaPrivateKey,
    sender_key: &RsaPublicKey,
) -> Result<String, LaunchError> {
    PkiProtocol::system().view(encrypted_query, recipient_key, sender_key)
}
