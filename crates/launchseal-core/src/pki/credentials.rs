//! Party certificates and RSA key loading

use std::fmt;

use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey},
};
use x509_cert::{
    Certificate,
    der::{Decode, DecodePem, Encode},
};

use crate::LaunchError;

/// An X.509 certificate's RSA key pair, as one party of the PKI protocol.
///
/// The public key is absent when the certificate carries a non-RSA key; the
/// private key is absent until one is attached.
#[derive(Clone)]
pub struct PartyCertificate {
    subject: String,
    public_key: Option<RsaPublicKey>,
    private_key: Option<RsaPrivateKey>,
}

impl PartyCertificate {
    /// Parse a PEM `CERTIFICATE` block.
    pub fn from_pem(pem: impl AsRef<[u8]>) -> Result<Self, LaunchError> {
        let certificate = Certificate::from_pem(pem.as_ref())
            .map_err(|e| LaunchError::invalid("certificate", e.to_string()))?;
        Self::from_certificate(&certificate)
    }

    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, LaunchError> {
        let certificate = Certificate::from_der(der)
            .map_err(|e| LaunchError::invalid("certificate", e.to_string()))?;
        Self::from_certificate(&certificate)
    }

    fn from_certificate(certificate: &Certificate) -> Result<Self, LaunchError> {
        let tbs = &certificate.tbs_certificate;
        let spki = tbs
            .subject_public_key_info
            .to_der()
            .map_err(|e| LaunchError::invalid("certificate", e.to_string()))?;

        // Non-RSA keys parse fine as certificates but cannot take part
        let public_key = RsaPublicKey::from_public_key_der(&spki).ok();

        Ok(Self { subject: tbs.subject.to_string(), public_key, private_key: None })
    }

    /// Attach the private key belonging to this certificate.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the certificate has no RSA public key or the private
    /// key does not belong to it.
    pub fn with_private_key(mut self, private_key: RsaPrivateKey) -> Result<Self, LaunchError> {
        let Some(public_key) = &self.public_key else {
            return Err(LaunchError::invalid(
                "private key",
                "certificate has no RSA public key to pair it with",
            ));
        };
        if RsaPublicKey::from(&private_key) != *public_key {
            return Err(LaunchError::invalid("private key", "does not match the certificate"));
        }

        self.private_key = Some(private_key);
        Ok(self)
    }

    /// [`with_private_key`](Self::with_private_key) from a PKCS#8 or PKCS#1
    /// PEM block.
    pub fn with_private_key_pem(self, pem: &str) -> Result<Self, LaunchError> {
        let private_key = load_private_key_pem(pem)?;
        self.with_private_key(private_key)
    }

    /// Subject distinguished name, RFC 4514 style.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// RSA public key, if the certificate has one.
    pub fn public_key(&self) -> Option<&RsaPublicKey> {
        self.public_key.as_ref()
    }

    /// Attached private key, if any.
    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        self.private_key.as_ref()
    }

    /// Returns true if a private key has been attached.
    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    pub(crate) fn require_public_key(
        &self,
        party: &'static str,
    ) -> Result<&RsaPublicKey, LaunchError> {
        self.public_key().ok_or(LaunchError::MissingPublicKey { party })
    }

    pub(crate) fn require_private_key(
        &self,
        party: &'static str,
    ) -> Result<&RsaPrivateKey, LaunchError> {
        self.private_key().ok_or(LaunchError::MissingPrivateKey { party })
    }
}

impl fmt::Debug for PartyCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartyCertificate")
            .field("subject", &self.subject)
            .field("has_public_key", &self.public_key.is_some())
            .field("has_private_key", &self.has_private_key())
            .finish()
    }
}

/// Load an RSA private key from a PKCS#8 (`PRIVATE KEY`) or PKCS#1
/// (`RSA PRIVATE KEY`) PEM block.
pub fn load_private_key_pem(pem: &str) -> Result<RsaPrivateKey, LaunchError> {
    let pem = pem.trim();
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|_| LaunchError::invalid("private key", "not a PKCS#8 or PKCS#1 RSA key"))
}

/// Load an RSA public key from an SPKI (`PUBLIC KEY`) or PKCS#1
/// (`RSA PUBLIC KEY`) PEM block.
pub fn load_public_key_pem(pem: &str) -> Result<RsaPublicKey, LaunchError> {
    let pem = pem.trim();
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|_| LaunchError::invalid("public key", "not an SPKI or PKCS#1 RSA key"))
}
