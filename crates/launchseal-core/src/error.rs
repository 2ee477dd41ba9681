//! Error types for the launchseal protocols.
//!
//! Every failure falls into one of four kinds (see [`ErrorKind`]) so callers
//! can tell an expired bookmark from a forged link without parsing messages.
//! The `Display` text is for logs; untrusted clients should only ever see
//! [`LaunchError::public_message`].

use std::time::Duration;

use launchseal_crypto::CryptoError;
use thiserror::Error;

/// Errors that can occur while securing or viewing a launch URL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    /// An argument or a decoded field is missing, empty or malformed
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        /// Offending argument or field
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// A signature is longer than the protocol allows
    #[error("signature length {len} exceeds the allowed length of {max}")]
    SignatureLengthExceeded {
        /// Declared or actual signature length
        len: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// A package declares a protocol version this library does not speak
    #[error("unsupported protocol version {version}, expected {supported}")]
    UnsupportedVersion {
        /// Version found in the package
        version: u16,
        /// Version this library implements
        supported: u16,
    },

    /// A certificate that must carry a private key does not
    #[error("{party} certificate does not have a private key")]
    MissingPrivateKey {
        /// Which party's certificate
        party: &'static str,
    },

    /// A certificate that must carry a public key does not
    #[error("{party} certificate does not have an RSA public key")]
    MissingPublicKey {
        /// Which party's certificate
        party: &'static str,
    },

    /// The signature timestamp is older than the accepted window
    #[error("stale signature: age {age:?} exceeds maximum of {max_age:?}")]
    Stale {
        /// How old the signature was when verified
        age: Duration,
        /// Configured maximum age
        max_age: Duration,
    },

    /// The signature nonce has been seen before
    #[error("nonce reused, possible replay attack")]
    Replay,

    /// A MAC or signature did not verify
    #[error("authentication failed: {reason}")]
    AuthenticationFailed {
        /// Which check failed
        reason: &'static str,
    },

    /// The wrapped session key or the payload could not be decrypted
    ///
    /// Deliberately carries no detail from the RSA or padding layer.
    #[error("could not decrypt the launch package")]
    DecryptionFailed,

    /// Error from a cryptographic primitive
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Coarse classification of a [`LaunchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad request: malformed or missing input, unknown version
    Validation,
    /// Possible attack: MAC, tag or signature mismatch, nonce reuse
    Authentication,
    /// Expected for old or bookmarked links
    Freshness,
    /// The host cannot operate securely (e.g. no entropy); never retried
    Resource,
}

/// Generic text safe to show to an untrusted client.
pub const PUBLIC_ERROR_MESSAGE: &str = "the launch request could not be verified";

impl LaunchError {
    /// Which of the four error kinds this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. }
            | Self::SignatureLengthExceeded { .. }
            | Self::UnsupportedVersion { .. }
            | Self::MissingPrivateKey { .. }
            | Self::MissingPublicKey { .. } => ErrorKind::Validation,

            Self::Replay | Self::AuthenticationFailed { .. } | Self::DecryptionFailed => {
                ErrorKind::Authentication
            },

            Self::Stale { .. } => ErrorKind::Freshness,

            Self::Crypto(err) if err.is_fatal() => ErrorKind::Resource,
            Self::Crypto(err) if err.is_authentication_failure() => ErrorKind::Authentication,
            Self::Crypto(_) => ErrorKind::Validation,
        }
    }

    /// Returns true if this error should be logged as a possible attack.
    pub fn is_attack_signal(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }

    /// Returns true if this error is fatal (unrecoverable).
    ///
    /// Only resource failures are fatal; everything else is a property of
    /// the particular input.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Resource
    }

    /// Text to return to untrusted clients instead of `Display`.
    pub fn public_message(&self) -> &'static str {
        PUBLIC_ERROR_MESSAGE
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput { field, reason: reason.into() }
    }
}
