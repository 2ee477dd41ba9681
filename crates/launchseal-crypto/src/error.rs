//! Error types for cryptographic primitives

use thiserror::Error;

/// Errors from primitive and envelope operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Key material is shorter (or longer) than the algorithm accepts
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Required length, or minimum length for variable-size keys
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// An input exceeded its caller-declared maximum length
    #[error("{field} length {len} exceeds maximum of {max}")]
    LengthExceeded {
        /// Which input was too long
        field: &'static str,
        /// Supplied length
        len: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Requested KDF output length is outside the supported range
    #[error("invalid output length {requested}: must be between {min} and {max}")]
    InvalidOutputLength {
        /// Requested number of bytes
        requested: usize,
        /// Minimum supported length
        min: usize,
        /// Maximum supported length
        max: usize,
    },

    /// Input bytes do not have the expected structure
    #[error("malformed input: {reason}")]
    Malformed {
        /// What was wrong with the input
        reason: String,
    },

    /// Envelope was produced by a cipher this decoder does not handle
    #[error("data was encrypted with an unsupported cipher, expected {expected}, got {actual}")]
    UnsupportedCipher {
        /// Version byte this decoder understands
        expected: u8,
        /// Version byte found in the envelope
        actual: u8,
    },

    /// MAC or AEAD tag did not verify
    ///
    /// The message deliberately carries no MAC or tag values.
    #[error("failed to authenticate message: {reason}")]
    AuthenticationFailed {
        /// Which check failed
        reason: &'static str,
    },

    /// The secure random source could not produce bytes
    #[error("secure random source unavailable: {reason}")]
    RandomUnavailable {
        /// Error reported by the OS
        reason: String,
    },
}

impl CryptoError {
    /// Returns true if this error is fatal (unrecoverable)
    ///
    /// Fatal errors cannot be fixed by the caller resubmitting different
    /// input: the environment itself is broken.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::RandomUnavailable { .. } => true,

            Self::InvalidKeyLength { .. }
            | Self::LengthExceeded { .. }
            | Self::InvalidOutputLength { .. }
            | Self::Malformed { .. }
            | Self::UnsupportedCipher { .. }
            | Self::AuthenticationFailed { .. } => false,
        }
    }

    /// Returns true if the input failed an integrity check.
    ///
    /// These are the errors worth logging as a possible attack rather than a
    /// bad request.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed { reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CryptoError::InvalidKeyLength { expected: 32, actual: 16 };
        assert_eq!(err.to_string(), "invalid key length: expected 32, got 16");

        let err = CryptoError::UnsupportedCipher { expected: 2, actual: 7 };
        assert_eq!(
            err.to_string(),
            "data was encrypted with an unsupported cipher, expected 2, got 7"
        );

        let err = CryptoError::LengthExceeded { field: "first", len: 40, max: 32 };
        assert_eq!(err.to_string(), "first length 40 exceeds maximum of 32");
    }

    #[test]
    fn only_rng_failure_is_fatal() {
        assert!(CryptoError::RandomUnavailable { reason: "no entropy".into() }.is_fatal());
        assert!(!CryptoError::AuthenticationFailed { reason: "mac mismatch" }.is_fatal());
        assert!(!CryptoError::malformed("short").is_fatal());
    }

    #[test]
    fn authentication_failure_classification() {
        assert!(CryptoError::AuthenticationFailed { reason: "tag" }.is_authentication_failure());
        assert!(!CryptoError::malformed("short").is_authentication_failure());
        assert!(
            !CryptoError::UnsupportedCipher { expected: 2, actual: 1 }.is_authentication_failure()
        );
    }
}
