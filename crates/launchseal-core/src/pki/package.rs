//! URL serialization of encrypted launch packages
//!
//! ```text
//! SEUS=<b64 payload>&ESP=<b64 wrapped key>&IV=<b64 iv>&V=<version>
//! ```
//!
//! Values are base64 then form-encoded. On parse, unknown parameters are
//! ignored and missing ones read as empty bytes (or version 0); deciding
//! whether that is acceptable is left to the caller.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::{LaunchError, query};

/// Symmetrically encrypted payload
pub const PAYLOAD_FIELD: &str = "SEUS";

/// RSA-wrapped session key
pub const WRAPPED_KEY_FIELD: &str = "ESP";

/// CBC initialization vector
pub const IV_FIELD: &str = "IV";

/// Protocol version
pub const VERSION_FIELD: &str = "V";

/// The four fields of a PKI-protected launch query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptedLaunchPackage {
    /// AES-CBC ciphertext of `[sigLen][signature][plaintext]`
    pub cipher_payload: Vec<u8>,
    /// Session key encrypted with RSA-OAEP-SHA1
    pub wrapped_key: Vec<u8>,
    /// AES-CBC IV
    pub iv: Vec<u8>,
    /// Protocol version (`0` if absent)
    pub protocol_version: u16,
}

impl EncryptedLaunchPackage {
    /// Serialize as URL query parameters.
    pub fn serialize(&self) -> String {
        let payload = STANDARD.encode(&self.cipher_payload);
        let wrapped_key = STANDARD.encode(&self.wrapped_key);
        let iv = STANDARD.encode(&self.iv);
        let version = self.protocol_version.to_string();

        query::encode_pairs([
            (PAYLOAD_FIELD, payload.as_str()),
            (WRAPPED_KEY_FIELD, wrapped_key.as_str()),
            (IV_FIELD, iv.as_str()),
            (VERSION_FIELD, version.as_str()),
        ])
    }

    /// Parse URL query parameters produced by [`serialize`](Self::serialize).
    ///
    /// Parsing is lenient. Unknown parameters are ignored, a missing field
    /// reads as empty, an empty or missing `V` reads as version 0, and when a
    /// field repeats only its first occurrence is used. Later ones are not
    /// decoded at all. Emptiness and the version are checked by the caller.
    ///
    /// # Errors
    ///
    /// `InvalidInput` naming the field when a binary field is not base64 or
    /// `V` is not a `u16`.
    pub fn deserialize(query: &str) -> Result<Self, LaunchError> {
        let mut package = Self::default();
        let mut seen = [false; 4];

        for (name, value) in query::parse(query) {
            let slot = match name.as_str() {
                PAYLOAD_FIELD => 0,
                WRAPPED_KEY_FIELD => 1,
                IV_FIELD => 2,
                VERSION_FIELD => 3,
                _ => continue,
            };
            if seen[slot] {
                continue;
            }
            seen[slot] = true;

            match slot {
                0 => package.cipher_payload = decode_field(PAYLOAD_FIELD, &value)?,
                1 => package.wrapped_key = decode_field(WRAPPED_KEY_FIELD, &value)?,
                2 => package.iv = decode_field(IV_FIELD, &value)?,
                _ => package.protocol_version = parse_version(&value)?,
            }
        }

        Ok(package)
    }
}

/// Returns true if all four package fields are present and non-empty.
pub fn is_pki_encrypted(query: &str) -> bool {
    [PAYLOAD_FIELD, WRAPPED_KEY_FIELD, IV_FIELD, VERSION_FIELD]
        .iter()
        .all(|field| query::has_value(query, field))
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, LaunchError> {
    STANDARD
        .decode(value.trim())
        .map_err(|e| LaunchError::invalid(field, format!("invalid base64: {e}")))
}

fn parse_version(value: &str) -> Result<u16, LaunchError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    value.parse().map_err(|_| {
        LaunchError::invalid(VERSION_FIELD, format!("{value:?} is not a version number"))
    })
}
