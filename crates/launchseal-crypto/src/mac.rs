//! HMAC-SHA256

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 tag size
pub const MAC_LEN: usize = 32;

/// Compute HMAC-SHA256 of `data` under `key`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; MAC_LEN] {
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        unreachable!("HMAC accepts keys of any length");
    };
    mac.update(data);
    let result = mac.finalize().into_bytes();

    let mut tag = [0u8; MAC_LEN];
    tag.copy_from_slice(&result);
    tag
}
