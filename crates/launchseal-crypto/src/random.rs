//! Secure random bytes from the OS CSPRNG

use crate::CryptoError;

/// Fill `buffer` with bytes from the OS CSPRNG.
///
/// Failure is reported, never retried: a host without working entropy
/// cannot produce safe keys or nonces.
pub fn fill_random(buffer: &mut [u8]) -> Result<(), CryptoError> {
    getrandom::fill(buffer).map_err(|e| CryptoError::RandomUnavailable { reason: e.to_string() })
}

/// Return `len` fresh random bytes.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, CryptoError> {
    let mut bytes = vec![0u8; len];
    fill_random(&mut bytes)?;
    Ok(bytes)
}

/// Return a fixed-size array of fresh random bytes.
pub fn random_array<const N: usize>() -> Result<[u8; N], CryptoError> {
    let mut bytes = [0u8; N];
    fill_random(&mut bytes)?;
    Ok(bytes)
}
