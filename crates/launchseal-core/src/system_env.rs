//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` reads the real wall clock and the OS CSPRNG (getrandom).
//! Output is non-deterministic by design of the inputs; use a test
//! environment where reproducibility matters.

use std::time::SystemTime;

use launchseal_crypto::{CryptoError, fill_random};

use crate::env::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// # Security
///
/// The RNG uses getrandom, which provides OS-level cryptographic randomness
/// (e.g., `getrandom(2)` on Linux, `BCryptGenRandom` on Windows). RNG failure
/// is surfaced as [`CryptoError::RandomUnavailable`] instead of panicking, so
/// a launch endpoint can fail the request without taking the process down.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), CryptoError> {
        fill_random(buffer)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    #[test]
    fn system_env_clock_is_after_2020() {
        let env = SystemEnv::new();
        let since_epoch = env.now().duration_since(UNIX_EPOCH).unwrap();
        assert!(since_epoch > Duration::from_secs(1_577_836_800));
    }

    #[test]
    fn system_env_random_bytes_are_random() {
        let env = SystemEnv::new();

        let bytes1: [u8; 32] = env.random_array().unwrap();
        let bytes2: [u8; 32] = env.random_array().unwrap();

        // Extremely unlikely to be equal if random
        assert_ne!(bytes1, bytes2, "Random bytes should differ");
    }

    #[test]
    fn system_env_random_bytes_fills_buffer() {
        let env = SystemEnv::new();

        let mut bytes = [0u8; 64];
        env.random_bytes(&mut bytes).unwrap();

        let non_zero_count = bytes.iter().filter(|&&b| b != 0).count();
        assert!(non_zero_count > 32, "Most bytes should be non-zero");
    }
}
