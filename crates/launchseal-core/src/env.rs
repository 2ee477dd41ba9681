//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from system resources (wall clock, randomness).
//! Production code uses [`crate::SystemEnv`]; tests inject a fixed clock and
//! scripted random bytes to exercise freshness and produce known-answer
//! output.

use std::time::SystemTime;

use launchseal_crypto::CryptoError;

/// Abstract environment providing time and randomness.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - `random_bytes()` either fills the whole buffer or returns an error
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time.
    ///
    /// Signature timestamps are compared across machines, so this is UTC
    /// wall time rather than a monotonic instant.
    fn now(&self) -> SystemTime;

    /// Fills the provided buffer with random bytes.
    ///
    /// Fails with [`CryptoError::RandomUnavailable`] if no secure source is
    /// available; callers never retry.
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), CryptoError>;

    /// Generates a fixed-size array of random bytes.
    fn random_array<const N: usize>(&self) -> Result<[u8; N], CryptoError> {
        let mut bytes = [0u8; N];
        self.random_bytes(&mut bytes)?;
        Ok(bytes)
    }
}

/// Deterministic environment for tests and fuzzing.
pub mod test_utils {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex, MutexGuard, PoisonError},
        time::{Duration, SystemTime, UNIX_EPOCH},
    };

    use launchseal_crypto::CryptoError;

    use super::Environment;

    /// Manually driven clock plus scripted random bytes.
    ///
    /// Clones share state, so a test can keep a handle and move the clock
    /// while a protocol owns another. Random requests consume scripted bytes
    /// first; once the script runs out, each request is filled with a single
    /// counter byte that increments per request.
    #[derive(Debug, Clone)]
    pub struct MockEnv {
        state: Arc<Mutex<MockState>>,
    }

    #[derive(Debug)]
    struct MockState {
        now: SystemTime,
        script: VecDeque<u8>,
        counter: u8,
        entropy_offline: bool,
    }

    impl MockEnv {
        /// Environment whose clock reads `now`.
        pub fn at(now: SystemTime) -> Self {
            let state =
                MockState { now, script: VecDeque::new(), counter: 1, entropy_offline: false };
            Self { state: Arc::new(Mutex::new(state)) }
        }

        /// Environment whose clock reads `secs` after the Unix epoch.
        pub fn at_unix(secs: u64) -> Self {
            Self::at(UNIX_EPOCH + Duration::from_secs(secs))
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            let mut state = self.lock();
            state.now += by;
        }

        /// Set the clock.
        pub fn set_now(&self, now: SystemTime) {
            self.lock().now = now;
        }

        /// Queue bytes to be returned by the next random requests.
        pub fn script(&self, bytes: &[u8]) {
            self.lock().script.extend(bytes);
        }

        /// Make every later random request fail.
        pub fn take_entropy_offline(&self) {
            self.lock().entropy_offline = true;
        }

        fn lock(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl Environment for MockEnv {
        fn now(&self) -> SystemTime {
            self.lock().now
        }

        fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), CryptoError> {
            let mut state = self.lock();
            if state.entropy_offline {
                return Err(CryptoError::RandomUnavailable {
                    reason: "mock entropy source offline".into(),
                });
            }

            let fill = state.counter;
            state.counter = state.counter.wrapping_add(1);
            for byte in buffer.iter_mut() {
                *byte = state.script.pop_front().unwrap_or(fill);
            }
            Ok(())
        }
    }

}
