//! One-time signatures with replay protection
//!
//! A signature binds data to a timestamp and a random nonce, and a verifier
//! accepts each nonce at most once while its timestamp is fresh. Old messages
//! fail the freshness check and replays within the window fail the nonce
//! check, so each signature verifies exactly once.
//!
//! # Wire format
//!
//! ```text
//! | mac (32) | timestamp (8, LE) | nonce (32) | data (N) |
//!            └──────────── packed ────────────────────────┘
//! mac = HMAC-SHA256(key, packed)
//! ```
//!
//! Not suitable where a message must be verified more than once.

use std::time::Duration;

use launchseal_crypto::{constant_time_eq, hmac_sha256};

use crate::{
    Environment, LaunchError,
    config::SignatureConfig,
    nonce_store::{NONCE_SIZE, NonceRecord, NonceStore},
    timestamp::Timestamp,
};

/// HMAC-SHA256 size
pub const MAC_SIZE: usize = 32;

/// Encoded timestamp size
pub const TIMESTAMP_SIZE: usize = 8;

/// Smallest valid signed message (empty data)
pub const MIN_SIGNED_LEN: usize = MAC_SIZE + TIMESTAMP_SIZE + NONCE_SIZE;

/// Fields of a packed message, borrowed from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unpacked<'a> {
    /// When the message was signed
    pub timestamp: Timestamp,
    /// Per-signature random nonce
    pub nonce: &'a [u8; NONCE_SIZE],
    /// Signed payload
    pub data: &'a [u8],
}

/// Pack `[timestamp][nonce][data]`.
pub fn pack(data: &[u8], timestamp: Timestamp, nonce: &[u8; NONCE_SIZE]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(TIMESTAMP_SIZE + NONCE_SIZE + data.len());
    packed.extend_from_slice(&timestamp.to_binary().to_le_bytes());
    packed.extend_from_slice(nonce);
    packed.extend_from_slice(data);
    packed
}

/// Split a packed message into its fields.
pub fn unpack(packed: &[u8]) -> Result<Unpacked<'_>, LaunchError> {
    let too_short = || {
        LaunchError::invalid(
            "signed data",
            format!(
                "{} bytes is shorter than timestamp and nonce ({} bytes)",
                packed.len(),
                TIMESTAMP_SIZE + NONCE_SIZE
            ),
        )
    };

    let (raw_timestamp, rest) = packed.split_first_chunk::<TIMESTAMP_SIZE>().ok_or_else(too_short)?;
    let (nonce, data) = rest.split_first_chunk::<NONCE_SIZE>().ok_or_else(too_short)?;
    let timestamp = Timestamp::from_binary(i64::from_le_bytes(*raw_timestamp))?;

    Ok(Unpacked { timestamp, nonce, data })
}

/// Signs and verifies one-time signatures.
///
/// Time and nonces come from the injected [`Environment`].
#[derive(Debug, Clone)]
pub struct OneTimeSignature<E> {
    env: E,
    config: SignatureConfig,
}

impl<E: Environment> OneTimeSignature<E> {
    /// Create a signer with the default 30 second window.
    pub fn new(env: E) -> Self {
        Self::with_config(env, SignatureConfig::default())
    }

    /// Create a signer with a custom configuration.
    pub fn with_config(env: E, config: SignatureConfig) -> Self {
        Self { env, config }
    }

    /// Active configuration.
    pub fn config(&self) -> &SignatureConfig {
        &self.config
    }

    /// Environment used for time and randomness.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Sign `data`, returning `mac || packed`.
    pub fn sign(&self, data: &[u8], key: &[u8]) -> Result<Vec<u8>, LaunchError> {
        let timestamp = Timestamp::from_system_time(self.env.now());
        let nonce = self.env.random_array::<NONCE_SIZE>()?;

        let packed = pack(data, timestamp, &nonce);
        let mac = hmac_sha256(key, &packed);

        let mut signed = Vec::with_capacity(MAC_SIZE + packed.len());
        signed.extend_from_slice(&mac);
        signed.extend_from_slice(&packed);
        Ok(signed)
    }

    /// Verify a one-time signature and return the signed data.
    ///
    /// Checks run cheapest first: freshness, then nonce reuse, then the MAC.
    /// Only a message passing all three records its nonce, after which
    /// expired nonces are purged from the front of `store`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: too short to hold MAC, timestamp and nonce
    /// - `Stale`: older than the configured maximum age
    /// - `Replay`: nonce already in `store`
    /// - `AuthenticationFailed`: MAC mismatch
    pub fn verify<S>(&self, signed: &[u8], key: &[u8], store: &S) -> Result<Vec<u8>, LaunchError>
    where
        S: NonceStore + ?Sized,
    {
        let (mac, packed) = signed.split_first_chunk::<MAC_SIZE>().ok_or_else(|| {
            LaunchError::invalid(
                "signature",
                format!("{} bytes is shorter than the minimum of {MIN_SIGNED_LEN}", signed.len()),
            )
        })?;
        let unpacked = unpack(packed)?;

        let now = Timestamp::from_system_time(self.env.now());
        let max_age = self.config.max_age;
        if let Some(age) = unpacked.timestamp.age_at(now)
            && age > max_age
        {
            tracing::debug!(age_ms = age.as_millis() as u64, "rejecting stale signature");
            return Err(LaunchError::Stale { age, max_age });
        }

        if store.contains(unpacked.nonce) {
            tracing::warn!("nonce reused, possible replay attack");
            return Err(LaunchError::Replay);
        }

        let expected = hmac_sha256(key, packed);
        if !constant_time_eq(&expected, mac, MAC_SIZE)? {
            tracing::warn!("one-time signature MAC mismatch");
            return Err(LaunchError::AuthenticationFailed { reason: "signature mismatch" });
        }

        // A concurrent verification may have recorded the nonce since the check above
        let record = NonceRecord { nonce: *unpacked.nonce, timestamp: unpacked.timestamp };
        if !store.enqueue_if_absent(record) {
            tracing::warn!("nonce reused concurrently, possible replay attack");
            return Err(LaunchError::Replay);
        }

        let purged = store.purge_expired(&|r: &NonceRecord| r.is_expired(now, max_age));
        if purged > 0 {
            tracing::debug!(purged, remaining = store.len(), "purged expired nonces");
        }

        Ok(unpacked.data.to_vec())
    }
}

/// Age of a signature's timestamp relative to the environment clock.
///
/// `None` for malformed input or timestamps in the future.
pub fn signature_age<E: Environment>(env: &E, signed: &[u8]) -> Option<Duration> {
    let packed = signed.get(MAC_SIZE..)?;
    let unpacked = unpack(packed).ok()?;
    unpacked.timestamp.age_at(Timestamp::from_system_time(env.now()))
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU8, Ordering},
        },
        time::{SystemTime, UNIX_EPOCH},
    };

    use launchseal_crypto::CryptoError;

    use super::*;
    use crate::nonce_store::MemoryNonceStore;

    const KEY: &[u8] = b"one-time signature test key 0001";

    // Fixed clock; each random_bytes call fills with the next counter value
    #[derive(Clone)]
    struct TestEnv {
        now: SystemTime,
        counter: Arc<AtomicU8>,
    }

    impl TestEnv {
        fn at(secs: u64) -> Self {
            Self {
                now: UNIX_EPOCH + Duration::from_secs(secs),
                counter: Arc::new(AtomicU8::new(1)),
            }
        }

        fn later(&self, secs: u64) -> Self {
            Self { now: self.now + Duration::from_secs(secs), counter: Arc::clone(&self.counter) }
        }
    }

    impl Environment for TestEnv {
        fn now(&self) -> SystemTime {
            self.now
        }

        fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), CryptoError> {
            buffer.fill(self.counter.fetch_add(1, Ordering::Relaxed));
            Ok(())
        }
    }

    const T0: u64 = 1_792_065_600;

    #[test]
    fn sign_then_verify_returns_data() {
        let signer = OneTimeSignature::new(TestEnv::at(T0));
        let store = MemoryNonceStore::new();

        let signed = signer.sign(b"hello", KEY).unwrap();
        assert_eq!(signed.len(), MIN_SIGNED_LEN + 5);
        assert_eq!(signer.verify(&signed, KEY, &store).unwrap(), b"hello");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn layout_is_mac_timestamp_nonce_data() {
        let signer = OneTimeSignature::new(TestEnv::at(T0));
        let signed = signer.sign(b"xyz", KEY).unwrap();

        let packed = &signed[MAC_SIZE..];
        assert_eq!(&signed[..MAC_SIZE], &hmac_sha256(KEY, packed));

        let unpacked = unpack(packed).unwrap();
        let signed_at = Timestamp::from_system_time(UNIX_EPOCH + Duration::from_secs(T0));
        assert_eq!(unpacked.timestamp, signed_at);
        assert_eq!(unpacked.nonce, &[1u8; NONCE_SIZE]);
        assert_eq!(unpacked.data, b"xyz");
    }

    #[test]
    fn second_verification_is_replay() {
        let signer = OneTimeSignature::new(TestEnv::at(T0));
        let store = MemoryNonceStore::new();
        let signed = signer.sign(b"once", KEY).unwrap();

        signer.verify(&signed, KEY, &store).unwrap();
        assert_eq!(signer.verify(&signed, KEY, &store).unwrap_err(), LaunchError::Replay);
    }

    #[test]
    fn separate_stores_do_not_share_nonces() {
        let signer = OneTimeSignature::new(TestEnv::at(T0));
        let signed = signer.sign(b"once", KEY).unwrap();

        signer.verify(&signed, KEY, &MemoryNonceStore::new()).unwrap();
        signer.verify(&signed, KEY, &MemoryNonceStore::new()).unwrap();
    }

    #[test]
    fn exactly_max_age_is_fresh() {
        let env = TestEnv::at(T0);
        let signed = OneTimeSignature::new(env.clone()).sign(b"data", KEY).unwrap();

        let verifier = OneTimeSignature::new(env.later(30));
        assert!(verifier.verify(&signed, KEY, &MemoryNonceStore::new()).is_ok());
    }

    #[test]
    fn older_than_max_age_is_stale() {
        let env = TestEnv::at(T0);
        let signed = OneTimeSignature::new(env.clone()).sign(b"data", KEY).unwrap();
        let store = MemoryNonceStore::new();

        let verifier = OneTimeSignature::new(env.later(31));
        let err = verifier.verify(&signed, KEY, &store).unwrap_err();

        assert_eq!(
            err,
            LaunchError::Stale { age: Duration::from_secs(31), max_age: Duration::from_secs(30) }
        );
        assert!(store.is_empty(), "stale messages never record their nonce");
    }

    #[test]
    fn future_timestamp_passes_freshness() {
        let env = TestEnv::at(T0 + 3600);
        let signed = OneTimeSignature::new(env.clone()).sign(b"data", KEY).unwrap();

        let verifier = OneTimeSignature::new(TestEnv::at(T0));
        assert!(verifier.verify(&signed, KEY, &MemoryNonceStore::new()).is_ok());
    }

    #[test]
    fn custom_max_age() {
        let env = TestEnv::at(T0);
        let signed = OneTimeSignature::new(env.clone()).sign(b"data", KEY).unwrap();

        let config = SignatureConfig { max_age: Duration::from_secs(5) };
        let verifier = OneTimeSignature::with_config(env.later(6), config);
        assert!(matches!(
            verifier.verify(&signed, KEY, &MemoryNonceStore::new()),
            Err(LaunchError::Stale { .. })
        ));
    }

    #[test]
    fn wrong_key_fails_without_recording_nonce() {
        let signer = OneTimeSignature::new(TestEnv::at(T0));
        let store = MemoryNonceStore::new();
        let signed = signer.sign(b"data", KEY).unwrap();

        let err = signer.verify(&signed, b"another key", &store).unwrap_err();
        assert!(err.is_attack_signal());
        assert!(store.is_empty());

        // The legitimate receiver can still verify
        assert!(signer.verify(&signed, KEY, &store).is_ok());
    }

    #[test]
    fn tampered_data_fails_authentication() {
        let signer = OneTimeSignature::new(TestEnv::at(T0));
        let mut signed = signer.sign(b"data", KEY).unwrap();
        let last = signed.len() - 1;
        signed[last] ^= 0x01;

        let err = signer.verify(&signed, KEY, &MemoryNonceStore::new()).unwrap_err();
        assert_eq!(err, LaunchError::AuthenticationFailed { reason: "signature mismatch" });
    }

    #[test]
    fn short_input_is_invalid() {
        let signer = OneTimeSignature::new(TestEnv::at(T0));
        let store = MemoryNonceStore::new();

        for len in [0, MAC_SIZE - 1, MAC_SIZE, MIN_SIGNED_LEN - 1] {
            let err = signer.verify(&vec![0u8; len], KEY, &store).unwrap_err();
            assert!(matches!(err, LaunchError::InvalidInput { .. }), "len {len}: {err:?}");
        }
    }

    #[test]
    fn verification_purges_expired_nonces() {
        let env = TestEnv::at(T0);
        let store = MemoryNonceStore::new();

        let first = OneTimeSignature::new(env.clone()).sign(b"a", KEY).unwrap();
        OneTimeSignature::new(env.clone()).verify(&first, KEY, &store).unwrap();

        let later = env.later(60);
        let second = OneTimeSignature::new(later.clone()).sign(b"b", KEY).unwrap();
        OneTimeSignature::new(later).verify(&second, KEY, &store).unwrap();

        assert_eq!(store.len(), 1, "first nonce expired and was purged");
    }

    #[test]
    fn signature_age_reads_timestamp() {
        let env = TestEnv::at(T0);
        let signed = OneTimeSignature::new(env.clone()).sign(b"a", KEY).unwrap();

        assert_eq!(signature_age(&env.later(12), &signed), Some(Duration::from_secs(12)));
        assert_eq!(signature_age(&env, &signed[..10]), None);
    }
}
