//! Tests for the PKI sign-and-encrypt protocol.
//!
//! These tests verify:
//! - A package produced by an independent implementation views correctly
//! - Round trip through certificates and raw keys
//! - Signature length is bounded on encrypt; a bad prefix on decrypt is
//!   an authentication failure
//! - Tampering, wrong keys and unknown versions fail closed
//! - Certificate preconditions name the offending party

use std::sync::LazyLock;

use base64::{Engine, engine::general_purpose::STANDARD};
use launchseal_core::{
    EncryptedLaunchPackage, ErrorKind, LaunchError, PartyCertificate, PkiProtocol,
    env::test_utils::MockEnv,
    is_pki_encrypted, is_shared_secret_encrypted,
    pki::{
        self, MAX_SIGNATURE_LENGTH, SignedMessage,
        envelope::{self, MALFORMED_SIGNATURE_PREFIX},
        load_private_key_pem, load_public_key_pem,
    },
};
use proptest::prelude::*;
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing_subscriber::EnvFilter;

const FOX: &str = "The quick brown fox jumps over the lazy dog";

const INTEGRATING_PARTY_CERT: &str = include_str!("fixtures/integrating_party_cert.pem");
const INTEGRATING_PARTY_KEY: &str = include_str!("fixtures/integrating_party_key.pem");
const LAUNCH_SYSTEM_CERT: &str = include_str!("fixtures/launch_system_cert.pem");
const LAUNCH_SYSTEM_KEY: &str = include_str!("fixtures/launch_system_key.pem");
const KNOWN_PACKAGE: &str = include_str!("fixtures/pki_package_v1.txt");

static SENDER_KEY: LazyLock<RsaPrivateKey> =
    LazyLock::new(|| load_private_key_pem(INTEGRATING_PARTY_KEY).unwrap());
static RECIPIENT_KEY: LazyLock<RsaPrivateKey> =
    LazyLock::new(|| load_private_key_pem(LAUNCH_SYSTEM_KEY).unwrap());

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn integrating_party() -> PartyCertificate {
    PartyCertificate::from_pem(INTEGRATING_PARTY_CERT)
        .unwrap()
        .with_private_key_pem(INTEGRATING_PARTY_KEY)
        .unwrap()
}

fn launch_system() -> PartyCertificate {
    PartyCertificate::from_pem(LAUNCH_SYSTEM_CERT)
        .unwrap()
        .with_private_key_pem(LAUNCH_SYSTEM_KEY)
        .unwrap()
}

fn protocol() -> PkiProtocol<MockEnv> {
    PkiProtocol::new(MockEnv::at_unix(0))
}

fn sender_public() -> RsaPublicKey {
    RsaPublicKey::from(&*SENDER_KEY)
}

fn recipient_public() -> RsaPublicKey {
    RsaPublicKey::from(&*RECIPIENT_KEY)
}

#[test]
fn views_known_package() {
    init_tracing();
    let package = KNOWN_PACKAGE.trim();
    assert!(is_pki_encrypted(package));
    assert!(!is_shared_secret_encrypted(package));

    let launch_system = launch_system();
    let integrating_party = PartyCertificate::from_pem(INTEGRATING_PARTY_CERT).unwrap();

    let viewed =
        protocol().view_with_certificates(package, &launch_system, &integrating_party).unwrap();
    assert_eq!(viewed, FOX);
}

#[test]
fn round_trip_with_certificates() {
    init_tracing();
    let protocol = protocol();
    let integrating_party = integrating_party();
    let launch_system = launch_system();

    let secured =
        protocol.secure_with_certificates(FOX, &integrating_party, &launch_system).unwrap();
    assert!(is_pki_encrypted(&secured));

    let viewed =
        protocol.view_with_certificates(&secured, &launch_system, &integrating_party).unwrap();
    assert_eq!(viewed, FOX);
}

#[test]
fn session_key_and_iv_come_from_environment() {
    let env = MockEnv::at_unix(0);
    env.script(&[0x42; 32]);
    env.script(&[0x24; 16]);
    let protocol = PkiProtocol::new(env);

    let secured = protocol.secure("a=1", &SENDER_KEY, &recipient_public()).unwrap();
    let package = EncryptedLaunchPackage::deserialize(&secured).unwrap();
    assert_eq!(package.iv, vec![0x24; 16]);
    assert_eq!(package.protocol_version, 1);
    assert_eq!(package.wrapped_key.len(), 256);

    let session_key = RECIPIENT_KEY
        .decrypt(rsa::Oaep::new::<sha1::Sha1>(), &package.wrapped_key)
        .unwrap();
    assert_eq!(session_key, vec![0x42; 32]);
}

#[test]
fn viewing_is_repeatable() {
    let secured = pki::secure(FOX, &SENDER_KEY, &recipient_public()).unwrap();
    for _ in 0..3 {
        assert_eq!(pki::view(&secured, &RECIPIENT_KEY, &sender_public()).unwrap(), FOX);
    }
}

#[test]
fn secure_requires_sender_private_key() {
    let public_only = PartyCertificate::from_pem(INTEGRATING_PARTY_CERT).unwrap();
    let err = protocol().secure_with_certificates(FOX, &public_only, &launch_system()).unwrap_err();
    assert_eq!(err, LaunchError::MissingPrivateKey { party: "integrating party" });
}

#[test]
fn view_requires_recipient_private_key() {
    let secured = pki::secure(FOX, &SENDER_KEY, &recipient_public()).unwrap();
    let public_only = PartyCertificate::from_pem(LAUNCH_SYSTEM_CERT).unwrap();

    let err = protocol()
        .view_with_certificates(&secured, &public_only, &integrating_party())
        .unwrap_err();
    assert_eq!(err, LaunchError::MissingPrivateKey { party: "launch system" });
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn oversized_signature_is_rejected_on_encrypt() {
    let message = SignedMessage {
        payload: FOX.as_bytes().to_vec(),
        signature: vec![1; MAX_SIGNATURE_LENGTH + 1],
    };
    let err = envelope::encrypt(&MockEnv::at_unix(0), &message, &recipient_public()).unwrap_err();
    assert_eq!(err, LaunchError::SignatureLengthExceeded { len: 1025, max: 1024 });
}

#[test]
fn oversized_signature_is_rejected_on_decrypt() {
    // A package whose plaintext declares a 2000-byte signature
    let message = SignedMessage { payload: vec![0; 2100], signature: Vec::new() };
    let mut package =
        envelope::encrypt(&MockEnv::at_unix(0), &message, &recipient_public()).unwrap();
    let forged = {
        let mut packed = 2000u32.to_le_bytes().to_vec();
        packed.extend_from_slice(&[0; 2100]);
        packed
    };
    package.cipher_payload = reencrypt(&package, &forged);

    let err = pki::view(&package.serialize(), &RECIPIENT_KEY, &sender_public()).unwrap_err();
    assert_eq!(err, LaunchError::AuthenticationFailed { reason: MALFORMED_SIGNATURE_PREFIX });
    assert!(!err.to_string().contains("2000"));
}

#[test]
fn truncated_signature_is_rejected_on_decrypt() {
    let message = SignedMessage { payload: Vec::new(), signature: Vec::new() };
    let mut package =
        envelope::encrypt(&MockEnv::at_unix(0), &message, &recipient_public()).unwrap();
    let forged = {
        let mut packed = 300u32.to_le_bytes().to_vec();
        packed.extend_from_slice(&[0; 100]);
        packed
    };
    package.cipher_payload = reencrypt(&package, &forged);

    let err = pki::view(&package.serialize(), &RECIPIENT_KEY, &sender_public()).unwrap_err();
    assert_eq!(err, LaunchError::AuthenticationFailed { reason: MALFORMED_SIGNATURE_PREFIX });
    assert!(err.to_string().contains("signature"));
    assert!(!err.to_string().contains("300"));
}

#[test]
fn iv_flips_in_length_prefix_are_authentication_failures() {
    init_tracing();
    let secured = pki::secure(FOX, &SENDER_KEY, &recipient_public()).unwrap();

    // The IV is XORed into the first block, which starts with the length prefix
    for index in 0..4 {
        for bit in [0, 7] {
            let mut package = EncryptedLaunchPackage::deserialize(&secured).unwrap();
            package.iv[index] ^= 1 << bit;

            let err =
                pki::view(&package.serialize(), &RECIPIENT_KEY, &sender_public()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Authentication, "iv[{index}] bit {bit}: {err:?}");
            assert!(err.is_attack_signal());
        }
    }
}

/// Replace a package's payload, keeping its wrapped session key.
fn reencrypt(package: &EncryptedLaunchPackage, packed: &[u8]) -> Vec<u8> {
    let session_key = RECIPIENT_KEY
        .decrypt(rsa::Oaep::new::<sha1::Sha1>(), &package.wrapped_key)
        .unwrap();
    launchseal_crypto::block::cbc_encrypt(&session_key, &package.iv, packed).unwrap()
}

#[test]
fn unsigned_plaintext_is_authentication_failure() {
    let forged = SignedMessage { payload: b"admin=true".to_vec(), signature: vec![0; 256] };
    let package = envelope::encrypt(&MockEnv::at_unix(0), &forged, &recipient_public()).unwrap();

    let err = pki::view(&package.serialize(), &RECIPIENT_KEY, &sender_public()).unwrap_err();
    assert!(matches!(err, LaunchError::AuthenticationFailed { .. }));
    assert!(err.is_attack_signal());
}

#[test]
fn non_utf8_plaintext_is_rejected() {
    let message = pki::sign(&[0xff, 0xfe, 0xfd], &SENDER_KEY).unwrap();
    let package = envelope::encrypt(&MockEnv::at_unix(0), &message, &recipient_public()).unwrap();

    let err = pki::view(&package.serialize(), &RECIPIENT_KEY, &sender_public()).unwrap_err();
    assert!(matches!(err, LaunchError::InvalidInput { field: "plaintext", .. }));
}

#[test]
fn unknown_versions_fail_closed() {
    let mut package = EncryptedLaunchPackage::deserialize(KNOWN_PACKAGE.trim()).unwrap();
    for version in [0, 2, 9, u16::MAX] {
        package.protocol_version = version;
        let err = pki::view(&package.serialize(), &RECIPIENT_KEY, &sender_public()).unwrap_err();
        assert_eq!(err, LaunchError::UnsupportedVersion { version, supported: 1 });
    }
}

#[test]
fn loads_public_key_pem() {
    use rsa::pkcs8::{EncodePublicKey, LineEnding};

    let pem = sender_public().to_public_key_pem(LineEnding::CRLF).unwrap();
    let key = load_public_key_pem(&pem).unwrap();

    let secured = pki::secure(FOX, &SENDER_KEY, &recipient_public()).unwrap();
    assert_eq!(pki::view(&secured, &RECIPIENT_KEY, &key).unwrap(), FOX);
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Payload,
    WrappedKey,
    Iv,
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_round_trip(plaintext in "[ -~]{0,512}") {
        let secured = pki::secure(&plaintext, &SENDER_KEY, &recipient_public()).unwrap();
        let viewed = pki::view(&secured, &RECIPIENT_KEY, &sender_public()).unwrap();
        prop_assert_eq!(viewed, plaintext);
    }

    #[test]
    fn prop_bit_flip_never_yields_plaintext(
        field in prop_oneof![Just(Field::Payload), Just(Field::WrappedKey), Just(Field::Iv)],
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let secured = pki::secure(FOX, &SENDER_KEY, &recipient_public()).unwrap();
        let mut package = EncryptedLaunchPackage::deserialize(&secured).unwrap();

        let bytes = match field {
            Field::Payload => &mut package.cipher_payload,
            Field::WrappedKey => &mut package.wrapped_key,
            Field::Iv => &mut package.iv,
        };
        let index = position.index(bytes.len());
        bytes[index] ^= 1 << bit;

        let result = pki::view(&package.serialize(), &RECIPIENT_KEY, &sender_public());
        prop_assert!(result.is_err(), "{:?} flip at {} accepted", field, index);
        let err = result.unwrap_err();
        prop_assert_eq!(
            err.kind(),
            ErrorKind::Authentication,
            "{:?} flip at {}: {:?}",
            field,
            index,
            err
        );
    }
}

#[test]
fn rejects_bad_base64_fields() {
    let query = format!("SEUS={}&ESP=%%%&IV=AA%3D%3D&V=1", STANDARD.encode([1, 2, 3]));
    let err = pki::view(&query, &RECIPIENT_KEY, &sender_public()).unwrap_err();
    assert!(matches!(err, LaunchError::InvalidInput { field: "ESP", .. }));
}
