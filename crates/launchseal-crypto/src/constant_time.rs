//! Constant-time equality for secrets of bounded length
//!
//! Both inputs are padded to a caller-supplied maximum so that the amount of
//! work depends only on that maximum, never on where the inputs differ or on
//! their actual lengths. The maximum must be a domain constant (e.g. the MAC
//! size), not something computed from the inputs.

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::CryptoError;

/// Filler for the unused tail of the padded buffers
const PAD_BYTE: u8 = 0x1c;

/// Compare two byte sequences without short-circuiting.
///
/// Returns `Ok(false)` when they differ in content or length, and
/// `Err(LengthExceeded)` only when either input is longer than `max_len`.
pub fn constant_time_eq(first: &[u8], second: &[u8], max_len: usize) -> Result<bool, CryptoError> {
    if first.len() > max_len {
        return Err(CryptoError::LengthExceeded { field: "first", len: first.len(), max: max_len });
    }
    if second.len() > max_len {
        return Err(CryptoError::LengthExceeded {
            field: "second",
            len: second.len(),
            max: max_len,
        });
    }

    let mut padded_first = pad(first, max_len);
    let mut padded_second = pad(second, max_len);

    // Padding alone would make "ab" equal "ab\x1c", so lengths take part too
    let same_len = (first.len() as u64).ct_eq(&(second.len() as u64));
    let same_bytes = padded_first.as_slice().ct_eq(padded_second.as_slice());
    let equal = bool::from(same_len & same_bytes);

    padded_first.zeroize();
    padded_second.zeroize();

    Ok(equal)
}

/// Compare the UTF-8 bytes of two strings in constant time.
///
/// `max_len` bounds the byte length, not the character count.
pub fn constant_time_str_eq(
    first: &str,
    second: &str,
    max_len: usize,
) -> Result<bool, CryptoError> {
    constant_time_eq(first.as_bytes(), second.as_bytes(), max_len)
}

fn pad(input: &[u8], max_len: usize) -> Vec<u8> {
    let mut padded = Vec::with_capacity(max_len);
    padded.extend_from_slice(input);
    padded.resize(max_len, PAD_BYTE);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_compare_equal() {
        assert!(constant_time_eq(b"secret", b"secret", 32).unwrap());
        assert!(constant_time_eq(&[], &[], 0).unwrap());
        assert!(constant_time_eq(&[7u8; 32], &[7u8; 32], 32).unwrap());
    }

    #[test]
    fn different_inputs_compare_unequal() {
        assert!(!constant_time_eq(b"secret", b"secreT", 32).unwrap());
        assert!(!constant_time_eq(b"Secret", b"secret", 32).unwrap());
    }

    #[test]
    fn length_difference_is_not_hidden_by_padding() {
        assert!(!constant_time_eq(b"ab", b"ab\x1c", 8).unwrap());
        assert!(!constant_time_eq(b"", b"\x1c", 8).unwrap());
        assert!(!constant_time_eq(b"abc", b"ab", 8).unwrap());
    }

    #[test]
    fn over_length_input_is_rejected() {
        let err = constant_time_eq(&[0u8; 33], &[0u8; 32], 32).unwrap_err();
        assert!(matches!(err, CryptoError::LengthExceeded { field: "first", len: 33, max: 32 }));

        let err = constant_time_eq(&[0u8; 32], &[0u8; 40], 32).unwrap_err();
        assert!(matches!(err, CryptoError::LengthExceeded { field: "second", len: 40, max: 32 }));
    }

    #[test]
    fn inputs_exactly_at_max_are_accepted() {
        assert!(constant_time_eq(&[1u8; 16], &[1u8; 16], 16).unwrap());
    }

    #[test]
    fn string_comparison_uses_utf8_bytes() {
        assert!(constant_time_str_eq("åäö", "åäö", 6).unwrap());
        assert!(!constant_time_str_eq("åäö", "aao", 6).unwrap());
        // Three characters, six bytes
        assert!(constant_time_str_eq("åäö", "åäö", 5).is_err());
    }
}
