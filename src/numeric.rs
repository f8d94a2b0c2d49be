//! Binary numeric primitives.
//!
//! Every binary Ion value, length prefix and symbol reference is built from
//! four integer representations:
//!
//! | Form | Layout |
//! |------|--------|
//! | `UInt` | big-endian magnitude, fixed width |
//! | `Int` | big-endian sign-magnitude, sign in the high bit of the first byte |
//! | `VarUInt` | 7 bits per byte, high bit set on the last byte only |
//! | `VarInt` | like `VarUInt`, first byte carries the sign in `0x40` and 6 bits |
//!
//! The `Var` forms are self-delimiting: the end marker makes a sequence of
//! them prefix-free, so a cursor can consume one without a length field.
//!
//! Encoders append to a caller-supplied `Vec<u8>` and return the number of
//! bytes written. Decoders take a slice starting at the encoded value and
//! return the value with the number of bytes consumed.
//!
//! ```rust
//! use serde_ion::numeric;
//!
//! let mut buf = Vec::new();
//! numeric::encode_var_uint(&mut buf, 300);
//! numeric::encode_var_int(&mut buf, -5);
//!
//! let (a, used) = numeric::decode_var_uint(&buf).unwrap();
//! let (b, _) = numeric::decode_var_int(&buf[used..]).unwrap();
//! assert_eq!((a, b), (300, -5));
//! ```

use crate::error::{Error, Result};
use num_bigint::{BigInt, BigUint, Sign};

/// Maximum bytes needed for a 64-bit `VarUInt` or `VarInt` (10 bytes)
pub const MAX_VAR_SIZE: usize = 10;

const END_FLAG: u8 = 0x80;
const VAR_INT_SIGN: u8 = 0x40;
const INT_SIGN: u8 = 0x80;

/// The one-byte `VarInt` encoding of negative zero.
pub const VAR_INT_NEGATIVE_ZERO: u8 = END_FLAG | VAR_INT_SIGN;

/// Number of bytes a `UInt` needs for `value` (zero needs none).
#[inline]
#[must_use]
pub const fn uint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    (bits + 7) / 8
}

/// Number of bytes an `Int` needs for a magnitude, sign bit included.
#[inline]
#[must_use]
pub const fn int_len(magnitude: u64) -> usize {
    if magnitude == 0 {
        return 0;
    }
    let bits = 64 - magnitude.leading_zeros() as usize;
    (bits + 1 + 7) / 8
}

/// Number of bytes a `VarUInt` needs for `value` (at least one).
#[inline]
#[must_use]
pub const fn var_uint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    if bits == 0 {
        1
    } else {
        (bits + 6) / 7
    }
}

/// Number of bytes a `VarInt` needs for a magnitude.
#[inline]
#[must_use]
pub const fn var_int_len(magnitude: u64) -> usize {
    let bits = 64 - magnitude.leading_zeros() as usize;
    if bits <= 6 {
        1
    } else {
        1 + (bits - 6 + 6) / 7
    }
}

/// Packs `value` into exactly `length` big-endian bytes, left-padded with zeros.
///
/// # Errors
///
/// Returns [`Error::EncodingOverflow`] if `value` needs more than `length`
/// bytes. Nothing is written in that case.
pub fn encode_fixed_uint(out: &mut Vec<u8>, value: u64, length: usize) -> Result<usize> {
    let needed = uint_len(value);
    if needed > length {
        return Err(Error::overflow(value, length));
    }
    out.extend(std::iter::repeat(0u8).take(length - needed));
    out.extend_from_slice(&value.to_be_bytes()[8 - needed..]);
    Ok(length)
}

/// Packs `value` as a sign-magnitude `Int` of exactly `length` bytes.
///
/// # Errors
///
/// Returns [`Error::EncodingOverflow`] if the magnitude plus sign bit does not
/// fit in `length` bytes.
pub fn encode_fixed_int(out: &mut Vec<u8>, value: i64, length: usize) -> Result<usize> {
    let magnitude = value.unsigned_abs();
    if int_len(magnitude) > length {
        return Err(Error::overflow(value, length));
    }
    let start = out.len();
    let magnitude_len = uint_len(magnitude);
    out.extend(std::iter::repeat(0u8).take(length - magnitude_len));
    out.extend_from_slice(&magnitude.to_be_bytes()[8 - magnitude_len..]);
    if value < 0 {
        out[start] |= INT_SIGN;
    }
    Ok(length)
}

/// Encodes `value` as a minimal `VarUInt`.
pub fn encode_var_uint(out: &mut Vec<u8>, value: u64) -> usize {
    let len = var_uint_len(value);
    for i in (0..len).rev() {
        let mut byte = ((value >> (7 * i)) & 0x7F) as u8;
        if i == 0 {
            byte |= END_FLAG;
        }
        out.push(byte);
    }
    len
}

/// Encodes `value` as a minimal `VarInt`.
pub fn encode_var_int(out: &mut Vec<u8>, value: i64) -> usize {
    let magnitude = value.unsigned_abs();
    let len = var_int_len(magnitude);
    for i in (0..len).rev() {
        let group = magnitude >> (7 * i);
        let mut byte = if i == len - 1 {
            let mut first = (group & 0x3F) as u8;
            if value < 0 {
                first |= VAR_INT_SIGN;
            }
            first
        } else {
            (group & 0x7F) as u8
        };
        if i == 0 {
            byte |= END_FLAG;
        }
        out.push(byte);
    }
    len
}

/// Encodes a floating point input as a `VarInt`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if `value` is not finite, has a fractional
/// part, or lies outside the 64-bit signed range.
pub fn encode_var_int_f64(out: &mut Vec<u8>, value: f64) -> Result<usize> {
    // 2^63 is exactly representable; anything at or above it is out of range.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(Error::InvalidInput(format!(
            "cannot encode non-integer value {value} as a VarInt"
        )));
    }
    if value >= LIMIT || value < -LIMIT {
        return Err(Error::InvalidInput(format!(
            "value {value} is outside the VarInt range"
        )));
    }
    Ok(encode_var_int(out, value as i64))
}

/// Encodes a `UInt` magnitude of arbitrary size with minimal length.
pub fn encode_uint_big(out: &mut Vec<u8>, value: &BigUint) -> usize {
    if value.bits() == 0 {
        return 0;
    }
    let bytes = value.to_bytes_be();
    out.extend_from_slice(&bytes);
    bytes.len()
}

/// Encodes an `Int` of arbitrary size with minimal length (zero is empty).
pub fn encode_int_big(out: &mut Vec<u8>, value: &BigInt) -> usize {
    let (sign, bytes) = value.to_bytes_be();
    if sign == Sign::NoSign {
        return 0;
    }
    let start = out.len();
    if bytes[0] & INT_SIGN != 0 {
        out.push(0);
    }
    out.extend_from_slice(&bytes);
    if sign == Sign::Minus {
        out[start] |= INT_SIGN;
    }
    out.len() - start
}

/// Decodes a whole slice as a `UInt`.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] if the magnitude exceeds 64 bits; use
/// [`decode_fixed_uint_big`] for those.
pub fn decode_fixed_uint(bytes: &[u8]) -> Result<u64> {
    let significant = bytes.iter().skip_while(|b| **b == 0).count();
    if significant > 8 {
        return Err(Error::malformed(0, "UInt exceeds 64 bits"));
    }
    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Decodes a whole slice as a `UInt` of arbitrary size.
#[must_use]
pub fn decode_fixed_uint_big(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Decodes a whole slice as a sign-magnitude `Int`.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] if the value does not fit in an `i64`.
pub fn decode_fixed_int(bytes: &[u8]) -> Result<i64> {
    let Some((&first, rest)) = bytes.split_first() else {
        return Ok(0);
    };
    let negative = first & INT_SIGN != 0;
    let mut magnitude = u64::from(first & !INT_SIGN);
    for (i, b) in rest.iter().enumerate() {
        if magnitude > (u64::MAX >> 8) {
            return Err(Error::malformed(i + 1, "Int exceeds 64 bits"));
        }
        magnitude = (magnitude << 8) | u64::from(*b);
    }
    signed_from_magnitude(magnitude, negative)
        .ok_or_else(|| Error::malformed(0, "Int exceeds 64 bits"))
}

/// Decodes a whole slice as a sign-magnitude `Int` of arbitrary size.
#[must_use]
pub fn decode_fixed_int_big(bytes: &[u8]) -> BigInt {
    let Some((&first, rest)) = bytes.split_first() else {
        return BigInt::default();
    };
    let mut magnitude = Vec::with_capacity(bytes.len());
    magnitude.push(first & !INT_SIGN);
    magnitude.extend_from_slice(rest);
    let sign = if first & INT_SIGN != 0 {
        Sign::Minus
    } else {
        Sign::Plus
    };
    BigInt::from_bytes_be(sign, &magnitude)
}

/// Returns `true` if `bytes` is an `Int` encoding of negative zero.
#[must_use]
pub fn is_negative_zero_int(bytes: &[u8]) -> bool {
    match bytes.split_first() {
        Some((&first, rest)) => first == INT_SIGN && rest.iter().all(|b| *b == 0),
        None => false,
    }
}

/// Decodes a `VarUInt` from the front of `buf`.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] if the input ends before the end marker
/// or the value exceeds 64 bits.
pub fn decode_var_uint(buf: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    for (pos, byte) in buf.iter().enumerate() {
        if result > (u64::MAX >> 7) {
            return Err(Error::malformed(pos, "VarUInt exceeds 64 bits"));
        }
        result = (result << 7) | u64::from(byte & 0x7F);
        if byte & END_FLAG != 0 {
            return Ok((result, pos + 1));
        }
    }
    Err(Error::malformed(buf.len(), "truncated VarUInt"))
}

/// Decodes a `VarInt` from the front of `buf`.
///
/// Negative zero decodes as `0`; use [`is_negative_zero_var_int`] where the
/// distinction matters.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] if the input ends before the end marker
/// or the value does not fit in an `i64`.
pub fn decode_var_int(buf: &[u8]) -> Result<(i64, usize)> {
    let Some(&first) = buf.first() else {
        return Err(Error::malformed(0, "truncated VarInt"));
    };
    let negative = first & VAR_INT_SIGN != 0;
    let mut magnitude = u64::from(first & 0x3F);
    let mut pos = 1;
    if first & END_FLAG == 0 {
        loop {
            let Some(&byte) = buf.get(pos) else {
                return Err(Error::malformed(pos, "truncated VarInt"));
            };
            if magnitude > (u64::MAX >> 7) {
                return Err(Error::malformed(pos, "VarInt exceeds 64 bits"));
            }
            magnitude = (magnitude << 7) | u64::from(byte & 0x7F);
            pos += 1;
            if byte & END_FLAG != 0 {
                break;
            }
        }
    }
    let value = signed_from_magnitude(magnitude, negative)
        .ok_or_else(|| Error::malformed(0, "VarInt exceeds 64 bits"))?;
    Ok((value, pos))
}

/// Returns `true` if `buf` starts with a `VarInt` encoding of negative zero.
#[must_use]
pub fn is_negative_zero_var_int(buf: &[u8]) -> bool {
    let Some(&first) = buf.first() else {
        return false;
    };
    if first & VAR_INT_SIGN == 0 || first & 0x3F != 0 {
        return false;
    }
    if first & END_FLAG != 0 {
        return true;
    }
    for byte in &buf[1..] {
        if byte & 0x7F != 0 {
            return false;
        }
        if byte & END_FLAG != 0 {
            return true;
        }
    }
    false
}

fn signed_from_magnitude(magnitude: u64, negative: bool) -> Option<i64> {
    if negative {
        if magnitude == 1u64 << 63 {
            Some(i64::MIN)
        } else {
            i64::try_from(magnitude).ok().map(|m| -m)
        }
    } else {
        i64::try_from(magnitude).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARIES: [i64; 11] = [
        0,
        1,
        127,
        128,
        16383,
        16384,
        -1,
        -127,
        -128,
        i64::MAX,
        i64::MIN,
    ];

    fn var_uint(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        encode_var_uint(&mut out, value);
        out
    }

    fn var_int(value: i64) -> Vec<u8> {
        let mut out = Vec::new();
        encode_var_int(&mut out, value);
        out
    }

    #[test]
    fn test_var_uint_layout() {
        assert_eq!(var_uint(0), vec![0x80]);
        assert_eq!(var_uint(127), vec![0xFF]);
        assert_eq!(var_uint(128), vec![0x01, 0x80]);
        assert_eq!(var_uint(16383), vec![0x7F, 0xFF]);
        assert_eq!(var_uint(16384), vec![0x01, 0x00, 0x80]);
    }

    #[test]
    fn test_var_int_layout() {
        assert_eq!(var_int(0), vec![0x80]);
        assert_eq!(var_int(-1), vec![0xC1]);
        assert_eq!(var_int(63), vec![0xBF]);
        assert_eq!(var_int(64), vec![0x00, 0xC0]);
        assert_eq!(var_int(-64), vec![0x40, 0xC0]);
    }

    #[test]
    fn test_var_uint_roundtrip() {
        for value in [0, 1, 127, 128, 16383, 16384, u32::MAX as u64, u64::MAX] {
            let encoded = var_uint(value);
            assert_eq!(encoded.len(), var_uint_len(value));
            assert_eq!(decode_var_uint(&encoded).unwrap(), (value, encoded.len()));
        }
    }

    #[test]
    fn test_var_int_roundtrip() {
        for value in BOUNDARIES {
            let encoded = var_int(value);
            assert!(encoded.len() <= MAX_VAR_SIZE);
            assert_eq!(decode_var_int(&encoded).unwrap(), (value, encoded.len()));
        }
    }

    #[test]
    fn test_fixed_int_roundtrip() {
        for value in BOUNDARIES {
            let mut out = Vec::new();
            let length = int_len(value.unsigned_abs()).max(1);
            encode_fixed_int(&mut out, value, length).unwrap();
            assert_eq!(out.len(), length);
            assert_eq!(decode_fixed_int(&out).unwrap(), value);
        }
    }

    #[test]
    fn test_fixed_uint_roundtrip() {
        for value in BOUNDARIES {
            let value = value.unsigned_abs();
            let mut out = Vec::new();
            encode_fixed_uint(&mut out, value, 8).unwrap();
            assert_eq!(out.len(), 8);
            assert_eq!(decode_fixed_uint(&out).unwrap(), value);
        }
    }

    #[test]
    fn test_fixed_uint_padding() {
        let mut out = Vec::new();
        encode_fixed_uint(&mut out, 16384, 4).unwrap();
        assert_eq!(out, vec![0x00, 0x00, 0x40, 0x00]);
    }

    #[test]
    fn test_fixed_uint_overflow() {
        let mut out = Vec::new();
        assert!(matches!(
            encode_fixed_uint(&mut out, 256, 1),
            Err(Error::EncodingOverflow { length: 1, .. })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_fixed_int_sign_bit() {
        let mut out = Vec::new();
        encode_fixed_int(&mut out, -1, 1).unwrap();
        assert_eq!(out, vec![0x81]);

        out.clear();
        encode_fixed_int(&mut out, -128, 2).unwrap();
        assert_eq!(out, vec![0x80, 0x80]);

        // 128 needs the sign bit of a second byte.
        assert!(encode_fixed_int(&mut out, 128, 1).is_err());
    }

    #[test]
    fn test_var_int_rejects_fraction() {
        let mut out = Vec::new();
        assert!(matches!(
            encode_var_int_f64(&mut out, 1.5),
            Err(Error::InvalidInput(_))
        ));
        assert!(encode_var_int_f64(&mut out, f64::NAN).is_err());
        assert!(out.is_empty());
        assert_eq!(encode_var_int_f64(&mut out, -3.0).unwrap(), 1);
        assert_eq!(out, vec![0xC3]);
    }

    #[test]
    fn test_prefix_free() {
        let mut out = Vec::new();
        encode_var_uint(&mut out, 16384);
        encode_var_uint(&mut out, 7);
        let (first, used) = decode_var_uint(&out).unwrap();
        let (second, _) = decode_var_uint(&out[used..]).unwrap();
        assert_eq!((first, second), (16384, 7));
    }

    #[test]
    fn test_truncated_var_uint() {
        let err = decode_var_uint(&[0x01, 0x02]).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { offset: 2, .. }));
        assert!(decode_var_int(&[0x01]).is_err());
        assert!(decode_var_int(&[]).is_err());
    }

    #[test]
    fn test_var_uint_overflow() {
        let mut bytes = vec![0x7F; 10];
        bytes.push(0xFF);
        assert!(decode_var_uint(&bytes).is_err());
    }

    #[test]
    fn test_negative_zero() {
        assert!(is_negative_zero_var_int(&[VAR_INT_NEGATIVE_ZERO]));
        assert!(is_negative_zero_var_int(&[0x40, 0x80]));
        assert!(!is_negative_zero_var_int(&[0x80]));
        assert_eq!(decode_var_int(&[VAR_INT_NEGATIVE_ZERO]).unwrap(), (0, 1));
        assert!(is_negative_zero_int(&[0x80]));
        assert!(!is_negative_zero_int(&[0x81]));
    }

    #[test]
    fn test_big_int_magnitudes() {
        let big = BigInt::from(u64::MAX) * BigInt::from(4u8) + BigInt::from(1u8);
        let mut out = Vec::new();
        let len = encode_int_big(&mut out, &-big.clone());
        assert_eq!(len, out.len());
        assert_eq!(out[0] & INT_SIGN, INT_SIGN);
        assert_eq!(decode_fixed_int_big(&out), -big);

        out.clear();
        assert_eq!(encode_int_big(&mut out, &BigInt::from(0u8)), 0);
        assert_eq!(encode_int_big(&mut out, &BigInt::from(128u8)), 2);
        assert_eq!(out, vec![0x00, 0x80]);
    }
}
