//! Little-endian base-128 variable-length integers.
//!
//! Each byte carries seven value bits; a set high bit means another byte
//! follows. The value is `sum((byte & 0x7F) << (7 * i))`.

use crate::{Error, Result};

/// Longest encoding of a 64-bit value.
pub const MAX_VARINT_BYTES: usize = 10;

/// Append `value` to `buf`.
pub fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Number of bytes `encode_varint` writes for `value`.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

/// Decode a varint from the start of `data`, returning the value and the
/// number of bytes consumed.
///
/// Offsets in returned errors are relative to `data`. Overlong encodings
/// (a trailing zero byte after a continuation) are rejected so that every
/// accepted varint re-encodes to the same bytes.
pub fn decode_varint(data: &[u8], max_bytes: usize) -> Result<(u64, usize)> {
    let max_bytes = max_bytes.min(MAX_VARINT_BYTES);
    let mut value: u64 = 0;

    for i in 0..max_bytes {
        let byte = match data.get(i) {
            Some(&b) => b,
            None => {
                return Err(Error::TruncatedRecord {
                    offset: 0,
                    declared: (i + 1) as u64,
                    remaining: data.len(),
                })
            }
        };

        let bits = (byte & 0x7F) as u64;
        if i == MAX_VARINT_BYTES - 1 && bits > 1 {
            return Err(Error::InvalidVarint {
                offset: 0,
                reason: "overflows 64 bits",
            });
        }
        value |= bits << (7 * i);

        if byte & 0x80 == 0 {
            if i > 0 && byte == 0 {
                return Err(Error::InvalidVarint {
                    offset: 0,
                    reason: "overlong encoding",
                });
            }
            return Ok((value, i + 1));
        }
    }

    Err(Error::InvalidVarint {
        offset: 0,
        reason: "exceeds maximum length",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_varint(&mut buf, value);
        buf
    }

    #[test]
    fn test_boundary_values() {
        let cases: &[(u64, &[u8])] = &[
            (0, &[0x00]),
            (127, &[0x7F]),
            (128, &[0x80, 0x01]),
            (16383, &[0xFF, 0x7F]),
            (16384, &[0x80, 0x80, 0x01]),
            (1 << 35, &[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]),
        ];

        for &(value, bytes) in cases {
            assert_eq!(encode(value), bytes, "encoding {}", value);
            assert_eq!(encoded_len(value), bytes.len());
            assert_eq!(
                decode_varint(bytes, MAX_VARINT_BYTES).unwrap(),
                (value, bytes.len())
            );
        }
    }

    #[test]
    fn test_u64_max_uses_ten_bytes() {
        let bytes = encode(u64::MAX);
        assert_eq!(bytes.len(), MAX_VARINT_BYTES);
        assert_eq!(decode_varint(&bytes, MAX_VARINT_BYTES).unwrap().0, u64::MAX);
    }

    #[test]
    fn test_decode_stops_at_terminal_byte() {
        let (value, len) = decode_varint(&[0x8A, 0x01, 0xFF, 0xFF], MAX_VARINT_BYTES).unwrap();
        assert_eq!(value, 0x8A);
        assert_eq!(len, 2);
    }

    #[test]
    fn test_too_long_is_invalid() {
        let bytes = [0xFFu8; 11];
        assert!(matches!(
            decode_varint(&bytes, MAX_VARINT_BYTES),
            Err(Error::InvalidVarint { .. })
        ));

        // A configured limit below ten bytes applies too.
        let bytes = encode(1 << 35);
        assert!(matches!(
            decode_varint(&bytes, 4),
            Err(Error::InvalidVarint { .. })
        ));
    }

    #[test]
    fn test_overflow_is_invalid() {
        let mut bytes = vec![0xFFu8; 9];
        bytes.push(0x02);
        assert!(matches!(
            decode_varint(&bytes, MAX_VARINT_BYTES),
            Err(Error::InvalidVarint { .. })
        ));
    }

    #[test]
    fn test_overlong_is_invalid() {
        assert!(matches!(
            decode_varint(&[0x80, 0x00], MAX_VARINT_BYTES),
            Err(Error::InvalidVarint { .. })
        ));
    }

    #[test]
    fn test_unterminated_is_truncated() {
        assert!(matches!(
            decode_varint(&[0x80, 0x80], MAX_VARINT_BYTES),
            Err(Error::TruncatedRecord { .. })
        ));
        assert!(matches!(
            decode_varint(&[], MAX_VARINT_BYTES),
            Err(Error::TruncatedRecord { .. })
        ));
    }
}
