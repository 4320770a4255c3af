//! Hex-encoded counter decoding.
//!
//! Fee and reward accumulators arrive from the DLMM client as hex strings.
//! The literal sentinel `"00"` means zero and is decoded directly, without a
//! base-16 parse of an already-degenerate value.

use crate::error::SnapshotError;

/// Sentinel the client emits for an empty counter.
pub const ZERO_SENTINEL: &str = "00";

/// Decodes a hex-encoded unsigned counter.
///
/// Decoding is a pure function of the stored string, so repeated decoding of
/// the same snapshot value always yields the same number.
pub fn decode_counter(raw: &str) -> Result<u128, SnapshotError> {
    if raw == ZERO_SENTINEL {
        return Ok(0);
    }
    u128::from_str_radix(raw, 16).map_err(|_| SnapshotError::InvalidCounter(raw.to_string()))
}

/// Decodes a hex-encoded amount that must fit a native token amount.
pub fn decode_amount(raw: &str) -> Result<u64, SnapshotError> {
    let value = decode_counter(raw)?;
    u64::try_from(value).map_err(|_| SnapshotError::InvalidCounter(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sentinel_decodes_to_zero() {
        assert_eq!(decode_counter("00").unwrap(), 0);
    }

    #[test]
    fn hex_string_decodes_to_numeric_value() {
        assert_eq!(decode_counter("ff").unwrap(), 255);
        assert_eq!(decode_counter("4e20").unwrap(), 20_000);
        assert_eq!(decode_counter("0").unwrap(), 0);
    }

    #[test]
    fn decoding_is_idempotent_over_the_stored_string() {
        let stored = "1a2b3c";
        let first = decode_counter(stored).unwrap();
        let second = decode_counter(stored).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, 0x1a2b3c);
    }

    #[test]
    fn invalid_hex_is_rejected() {
        assert!(matches!(
            decode_counter("zz"),
            Err(SnapshotError::InvalidCounter(_))
        ));
    }

    #[test]
    fn amount_overflow_is_rejected() {
        let too_big = "ffffffffffffffffff"; // 72 bits
        assert!(decode_amount(too_big).is_err());
        assert_eq!(decode_amount("ff").unwrap(), 255);
    }
}
