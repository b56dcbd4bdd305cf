//! Module frame codec.
//!
//! Wire format for one 16-digit driver module:
//! ```text
//! [start_register:1][plane bytes:16]
//! ```
//! The 16 payload bytes are organized as 8 register pairs, one pair per
//! segment plane (segments a–g plus the decimal point). For digit `d` and
//! segment bit `s`, the lit/unlit state lands in byte `2s` bit `d` when
//! `d < 8`, otherwise in byte `2s + 1` bit `d − 8`. Each pair therefore
//! answers "which of the 16 digits have segment `s` lit", not "which
//! segments does digit `d` show". The layout is bit-transposed, plane-major.

/// Digits hosted by one driver module.
pub const DIGITS_PER_MODULE: usize = 16;

/// Segment planes per module: segments a–g plus the decimal point.
pub const SEGMENT_PLANES: usize = 8;

/// Length of the plane-major payload in bytes.
pub const FRAME_LEN: usize = 16;

/// Display-memory start register prepended to every module write.
pub const START_REGISTER: u8 = 0x00;

/// Encodes per-digit segment bytes into the plane-major wire payload.
///
/// Input byte `digits[d]` uses bits 0–6 for segments a–g and bit 7 for the
/// decimal point. Digits a module does not populate are simply left zero.
pub fn encode_frame(digits: &[u8; DIGITS_PER_MODULE]) -> [u8; FRAME_LEN] {
    let mut planes = [0u8; FRAME_LEN];
    for (digit, &segments) in digits.iter().enumerate() {
        for segment in 0..SEGMENT_PLANES {
            if segments & (1 << segment) == 0 {
                continue;
            }
            let (byte, bit) = if digit < 8 {
                (segment * 2, digit)
            } else {
                (segment * 2 + 1, digit - 8)
            };
            planes[byte] |= 1 << bit;
        }
    }
    planes
}

/// Decodes a plane-major payload back into per-digit segment bytes.
///
/// Inverse of [`encode_frame`] over the full 16-digit, 8-segment domain.
pub fn decode_frame(planes: &[u8; FRAME_LEN]) -> [u8; DIGITS_PER_MODULE] {
    let mut digits = [0u8; DIGITS_PER_MODULE];
    for segment in 0..SEGMENT_PLANES {
        for digit in 0..DIGITS_PER_MODULE {
            let (byte, bit) = if digit < 8 {
                (segment * 2, digit)
            } else {
                (segment * 2 + 1, digit - 8)
            };
            if planes[byte] & (1 << bit) != 0 {
                digits[digit] |= 1 << segment;
            }
        }
    }
    digits
}

/// Builds the full 17-byte write transaction: start register followed by the
/// encoded payload. Sent to a module address as a single bus write.
pub fn write_transaction(digits: &[u8; DIGITS_PER_MODULE]) -> [u8; FRAME_LEN + 1] {
    let planes = encode_frame(digits);
    let mut transaction = [0u8; FRAME_LEN + 1];
    transaction[0] = START_REGISTER;
    transaction[1..].copy_from_slice(&planes);
    transaction
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_segments_on_encodes_to_all_ones() {
        let planes = encode_frame(&[0xFF; DIGITS_PER_MODULE]);
        assert_eq!(planes, [0xFF; FRAME_LEN]);
    }

    #[test]
    fn test_all_segments_off_encodes_to_zero() {
        let planes = encode_frame(&[0x00; DIGITS_PER_MODULE]);
        assert_eq!(planes, [0x00; FRAME_LEN]);
    }

    #[test]
    fn test_low_digit_lands_in_even_byte() {
        // Digit 3 with only segment a (bit 0) lit: plane byte 0, bit 3.
        let mut digits = [0u8; DIGITS_PER_MODULE];
        digits[3] = 0b0000_0001;
        let planes = encode_frame(&digits);
        assert_eq!(planes[0], 1 << 3);
        assert!(planes[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_high_digit_lands_in_odd_byte() {
        // Digit 10 with only segment a lit: plane byte 1, bit 2.
        let mut digits = [0u8; DIGITS_PER_MODULE];
        digits[10] = 0b0000_0001;
        let planes = encode_frame(&digits);
        assert_eq!(planes[1], 1 << 2);
        assert_eq!(planes[0], 0);
    }

    #[test]
    fn test_segment_selects_register_pair() {
        // Segment g (bit 6) on digit 0: plane byte 12, bit 0.
        let mut digits = [0u8; DIGITS_PER_MODULE];
        digits[0] = 0b0100_0000;
        let planes = encode_frame(&digits);
        assert_eq!(planes[12], 1);
    }

    #[test]
    fn test_decimal_point_uses_last_register_pair() {
        // Decimal point (bit 7) on digit 15: plane byte 15, bit 7.
        let mut digits = [0u8; DIGITS_PER_MODULE];
        digits[15] = 0b1000_0000;
        let planes = encode_frame(&digits);
        assert_eq!(planes[15], 1 << 7);
    }

    #[test]
    fn test_decode_inverts_encode_for_patterned_input() {
        let mut digits = [0u8; DIGITS_PER_MODULE];
        for (i, d) in digits.iter_mut().enumerate() {
            // A spread of distinct per-digit patterns.
            *d = (i as u8).wrapping_mul(0x1D) ^ 0xA5;
        }
        assert_eq!(decode_frame(&encode_frame(&digits)), digits);
    }

    #[test]
    fn test_decode_inverts_encode_for_single_bit_inputs() {
        for digit in 0..DIGITS_PER_MODULE {
            for segment in 0..SEGMENT_PLANES {
                let mut digits = [0u8; DIGITS_PER_MODULE];
                digits[digit] = 1 << segment;
                assert_eq!(
                    decode_frame(&encode_frame(&digits)),
                    digits,
                    "digit {digit}, segment {segment}"
                );
            }
        }
    }

    #[test]
    fn test_write_transaction_prepends_start_register() {
        let transaction = write_transaction(&[0xFF; DIGITS_PER_MODULE]);
        assert_eq!(transaction.len(), 17);
        assert_eq!(transaction[0], START_REGISTER);
        assert_eq!(&transaction[1..], &[0xFF; FRAME_LEN]);
    }
}
