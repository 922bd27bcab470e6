//! The 15-bit format information field: error correction level + mask
//! pattern, recovered by nearest-match against the 32 valid codewords.

use crate::error::{Error, Result};
use crate::qr::bch::{encode_format_bits, hamming_weight};
use crate::qr::error_correction_level::ErrorCorrectionLevel;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatInformation {
    pub error_correction_level: ErrorCorrectionLevel,
    pub mask_pattern: u8,
}

impl FormatInformation {
    pub fn encode(level: ErrorCorrectionLevel, mask_pattern: u8) -> u32 {
        assert!(mask_pattern < 8);
        let data_bits = (level.bits() << 3) | mask_pattern as u32;
        encode_format_bits(data_bits)
    }

    /// Finds the minimum Hamming-distance match (<= 3 bits) against the 32
    /// valid 15-bit format codewords.
    pub fn decode(masked_format_info: u32) -> Result<FormatInformation> {
        let mut best_difference = u32::MAX;
        let mut best_format_info = 0u32;
        for data_bits in 0..32u32 {
            let candidate = encode_format_bits(data_bits);
            if candidate == masked_format_info {
                return Self::from_data_bits(data_bits);
            }
            let diff = hamming_weight(candidate ^ masked_format_info);
            if diff < best_difference {
                best_difference = diff;
                best_format_info = data_bits;
            }
        }
        if best_difference <= 3 {
            Self::from_data_bits(best_format_info)
        } else {
            Err(Error::format("could not decode format information"))
        }
    }

    fn from_data_bits(data_bits: u32) -> Result<FormatInformation> {
        Ok(FormatInformation {
            error_correction_level: ErrorCorrectionLevel::from_bits(data_bits >> 3)?,
            mask_pattern: (data_bits & 0x07) as u8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_every_level_and_mask() {
        for &level in &[
            ErrorCorrectionLevel::L,
            ErrorCorrectionLevel::M,
            ErrorCorrectionLevel::Q,
            ErrorCorrectionLevel::H,
        ] {
            for mask in 0..8u8 {
                let encoded = FormatInformation::encode(level, mask);
                let decoded = FormatInformation::decode(encoded).unwrap();
                assert_eq!(decoded.error_correction_level, level);
                assert_eq!(decoded.mask_pattern, mask);
            }
        }
    }

    #[test]
    fn recovers_from_up_to_three_bit_errors() {
        let encoded = FormatInformation::encode(ErrorCorrectionLevel::Q, 5);
        let corrupted = encoded ^ 0b111;
        let decoded = FormatInformation::decode(corrupted).unwrap();
        assert_eq!(decoded.error_correction_level, ErrorCorrectionLevel::Q);
        assert_eq!(decoded.mask_pattern, 5);
    }
}
