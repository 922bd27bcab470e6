//! Version 1..40 geometry and error-correction-block bookkeeping.

use crate::error::{Error, Result};
use crate::qr::bch::encode_version_bits;
use crate::qr::error_correction_level::ErrorCorrectionLevel;

/// Per-(version, EC level) block shape: total EC codewords per block and
/// how many blocks share the symbol's codewords.
#[derive(Clone, Copy, Debug)]
pub struct EcBlocks {
    pub ec_codewords_per_block: u32,
    pub num_blocks: u32,
}

impl EcBlocks {
    /// The actual block groups, derived the way a real encoder/decoder
    /// needs them: `num_blocks` blocks share `total_codewords` raw
    /// codewords as evenly as possible, so only the last few blocks carry
    /// one extra data codeword.
    pub fn groups(&self, total_codewords: u32) -> Vec<BlockGroup> {
        let num_blocks = self.num_blocks;
        let short_block_len = total_codewords / num_blocks;
        let num_short_blocks = num_blocks - total_codewords % num_blocks;
        let mut groups = Vec::new();
        if num_short_blocks > 0 {
            groups.push(BlockGroup {
                count: num_short_blocks,
                total_codewords: short_block_len,
                data_codewords: short_block_len - self.ec_codewords_per_block,
            });
        }
        if num_short_blocks < num_blocks {
            groups.push(BlockGroup {
                count: num_blocks - num_short_blocks,
                total_codewords: short_block_len + 1,
                data_codewords: short_block_len + 1 - self.ec_codewords_per_block,
            });
        }
        groups
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BlockGroup {
    pub count: u32,
    pub total_codewords: u32,
    pub data_codewords: u32,
}

// Indexed [level.ordinal()][version], version 1-based (index 0 unused).
static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [-1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30],
    [-1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28],
    [-1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30],
    [-1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30],
];

static NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [-1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12, 13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25],
    [-1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21, 23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49],
    [-1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68],
    [-1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81],
];

#[derive(Clone, Copy, Debug)]
pub struct Version(pub u32);

impl Version {
    pub fn new(number: u32) -> Result<Version> {
        if number < 1 || number > 40 {
            return Err(Error::illegal_argument("version must be in 1..=40"));
        }
        Ok(Version(number))
    }

    pub fn number(self) -> u32 {
        self.0
    }

    pub fn dimension(self) -> u32 {
        17 + 4 * self.0
    }

    /// Smallest version whose symbol dimension matches `dimension`.
    pub fn from_dimension(dimension: u32) -> Result<Version> {
        if dimension < 21 || dimension > 177 || (dimension - 17) % 4 != 0 {
            return Err(Error::format("invalid symbol dimension"));
        }
        Version::new((dimension - 17) / 4)
    }

    pub fn ec_blocks(self, level: ErrorCorrectionLevel) -> EcBlocks {
        let v = self.0 as usize;
        EcBlocks {
            ec_codewords_per_block: ECC_CODEWORDS_PER_BLOCK[level.ordinal()][v] as u32,
            num_blocks: NUM_ERROR_CORRECTION_BLOCKS[level.ordinal()][v] as u32,
        }
    }

    /// Total 8-bit codewords (data + EC) this version's modules can carry,
    /// after function patterns and (for version >= 7) version info are
    /// excluded; remainder bits are discarded by the `/8`.
    pub fn total_codewords(self) -> u32 {
        let ver = self.0 as i64;
        let mut result: i64 = (16 * ver + 128) * ver + 64;
        if ver >= 2 {
            let num_align = ver / 7 + 2;
            result -= (25 * num_align - 10) * num_align - 55;
            if ver >= 7 {
                result -= 18 * 2;
            }
        }
        (result / 8) as u32
    }

    pub fn total_data_codewords(self, level: ErrorCorrectionLevel) -> u32 {
        let blocks = self.ec_blocks(level);
        self.total_codewords() - blocks.ec_codewords_per_block * blocks.num_blocks
    }

    /// Alignment pattern center coordinates along one axis (same list used
    /// for rows and columns); empty for version 1.
    pub fn alignment_pattern_centers(self) -> Vec<i32> {
        let ver = self.0 as i32;
        if ver == 1 {
            return Vec::new();
        }
        let num_align = ver / 7 + 2;
        let step = if ver != 32 {
            (ver * 4 + num_align * 2 + 1) / (2 * num_align - 2) * 2
        } else {
            26
        };
        let mut result = vec![6i32];
        let mut pos = ver * 4 + 10;
        for _ in 0..num_align - 1 {
            result.insert(1, pos);
            pos -= step;
        }
        result
    }

    /// The 18-bit BCH-encoded version pattern, present from version 7 up.
    pub fn version_info_bits(self) -> Option<u32> {
        if self.0 >= 7 {
            Some(encode_version_bits(self.0))
        } else {
            None
        }
    }

    /// Recovers a version from an 18-bit field read off the symbol by
    /// finding the closest (Hamming distance <= 3) of the 34 valid
    /// version-7..40 codewords.
    pub fn decode_version_information(bits: u32) -> Result<Version> {
        let mut best_difference = u32::MAX;
        let mut best_version = 0u32;
        for v in 7..=40u32 {
            let target = encode_version_bits(v);
            if target == bits {
                return Version::new(v);
            }
            let bits_diff = crate::qr::bch::hamming_weight(target ^ bits);
            if bits_diff < best_difference {
                best_difference = bits_diff;
                best_version = v;
            }
        }
        if best_difference <= 3 {
            Version::new(best_version)
        } else {
            Err(Error::format("could not decode version information"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_formula() {
        assert_eq!(Version::new(1).unwrap().dimension(), 21);
        assert_eq!(Version::new(40).unwrap().dimension(), 177);
    }

    #[test]
    fn total_codewords_matches_known_values() {
        // Version 1 has 26 total codewords (JISX0510 Table 7).
        assert_eq!(Version::new(1).unwrap().total_codewords(), 26);
        assert_eq!(Version::new(7).unwrap().total_codewords(), 196);
        assert_eq!(Version::new(40).unwrap().total_codewords(), 3706);
    }

    #[test]
    fn data_codewords_version1_l() {
        let v = Version::new(1).unwrap();
        assert_eq!(v.total_data_codewords(ErrorCorrectionLevel::L), 19);
        assert_eq!(v.total_data_codewords(ErrorCorrectionLevel::H), 9);
    }

    #[test]
    fn alignment_pattern_centers_known_versions() {
        assert_eq!(Version::new(1).unwrap().alignment_pattern_centers(), Vec::<i32>::new());
        assert_eq!(Version::new(2).unwrap().alignment_pattern_centers(), vec![6, 18]);
        assert_eq!(Version::new(7).unwrap().alignment_pattern_centers(), vec![6, 22, 38]);
    }

    #[test]
    fn version_info_round_trips_with_noise() {
        let v = Version::new(15).unwrap();
        let bits = v.version_info_bits().unwrap();
        assert_eq!(Version::decode_version_information(bits).unwrap().number(), 15);
        // Flip 3 bits; must still recover.
        let corrupted = bits ^ 0b111;
        assert_eq!(
            Version::decode_version_information(corrupted).unwrap().number(),
            15
        );
    }

    #[test]
    fn groups_split_matches_total() {
        let v = Version::new(5).unwrap();
        let blocks = v.ec_blocks(ErrorCorrectionLevel::Q);
        let groups = blocks.groups(v.total_codewords());
        let sum: u32 = groups.iter().map(|g| g.count * g.total_codewords).sum();
        assert_eq!(sum, v.total_codewords());
        let data_sum: u32 = groups.iter().map(|g| g.count * g.data_codewords).sum();
        assert_eq!(data_sum, v.total_data_codewords(ErrorCorrectionLevel::Q));
    }
}
