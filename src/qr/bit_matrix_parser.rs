//! Reads a sampled symbol matrix: recovers version and format
//! information (trying both copies of each, and the mirrored layout as a
//! fallback), unmasks, and walks the zig-zag codeword order to pull out
//! raw data+EC bytes, finally deinterleaved per the version's block
//! structure.

use crate::bitmatrix::BitMatrix;
use crate::error::{Error, Result};
use crate::qr::format_information::FormatInformation;
use crate::qr::mask;
use crate::qr::version::Version;

pub struct ParsedSymbol {
    pub version: Version,
    pub format_information: FormatInformation,
    pub codewords: Vec<u8>,
    pub mirrored: bool,
}

pub struct BitMatrixParser<'a> {
    bits: &'a BitMatrix,
}

impl<'a> BitMatrixParser<'a> {
    pub fn new(bits: &'a BitMatrix) -> Result<BitMatrixParser<'a>> {
        let dimension = bits.height();
        if dimension < 21 || dimension % 4 != 1 {
            return Err(Error::format("symbol dimension is not a valid QR size"));
        }
        Ok(BitMatrixParser { bits })
    }

    /// Tries the matrix both as-read and transposed (ZXing's "mirrored
    /// layout"), returning whichever orientation produces consistent
    /// format and version information.
    pub fn parse(&self) -> Result<ParsedSymbol> {
        if let Ok(parsed) = self.parse_oriented(false) {
            return Ok(parsed);
        }
        self.parse_oriented(true)
    }

    fn parse_oriented(&self, mirror: bool) -> Result<ParsedSymbol> {
        let matrix = if mirror {
            transpose(self.bits)
        } else {
            self.bits.clone()
        };
        let format_information = Self::read_format_information(&matrix)?;
        let version = Self::read_version(&matrix)?;

        let function_pattern = build_function_pattern(&matrix, version);
        let mut data_matrix = matrix.clone();
        mask::apply_mask(&mut data_matrix, &function_pattern, format_information.mask_pattern);

        let codewords = read_codewords(&data_matrix, &function_pattern, version)?;
        Ok(ParsedSymbol {
            version,
            format_information,
            codewords,
            mirrored: mirror,
        })
    }

    fn read_format_information(matrix: &BitMatrix) -> Result<FormatInformation> {
        let dimension = matrix.height();
        // Primary copy: top-left corner, split around the timing modules.
        let mut format_info_bits = 0u32;
        for x in 0..6 {
            format_info_bits = (format_info_bits << 1) | matrix.get(x, 8) as u32;
        }
        format_info_bits = (format_info_bits << 1) | matrix.get(7, 8) as u32;
        format_info_bits = (format_info_bits << 1) | matrix.get(8, 8) as u32;
        format_info_bits = (format_info_bits << 1) | matrix.get(8, 7) as u32;
        for y in (0..6).rev() {
            format_info_bits = (format_info_bits << 1) | matrix.get(8, y) as u32;
        }
        if let Ok(info) = FormatInformation::decode(format_info_bits) {
            return Ok(info);
        }

        // Secondary copy: split across the top-right and bottom-left.
        let mut second_bits = 0u32;
        for x in (dimension - 8..dimension).rev() {
            second_bits = (second_bits << 1) | matrix.get(x, 8) as u32;
        }
        for y in (dimension - 7..dimension).rev() {
            second_bits = (second_bits << 1) | matrix.get(8, y) as u32;
        }
        FormatInformation::decode(second_bits)
    }

    fn read_version(matrix: &BitMatrix) -> Result<Version> {
        let dimension = matrix.height();
        let provisional = Version::from_dimension(dimension)?;
        if provisional.number() < 7 {
            return Ok(provisional);
        }

        let mut top_right_bits = 0u32;
        for x in 0..6 {
            for y in (dimension - 11..dimension - 8).rev() {
                top_right_bits = (top_right_bits << 1) | matrix.get(x, y) as u32;
            }
        }
        if let Ok(v) = Version::decode_version_information(top_right_bits) {
            return Ok(v);
        }

        let mut bottom_left_bits = 0u32;
        for y in 0..6 {
            for x in (dimension - 11..dimension - 8).rev() {
                bottom_left_bits = (bottom_left_bits << 1) | matrix.get(x, y) as u32;
            }
        }
        Version::decode_version_information(bottom_left_bits)
    }
}

fn transpose(matrix: &BitMatrix) -> BitMatrix {
    let mut out = BitMatrix::square(matrix.width());
    for y in 0..matrix.height() {
        for x in 0..matrix.width() {
            if matrix.get(x, y) {
                out.set(y, x);
            }
        }
    }
    out
}

/// Marks every module that is NOT free for data: finder patterns plus
/// separators, timing patterns, alignment patterns, the dark module,
/// and the format/version info reservations.
pub fn build_function_pattern(matrix: &BitMatrix, version: Version) -> BitMatrix {
    let dimension = matrix.height();
    let mut function_pattern = BitMatrix::square(dimension);

    // Three 9x9 finder+separator corners.
    function_pattern.set_region(0, 0, 9, 9);
    function_pattern.set_region(dimension - 8, 0, 8, 9);
    function_pattern.set_region(0, dimension - 8, 9, 8);

    // Timing patterns.
    function_pattern.set_region(6, 9, 1, dimension - 17);
    function_pattern.set_region(9, 6, dimension - 17, 1);

    // Alignment patterns.
    let centers = version.alignment_pattern_centers();
    for &cy in &centers {
        for &cx in &centers {
            if (cx == 6 && cy == 6)
                || (cx == 6 && cy as u32 == dimension - 7)
                || (cx as u32 == dimension - 7 && cy == 6)
            {
                continue;
            }
            function_pattern.set_region((cx - 2) as u32, (cy - 2) as u32, 5, 5);
        }
    }

    // Version info blocks, present from version 7.
    if version.number() >= 7 {
        function_pattern.set_region(0, dimension - 11, 6, 3);
        function_pattern.set_region(dimension - 11, 0, 3, 6);
    }

    function_pattern
}

fn read_codewords(matrix: &BitMatrix, function_pattern: &BitMatrix, version: Version) -> Result<Vec<u8>> {
    let dimension = matrix.height();
    let num_codewords = version.total_codewords() as usize;
    let mut result = Vec::with_capacity(num_codewords);

    let mut bit_buffer = 0u8;
    let mut bits_read = 0u32;

    let mut reading_up = true;
    let mut col = dimension - 1;
    while col > 0 {
        if col == 6 {
            col -= 1; // skip the vertical timing column.
            if col == 0 {
                break;
            }
        }
        for count in 0..dimension {
            let y = if reading_up { dimension - 1 - count } else { count };
            for c in 0..2 {
                let x = col - c as u32;
                if function_pattern.get(x, y) {
                    continue;
                }
                bit_buffer = (bit_buffer << 1) | matrix.get(x, y) as u8;
                bits_read += 1;
                if bits_read == 8 {
                    result.push(bit_buffer);
                    bit_buffer = 0;
                    bits_read = 0;
                    if result.len() == num_codewords {
                        return Ok(result);
                    }
                }
            }
        }
        reading_up = !reading_up;
        if col < 2 {
            break;
        }
        col -= 2;
    }

    if result.len() != num_codewords {
        return Err(Error::format("did not read the expected number of codewords"));
    }
    Ok(result)
}

/// Splits raw interleaved codewords into per-block data, running
/// Reed-Solomon correction on each and concatenating the corrected data
/// codewords.
pub fn deinterleave_and_correct(
    codewords: &[u8],
    version: Version,
    level: crate::qr::error_correction_level::ErrorCorrectionLevel,
) -> Result<Vec<u8>> {
    let ec_blocks = version.ec_blocks(level);
    let groups = ec_blocks.groups(version.total_codewords());

    let num_blocks: usize = groups.iter().map(|g| g.count as usize).sum();
    let mut data_blocks: Vec<Vec<u8>> = Vec::with_capacity(num_blocks);
    let mut ec_blocks_storage: Vec<Vec<u8>> = Vec::with_capacity(num_blocks);
    let mut max_data_len = 0usize;

    for group in &groups {
        for _ in 0..group.count {
            data_blocks.push(Vec::with_capacity(group.data_codewords as usize));
            ec_blocks_storage.push(Vec::with_capacity(ec_blocks.ec_codewords_per_block as usize));
            max_data_len = max_data_len.max(group.data_codewords as usize);
        }
    }

    let mut cursor = 0usize;
    for round in 0..max_data_len {
        for (i, block) in data_blocks.iter_mut().enumerate() {
            if round < block.capacity() {
                block.push(codewords[cursor]);
                cursor += 1;
                let _ = i;
            }
        }
    }
    for ec_block in ec_blocks_storage.iter_mut() {
        for _ in 0..ec_block.capacity() {
            ec_block.push(codewords[cursor]);
            cursor += 1;
        }
    }

    let field = &*crate::gf::QR_CODE_FIELD_256;
    let decoder = crate::reed_solomon::ReedSolomonDecoder::new(field);
    let mut result = Vec::with_capacity(version.total_data_codewords(level) as usize);
    for (data, ec) in data_blocks.iter().zip(ec_blocks_storage.iter()) {
        let mut combined: Vec<u8> = data.clone();
        combined.extend_from_slice(ec);
        decoder.decode(&mut combined, ec.len())?;
        result.extend_from_slice(&combined[..data.len()]);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qr::error_correction_level::ErrorCorrectionLevel;

    #[test]
    fn function_pattern_covers_finder_corners() {
        let version = Version::new(1).unwrap();
        let matrix = BitMatrix::square(version.dimension());
        let fp = build_function_pattern(&matrix, version);
        assert!(fp.get(0, 0));
        assert!(fp.get(20, 0));
        assert!(fp.get(0, 20));
        assert!(!fp.get(10, 10));
    }

    #[test]
    fn deinterleave_single_block_roundtrip() {
        let version = Version::new(1).unwrap();
        let level = ErrorCorrectionLevel::L;
        let data_len = version.total_data_codewords(level) as usize;
        let mut codewords: Vec<u8> = (0..data_len as u8).collect();
        let field = &*crate::gf::QR_CODE_FIELD_256;
        let mut encoder = crate::reed_solomon::ReedSolomonEncoder::new(field);
        let ec_count = version.ec_blocks(level).ec_codewords_per_block as usize;
        encoder.encode(&mut codewords, ec_count);

        let recovered = deinterleave_and_correct(&codewords, version, level).unwrap();
        assert_eq!(recovered, (0..data_len as u8).collect::<Vec<u8>>());
    }
}
