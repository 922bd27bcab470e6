//! Builds the final module matrix from a version, format information and
//! packed data bits: lays down the function patterns, writes data bits
//! in zig-zag order, then picks the mask with the lowest penalty score.

use crate::bitarray::BitArray;
use crate::bitmatrix::BitMatrix;
use crate::error::Result;
use crate::qr::bit_matrix_parser::build_function_pattern;
use crate::qr::error_correction_level::ErrorCorrectionLevel;
use crate::qr::format_information::FormatInformation;
use crate::qr::mask;
use crate::qr::version::Version;

const POSITION_DETECTION_PATTERN: [[u8; 7]; 7] = [
    [1, 1, 1, 1, 1, 1, 1],
    [1, 0, 0, 0, 0, 0, 1],
    [1, 0, 1, 1, 1, 0, 1],
    [1, 0, 1, 1, 1, 0, 1],
    [1, 0, 1, 1, 1, 0, 1],
    [1, 0, 0, 0, 0, 0, 1],
    [1, 1, 1, 1, 1, 1, 1],
];

const ALIGNMENT_PATTERN: [[u8; 5]; 5] = [
    [1, 1, 1, 1, 1],
    [1, 0, 0, 0, 1],
    [1, 0, 1, 0, 1],
    [1, 0, 0, 0, 1],
    [1, 1, 1, 1, 1],
];

/// Builds the complete, masked symbol matrix and returns it with the
/// mask pattern that was chosen.
pub fn build_matrix(
    data_bits: &BitArray,
    level: ErrorCorrectionLevel,
    version: Version,
    requested_mask: Option<u8>,
) -> Result<(BitMatrix, u8)> {
    let dimension = version.dimension();
    let mut skeleton = BitMatrix::square(dimension);
    embed_basic_patterns(&mut skeleton, version);
    let function_pattern = build_function_pattern(&skeleton, version);

    let mut data_matrix = skeleton.clone();
    embed_data_bits(&mut data_matrix, &function_pattern, data_bits);

    let mask_pattern = match requested_mask {
        Some(m) => m,
        None => choose_best_mask(&data_matrix, &function_pattern),
    };

    let mut final_matrix = data_matrix;
    mask::apply_mask(&mut final_matrix, &function_pattern, mask_pattern);
    embed_format_and_version_info(&mut final_matrix, level, version, mask_pattern);
    Ok((final_matrix, mask_pattern))
}

fn embed_basic_patterns(matrix: &mut BitMatrix, version: Version) {
    let dimension = matrix.height();
    embed_position_detection_pattern(matrix, 0, 0);
    embed_position_detection_pattern(matrix, dimension - 7, 0);
    embed_position_detection_pattern(matrix, 0, dimension - 7);
    embed_timing_patterns(matrix);
    embed_dark_module(matrix, dimension);
    embed_alignment_patterns(matrix, version);
}

fn embed_position_detection_pattern(matrix: &mut BitMatrix, x_offset: u32, y_offset: u32) {
    for (dy, row) in POSITION_DETECTION_PATTERN.iter().enumerate() {
        for (dx, &v) in row.iter().enumerate() {
            matrix.set_value(x_offset + dx as u32, y_offset + dy as u32, v == 1);
        }
    }
}

fn embed_timing_patterns(matrix: &mut BitMatrix) {
    let dimension = matrix.height();
    for i in 8..dimension - 8 {
        let value = i % 2 == 0;
        matrix.set_value(i, 6, value);
        matrix.set_value(6, i, value);
    }
}

fn embed_dark_module(matrix: &mut BitMatrix, dimension: u32) {
    matrix.set(8, dimension - 8);
}

fn embed_alignment_patterns(matrix: &mut BitMatrix, version: Version) {
    let dimension = matrix.height();
    let centers = version.alignment_pattern_centers();
    for &cy in &centers {
        for &cx in &centers {
            if (cx == 6 && cy == 6) || (cx == 6 && cy as u32 == dimension - 7) || (cx as u32 == dimension - 7 && cy == 6) {
                continue;
            }
            for (dy, row) in ALIGNMENT_PATTERN.iter().enumerate() {
                for (dx, &v) in row.iter().enumerate() {
                    matrix.set_value(
                        (cx - 2) as u32 + dx as u32,
                        (cy - 2) as u32 + dy as u32,
                        v == 1,
                    );
                }
            }
        }
    }
}

/// Writes data+EC bits in the same zig-zag, two-columns-at-a-time order
/// the parser reads in, skipping every function module.
fn embed_data_bits(matrix: &mut BitMatrix, function_pattern: &BitMatrix, data_bits: &BitArray) {
    let dimension = matrix.height();
    let mut bit_index = 0usize;
    let total_bits = data_bits.len();

    let mut reading_up = true;
    let mut col = dimension - 1;
    while col > 0 {
        if col == 6 {
            col -= 1;
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
                let bit = if bit_index < total_bits {
                    data_bits.get(bit_index)
                } else {
                    false // remainder bits, JISX0510 section 8.7.3: padded with 0.
                };
                matrix.set_value(x, y, bit);
                bit_index += 1;
            }
        }
        reading_up = !reading_up;
        if col < 2 {
            break;
        }
        col -= 2;
    }
}

fn embed_format_and_version_info(
    matrix: &mut BitMatrix,
    level: ErrorCorrectionLevel,
    version: Version,
    mask_pattern: u8,
) {
    let dimension = matrix.height();
    let format_bits = FormatInformation::encode(level, mask_pattern);

    for i in 0..15 {
        let bit = (format_bits >> i) & 1 != 0;
        let (x1, y1) = format_info_position_copy1(i);
        matrix.set_value(x1, y1, bit);
        let (x2, y2) = format_info_position_copy2(i, dimension);
        matrix.set_value(x2, y2, bit);
    }

    if let Some(version_bits) = version.version_info_bits() {
        for i in 0u32..18 {
            let bit = (version_bits >> i) & 1 != 0;
            let n = 17 - i;
            let outer = n / 3;
            let inner = dimension - 9 - (n % 3);
            // Top-right block: outer indexes columns 0..6, inner selects one
            // of the three rows dimension-9/-10/-11.
            matrix.set_value(outer, inner, bit);
            // Bottom-left block is the transpose of the top-right one.
            matrix.set_value(inner, outer, bit);
        }
    }
}

/// Inverse of the bit order `BitMatrixParser::read_format_information`
/// assembles for the top-left copy.
fn format_info_position_copy1(i: u32) -> (u32, u32) {
    match i {
        0..=5 => (8, i),
        6 => (8, 7),
        7 => (8, 8),
        8 => (7, 8),
        9..=14 => (14 - i, 8),
        _ => unreachable!("format information is 15 bits"),
    }
}

/// Inverse of the bit order `BitMatrixParser::read_format_information`
/// assembles for the secondary (top-right/bottom-left) copy.
fn format_info_position_copy2(i: u32, dimension: u32) -> (u32, u32) {
    match i {
        0..=6 => (8, dimension - 7 + i),
        7..=14 => (dimension - 15 + i, 8),
        _ => unreachable!("format information is 15 bits"),
    }
}

fn choose_best_mask(data_matrix: &BitMatrix, function_pattern: &BitMatrix) -> u8 {
    let mut best_pattern = 0u8;
    let mut best_penalty = u32::MAX;
    for pattern in 0..8u8 {
        let mut candidate = data_matrix.clone();
        mask::apply_mask(&mut candidate, function_pattern, pattern);
        let penalty = mask::penalty_score(&candidate);
        if penalty < best_penalty {
            best_penalty = penalty;
            best_pattern = pattern;
        }
    }
    best_pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_matrix_version1_has_correct_dimension() {
        let mut bits = BitArray::new(0);
        for _ in 0..19 * 8 {
            bits.append_bit(false);
        }
        let version = Version::new(1).unwrap();
        let (matrix, mask_pattern) =
            build_matrix(&bits, ErrorCorrectionLevel::L, version, None).unwrap();
        assert_eq!(matrix.width(), 21);
        assert!(mask_pattern < 8);
    }

    #[test]
    fn requested_mask_is_honored() {
        let mut bits = BitArray::new(0);
        for _ in 0..19 * 8 {
            bits.append_bit(false);
        }
        let version = Version::new(1).unwrap();
        let (_matrix, mask_pattern) =
            build_matrix(&bits, ErrorCorrectionLevel::L, version, Some(3)).unwrap();
        assert_eq!(mask_pattern, 3);
    }
}
