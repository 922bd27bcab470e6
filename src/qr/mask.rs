//! The eight data-masking predicates and the JISX0510 section 21 penalty
//! rules used to pick among them.

use itertools::Itertools;

use crate::bitmatrix::BitMatrix;
use crate::error::{Error, Result};

/// Returns whether module (i = row, j = column) should be inverted under
/// the given mask pattern (0..=7).
pub fn mask_bit(pattern: u8, i: u32, j: u32) -> bool {
    let i = i as i64;
    let j = j as i64;
    match pattern {
        0 => (i + j) % 2 == 0,
        1 => i % 2 == 0,
        2 => j % 3 == 0,
        3 => (i + j) % 3 == 0,
        4 => (i / 2 + j / 3) % 2 == 0,
        5 => (i * j) % 2 + (i * j) % 3 == 0,
        6 => ((i * j) % 2 + (i * j) % 3) % 2 == 0,
        7 => ((i + j) % 2 + (i * j) % 3) % 2 == 0,
        _ => panic!("mask pattern must be 0..=7, got {}", pattern),
    }
}

/// Applies a mask to every module marked as a data module in
/// `function_pattern` (set bits there mark function/non-data modules, so
/// the mask is applied where `function_pattern` is clear).
pub fn apply_mask(matrix: &mut BitMatrix, function_pattern: &BitMatrix, pattern: u8) {
    for y in 0..matrix.height() {
        for x in 0..matrix.width() {
            if !function_pattern.get(x, y) && mask_bit(pattern, y, x) {
                matrix.flip(x, y);
            }
        }
    }
}

pub fn mask_pattern_from_bits(bits: u32) -> Result<u8> {
    if bits < 8 {
        Ok(bits as u8)
    } else {
        Err(Error::format("mask pattern out of range"))
    }
}

const PENALTY_N1: u32 = 3;
const PENALTY_N2: u32 = 3;
const PENALTY_N3: u32 = 40;
const PENALTY_N4: u32 = 10;

/// Sum of the four JISX0510 section 21 masking penalty rules.
pub fn penalty_score(matrix: &BitMatrix) -> u32 {
    rule1_score(matrix) + rule2_score(matrix) + rule3_score(matrix) + rule4_score(matrix)
}

fn rule1_score(matrix: &BitMatrix) -> u32 {
    let mut score = 0;
    score += rule1_lines(matrix, true);
    score += rule1_lines(matrix, false);
    score
}

fn rule1_lines(matrix: &BitMatrix, horizontal: bool) -> u32 {
    let (outer, inner) = if horizontal {
        (matrix.height(), matrix.width())
    } else {
        (matrix.width(), matrix.height())
    };
    let mut score = 0;
    for o in 0..outer {
        let line = (0..inner).map(|i| {
            if horizontal {
                matrix.get(i, o)
            } else {
                matrix.get(o, i)
            }
        });
        for (_, run) in &line.into_iter().group_by(|&bit| bit) {
            let len = run.count() as u32;
            if len >= 5 {
                score += PENALTY_N1 + (len - 5);
            }
        }
    }
    score
}

fn rule2_score(matrix: &BitMatrix) -> u32 {
    let mut score = 0;
    if matrix.width() < 2 || matrix.height() < 2 {
        return 0;
    }
    for y in 0..matrix.height() - 1 {
        for x in 0..matrix.width() - 1 {
            let v = matrix.get(x, y);
            if v == matrix.get(x + 1, y) && v == matrix.get(x, y + 1) && v == matrix.get(x + 1, y + 1) {
                score += PENALTY_N2;
            }
        }
    }
    score
}

/// 1:1:3:1:1 finder-look-alike pattern, `1011101` in dark=1/light=0, with
/// four light modules padding either side.
fn rule3_score(matrix: &BitMatrix) -> u32 {
    let mut score = 0;
    score += rule3_lines(matrix, true);
    score += rule3_lines(matrix, false);
    score
}

fn rule3_lines(matrix: &BitMatrix, horizontal: bool) -> u32 {
    const PATTERN: [bool; 7] = [true, false, true, true, true, false, true];
    let (outer, inner) = if horizontal {
        (matrix.height(), matrix.width())
    } else {
        (matrix.width(), matrix.height())
    };
    let get = |o: u32, i: u32| -> bool {
        if horizontal {
            matrix.get(i, o)
        } else {
            matrix.get(o, i)
        }
    };
    let mut score = 0;
    if inner < 7 {
        return 0;
    }
    for o in 0..outer {
        for i in 0..=inner - 7 {
            let matches = (0..7).all(|k| get(o, i + k) == PATTERN[k as usize]);
            if !matches {
                continue;
            }
            let has_dark_before = (i.saturating_sub(4)..i).any(|k| get(o, k));
            let has_dark_after = ((i + 7)..(i + 11).min(inner)).any(|k| get(o, k));
            if !has_dark_before || !has_dark_after {
                score += PENALTY_N3;
            }
        }
    }
    score
}

fn rule4_score(matrix: &BitMatrix) -> u32 {
    let total = (matrix.width() * matrix.height()) as f64;
    let mut dark = 0u32;
    for y in 0..matrix.height() {
        for x in 0..matrix.width() {
            if matrix.get(x, y) {
                dark += 1;
            }
        }
    }
    let ratio = dark as f64 / total;
    let step = ((ratio - 0.5).abs() * 20.0).floor() as u32;
    PENALTY_N4 * step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masking_is_self_inverse() {
        let mut function_pattern = BitMatrix::square(21);
        // Pretend nothing is a function module: every bit is maskable.
        function_pattern.clear();
        let mut data = BitMatrix::square(21);
        data.set(1, 1);
        data.set(5, 5);
        data.set(10, 3);
        let original = data.clone();
        apply_mask(&mut data, &function_pattern, 3);
        apply_mask(&mut data, &function_pattern, 3);
        assert_eq!(data, original);
    }

    #[test]
    fn mask_pattern_predicates_match_spec_table() {
        assert!(mask_bit(0, 0, 0));
        assert!(!mask_bit(0, 0, 1));
        assert!(mask_bit(1, 2, 7));
        assert!(!mask_bit(1, 3, 7));
        assert!(mask_bit(2, 5, 3));
    }

    #[test]
    fn rule2_counts_2x2_blocks() {
        let mut m = BitMatrix::square(4);
        m.set(0, 0);
        m.set(1, 0);
        m.set(0, 1);
        m.set(1, 1);
        assert_eq!(rule2_score(&m), PENALTY_N2);
    }
}
