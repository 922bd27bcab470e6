//! Locates the alignment pattern nearest an estimated position: a smaller
//! dark:light:dark 1:1:1 concentric square, confirmed by a vertical
//! cross-check through the candidate center.

use crate::bitmatrix::BitMatrix;
use crate::error::{Error, Result};
use crate::geometry::ResultPoint;

#[derive(Clone, Copy, Debug)]
pub struct AlignmentPattern {
    pub location: ResultPoint,
    pub estimated_module_size: f32,
}

pub struct AlignmentPatternFinder<'a> {
    matrix: &'a BitMatrix,
    start_x: u32,
    start_y: u32,
    width: u32,
    height: u32,
    module_size: f32,
    possible_centers: Vec<(AlignmentPattern, u32)>,
}

impl<'a> AlignmentPatternFinder<'a> {
    pub fn new(
        matrix: &'a BitMatrix,
        start_x: u32,
        start_y: u32,
        width: u32,
        height: u32,
        module_size: f32,
    ) -> AlignmentPatternFinder<'a> {
        AlignmentPatternFinder {
            matrix,
            start_x,
            start_y,
            width,
            height,
            module_size,
            possible_centers: Vec::new(),
        }
    }

    pub fn find(&mut self) -> Result<AlignmentPattern> {
        let max_j = self.start_x + self.width;
        let middle_i = self.start_y + self.height / 2;

        for i_gen in 0..self.height {
            let i = self.start_y
                + if i_gen % 2 == 0 {
                    (i_gen + 1) / 2
                } else {
                    self.height - 1 - i_gen / 2
                };
            if i >= self.matrix.height() {
                continue;
            }
            let mut state_count = [0u32; 3];
            let mut j = self.start_x;
            while j < max_j && !self.matrix.get(j, i) {
                j += 1;
            }
            let mut current_state = 0usize;
            while j < max_j {
                if self.matrix.get(j, i) {
                    if current_state == 1 {
                        state_count[1] += 1;
                    } else {
                        state_count[current_state] += 1;
                    }
                } else {
                    if current_state == 1 {
                        current_state = 2;
                    }
                    state_count[current_state] += 1;
                }
                if current_state == 2 {
                    if Self::found_pattern_cross(&state_count) {
                        let center_j = Self::center_from_end(&state_count, j);
                        if let Some(center_i) = self.cross_check_vertical(i, center_j as u32, 2 * state_count[1]) {
                            let estimated_module_size =
                                (state_count[0] + state_count[1] + state_count[2]) as f32 / 3.0;
                            if let Some(found) =
                                self.handle_possible_center(estimated_module_size, center_i, center_j)
                            {
                                return Ok(found);
                            }
                        }
                    }
                    state_count = [state_count[2], 0, 0];
                    current_state = if self.matrix.get(j, i) { 0 } else { 1 };
                    if current_state == 0 {
                        state_count[0] = 1;
                    }
                } else if current_state < 2 && self.matrix.get(j, i) == (current_state == 1) {
                    current_state += 1;
                }
                j += 1;
            }
            let _ = middle_i;
        }

        if !self.possible_centers.is_empty() {
            return Ok(self.possible_centers[0].0);
        }
        Err(Error::not_found("alignment pattern not found"))
    }

    fn found_pattern_cross(state_count: &[u32; 3]) -> bool {
        if state_count[0] == 0 || state_count[1] == 0 || state_count[2] == 0 {
            return false;
        }
        let module_size = (state_count[0] + state_count[1] + state_count[2]) as f32 / 3.0;
        let max_variance = module_size / 2.0;
        (module_size - state_count[0] as f32).abs() < max_variance
            && (module_size - state_count[1] as f32).abs() < max_variance
            && (module_size - state_count[2] as f32).abs() < max_variance
    }

    fn center_from_end(state_count: &[u32; 3], end: u32) -> f32 {
        end as f32 - state_count[2] as f32 - state_count[1] as f32 / 2.0
    }

    fn cross_check_vertical(&self, start_row: u32, center_col: u32, max_count: u32) -> Option<f32> {
        let height = self.matrix.height();
        let mut state = [0u32; 3];
        let mut r = start_row;
        while r > 0 && self.matrix.get(center_col, r - 1) && state[1] < max_count {
            r -= 1;
            state[1] += 1;
        }
        if r == 0 {
            return None;
        }
        while r > 0 && !self.matrix.get(center_col, r - 1) && state[0] < max_count {
            r -= 1;
            state[0] += 1;
        }
        if state[0] >= max_count {
            return None;
        }

        let mut r2 = start_row + 1;
        while r2 < height && self.matrix.get(center_col, r2) && state[1] < max_count {
            r2 += 1;
            state[1] += 1;
        }
        if r2 == height || state[1] >= max_count {
            return None;
        }
        while r2 < height && !self.matrix.get(center_col, r2) && state[2] < max_count {
            r2 += 1;
            state[2] += 1;
        }
        if state[2] >= max_count {
            return None;
        }

        if 5 * (state[0] as i64 + state[1] as i64 + state[2] as i64 - max_count as i64).abs()
            >= 2 * max_count as i64
        {
            return None;
        }
        if Self::found_pattern_cross(&state) {
            Some(Self::center_from_end(&state, r2))
        } else {
            None
        }
    }

    fn handle_possible_center(
        &mut self,
        estimated_module_size: f32,
        i: f32,
        j: f32,
    ) -> Option<AlignmentPattern> {
        for (existing, count) in self.possible_centers.iter_mut() {
            if Self::about_equals(existing, estimated_module_size, i, j) {
                *existing = Self::combine(existing, *count, estimated_module_size, i, j);
                *count += 1;
                if *count >= 2 {
                    return Some(*existing);
                }
                return None;
            }
        }
        if (estimated_module_size - self.module_size).abs() <= 2.0 * self.module_size {
            self.possible_centers.push((
                AlignmentPattern {
                    location: ResultPoint::new(j, i),
                    estimated_module_size,
                },
                1,
            ));
        }
        None
    }

    fn about_equals(p: &AlignmentPattern, module_size: f32, i: f32, j: f32) -> bool {
        if (i - p.location.y).abs() <= module_size && (j - p.location.x).abs() <= module_size {
            let diff = (module_size - p.estimated_module_size).abs();
            diff <= 1.0 || diff <= p.estimated_module_size
        } else {
            false
        }
    }

    fn combine(p: &AlignmentPattern, count: u32, module_size: f32, i: f32, j: f32) -> AlignmentPattern {
        let n = count + 1;
        AlignmentPattern {
            location: ResultPoint::new(
                (count as f32 * p.location.x + j) / n as f32,
                (count as f32 * p.location.y + i) / n as f32,
            ),
            estimated_module_size: (count as f32 * p.estimated_module_size + module_size) / n as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_synthetic_alignment_square() {
        let mut matrix = BitMatrix::square(60);
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let ring = dx.abs().max(dy.abs());
                if ring == 0 || ring == 2 {
                    matrix.set((30 + dx) as u32, (30 + dy) as u32);
                }
            }
        }
        let mut finder = AlignmentPatternFinder::new(&matrix, 20, 20, 20, 20, 1.0);
        let result = finder.find();
        assert!(result.is_ok());
        let pattern = result.unwrap();
        assert!((pattern.location.x - 30.0).abs() < 3.0);
        assert!((pattern.location.y - 30.0).abs() < 3.0);
    }
}
