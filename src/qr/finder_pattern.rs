//! Locates the three position-detection (finder) patterns in a binarized
//! image: concentric dark:light:dark:light:dark modules in ratio
//! 1:1:3:1:1, checked along rows, then confirmed vertically and
//! horizontally through the candidate center — plus, in pure-barcode mode,
//! a diagonal cross-check from top-left to bottom-right.

use crate::bitmatrix::BitMatrix;
use crate::error::{Error, Result};
use crate::geometry::ResultPoint;

const CENTER_QUORUM: u32 = 2;
const MAX_MODULES: f32 = 57.0; // widest finder pattern spans 7 modules at version 40.

#[derive(Clone, Copy, Debug)]
pub struct FinderPattern {
    pub location: ResultPoint,
    pub estimated_module_size: f32,
    pub count: u32,
}

impl FinderPattern {
    fn about_equals(&self, module_size: f32, i: f32, j: f32) -> bool {
        if (i - self.location.y).abs() <= module_size && (j - self.location.x).abs() <= module_size
        {
            let diff = (module_size - self.estimated_module_size).abs();
            diff <= 1.0 || diff <= self.estimated_module_size
        } else {
            false
        }
    }

    fn combine(&self, module_size: f32, i: f32, j: f32) -> FinderPattern {
        let combined_count = self.count + 1;
        FinderPattern {
            location: ResultPoint::new(
                (self.count as f32 * self.location.x + j) / combined_count as f32,
                (self.count as f32 * self.location.y + i) / combined_count as f32,
            ),
            estimated_module_size: (self.count as f32 * self.estimated_module_size + module_size)
                / combined_count as f32,
            count: combined_count,
        }
    }
}

pub struct FinderPatternFinder<'a> {
    matrix: &'a BitMatrix,
    possible_centers: Vec<FinderPattern>,
    try_harder: bool,
    pure_barcode: bool,
}

impl<'a> FinderPatternFinder<'a> {
    pub fn new(matrix: &'a BitMatrix, try_harder: bool, pure_barcode: bool) -> FinderPatternFinder<'a> {
        FinderPatternFinder {
            matrix,
            possible_centers: Vec::new(),
            try_harder,
            pure_barcode,
        }
    }

    pub fn find(&mut self) -> Result<[FinderPattern; 3]> {
        let height = self.matrix.height();
        let width = self.matrix.width();
        let mut skip = if self.try_harder {
            3
        } else {
            (((3.0 * height as f32) / (4.0 * MAX_MODULES)).floor() as u32).max(3)
        };

        let mut done = false;
        let mut row = skip - 1;
        while row < height && !done {
            let mut current_state = 0usize;
            let mut state_count = [0u32; 5];
            let mut col = 0u32;
            while col < width {
                if self.matrix.get(col, row) {
                    if current_state & 1 == 1 {
                        current_state += 1;
                    }
                    state_count[current_state] += 1;
                } else {
                    if current_state & 1 == 0 {
                        if current_state == 4 {
                            if Self::found_pattern_cross(&state_count) {
                                let confirmed =
                                    self.handle_possible_center(&state_count, row, col);
                                if confirmed {
                                    skip = 2;
                                    if self.possible_centers.len() > 1 {
                                        row = self.find_row_skip();
                                    }
                                }
                            }
                            current_state = 0;
                            state_count = [0; 5];
                        } else {
                            current_state += 1;
                            state_count[current_state] += 1;
                        }
                    } else {
                        state_count[current_state] += 1;
                    }
                }
                col += 1;
            }
            if Self::found_pattern_cross(&state_count) {
                self.handle_possible_center(&state_count, row, width);
            }
            row += skip;
            if self.possible_centers.len() >= 3 {
                // An early exit once enough well-formed candidates accumulate;
                // select_best_patterns still validates module-size agreement.
                done = self.have_multiple_confirmed_centers();
            }
        }

        self.select_best_patterns()
    }

    fn found_pattern_cross(state_count: &[u32; 5]) -> bool {
        let mut total = 0u32;
        for &count in state_count {
            if count == 0 {
                return false;
            }
            total += count;
        }
        if total < 7 {
            return false;
        }
        let module_size = (total as f32) / 7.0;
        let max_variance = module_size / 2.0;
        (module_size - state_count[0] as f32).abs() < max_variance
            && (module_size - state_count[1] as f32).abs() < max_variance
            && (3.0 * module_size - state_count[2] as f32).abs() < 3.0 * max_variance
            && (module_size - state_count[3] as f32).abs() < max_variance
            && (module_size - state_count[4] as f32).abs() < max_variance
    }

    fn cross_check_vertical(&self, start_row: u32, center_col: u32, original_state_count_total: u32) -> Option<f32> {
        let height = self.matrix.height();
        let mut state = [0u32; 5];
        let mut r = start_row;
        while r > 0 && self.matrix.get(center_col, r - 1) {
            r -= 1;
            state[2] += 1;
        }
        if r == 0 && !self.matrix.get(center_col, 0) {
            return None;
        }
        while r > 0 && !self.matrix.get(center_col, r - 1) && state[1] < original_state_count_total {
            r -= 1;
            state[1] += 1;
        }
        if r == 0 || state[1] >= original_state_count_total {
            return None;
        }
        while r > 0 && self.matrix.get(center_col, r - 1) && state[0] < original_state_count_total {
            r -= 1;
            state[0] += 1;
        }
        if state[0] >= original_state_count_total {
            return None;
        }

        let mut r2 = start_row + 1;
        while r2 < height && self.matrix.get(center_col, r2) {
            r2 += 1;
            state[2] += 1;
        }
        if r2 == height {
            return None;
        }
        while r2 < height && !self.matrix.get(center_col, r2) && state[3] < original_state_count_total {
            r2 += 1;
            state[3] += 1;
        }
        if r2 == height || state[3] >= original_state_count_total {
            return None;
        }
        while r2 < height && self.matrix.get(center_col, r2) && state[4] < original_state_count_total {
            r2 += 1;
            state[4] += 1;
        }
        if state[4] >= original_state_count_total {
            return None;
        }

        let state_count_total = state[0] + state[1] + state[2] + state[3] + state[4];
        if 5 * (state_count_total as i64 - original_state_count_total as i64).abs()
            >= 2 * original_state_count_total as i64
        {
            return None;
        }
        if Self::found_pattern_cross(&state) {
            Some(Self::center_from_end(&state, r2))
        } else {
            None
        }
    }

    fn cross_check_horizontal(&self, start_col: u32, center_row: u32, original_state_count_total: u32) -> Option<f32> {
        let width = self.matrix.width();
        let mut state = [0u32; 5];
        let mut c = start_col;
        while c > 0 && self.matrix.get(c - 1, center_row) {
            c -= 1;
            state[2] += 1;
        }
        if c == 0 {
            return None;
        }
        while c > 0 && !self.matrix.get(c - 1, center_row) && state[1] < original_state_count_total {
            c -= 1;
            state[1] += 1;
        }
        if c == 0 || state[1] >= original_state_count_total {
            return None;
        }
        while c > 0 && self.matrix.get(c - 1, center_row) && state[0] < original_state_count_total {
            c -= 1;
            state[0] += 1;
        }
        if state[0] >= original_state_count_total {
            return None;
        }

        let mut c2 = start_col + 1;
        while c2 < width && self.matrix.get(c2, center_row) {
            c2 += 1;
            state[2] += 1;
        }
        if c2 == width {
            return None;
        }
        while c2 < width && !self.matrix.get(c2, center_row) && state[3] < original_state_count_total {
            c2 += 1;
            state[3] += 1;
        }
        if c2 == width || state[3] >= original_state_count_total {
            return None;
        }
        while c2 < width && self.matrix.get(c2, center_row) && state[4] < original_state_count_total {
            c2 += 1;
            state[4] += 1;
        }
        if state[4] >= original_state_count_total {
            return None;
        }

        if Self::found_pattern_cross(&state) {
            Some(Self::center_from_end(&state, c2))
        } else {
            None
        }
    }

    fn center_from_end(state_count: &[u32; 5], end: u32) -> f32 {
        end as f32 - state_count[4] as f32 - state_count[3] as f32 - state_count[2] as f32 / 2.0
    }

    /// Walks diagonally (top-left <-> bottom-right) through the refined
    /// center, same 1:1:3:1:1 proportion test as the horizontal/vertical
    /// checks but with a looser 100% total-width tolerance. Only run in
    /// pure-barcode mode.
    fn cross_check_diagonal(&self, start_col: u32, start_row: u32, original_state_count_total: u32) -> bool {
        let width = self.matrix.width();
        let height = self.matrix.height();
        let mut state = [0u32; 5];

        let mut c = start_col;
        let mut r = start_row;
        while c > 0 && r > 0 && self.matrix.get(c - 1, r - 1) {
            c -= 1;
            r -= 1;
            state[2] += 1;
        }
        if c == 0 || r == 0 {
            return false;
        }
        while c > 0 && r > 0 && !self.matrix.get(c - 1, r - 1) && state[1] < original_state_count_total {
            c -= 1;
            r -= 1;
            state[1] += 1;
        }
        if c == 0 || r == 0 || state[1] >= original_state_count_total {
            return false;
        }
        while c > 0 && r > 0 && self.matrix.get(c - 1, r - 1) && state[0] < original_state_count_total {
            c -= 1;
            r -= 1;
            state[0] += 1;
        }
        if state[0] >= original_state_count_total {
            return false;
        }

        let mut c2 = start_col + 1;
        let mut r2 = start_row + 1;
        while c2 < width && r2 < height && self.matrix.get(c2, r2) {
            c2 += 1;
            r2 += 1;
            state[2] += 1;
        }
        if c2 == width || r2 == height {
            return false;
        }
        while c2 < width && r2 < height && !self.matrix.get(c2, r2) && state[3] < original_state_count_total {
            c2 += 1;
            r2 += 1;
            state[3] += 1;
        }
        if c2 == width || r2 == height || state[3] >= original_state_count_total {
            return false;
        }
        while c2 < width && r2 < height && self.matrix.get(c2, r2) && state[4] < original_state_count_total {
            c2 += 1;
            r2 += 1;
            state[4] += 1;
        }
        if state[4] >= original_state_count_total {
            return false;
        }

        let state_count_total: u32 = state.iter().sum();
        if (state_count_total as i64 - original_state_count_total as i64).abs()
            >= original_state_count_total as i64
        {
            return false;
        }
        Self::found_pattern_cross(&state)
    }

    fn handle_possible_center(&mut self, state_count: &[u32; 5], row: u32, col: u32) -> bool {
        let state_count_total: u32 = state_count.iter().sum();
        let center_col = Self::center_from_end(state_count, col);
        let center_row = match self.cross_check_vertical(row, center_col as u32, state_count[2]) {
            Some(r) => r,
            None => return false,
        };
        let center_col = match self.cross_check_horizontal(center_col as u32, center_row as u32, state_count[2]) {
            Some(c) => c,
            None => return false,
        };
        if self.pure_barcode
            && !self.cross_check_diagonal(center_col as u32, center_row as u32, state_count[2])
        {
            return false;
        }

        let estimated_module_size = state_count_total as f32 / 7.0;
        let mut found = false;
        for i in 0..self.possible_centers.len() {
            if self.possible_centers[i].about_equals(estimated_module_size, center_row, center_col) {
                self.possible_centers[i] =
                    self.possible_centers[i].combine(estimated_module_size, center_row, center_col);
                found = true;
                break;
            }
        }
        if !found {
            if estimated_module_size >= 1.0 && estimated_module_size <= MAX_MODULES {
                self.possible_centers.push(FinderPattern {
                    location: ResultPoint::new(center_col, center_row),
                    estimated_module_size,
                    count: 1,
                });
            }
        }
        true
    }

    fn have_multiple_confirmed_centers(&self) -> bool {
        let mut confirmed = 0;
        let mut total_module_size = 0.0f32;
        for p in &self.possible_centers {
            if p.count >= CENTER_QUORUM {
                confirmed += 1;
                total_module_size += p.estimated_module_size;
            }
        }
        if confirmed < 3 {
            return false;
        }
        let average = total_module_size / self.possible_centers.len() as f32;
        let mut total_deviation = 0.0f32;
        for p in &self.possible_centers {
            total_deviation += (p.estimated_module_size - average).abs();
        }
        total_deviation <= 0.05 * total_module_size
    }

    fn find_row_skip(&self) -> u32 {
        if self.possible_centers.len() <= 1 {
            return 0;
        }
        let mut first_confirmed = None;
        for p in &self.possible_centers {
            if p.count >= CENTER_QUORUM {
                if first_confirmed.is_some() {
                    return 0;
                }
                first_confirmed = Some(*p);
            }
        }
        if let Some(p) = first_confirmed {
            ((p.location.y - p.estimated_module_size) / 2.0).max(0.0) as u32
        } else {
            0
        }
    }

    /// Selects the 3 candidates with highest confirmation counts that are
    /// mutually consistent in estimated module size, smallest total
    /// pairwise distance first.
    fn select_best_patterns(&self) -> Result<[FinderPattern; 3]> {
        let start_size = self.possible_centers.len();
        if start_size < 3 {
            return Err(Error::not_found("fewer than 3 finder pattern candidates"));
        }

        let mut centers = self.possible_centers.clone();
        if centers.len() > 3 {
            let mut total_module_size = 0.0f32;
            let mut square_module_size = 0.0f32;
            for p in &centers {
                total_module_size += p.estimated_module_size;
                square_module_size += p.estimated_module_size * p.estimated_module_size;
            }
            let average = total_module_size / centers.len() as f32;
            let stddev =
                (square_module_size / centers.len() as f32 - average * average).sqrt();
            centers.sort_by(|a, b| {
                let da = (a.estimated_module_size - average).abs();
                let db = (b.estimated_module_size - average).abs();
                da.partial_cmp(&db).unwrap()
            });
            let limit = (0.2 * average).max(stddev);
            centers.retain(|p| (p.estimated_module_size - average).abs() <= limit.max(average * 0.5));
        }

        if centers.len() > 3 {
            centers.sort_by(|a, b| b.count.cmp(&a.count));
            centers.truncate(3);
        }
        if centers.len() < 3 {
            return Err(Error::not_found("could not narrow to 3 finder patterns"));
        }

        Ok([centers[0], centers[1], centers[2]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_finder(matrix: &mut BitMatrix, cx: u32, cy: u32, module: u32) {
        for dy in -3i32..=3 {
            for dx in -3i32..=3 {
                let ring = dx.abs().max(dy.abs());
                let dark = ring == 0 || ring == 1 || ring == 3;
                if dark {
                    for my in 0..module {
                        for mx in 0..module {
                            let x = (cx as i32 + dx * module as i32 + mx as i32) as u32;
                            let y = (cy as i32 + dy * module as i32 + my as i32) as u32;
                            matrix.set(x, y);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn finds_three_synthetic_patterns() {
        let mut matrix = BitMatrix::square(200);
        draw_finder(&mut matrix, 30, 30, 3);
        draw_finder(&mut matrix, 150, 30, 3);
        draw_finder(&mut matrix, 30, 150, 3);
        let mut finder = FinderPatternFinder::new(&matrix, false, false);
        let result = finder.find();
        assert!(result.is_ok());
    }

    #[test]
    fn pure_barcode_mode_still_finds_synthetic_patterns() {
        let mut matrix = BitMatrix::square(200);
        draw_finder(&mut matrix, 30, 30, 3);
        draw_finder(&mut matrix, 150, 30, 3);
        draw_finder(&mut matrix, 30, 150, 3);
        let mut finder = FinderPatternFinder::new(&matrix, false, true);
        let result = finder.find();
        assert!(result.is_ok());
    }
}
