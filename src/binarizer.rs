//! Turns a `LuminanceSource` into a monochrome `BitMatrix` (for 2-D
//! readers) or a `BitArray` per row (for 1-D readers), tolerating uneven
//! illumination.

use crate::bitarray::BitArray;
use crate::bitmatrix::BitMatrix;
use crate::error::{Error, Result};
use crate::luminance::LuminanceSource;
use log::debug;

const LUMINANCE_BITS: u32 = 5;
const LUMINANCE_SHIFT: u32 = 8 - LUMINANCE_BITS;
const LUMINANCE_BUCKETS: usize = 1 << LUMINANCE_BITS;

pub trait Binarizer {
    fn get_black_row(&self, y: u32) -> Result<BitArray>;
    fn get_black_matrix(&self) -> Result<BitMatrix>;
}

/// Builds a histogram from a handful of sampled rows and picks a single
/// global black point via a two-peak / valley search.
pub struct GlobalHistogramBinarizer<'a> {
    source: &'a dyn LuminanceSource,
}

impl<'a> GlobalHistogramBinarizer<'a> {
    pub fn new(source: &'a dyn LuminanceSource) -> GlobalHistogramBinarizer<'a> {
        GlobalHistogramBinarizer { source }
    }

    fn estimate_black_point(buckets: &[u32; LUMINANCE_BUCKETS]) -> Result<u32> {
        let num_buckets = buckets.len();
        let mut max_bucket_count = 0u32;
        let mut first_peak = 0usize;
        let mut first_peak_size = 0u32;
        for (i, &count) in buckets.iter().enumerate() {
            if count > first_peak_size {
                first_peak_size = count;
                first_peak = i;
            }
            if count > max_bucket_count {
                max_bucket_count = count;
            }
        }

        let mut second_peak = 0usize;
        let mut second_peak_score = 0i64;
        for (i, &count) in buckets.iter().enumerate() {
            let distance = i as i64 - first_peak as i64;
            let score = distance * distance * count as i64;
            if score > second_peak_score {
                second_peak_score = score;
                second_peak = i;
            }
        }

        let (first_peak, second_peak) = if first_peak > second_peak {
            (second_peak, first_peak)
        } else {
            (first_peak, second_peak)
        };

        if second_peak - first_peak <= num_buckets / 16 {
            return Err(Error::not_found("insufficient contrast to binarize"));
        }

        let mut best_valley = second_peak - 1;
        let mut best_valley_score = -1i64;
        for x in (first_peak..second_peak).rev() {
            let from_first = (x - first_peak) as i64;
            let score = from_first * from_first
                * (second_peak as i64 - x as i64)
                * (max_bucket_count as i64 - buckets[x] as i64);
            if score > best_valley_score {
                best_valley_score = score;
                best_valley = x;
            }
        }

        Ok((best_valley as u32) << LUMINANCE_SHIFT)
    }

    fn build_histogram(&self, y: u32) -> Result<(Vec<u8>, [u32; LUMINANCE_BUCKETS])> {
        let width = self.source.width();
        let row = self.source.get_row(y, Vec::with_capacity(width as usize));
        let mut buckets = [0u32; LUMINANCE_BUCKETS];
        for &p in &row {
            buckets[(p >> LUMINANCE_SHIFT) as usize] += 1;
        }
        Ok((row, buckets))
    }
}

impl<'a> Binarizer for GlobalHistogramBinarizer<'a> {
    fn get_black_row(&self, y: u32) -> Result<BitArray> {
        let (row, buckets) = self.build_histogram(y)?;
        let black_point = Self::estimate_black_point(&buckets)?;
        let width = row.len();
        let mut out = BitArray::new(width);
        if width < 3 {
            for (i, &p) in row.iter().enumerate() {
                if (p as u32) < black_point {
                    out.set(i);
                }
            }
            return Ok(out);
        }
        let mut left = row[0] as i32;
        let mut center = row[1] as i32;
        for x in 1..width - 1 {
            let right = row[x + 1] as i32;
            // -1, 4, -1 sharpening kernel normalized by /2.
            let luminance = ((center * 4) - left - right) / 2;
            if (luminance as u32) < black_point {
                out.set(x);
            }
            left = center;
            center = right;
        }
        Ok(out)
    }

    fn get_black_matrix(&self) -> Result<BitMatrix> {
        let width = self.source.width();
        let height = self.source.height();
        let mut matrix = BitMatrix::new(width, height);

        let mut local_buckets = [0u32; LUMINANCE_BUCKETS];
        let rows_to_sample = [height / 5, height * 2 / 5, height * 3 / 5, height * 4 / 5];
        let min_x = width / 8;
        let max_x = width - min_x;

        for &y in &rows_to_sample {
            let row = self.source.get_row(y, Vec::with_capacity(width as usize));
            for x in min_x..max_x {
                local_buckets[(row[x as usize] >> LUMINANCE_SHIFT) as usize] += 1;
            }
        }
        let black_point = Self::estimate_black_point(&local_buckets)?;

        let matrix_data = self.source.get_matrix();
        for y in 0..height {
            let row_start = (y * width) as usize;
            for x in 0..width {
                if (matrix_data[row_start + x as usize] as u32) < black_point {
                    matrix.set(x, y);
                }
            }
        }
        Ok(matrix)
    }
}

const BLOCK_SIZE: u32 = 8;
const MIN_DYNAMIC_RANGE: i32 = 24;

/// Per-block adaptive thresholding; falls back to the global binarizer for
/// images smaller than 40x40 in either dimension.
pub struct HybridBinarizer<'a> {
    source: &'a dyn LuminanceSource,
}

impl<'a> HybridBinarizer<'a> {
    pub fn new(source: &'a dyn LuminanceSource) -> HybridBinarizer<'a> {
        HybridBinarizer { source }
    }

    fn sub_blocks(dimension: u32) -> u32 {
        (dimension + BLOCK_SIZE - 1) / BLOCK_SIZE
    }

    fn calculate_black_points(&self, width: u32, height: u32) -> Vec<Vec<u32>> {
        let sub_width = Self::sub_blocks(width);
        let sub_height = Self::sub_blocks(height);
        let matrix_data = self.source.get_matrix();
        let mut black_points = vec![vec![0u32; sub_width as usize]; sub_height as usize];

        for y in 0..sub_height {
            let y_offset = (y * BLOCK_SIZE).min(height - BLOCK_SIZE);
            for x in 0..sub_width {
                let x_offset = (x * BLOCK_SIZE).min(width - BLOCK_SIZE);
                let mut sum = 0u32;
                let mut min = 255i32;
                let mut max = 0i32;
                for yy in 0..BLOCK_SIZE {
                    let row = ((y_offset + yy) * width) as usize;
                    for xx in 0..BLOCK_SIZE {
                        let pixel = matrix_data[row + (x_offset + xx) as usize] as i32;
                        sum += pixel as u32;
                        min = min.min(pixel);
                        max = max.max(pixel);
                    }
                }
                let mut average = (sum >> 6) as i32; // sum / 64, i.e. >>6
                if max - min <= MIN_DYNAMIC_RANGE {
                    average = min / 2;
                    if y > 0 && x > 0 {
                        let north = black_points[(y - 1) as usize][x as usize] as i32;
                        let west = black_points[y as usize][(x - 1) as usize] as i32;
                        let northwest = black_points[(y - 1) as usize][(x - 1) as usize] as i32;
                        let average_neighbor = (north + 2 * west + northwest) / 4;
                        if average_neighbor as i32 > min {
                            average = average_neighbor;
                        }
                    }
                }
                black_points[y as usize][x as usize] = average as u32;
            }
        }
        black_points
    }

    fn threshold_block(
        &self,
        matrix_data: &[u8],
        width: u32,
        height: u32,
        black_points: &[Vec<u32>],
        matrix: &mut BitMatrix,
    ) {
        let sub_width = black_points[0].len() as i32;
        let sub_height = black_points.len() as i32;
        for y in 0..sub_height {
            let y_offset = (y * BLOCK_SIZE as i32).min(height as i32 - BLOCK_SIZE as i32).max(0);
            for x in 0..sub_width {
                let x_offset = (x * BLOCK_SIZE as i32).min(width as i32 - BLOCK_SIZE as i32).max(0);
                let cap = |v: i32, lo: i32, hi: i32| v.max(lo).min(hi);
                let center_y = cap(y, 2, sub_height - 3);
                let center_x = cap(x, 2, sub_width - 3);
                let mut sum = 0i64;
                for dy in -2..=2 {
                    for dx in -2..=2 {
                        sum += black_points[(center_y + dy) as usize][(center_x + dx) as usize] as i64;
                    }
                }
                let average = (sum / 25) as i32;
                for yy in 0..BLOCK_SIZE as i32 {
                    let py = y_offset + yy;
                    let row = (py * width as i32) as usize;
                    for xx in 0..BLOCK_SIZE as i32 {
                        let px = x_offset + xx;
                        let pixel = matrix_data[row + px as usize] as i32;
                        if pixel <= average {
                            matrix.set(px as u32, py as u32);
                        }
                    }
                }
            }
        }
    }
}

impl<'a> Binarizer for HybridBinarizer<'a> {
    fn get_black_row(&self, y: u32) -> Result<BitArray> {
        GlobalHistogramBinarizer::new(self.source).get_black_row(y)
    }

    fn get_black_matrix(&self) -> Result<BitMatrix> {
        let width = self.source.width();
        let height = self.source.height();
        if width < 40 || height < 40 {
            debug!("image too small for hybrid binarization, falling back to global histogram");
            return GlobalHistogramBinarizer::new(self.source).get_black_matrix();
        }
        let matrix_data = self.source.get_matrix();
        let black_points = self.calculate_black_points(width, height);
        let mut matrix = BitMatrix::new(width, height);
        self.threshold_block(&matrix_data, width, height, &black_points, &mut matrix);
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::luminance::GrayLuminanceSource;

    fn checkerboard_image(size: u32) -> GrayLuminanceSource {
        let mut data = vec![0u8; (size * size) as usize];
        for y in 0..size {
            for x in 0..size {
                let block = ((x / 4) + (y / 4)) % 2;
                data[(y * size + x) as usize] = if block == 0 { 20 } else { 235 };
            }
        }
        GrayLuminanceSource::new(size, size, data)
    }

    #[test]
    fn uniform_image_fails_global_binarizer() {
        let data = vec![128u8; 100 * 100];
        let src = GrayLuminanceSource::new(100, 100, data);
        let binarizer = GlobalHistogramBinarizer::new(&src);
        assert!(binarizer.get_black_matrix().is_err());
    }

    #[test]
    fn uniform_image_hybrid_is_uniformly_light() {
        let data = vec![200u8; 100 * 100];
        let src = GrayLuminanceSource::new(100, 100, data);
        let binarizer = HybridBinarizer::new(&src);
        let matrix = binarizer.get_black_matrix().unwrap();
        assert!(matrix.enclosing_rectangle().is_none() || {
            // A low-dynamic-range uniform region should not register as black.
            let mut any_set = false;
            for y in 0..matrix.height() {
                for x in 0..matrix.width() {
                    if matrix.get(x, y) {
                        any_set = true;
                    }
                }
            }
            !any_set
        });
    }

    #[test]
    fn checkerboard_binarizes_to_contrast() {
        let src = checkerboard_image(64);
        let binarizer = HybridBinarizer::new(&src);
        let matrix = binarizer.get_black_matrix().unwrap();
        assert!(matrix.get(0, 0));
        assert!(!matrix.get(4, 0));
    }

    #[test]
    fn small_image_falls_back_to_global() {
        let mut data = vec![0u8; 20 * 20];
        for (i, v) in data.iter_mut().enumerate() {
            *v = if i % 2 == 0 { 10 } else { 240 };
        }
        let src = GrayLuminanceSource::new(20, 20, data);
        let binarizer = HybridBinarizer::new(&src);
        assert!(binarizer.get_black_matrix().is_ok());
    }
}
