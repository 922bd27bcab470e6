//! Locates and rectifies a QR symbol in a binarized bit matrix: find the
//! three finder patterns, estimate module size and dimension, locate the
//! alignment pattern closest to the expected bottom-right position
//! (escalating the search allowance if it isn't found), and sample a
//! clean module grid through a perspective transform.

use crate::bitmatrix::BitMatrix;
use crate::error::{Error, Result};
use crate::geometry::ResultPoint;
use crate::grid_sampler::{DefaultGridSampler, GridSampler};
use crate::hints::DecodeHints;
use crate::perspective::PerspectiveTransform;
use crate::qr::alignment_pattern::{AlignmentPattern, AlignmentPatternFinder};
use crate::qr::finder_pattern::{FinderPattern, FinderPatternFinder};
use crate::qr::version::Version;

pub struct DetectorResult {
    pub bits: BitMatrix,
    pub points: Vec<ResultPoint>,
}

pub fn detect(image: &BitMatrix, hints: &DecodeHints) -> Result<DetectorResult> {
    let mut finder = FinderPatternFinder::new(image, hints.try_harder, hints.pure_barcode);
    let patterns = finder.find()?;
    process_finder_pattern_info(image, patterns)
}

fn process_finder_pattern_info(image: &BitMatrix, patterns: [FinderPattern; 3]) -> Result<DetectorResult> {
    let mut points = [
        patterns[0].location,
        patterns[1].location,
        patterns[2].location,
    ];
    ResultPoint::order_finder_patterns(&mut points);
    let (bottom_left, top_left, top_right) = (points[0], points[1], points[2]);

    let module_size = calculate_module_size(image, top_left, top_right, bottom_left)?;
    let dimension = compute_dimension(top_left, top_right, bottom_left, module_size)?;
    let version = Version::from_dimension(dimension)?;

    let alignment_pattern = if version.alignment_pattern_centers().is_empty() {
        None
    } else {
        let br_x = top_right.x - top_left.x + bottom_left.x;
        let br_y = top_right.y - top_left.y + bottom_left.y;

        let last_center = *version
            .alignment_pattern_centers()
            .last()
            .expect("checked non-empty above") as f32;
        let modules_between = last_center - 3.5; // distance from finder center to alignment center, in modules
        let est_x = top_left.x + modules_between / (version.dimension() as f32 - 7.0) * (br_x - top_left.x);
        let est_y = top_left.y + modules_between / (version.dimension() as f32 - 7.0) * (br_y - top_left.y);

        find_alignment_in_region(image, est_x, est_y, module_size)
    };

    let dimension_f = dimension as f32;
    let transform = if let Some(ref alignment) = alignment_pattern {
        create_transform(top_left, top_right, bottom_left, Some(alignment.location), dimension_f)
    } else {
        create_transform(top_left, top_right, bottom_left, None, dimension_f)
    };

    let sampler = DefaultGridSampler;
    let bits = sampler.sample_grid(image, dimension, dimension, &transform)?;

    let mut result_points = vec![bottom_left, top_left, top_right];
    if let Some(alignment) = alignment_pattern {
        result_points.push(alignment.location);
    }

    Ok(DetectorResult {
        bits,
        points: result_points,
    })
}

fn calculate_module_size(
    image: &BitMatrix,
    top_left: ResultPoint,
    top_right: ResultPoint,
    bottom_left: ResultPoint,
) -> Result<f32> {
    let one = size_of_black_white_black_run(
        image,
        top_left.x as i32,
        top_left.y as i32,
        top_right.x as i32,
        top_right.y as i32,
    );
    let two = size_of_black_white_black_run(
        image,
        top_left.x as i32,
        top_left.y as i32,
        bottom_left.x as i32,
        bottom_left.y as i32,
    );
    let average = (one + two) / 14.0; // 7 modules across each finder-to-finder diagonal half.
    if average < 1.0 {
        return Err(Error::not_found("module size estimate degenerate"));
    }
    Ok(average)
}

/// Bresenham-walks from `(from_x, from_y)` towards `(to_x, to_y)`, timing
/// how many pixels the black-white-black finder-center run spans.
fn size_of_black_white_black_run(image: &BitMatrix, from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> f32 {
    let steep = (to_y - from_y).abs() > (to_x - from_x).abs();
    let (mut from_x, mut from_y, mut to_x, mut to_y) = if steep {
        (from_y, from_x, to_y, to_x)
    } else {
        (from_x, from_y, to_x, to_y)
    };

    let dx = (to_x - from_x).abs();
    let dy = (to_y - from_y).abs();
    let mut error = -dx / 2;
    let x_step = if from_x < to_x { 1 } else { -1 };
    let y_step = if from_y < to_y { 1 } else { -1 };

    let mut state = 0; // 0 = before first black, 1 = in white gap, 2 = done
    let mut x = from_x;
    let mut y = from_y;
    loop {
        let (real_x, real_y) = if steep { (y, x) } else { (x, y) };
        if real_x < 0 || real_x >= image.width() as i32 || real_y < 0 || real_y >= image.height() as i32 {
            break;
        }
        let is_black = image.get(real_x as u32, real_y as u32);
        if state == 1 {
            if is_black {
                state = 2;
                break;
            }
        } else if is_black {
            // still counting the leading black run; state stays 0
        } else if state == 0 {
            state = 1;
        }

        if x == to_x {
            break;
        }
        error += dy;
        if error > 0 {
            if y == to_y {
                break;
            }
            y += y_step;
            error -= dx;
        }
        x += x_step;
    }

    let diff_x = (x - from_x) as f32;
    let diff_y = (y - from_y) as f32;
    (diff_x * diff_x + diff_y * diff_y).sqrt()
}

fn compute_dimension(
    top_left: ResultPoint,
    top_right: ResultPoint,
    bottom_left: ResultPoint,
    module_size: f32,
) -> Result<u32> {
    let tltr = ResultPoint::distance(top_left, top_right) / module_size;
    let tlbl = ResultPoint::distance(top_left, bottom_left) / module_size;
    let dimension = ((tltr + tlbl) / 2.0).round() as i32 + 7;
    let modules_round = match dimension % 4 {
        0 => dimension + 1,
        2 => dimension - 1,
        3 => return Err(Error::not_found("computed dimension is congruent to 3 mod 4")),
        _ => dimension,
    };
    if modules_round < 21 {
        return Err(Error::not_found("computed dimension too small"));
    }
    Ok(modules_round as u32)
}

fn find_alignment_in_region(
    image: &BitMatrix,
    est_x: f32,
    est_y: f32,
    module_size: f32,
) -> Option<AlignmentPattern> {
    for &allowance_factor in &[4.0f32, 8.0, 16.0] {
        let allowance = (allowance_factor * module_size) as i32;
        let alignment_area_left_x = (est_x as i32 - allowance).max(0) as u32;
        let alignment_area_right_x = (est_x as i32 + allowance).min(image.width() as i32 - 1) as u32;
        if alignment_area_right_x <= alignment_area_left_x + 1 {
            continue;
        }
        let alignment_area_top_y = (est_y as i32 - allowance).max(0) as u32;
        let alignment_area_bottom_y = (est_y as i32 + allowance).min(image.height() as i32 - 1) as u32;
        if alignment_area_bottom_y <= alignment_area_top_y + 1 {
            continue;
        }

        let mut finder = AlignmentPatternFinder::new(
            image,
            alignment_area_left_x,
            alignment_area_top_y,
            alignment_area_right_x - alignment_area_left_x,
            alignment_area_bottom_y - alignment_area_top_y,
            module_size,
        );
        if let Ok(found) = finder.find() {
            return Some(found);
        }
    }
    None
}

fn create_transform(
    top_left: ResultPoint,
    top_right: ResultPoint,
    bottom_left: ResultPoint,
    alignment_point: Option<ResultPoint>,
    dimension: f32,
) -> PerspectiveTransform {
    let dimension_minus_three = dimension - 3.5;
    let (bottom_right_x, bottom_right_y, source_bottom_right_x, source_bottom_right_y);
    if let Some(alignment) = alignment_point {
        bottom_right_x = alignment.x;
        bottom_right_y = alignment.y;
        source_bottom_right_x = dimension_minus_three - 3.0;
        source_bottom_right_y = source_bottom_right_x;
    } else {
        bottom_right_x = top_right.x - top_left.x + bottom_left.x;
        bottom_right_y = top_right.y - top_left.y + bottom_left.y;
        source_bottom_right_x = dimension_minus_three;
        source_bottom_right_y = dimension_minus_three;
    }

    PerspectiveTransform::quadrilateral_to_quadrilateral(
        3.5,
        3.5,
        dimension_minus_three,
        3.5,
        source_bottom_right_x,
        source_bottom_right_y,
        3.5,
        dimension_minus_three,
        top_left.x,
        top_left.y,
        top_right.x,
        top_right.y,
        bottom_right_x,
        bottom_right_y,
        bottom_left.x,
        bottom_left.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_dimension_version1() {
        let tl = ResultPoint::new(10.0, 10.0);
        let tr = ResultPoint::new(73.0, 10.0); // 21 modules * 3px, minus finder half-width
        let bl = ResultPoint::new(10.0, 73.0);
        let dim = compute_dimension(tl, tr, bl, 3.0).unwrap();
        assert_eq!(dim, 21);
    }

    #[test]
    fn compute_dimension_rejects_3_mod_4() {
        let tl = ResultPoint::new(0.0, 0.0);
        let tr = ResultPoint::new(74.0, 0.0);
        let bl = ResultPoint::new(0.0, 74.0);
        // (74/3 + 74/3) / 2 rounds to 25, +7 = 32, which is 0 mod 4, not 3;
        // pick a module size that lands dimension at 3 mod 4 instead.
        let dim = compute_dimension(tl, tr, bl, 3.65);
        assert!(dim.is_err());
    }
}
