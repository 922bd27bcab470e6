//! Samples a rectified module grid out of a binarized image given a
//! perspective transform.

use crate::bitmatrix::BitMatrix;
use crate::error::{Error, Result};
use crate::perspective::PerspectiveTransform;

pub trait GridSampler {
    fn sample_grid(
        &self,
        image: &BitMatrix,
        dimension_x: u32,
        dimension_y: u32,
        transform: &PerspectiveTransform,
    ) -> Result<BitMatrix>;
}

pub struct DefaultGridSampler;

impl GridSampler for DefaultGridSampler {
    fn sample_grid(
        &self,
        image: &BitMatrix,
        dimension_x: u32,
        dimension_y: u32,
        transform: &PerspectiveTransform,
    ) -> Result<BitMatrix> {
        if dimension_x == 0 || dimension_y == 0 {
            return Err(Error::illegal_argument("dimension must be positive"));
        }
        let mut bits = BitMatrix::new(dimension_x, dimension_y);
        let mut points = vec![0f32; 2 * dimension_x as usize];
        for y in 0..dimension_y {
            let max = points.len();
            let y_value = y as f32 + 0.5;
            for x in (0..max).step_by(2) {
                points[x] = (x as f32 / 2.0) + 0.5;
                points[x + 1] = y_value;
            }
            transform.transform_points(&mut points);
            check_and_nudge_points(image, &mut points)?;
            for x in (0..max).step_by(2) {
                let px = points[x];
                let py = points[x + 1];
                if px < 0.0 || px >= image.width() as f32 || py < 0.0 || py >= image.height() as f32
                {
                    return Err(Error::not_found("transformed point out of image bounds"));
                }
                if image.get(px as u32, py as u32) {
                    bits.set((x / 2) as u32, y);
                }
            }
        }
        Ok(bits)
    }
}

/// Nudge the endpoints of each row back onto the image if they are off by
/// at most one pixel; fail if further off than that.
fn check_and_nudge_points(image: &BitMatrix, points: &mut [f32]) -> Result<()> {
    let width = image.width() as i32;
    let height = image.height() as i32;

    let mut i = 0;
    while i < points.len() {
        let x = points[i];
        let y = points[i + 1];
        if x < -1.0 || x > width as f32 || y < -1.0 || y > height as f32 {
            return Err(Error::not_found("sample point far off image"));
        }
        let mut nx = x;
        let mut ny = y;
        if nx < 0.0 {
            nx = 0.0;
        } else if nx >= width as f32 {
            nx = width as f32 - 1.0;
        }
        if ny < 0.0 {
            ny = 0.0;
        } else if ny >= height as f32 {
            ny = height as f32 - 1.0;
        }
        points[i] = nx;
        points[i + 1] = ny;
        i += 2;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_sample_round_trips() {
        let dim = 21u32;
        let mut image = BitMatrix::square(dim);
        image.set(0, 0);
        image.set(5, 5);
        image.set(20, 20);
        let sampler = DefaultGridSampler;
        let sampled = sampler
            .sample_grid(&image, dim, dim, &PerspectiveTransform::identity())
            .unwrap();
        assert_eq!(sampled, image);
    }

    #[test]
    fn out_of_bounds_transform_fails() {
        let image = BitMatrix::square(21);
        let sampler = DefaultGridSampler;
        let transform = PerspectiveTransform::square_to_quadrilateral(
            -50.0, -50.0, -10.0, -50.0, -10.0, -10.0, -50.0, -10.0,
        );
        let result = sampler.sample_grid(&image, 21, 21, &transform);
        assert!(result.is_err());
    }
}
