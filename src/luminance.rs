//! A `LuminanceSource` is the capability set a binarizer needs: width,
//! height, one-row-at-a-time access (reusing a caller buffer) and whole-
//! matrix access. Rotation support is optional.

pub trait LuminanceSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Fills `row` (resizing if necessary) with the luminance values of
    /// image row `y` and returns it back to the caller.
    fn get_row(&self, y: u32, row: Vec<u8>) -> Vec<u8>;

    fn get_matrix(&self) -> Vec<u8>;

    fn is_rotate_supported(&self) -> bool {
        false
    }

    /// Rotates 90 degrees counter-clockwise, if supported.
    fn rotate_counter_clockwise(&self) -> Option<Box<dyn LuminanceSource>> {
        None
    }

    fn is_crop_supported(&self) -> bool {
        false
    }

    fn crop(&self, _left: u32, _top: u32, _width: u32, _height: u32) -> Option<Box<dyn LuminanceSource>> {
        None
    }
}

/// A plain in-memory luminance source backed by a row-major byte buffer.
/// This is the adapter a caller plugs a decoded raster image into; image
/// decoding itself is out of scope here.
pub struct GrayLuminanceSource {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl GrayLuminanceSource {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> GrayLuminanceSource {
        assert_eq!(data.len(), (width * height) as usize);
        GrayLuminanceSource {
            width,
            height,
            data,
        }
    }

    pub fn from_image(image: &image::GrayImage) -> GrayLuminanceSource {
        let (width, height) = image.dimensions();
        GrayLuminanceSource::new(width, height, image.as_raw().clone())
    }
}

impl LuminanceSource for GrayLuminanceSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn get_row(&self, y: u32, mut row: Vec<u8>) -> Vec<u8> {
        let start = (y * self.width) as usize;
        let end = start + self.width as usize;
        row.clear();
        row.extend_from_slice(&self.data[start..end]);
        row
    }

    fn get_matrix(&self) -> Vec<u8> {
        self.data.clone()
    }

    fn is_rotate_supported(&self) -> bool {
        true
    }

    fn rotate_counter_clockwise(&self) -> Option<Box<dyn LuminanceSource>> {
        let mut rotated = vec![0u8; self.data.len()];
        let (w, h) = (self.width, self.height);
        for y in 0..h {
            for x in 0..w {
                // (x, y) in source -> (y, w-1-x) in a 90ccw-rotated (h x w) image
                let src = (y * w + x) as usize;
                let dst_x = y;
                let dst_y = w - 1 - x;
                let dst = (dst_y * h + dst_x) as usize;
                rotated[dst] = self.data[src];
            }
        }
        Some(Box::new(GrayLuminanceSource::new(h, w, rotated)))
    }

    fn is_crop_supported(&self) -> bool {
        true
    }

    fn crop(&self, left: u32, top: u32, width: u32, height: u32) -> Option<Box<dyn LuminanceSource>> {
        if left + width > self.width || top + height > self.height {
            return None;
        }
        let mut cropped = vec![0u8; (width * height) as usize];
        for y in 0..height {
            let src_start = ((top + y) * self.width + left) as usize;
            let dst_start = (y * width) as usize;
            cropped[dst_start..dst_start + width as usize]
                .copy_from_slice(&self.data[src_start..src_start + width as usize]);
        }
        Some(Box::new(GrayLuminanceSource::new(width, height, cropped)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_row_matches_matrix() {
        let data: Vec<u8> = (0..12).collect();
        let src = GrayLuminanceSource::new(4, 3, data.clone());
        let row = src.get_row(1, Vec::new());
        assert_eq!(row, &data[4..8]);
    }

    #[test]
    fn rotate_ccw_moves_corner() {
        // 2x1 image [A, B] rotated 90ccw becomes a 1x2 image with B on top.
        let src = GrayLuminanceSource::new(2, 1, vec![10, 20]);
        let rotated = src.rotate_counter_clockwise().unwrap();
        assert_eq!(rotated.width(), 1);
        assert_eq!(rotated.height(), 2);
        assert_eq!(rotated.get_matrix(), vec![20, 10]);
    }

    #[test]
    fn crop_extracts_subregion() {
        let data: Vec<u8> = (0..16).collect();
        let src = GrayLuminanceSource::new(4, 4, data);
        let cropped = src.crop(1, 1, 2, 2).unwrap();
        assert_eq!(cropped.get_matrix(), vec![5, 6, 9, 10]);
    }
}
