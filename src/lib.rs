//! QR Code (ISO/IEC 18004) encoding and decoding: binarization, finder
//! and alignment pattern detection, perspective rectification, bitstream
//! decode with Reed-Solomon error correction, and the reverse encode
//! pipeline with mask penalty scoring.

pub mod binarizer;
pub mod bitarray;
pub mod bitmatrix;
pub mod charset;
pub mod error;
pub mod geometry;
pub mod gf;
pub mod grid_sampler;
pub mod hints;
pub mod luminance;
pub mod perspective;
pub mod qr;
pub mod reed_solomon;
pub mod result;

use binarizer::{Binarizer, HybridBinarizer};
use error::Result;
use hints::{DecodeHints, EncodeHints};
use luminance::LuminanceSource;
use qr::detector;
use result::ScanResult;

/// Locates, rectifies and decodes a single QR symbol in `source`.
pub fn decode(source: &dyn LuminanceSource, hints: &DecodeHints) -> Result<ScanResult> {
    let binarizer = HybridBinarizer::new(source);
    let black_matrix = binarizer.get_black_matrix()?;
    let detected = detector::detect(&black_matrix, hints)?;
    let decoder_result = qr::decoder::decode(&detected.bits, hints)?;
    Ok(ScanResult::from_decoder_result(decoder_result, detected.points))
}

/// Encodes `content` as a QR symbol, returning the module matrix (one
/// bit per module, no quiet zone) plus the chosen version/level/mask.
pub fn encode(content: &str, hints: EncodeHints) -> Result<qr::encoder::EncodedSymbol> {
    qr::encoder::encode(content, hints)
}

/// Renders an encoded symbol's module matrix to a grayscale image with
/// the requested quiet zone, for callers that want pixels rather than a
/// bare `BitMatrix`.
pub fn to_image(symbol: &qr::encoder::EncodedSymbol, margin: u32, module_pixels: u32) -> image::GrayImage {
    let dimension = symbol.matrix.width();
    let size = (dimension + 2 * margin) * module_pixels;
    image::ImageBuffer::from_fn(size, size, |x, y| {
        let mx = x / module_pixels;
        let my = y / module_pixels;
        if mx < margin || my < margin || mx >= margin + dimension || my >= margin + dimension {
            return image::Luma([255u8]);
        }
        let module_x = mx - margin;
        let module_y = my - margin;
        if symbol.matrix.get(module_x, module_y) {
            image::Luma([0u8])
        } else {
            image::Luma([255u8])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use luminance::GrayLuminanceSource;

    #[test]
    fn encode_then_render_produces_expected_image_size() {
        let symbol = encode("HELLO WORLD", EncodeHints::default()).unwrap();
        let image = to_image(&symbol, 4, 3);
        let expected = (symbol.matrix.width() + 8) * 3;
        assert_eq!(image.width(), expected);
        assert_eq!(image.height(), expected);
    }

    #[test]
    fn decode_rejects_blank_image() {
        let data = vec![128u8; 100 * 100];
        let src = GrayLuminanceSource::new(100, 100, data);
        let hints = DecodeHints::default();
        assert!(decode(&src, &hints).is_err());
    }
}
