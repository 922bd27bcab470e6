//! Decode output types: the raw decoder result plus the higher-level
//! scan result a caller actually wants, with a metadata side-table for
//! the odds and ends (ECI segments, structured append, byte segments).

use std::collections::HashMap;

use crate::geometry::ResultPoint;
use crate::qr::error_correction_level::ErrorCorrectionLevel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultMetadataType {
    ByteSegments,
    ErrorCorrectionLevel,
    StructuredAppendSequence,
    StructuredAppendParity,
    Mirrored,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataValue {
    Text(String),
    Number(i64),
    Bool(bool),
    ByteSegments(Vec<Vec<u8>>),
}

/// Everything the bitstream parser recovers from one QR symbol's data
/// codewords, before being wrapped into the public-facing `Result`.
#[derive(Clone, Debug, Default)]
pub struct DecoderResult {
    pub raw_bytes: Vec<u8>,
    pub text: String,
    pub byte_segments: Vec<Vec<u8>>,
    pub ec_level: Option<String>,
    /// (sequence number, parity), present only for structured-append
    /// symbols.
    pub structured_append: Option<(i32, i32)>,
    pub mirrored: bool,
}

impl DecoderResult {
    pub fn with_ec_level(mut self, level: ErrorCorrectionLevel) -> DecoderResult {
        self.ec_level = Some(format!("{:?}", level));
        self
    }
}

/// Public scan result: decoded text, the symbol's finder-pattern/corner
/// locations, and a metadata side-table.
#[derive(Clone, Debug)]
pub struct ScanResult {
    pub text: String,
    pub raw_bytes: Vec<u8>,
    pub result_points: Vec<ResultPoint>,
    pub metadata: HashMap<ResultMetadataType, MetadataValue>,
}

impl ScanResult {
    pub fn from_decoder_result(decoder_result: DecoderResult, mut points: Vec<ResultPoint>) -> ScanResult {
        if decoder_result.mirrored && points.len() >= 3 {
            points.swap(0, 2);
        }
        let mut metadata = HashMap::new();
        if !decoder_result.byte_segments.is_empty() {
            metadata.insert(
                ResultMetadataType::ByteSegments,
                MetadataValue::ByteSegments(decoder_result.byte_segments.clone()),
            );
        }
        if let Some(level) = &decoder_result.ec_level {
            metadata.insert(
                ResultMetadataType::ErrorCorrectionLevel,
                MetadataValue::Text(level.clone()),
            );
        }
        if let Some((sequence, parity)) = decoder_result.structured_append {
            metadata.insert(
                ResultMetadataType::StructuredAppendSequence,
                MetadataValue::Number(sequence as i64),
            );
            metadata.insert(
                ResultMetadataType::StructuredAppendParity,
                MetadataValue::Number(parity as i64),
            );
        }
        if decoder_result.mirrored {
            metadata.insert(ResultMetadataType::Mirrored, MetadataValue::Bool(true));
        }
        ScanResult {
            text: decoder_result.text,
            raw_bytes: decoder_result.raw_bytes,
            result_points: points,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_carries_ec_level_and_mirrored() {
        let decoder_result = DecoderResult {
            text: "HI".into(),
            mirrored: true,
            ..Default::default()
        }
        .with_ec_level(ErrorCorrectionLevel::H);
        let result = ScanResult::from_decoder_result(decoder_result, vec![]);
        assert_eq!(
            result.metadata.get(&ResultMetadataType::ErrorCorrectionLevel),
            Some(&MetadataValue::Text("H".to_string()))
        );
        assert_eq!(
            result.metadata.get(&ResultMetadataType::Mirrored),
            Some(&MetadataValue::Bool(true))
        );
    }

    #[test]
    fn mirrored_result_swaps_bottom_left_and_top_right() {
        let bl = ResultPoint::new(0.0, 10.0);
        let tl = ResultPoint::new(0.0, 0.0);
        let tr = ResultPoint::new(10.0, 0.0);
        let decoder_result = DecoderResult {
            mirrored: true,
            ..Default::default()
        };
        let result = ScanResult::from_decoder_result(decoder_result, vec![bl, tl, tr]);
        assert_eq!(result.result_points, vec![tr, tl, bl]);
    }
}
