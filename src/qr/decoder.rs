//! Top-level symbol decode: sampled module matrix in, `DecoderResult` out.

use crate::bitmatrix::BitMatrix;
use crate::error::Result;
use crate::hints::DecodeHints;
use crate::qr::bit_matrix_parser::{deinterleave_and_correct, BitMatrixParser};
use crate::qr::decoded_bit_stream_parser;
use crate::result::DecoderResult;

pub fn decode(bits: &BitMatrix, hints: &DecodeHints) -> Result<DecoderResult> {
    let parser = BitMatrixParser::new(bits)?;
    let parsed = parser.parse()?;

    let data_codewords = deinterleave_and_correct(
        &parsed.codewords,
        parsed.version,
        parsed.format_information.error_correction_level,
    )?;

    let mut result = decoded_bit_stream_parser::decode(
        &data_codewords,
        parsed.version,
        parsed.format_information.error_correction_level,
        hints,
    )?;
    result.mirrored = parsed.mirrored;
    Ok(result)
}
