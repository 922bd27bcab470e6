//! Content to symbol: mode selection, version sizing, bitstream packing,
//! Reed-Solomon encoding with block interleaving, and matrix construction.

use crate::bitarray::BitArray;
use crate::bitmatrix::BitMatrix;
use crate::charset::eci_value_for_encoding;
use crate::error::{Error, Result};
use crate::gf::QR_CODE_FIELD_256;
use crate::hints::EncodeHints;
use crate::qr::error_correction_level::ErrorCorrectionLevel;
use crate::qr::matrix_util::build_matrix;
use crate::qr::mode::Mode;
use crate::qr::version::Version;
use crate::reed_solomon::ReedSolomonEncoder;
use encoding_rs::{Encoding, SHIFT_JIS, WINDOWS_1252};

const ALPHANUMERIC_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

pub struct EncodedSymbol {
    pub matrix: BitMatrix,
    pub version: Version,
    pub error_correction_level: ErrorCorrectionLevel,
    pub mask_pattern: u8,
}

pub fn encode(content: &str, hints: EncodeHints) -> Result<EncodedSymbol> {
    let charset = hints.character_set.unwrap_or(WINDOWS_1252);
    let mode = choose_mode(content, charset);
    let level = hints.error_correction_level;

    let version = choose_version(content, mode, charset, level)?;
    let data_bits = encode_payload(content, mode, charset, version)?;
    let final_bits = terminate_and_pad(data_bits, version, level)?;
    let interleaved = interleave_with_ec(&final_bits, version, level);

    let (matrix, mask_pattern) = build_matrix(&interleaved, level, version, hints.mask_pattern)?;
    Ok(EncodedSymbol {
        matrix,
        version,
        error_correction_level: level,
        mask_pattern,
    })
}

/// Whether `c` falls in one of Shift_JIS's two double-byte Kanji bands,
/// and if so, its raw Shift_JIS codepoint.
fn shift_jis_kanji_code(c: char) -> Option<u16> {
    let mut buf = [0u8; 4];
    let s = c.encode_utf8(&mut buf);
    let (encoded, _, had_errors) = SHIFT_JIS.encode(s);
    if had_errors || encoded.len() != 2 {
        return None;
    }
    let code = u16::from_be_bytes([encoded[0], encoded[1]]);
    if (0x8140..=0x9FFC).contains(&code) || (0xE040..=0xEBBF).contains(&code) {
        Some(code)
    } else {
        None
    }
}

/// Whether assembling an ECI segment is needed: the requested charset is
/// something other than the implicit default.
fn needs_eci_header(charset: &'static Encoding) -> bool {
    !std::ptr::eq(charset, WINDOWS_1252) && eci_value_for_encoding(charset).is_some()
}

fn choose_mode(content: &str, charset: &'static Encoding) -> Mode {
    if content.bytes().all(|b| b.is_ascii_digit()) && !content.is_empty() {
        Mode::Numeric
    } else if content.bytes().all(|b| ALPHANUMERIC_CHARS.contains(&b)) {
        Mode::Alphanumeric
    } else if std::ptr::eq(charset, SHIFT_JIS)
        && !content.is_empty()
        && content.chars().all(|c| shift_jis_kanji_code(c).is_some())
    {
        Mode::Kanji
    } else {
        Mode::Byte
    }
}

/// Number of bytes `content` occupies once encoded in `charset`; used for
/// byte-mode sizing, where the symbol's count field is a byte count, not
/// a `char` count.
fn encoded_byte_len(content: &str, charset: &'static Encoding) -> Result<usize> {
    let (encoded, _, had_errors) = charset.encode(content);
    if had_errors {
        return Err(Error::writer("content not representable in the requested charset"));
    }
    Ok(encoded.len())
}

/// Number of bits the payload (without mode indicator/count) occupies,
/// used while walking versions to find the smallest that fits.
fn payload_bit_count(content: &str, mode: Mode, charset: &'static Encoding) -> Result<usize> {
    let len = content.len();
    Ok(match mode {
        Mode::Numeric => (len / 3) * 10 + match len % 3 {
            1 => 4,
            2 => 7,
            _ => 0,
        },
        Mode::Alphanumeric => (len / 2) * 11 + if len % 2 == 1 { 6 } else { 0 },
        Mode::Byte => encoded_byte_len(content, charset)? * 8,
        Mode::Kanji => content.chars().count() * 13,
        _ => 0,
    })
}

/// 4-bit mode indicator plus 8-bit ECI designator, prepended ahead of the
/// byte-mode segment when a non-default charset is requested.
fn eci_header_bits(mode: Mode, charset: &'static Encoding) -> usize {
    if mode == Mode::Byte && needs_eci_header(charset) {
        12
    } else {
        0
    }
}

fn choose_version(
    content: &str,
    mode: Mode,
    charset: &'static Encoding,
    level: ErrorCorrectionLevel,
) -> Result<Version> {
    for number in 1..=40u32 {
        let version = Version::new(number)?;
        let header_bits = 4 + mode.character_count_bits(version) as usize + eci_header_bits(mode, charset);
        let total_bits = header_bits + payload_bit_count(content, mode, charset)?;
        let available_bits = version.total_data_codewords(level) as usize * 8;
        if total_bits <= available_bits {
            return Ok(version);
        }
    }
    Err(Error::writer("content too long for any QR version at the requested error correction level"))
}

fn encode_payload(content: &str, mode: Mode, charset: &'static Encoding, version: Version) -> Result<BitArray> {
    let mut bits = BitArray::new(0);

    if mode == Mode::Byte && needs_eci_header(charset) {
        let eci_value = eci_value_for_encoding(charset).expect("needs_eci_header checked this is Some");
        bits.append_bits(Mode::Eci.bits(), 4);
        bits.append_bits(eci_value, 8);
    }

    bits.append_bits(mode.bits(), 4);
    let count = match mode {
        Mode::Byte => encoded_byte_len(content, charset)? as u32,
        Mode::Kanji => content.chars().count() as u32,
        _ => content.len() as u32,
    };
    bits.append_bits(count, mode.character_count_bits(version) as usize);

    match mode {
        Mode::Numeric => encode_numeric(content, &mut bits),
        Mode::Alphanumeric => encode_alphanumeric(content, &mut bits)?,
        Mode::Byte => encode_byte(content, charset, &mut bits)?,
        Mode::Kanji => encode_kanji(content, &mut bits)?,
        _ => unreachable!("choose_mode only returns Numeric/Alphanumeric/Byte/Kanji"),
    }
    Ok(bits)
}

fn encode_numeric(content: &str, bits: &mut BitArray) {
    let digits: Vec<u8> = content.bytes().map(|b| b - b'0').collect();
    let mut chunks = digits.chunks_exact(3);
    for chunk in &mut chunks {
        let value = chunk[0] as u32 * 100 + chunk[1] as u32 * 10 + chunk[2] as u32;
        bits.append_bits(value, 10);
    }
    let remainder = chunks.remainder();
    match remainder.len() {
        2 => bits.append_bits(remainder[0] as u32 * 10 + remainder[1] as u32, 7),
        1 => bits.append_bits(remainder[0] as u32, 4),
        _ => {}
    }
}

fn encode_alphanumeric(content: &str, bits: &mut BitArray) -> Result<()> {
    let values: Result<Vec<u32>> = content
        .bytes()
        .map(|b| {
            ALPHANUMERIC_CHARS
                .iter()
                .position(|&c| c == b)
                .map(|p| p as u32)
                .ok_or_else(|| Error::writer("character not representable in alphanumeric mode"))
        })
        .collect();
    let values = values?;
    let mut chunks = values.chunks_exact(2);
    for chunk in &mut chunks {
        bits.append_bits(chunk[0] * 45 + chunk[1], 11);
    }
    if let [last] = chunks.remainder() {
        bits.append_bits(*last, 6);
    }
    Ok(())
}

fn encode_byte(content: &str, charset: &'static Encoding, bits: &mut BitArray) -> Result<()> {
    let (encoded, _, had_errors) = charset.encode(content);
    if had_errors {
        return Err(Error::writer("content not representable in the requested charset"));
    }
    for &b in encoded.as_ref() {
        bits.append_bits(b as u32, 8);
    }
    Ok(())
}

/// Packs each Kanji character as the 13-bit difference between its raw
/// Shift_JIS codepoint and the base of its double-byte band, high byte
/// times 0xC0 plus low byte, per JISX0510 section 8.4.5.
fn encode_kanji(content: &str, bits: &mut BitArray) -> Result<()> {
    for c in content.chars() {
        let code = shift_jis_kanji_code(c)
            .ok_or_else(|| Error::writer("character not representable in Kanji mode"))?;
        let assembled = if (0x8140..=0x9FFC).contains(&code) {
            code - 0x8140
        } else {
            code - 0xC140
        };
        let packed = ((assembled >> 8) as u32) * 0xC0 + (assembled & 0xFF) as u32;
        bits.append_bits(packed, 13);
    }
    Ok(())
}

/// Appends the terminator, pads to a byte boundary, then fills with the
/// JISX0510 section 8.7.3 alternating pad bytes (0xEC, 0x11) up to the
/// version's data codeword capacity.
fn terminate_and_pad(mut bits: BitArray, version: Version, level: ErrorCorrectionLevel) -> Result<BitArray> {
    let capacity_bits = version.total_data_codewords(level) as usize * 8;
    if bits.len() > capacity_bits {
        return Err(Error::writer("encoded payload exceeds version capacity"));
    }

    let terminator_bits = (4usize).min(capacity_bits - bits.len());
    bits.append_bits(0, terminator_bits);

    while bits.len() % 8 != 0 {
        bits.append_bit(false);
    }

    let mut pad_toggle = true;
    while bits.len() < capacity_bits {
        bits.append_bits(if pad_toggle { 0xEC } else { 0x11 }, 8);
        pad_toggle = !pad_toggle;
    }
    Ok(bits)
}

fn interleave_with_ec(final_bits: &BitArray, version: Version, level: ErrorCorrectionLevel) -> BitArray {
    let data_codewords = final_bits.to_bytes();
    let ec_blocks = version.ec_blocks(level);
    let groups = ec_blocks.groups(version.total_codewords());

    let mut data_blocks: Vec<&[u8]> = Vec::new();
    let mut cursor = 0usize;
    for group in &groups {
        for _ in 0..group.count {
            let len = group.data_codewords as usize;
            data_blocks.push(&data_codewords[cursor..cursor + len]);
            cursor += len;
        }
    }

    let field = &*QR_CODE_FIELD_256;
    let mut encoder = ReedSolomonEncoder::new(field);
    let ec_count = ec_blocks.ec_codewords_per_block as usize;
    let ec_blocks_bytes: Vec<Vec<u8>> = data_blocks
        .iter()
        .map(|block| {
            let mut buf = block.to_vec();
            encoder.encode(&mut buf, ec_count);
            buf[block.len()..].to_vec()
        })
        .collect();

    let max_data_len = data_blocks.iter().map(|b| b.len()).max().unwrap_or(0);
    let mut result = BitArray::new(0);
    for i in 0..max_data_len {
        for block in &data_blocks {
            if i < block.len() {
                result.append_bits(block[i] as u32, 8);
            }
        }
    }
    for i in 0..ec_count {
        for ec_block in &ec_blocks_bytes {
            result.append_bits(ec_block[i] as u32, 8);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chooses_numeric_mode_for_digits() {
        assert_eq!(choose_mode("0123456789", WINDOWS_1252), Mode::Numeric);
    }

    #[test]
    fn chooses_alphanumeric_mode() {
        assert_eq!(choose_mode("HELLO WORLD", WINDOWS_1252), Mode::Alphanumeric);
    }

    #[test]
    fn chooses_byte_mode_for_lowercase() {
        assert_eq!(choose_mode("Hello, world!", WINDOWS_1252), Mode::Byte);
    }

    #[test]
    fn chooses_kanji_mode_for_shift_jis_content() {
        // Two Kanji ideographs, both within the Shift_JIS double-byte band.
        assert_eq!(choose_mode("\u{65E5}\u{672C}", SHIFT_JIS), Mode::Kanji);
    }

    #[test]
    fn halfwidth_katakana_stays_byte_mode_with_shift_jis_charset() {
        // U+FF71 is a single-byte Shift_JIS halfwidth katakana, not Kanji.
        assert_eq!(choose_mode("\u{FF71}", SHIFT_JIS), Mode::Byte);
    }

    #[test]
    fn version_1_l_fits_small_alphanumeric_payload() {
        let version =
            choose_version("HELLO WORLD", Mode::Alphanumeric, WINDOWS_1252, ErrorCorrectionLevel::L).unwrap();
        assert_eq!(version.number(), 1);
    }

    #[test]
    fn encode_small_payload_produces_square_matrix() {
        let symbol = encode("HELLO WORLD", EncodeHints::default()).unwrap();
        assert_eq!(symbol.matrix.width(), symbol.matrix.height());
        assert_eq!(symbol.version.number(), 1);
    }

    #[test]
    fn padding_alternates_ec_and_eleven() {
        let version = Version::new(1).unwrap();
        let level = ErrorCorrectionLevel::L;
        let mut bits = BitArray::new(0);
        bits.append_bits(Mode::Byte.bits(), 4);
        bits.append_bits(1, 8);
        bits.append_bits(b'A' as u32, 8);
        let padded = terminate_and_pad(bits, version, level).unwrap();
        let bytes = padded.to_bytes();
        // bytes[0..3] hold the mode/count/data/terminator header; padding
        // starts at byte 3.
        assert_eq!(bytes[3], 0xEC);
        assert_eq!(bytes[4], 0x11);
    }

    #[test]
    fn encode_with_shift_jis_hint_prepends_eci_segment() {
        let hints = EncodeHints {
            character_set: Some(SHIFT_JIS),
            ..Default::default()
        };
        let symbol = encode("\u{3042}", hints).unwrap();
        assert_eq!(symbol.matrix.width(), symbol.matrix.height());
    }

    #[test]
    fn encode_kanji_content_chooses_kanji_mode() {
        let hints = EncodeHints {
            character_set: Some(SHIFT_JIS),
            ..Default::default()
        };
        let symbol = encode("\u{65E5}\u{672C}", hints).unwrap();
        assert_eq!(symbol.matrix.width(), symbol.matrix.height());
    }
}
