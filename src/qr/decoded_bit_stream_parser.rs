//! Turns the data codewords recovered from a symbol's modules into text,
//! walking the mode-tagged segments: NUMERIC, ALPHANUMERIC, BYTE, KANJI,
//! HANZI, ECI switches, STRUCTURED_APPEND headers and FNC1 flags.

use std::io::Cursor;

use bitstream_io::{BigEndian, BitRead, BitReader};
use encoding_rs::Encoding;

use crate::charset::{from_eci_value, guess_encoding};
use crate::error::{Error, Result};
use crate::hints::DecodeHints;
use crate::qr::error_correction_level::ErrorCorrectionLevel;
use crate::qr::mode::Mode;
use crate::qr::version::Version;
use crate::result::DecoderResult;

const ALPHANUMERIC_CHARS: &[u8] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// MSB-first bit cursor over a byte slice, the shape every mode's decode
/// loop reads through.
struct BitSource<'a> {
    reader: BitReader<Cursor<&'a [u8]>, BigEndian>,
    total_bits: usize,
    bits_read: usize,
}

impl<'a> BitSource<'a> {
    fn new(bytes: &'a [u8]) -> BitSource<'a> {
        BitSource {
            reader: BitReader::new(Cursor::new(bytes)),
            total_bits: bytes.len() * 8,
            bits_read: 0,
        }
    }

    fn available(&self) -> usize {
        self.total_bits - self.bits_read
    }

    fn read_bits(&mut self, num_bits: usize) -> Result<u32> {
        if num_bits == 0 || num_bits > 32 || num_bits > self.available() {
            return Err(Error::format("bitstream exhausted while reading codewords"));
        }
        let value: u32 = self
            .reader
            .read(num_bits as u32)
            .map_err(|_| Error::format("bit read failed"))?;
        self.bits_read += num_bits;
        Ok(value)
    }
}

/// The byte-mode charset in effect: unset (guess, or the caller's
/// `CHARACTER_SET` hint), a concrete `encoding_rs` codec, or UTF-16BE
/// (ECI 25, which `encoding_rs` has no direct codec for).
enum ByteCharset {
    Unset,
    Fixed(&'static Encoding),
    Utf16Be,
}

struct ParseState {
    current_charset: ByteCharset,
    byte_segments: Vec<Vec<u8>>,
    structured_append: Option<(i32, i32)>,
    fc1_first: bool,
    fc1_second: bool,
}

pub fn decode(data: &[u8], version: Version, ec_level: ErrorCorrectionLevel, hints: &DecodeHints) -> Result<DecoderResult> {
    let mut source = BitSource::new(data);
    let mut text_bytes: Vec<u8> = Vec::new();
    let mut state = ParseState {
        current_charset: ByteCharset::Unset,
        byte_segments: Vec::new(),
        structured_append: None,
        fc1_first: false,
        fc1_second: false,
    };

    loop {
        if source.available() < 4 {
            break;
        }
        let mode = Mode::from_bits(source.read_bits(4)?)?;
        if mode == Mode::Terminator {
            break;
        }
        match mode {
            Mode::Fnc1First => {
                state.fc1_first = true;
            }
            Mode::Fnc1Second => {
                state.fc1_second = true;
                let _application_indicator = source.read_bits(8)?;
            }
            Mode::StructuredAppend => {
                let sequence = source.read_bits(8)? as i32;
                let parity = source.read_bits(8)? as i32;
                state.structured_append = Some((sequence, parity));
            }
            Mode::Eci => {
                let eci_value = read_eci_value(&mut source)?;
                state.current_charset = if eci_value == 25 {
                    ByteCharset::Utf16Be
                } else {
                    ByteCharset::Fixed(from_eci_value(eci_value)?.encoding)
                };
            }
            Mode::Numeric => {
                decode_numeric_segment(&mut source, mode.character_count_bits(version), &mut text_bytes)?;
            }
            Mode::Alphanumeric => {
                decode_alphanumeric_segment(
                    &mut source,
                    mode.character_count_bits(version),
                    state.fc1_first || state.fc1_second,
                    &mut text_bytes,
                )?;
            }
            Mode::Byte => {
                decode_byte_segment(&mut source, mode.character_count_bits(version), hints, &mut state, &mut text_bytes)?;
            }
            Mode::Kanji => {
                decode_kanji_segment(&mut source, mode.character_count_bits(version), &mut text_bytes)?;
            }
            Mode::Hanzi => {
                decode_hanzi_segment(&mut source, mode.character_count_bits(version), &mut text_bytes)?;
            }
            Mode::Terminator => unreachable!(),
        }
    }

    let text = String::from_utf8_lossy(&text_bytes).into_owned();
    Ok(DecoderResult {
        raw_bytes: data.to_vec(),
        text,
        byte_segments: state.byte_segments,
        ec_level: Some(format!("{:?}", ec_level)),
        structured_append: state.structured_append,
        mirrored: false,
    })
}

fn read_eci_value(source: &mut BitSource) -> Result<u32> {
    let first_byte = source.read_bits(8)?;
    if first_byte & 0x80 == 0 {
        Ok(first_byte & 0x7F)
    } else if first_byte & 0xC0 == 0x80 {
        let second = source.read_bits(8)?;
        Ok(((first_byte & 0x3F) << 8) | second)
    } else if first_byte & 0xE0 == 0xC0 {
        let second = source.read_bits(8)?;
        let third = source.read_bits(8)?;
        Ok(((first_byte & 0x1F) << 16) | (second << 8) | third)
    } else {
        Err(Error::format("invalid ECI designator"))
    }
}

fn decode_numeric_segment(source: &mut BitSource, count_bits: u32, out: &mut Vec<u8>) -> Result<()> {
    let mut count = source.read_bits(count_bits as usize)? as i64;
    while count >= 3 {
        let triple = source.read_bits(10)?;
        if triple >= 1000 {
            return Err(Error::format("invalid numeric triple"));
        }
        out.extend_from_slice(format!("{:03}", triple).as_bytes());
        count -= 3;
    }
    if count == 2 {
        let pair = source.read_bits(7)?;
        if pair >= 100 {
            return Err(Error::format("invalid numeric pair"));
        }
        out.extend_from_slice(format!("{:02}", pair).as_bytes());
    } else if count == 1 {
        let digit = source.read_bits(4)?;
        if digit >= 10 {
            return Err(Error::format("invalid numeric digit"));
        }
        out.extend_from_slice(format!("{}", digit).as_bytes());
    }
    Ok(())
}

fn decode_alphanumeric_segment(
    source: &mut BitSource,
    count_bits: u32,
    is_gs1: bool,
    out: &mut Vec<u8>,
) -> Result<()> {
    let mut count = source.read_bits(count_bits as usize)? as i64;
    let mut buf = Vec::new();
    while count > 1 {
        let value = source.read_bits(11)?;
        let a = value / 45;
        let b = value % 45;
        buf.push(alphanumeric_char(a)?);
        buf.push(alphanumeric_char(b)?);
        count -= 2;
    }
    if count == 1 {
        let value = source.read_bits(6)?;
        buf.push(alphanumeric_char(value)?);
    }
    if is_gs1 {
        apply_fnc1_percent_escaping(&mut buf);
    }
    out.extend_from_slice(&buf);
    Ok(())
}

/// FNC1-active alphanumeric post-processing: a doubled `%%` collapses to a
/// literal `%`, a lone `%` becomes GS (0x1D), the GS1 element separator.
fn apply_fnc1_percent_escaping(buf: &mut Vec<u8>) {
    let mut result = Vec::with_capacity(buf.len());
    let mut i = 0;
    while i < buf.len() {
        if buf[i] == b'%' {
            if buf.get(i + 1) == Some(&b'%') {
                result.push(b'%');
                i += 2;
            } else {
                result.push(0x1D);
                i += 1;
            }
        } else {
            result.push(buf[i]);
            i += 1;
        }
    }
    *buf = result;
}

fn alphanumeric_char(value: u32) -> Result<u8> {
    ALPHANUMERIC_CHARS
        .get(value as usize)
        .copied()
        .ok_or_else(|| Error::format("alphanumeric value out of range"))
}

fn decode_byte_segment(
    source: &mut BitSource,
    count_bits: u32,
    hints: &DecodeHints,
    state: &mut ParseState,
    out: &mut Vec<u8>,
) -> Result<()> {
    let count = source.read_bits(count_bits as usize)? as usize;
    let mut raw = Vec::with_capacity(count);
    for _ in 0..count {
        raw.push(source.read_bits(8)? as u8);
    }
    match &state.current_charset {
        ByteCharset::Utf16Be => {
            let decoded = decode_utf16be(&raw)?;
            out.extend_from_slice(decoded.as_bytes());
        }
        ByteCharset::Fixed(encoding) => {
            let (decoded, _, _) = encoding.decode(&raw);
            out.extend_from_slice(decoded.as_bytes());
        }
        ByteCharset::Unset => {
            let encoding = hints
                .character_set
                .and_then(|label| Encoding::for_label(label.as_bytes()))
                .unwrap_or_else(|| guess_encoding(&raw));
            let (decoded, _, _) = encoding.decode(&raw);
            out.extend_from_slice(decoded.as_bytes());
        }
    }
    state.byte_segments.push(raw);
    Ok(())
}

fn decode_utf16be(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::format("UTF-16BE byte segment has odd length"));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| Error::format("invalid UTF-16BE sequence"))
}

/// 13-bit packed Shift_JIS pairs, JISX0510 section 8.4.5.
fn decode_kanji_segment(source: &mut BitSource, count_bits: u32, out: &mut Vec<u8>) -> Result<()> {
    let count = source.read_bits(count_bits as usize)? as usize;
    let mut sjis = Vec::with_capacity(count * 2);
    for _ in 0..count {
        let packed = source.read_bits(13)?;
        let mut assembled = ((packed / 0xC0) << 8) | (packed % 0xC0);
        if assembled < 0x1F00 {
            assembled += 0x8140;
        } else {
            assembled += 0xC140;
        }
        sjis.push((assembled >> 8) as u8);
        sjis.push((assembled & 0xFF) as u8);
    }
    let (decoded, _, _) = encoding_rs::SHIFT_JIS.decode(&sjis);
    out.extend_from_slice(decoded.as_bytes());
    Ok(())
}

/// 13-bit packed GB2312 pairs, GB18030 Hanzi mode per JISX0510 Annex G
/// (the "GB2312-offset" variant Chinese Model 2 symbols use).
fn decode_hanzi_segment(source: &mut BitSource, count_bits: u32, out: &mut Vec<u8>) -> Result<()> {
    let count = source.read_bits(count_bits as usize)? as usize;
    let mut gb = Vec::with_capacity(count * 2);
    for _ in 0..count {
        let packed = source.read_bits(13)?;
        let mut assembled = ((packed / 0x060) << 8) | (packed % 0x060);
        assembled += if assembled < 0x3BF { 0xA1A1 } else { 0xA6A1 };
        gb.push((assembled >> 8) as u8);
        gb.push((assembled & 0xFF) as u8);
    }
    let (decoded, _, _) = encoding_rs::GB18030.decode(&gb);
    out.extend_from_slice(decoded.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitarray::BitArray;

    fn codewords_from_bits(bits: &BitArray) -> Vec<u8> {
        bits.to_bytes()
    }

    #[test]
    fn decodes_numeric_segment() {
        let mut bits = BitArray::new(0);
        bits.append_bits(Mode::Numeric.bits(), 4);
        bits.append_bits(4, 10); // 4 digits, count field for version 1
        bits.append_bits(123, 10);
        bits.append_bits(4, 4);
        bits.append_bits(Mode::Terminator.bits(), 4);
        let bytes = codewords_from_bits(&bits);
        let version = Version::new(1).unwrap();
        let result = decode(&bytes, version, ErrorCorrectionLevel::L, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "1234");
    }

    #[test]
    fn decodes_alphanumeric_segment() {
        let mut bits = BitArray::new(0);
        bits.append_bits(Mode::Alphanumeric.bits(), 4);
        bits.append_bits(2, 9);
        // "HI" -> H=17, I=18 -> value = 17*45+18 = 783
        bits.append_bits(783, 11);
        bits.append_bits(Mode::Terminator.bits(), 4);
        let bytes = codewords_from_bits(&bits);
        let version = Version::new(1).unwrap();
        let result = decode(&bytes, version, ErrorCorrectionLevel::L, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "HI");
    }

    #[test]
    fn decodes_byte_segment_ascii() {
        let mut bits = BitArray::new(0);
        bits.append_bits(Mode::Byte.bits(), 4);
        bits.append_bits(2, 8);
        bits.append_bits(b'H' as u32, 8);
        bits.append_bits(b'i' as u32, 8);
        bits.append_bits(Mode::Terminator.bits(), 4);
        let bytes = codewords_from_bits(&bits);
        let version = Version::new(1).unwrap();
        let result = decode(&bytes, version, ErrorCorrectionLevel::L, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "Hi");
        assert_eq!(result.byte_segments, vec![vec![b'H', b'i']]);
    }

    #[test]
    fn structured_append_header_is_captured() {
        let mut bits = BitArray::new(0);
        bits.append_bits(Mode::StructuredAppend.bits(), 4);
        bits.append_bits(2, 8); // sequence
        bits.append_bits(5, 8); // parity
        bits.append_bits(Mode::Byte.bits(), 4);
        bits.append_bits(1, 8);
        bits.append_bits(b'X' as u32, 8);
        bits.append_bits(Mode::Terminator.bits(), 4);
        let bytes = codewords_from_bits(&bits);
        let version = Version::new(1).unwrap();
        let result = decode(&bytes, version, ErrorCorrectionLevel::L, &DecodeHints::default()).unwrap();
        assert_eq!(result.structured_append, Some((2, 5)));
        assert_eq!(result.text, "X");
    }

    #[test]
    fn fnc1_alphanumeric_unescapes_doubled_percent() {
        let mut bits = BitArray::new(0);
        bits.append_bits(Mode::Fnc1First.bits(), 4);
        bits.append_bits(Mode::Alphanumeric.bits(), 4);
        bits.append_bits(4, 9);
        // "A%%B" -> A=10, %=38 twice, B=11
        bits.append_bits(10 * 45 + 38, 11);
        bits.append_bits(38 * 45 + 11, 11);
        bits.append_bits(Mode::Terminator.bits(), 4);
        let bytes = codewords_from_bits(&bits);
        let version = Version::new(1).unwrap();
        let result = decode(&bytes, version, ErrorCorrectionLevel::L, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "A%B");
    }

    #[test]
    fn fnc1_alphanumeric_turns_lone_percent_into_gs() {
        let mut bits = BitArray::new(0);
        bits.append_bits(Mode::Fnc1First.bits(), 4);
        bits.append_bits(Mode::Alphanumeric.bits(), 4);
        bits.append_bits(2, 9);
        // "%A" -> %=38, A=10
        bits.append_bits(38 * 45 + 10, 11);
        bits.append_bits(Mode::Terminator.bits(), 4);
        let bytes = codewords_from_bits(&bits);
        let version = Version::new(1).unwrap();
        let result = decode(&bytes, version, ErrorCorrectionLevel::L, &DecodeHints::default()).unwrap();
        assert_eq!(result.raw_bytes.len() > 0, true);
        assert_eq!(result.text.as_bytes(), &[0x1D, b'A']);
    }

    #[test]
    fn eci_25_decodes_as_utf16be() {
        let mut bits = BitArray::new(0);
        bits.append_bits(Mode::Eci.bits(), 4);
        bits.append_bits(25, 8); // single-byte ECI designator, value 25
        bits.append_bits(Mode::Byte.bits(), 4);
        bits.append_bits(4, 8); // 4 raw bytes = 2 UTF-16BE code units
        for unit in "H\u{3042}".encode_utf16() {
            bits.append_bits((unit >> 8) as u32, 8);
            bits.append_bits((unit & 0xFF) as u32, 8);
        }
        bits.append_bits(Mode::Terminator.bits(), 4);
        let bytes = codewords_from_bits(&bits);
        let version = Version::new(1).unwrap();
        let result = decode(&bytes, version, ErrorCorrectionLevel::L, &DecodeHints::default()).unwrap();
        assert_eq!(result.text, "H\u{3042}");
    }

    #[test]
    fn decode_byte_segment_honors_character_set_hint() {
        let mut bits = BitArray::new(0);
        bits.append_bits(Mode::Byte.bits(), 4);
        bits.append_bits(2, 8);
        // Shift_JIS for Hiragana 'a' (U+3042) is the byte pair 0x82 0xA0.
        bits.append_bits(0x82, 8);
        bits.append_bits(0xA0, 8);
        bits.append_bits(Mode::Terminator.bits(), 4);
        let bytes = codewords_from_bits(&bits);
        let version = Version::new(1).unwrap();
        let hints = DecodeHints {
            character_set: Some("Shift_JIS"),
            ..Default::default()
        };
        let result = decode(&bytes, version, ErrorCorrectionLevel::L, &hints).unwrap();
        assert_eq!(result.text, "\u{3042}");
    }
}
