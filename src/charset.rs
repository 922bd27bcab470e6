//! ECI (Extended Channel Interpretation) charset registry and the
//! encoding guesser used for un-ECI'd byte-mode segments.

use crate::error::{Error, Result};
use encoding_rs::{
    Encoding, BIG5, EUC_KR, GB18030, ISO_8859_10, ISO_8859_13, ISO_8859_14, ISO_8859_15,
    ISO_8859_16, ISO_8859_2, ISO_8859_3, ISO_8859_4, ISO_8859_5, ISO_8859_6, ISO_8859_7,
    ISO_8859_8, SHIFT_JIS, UTF_8, WINDOWS_1250, WINDOWS_1251, WINDOWS_1252, WINDOWS_1254,
    WINDOWS_1257, WINDOWS_874,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharacterSetEci {
    pub value: u32,
    pub encoding: &'static Encoding,
}

/// ISO/IEC 18004 Table 4. Values outside `[0,900)` are a format failure.
/// ECI 25 (UTF-16BE) has no raw `encoding_rs` codec; callers must check
/// for it before calling this function and decode it manually.
pub fn from_eci_value(value: u32) -> Result<CharacterSetEci> {
    if value >= 900 {
        return Err(Error::format("ECI value out of range"));
    }
    let encoding: &'static Encoding = match value {
        0 | 2 => WINDOWS_1252, // Cp437, approximated as Windows-1252.
        1 | 3 => WINDOWS_1252, // ISO-8859-1, subset of Windows-1252.
        4 => ISO_8859_2,
        5 => ISO_8859_3,
        6 => ISO_8859_4,
        7 => ISO_8859_5,
        8 => ISO_8859_6,
        9 => ISO_8859_7,
        10 => ISO_8859_8,
        11 => WINDOWS_1254, // ISO-8859-9; encoding_rs redirects this label to Windows-1254.
        12 => ISO_8859_10,
        13 => WINDOWS_874, // ISO-8859-11 (Thai); encoding_rs has no direct codec.
        15 => ISO_8859_13,
        16 => ISO_8859_14,
        17 => ISO_8859_15,
        18 => ISO_8859_16,
        20 => SHIFT_JIS,
        21 => WINDOWS_1250,
        22 => WINDOWS_1251,
        23 => WINDOWS_1252,
        24 => WINDOWS_1257,
        26 => UTF_8,
        27 | 170 => WINDOWS_1252, // ASCII, approximated as its Windows-1252 superset.
        28 => BIG5,
        29 => GB18030,
        30 => EUC_KR,
        _ => WINDOWS_1252,
    };
    Ok(CharacterSetEci { value, encoding })
}

/// Reverse lookup for the encoder: which ECI value designates `encoding`,
/// if any. `None` means the encoding has no standard ECI assignment (or
/// is the default Windows-1252/ISO-8859-1, which needs no ECI header).
pub fn eci_value_for_encoding(encoding: &'static Encoding) -> Option<u32> {
    match encoding.name() {
        "Shift_JIS" => Some(20),
        "windows-1250" => Some(21),
        "windows-1251" => Some(22),
        "windows-1257" => Some(24),
        "UTF-8" => Some(26),
        "Big5" => Some(28),
        "gb18030" => Some(29),
        "EUC-KR" => Some(30),
        "ISO-8859-2" => Some(4),
        "ISO-8859-3" => Some(5),
        "ISO-8859-4" => Some(6),
        "ISO-8859-5" => Some(7),
        "ISO-8859-6" => Some(8),
        "ISO-8859-7" => Some(9),
        "ISO-8859-8" => Some(10),
        "ISO-8859-10" => Some(12),
        "ISO-8859-13" => Some(15),
        "ISO-8859-14" => Some(16),
        "ISO-8859-15" => Some(17),
        "ISO-8859-16" => Some(18),
        _ => None,
    }
}

pub fn default_eci() -> CharacterSetEci {
    from_eci_value(3).expect("ECI 3 is always in range") // ISO-8859-1
}

/// Heuristic guess at the byte-mode encoding when no ECI designator
/// preceded the segment: a UTF-8 signature is decisive, otherwise counts
/// of plausible Shift_JIS double-byte lead bytes against the fraction of
/// bytes above 0x7F decide between Shift_JIS and Latin-1.
pub fn guess_encoding(bytes: &[u8]) -> &'static Encoding {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return UTF_8;
    }
    if std::str::from_utf8(bytes).is_ok() {
        let high_bytes = bytes.iter().filter(|&&b| b >= 0x80).count();
        if high_bytes == 0 {
            return UTF_8;
        }
    }

    let mut sjis_lead_candidates = 0usize;
    let mut high = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b >= 0x80 {
            high += 1;
            if i + 1 < bytes.len() {
                let b2 = bytes[i + 1];
                let lead_ok = (0x81..=0x9F).contains(&b) || (0xE0..=0xFC).contains(&b);
                let trail_ok = (0x40..=0xFC).contains(&b2) && b2 != 0x7F;
                if lead_ok && trail_ok {
                    sjis_lead_candidates += 1;
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }

    if high > 0 && sjis_lead_candidates * 2 >= high {
        SHIFT_JIS
    } else {
        WINDOWS_1252
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_prefers_utf8() {
        assert_eq!(guess_encoding(b"HELLO WORLD"), UTF_8);
    }

    #[test]
    fn valid_utf8_multibyte_stays_utf8() {
        assert_eq!(guess_encoding("héllo".as_bytes()), UTF_8);
    }

    #[test]
    fn shift_jis_lead_trail_pairs_detected() {
        // 0x82 0xA0 is Shift_JIS for Hiragana 'a'.
        let bytes = [0x82, 0xA0, 0x82, 0xA2, 0x82, 0xA4];
        assert_eq!(guess_encoding(&bytes), SHIFT_JIS);
    }

    #[test]
    fn eci_value_3_is_default_latin1_family() {
        assert_eq!(default_eci().value, 3);
    }

    #[test]
    fn eci_value_900_and_above_is_format_failure() {
        assert!(from_eci_value(900).is_err());
        assert!(from_eci_value(12345).is_err());
    }

    #[test]
    fn eci_28_is_big5_and_29_is_gb18030() {
        assert_eq!(from_eci_value(28).unwrap().encoding, BIG5);
        assert_eq!(from_eci_value(29).unwrap().encoding, GB18030);
        assert_eq!(from_eci_value(24).unwrap().encoding, WINDOWS_1257);
    }

    #[test]
    fn iso_8859_family_uses_distinct_codecs() {
        assert_eq!(from_eci_value(4).unwrap().encoding, ISO_8859_2);
        assert_eq!(from_eci_value(7).unwrap().encoding, ISO_8859_5);
        assert_eq!(from_eci_value(18).unwrap().encoding, ISO_8859_16);
    }

    #[test]
    fn eci_value_for_encoding_round_trips() {
        assert_eq!(eci_value_for_encoding(SHIFT_JIS), Some(20));
        assert_eq!(eci_value_for_encoding(BIG5), Some(28));
        assert_eq!(eci_value_for_encoding(WINDOWS_1252), None);
    }
}
