//! Mode indicator values and per-version character-count bit widths.

use crate::error::{Error, Result};
use crate::qr::version::Version;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Terminator,
    Numeric,
    Alphanumeric,
    StructuredAppend,
    Byte,
    Fnc1First,
    Eci,
    Kanji,
    Fnc1Second,
    Hanzi,
}

impl Mode {
    /// The 4-bit mode indicator, as laid out in the symbol's bitstream.
    pub fn bits(self) -> u32 {
        match self {
            Mode::Terminator => 0x0,
            Mode::Numeric => 0x1,
            Mode::Alphanumeric => 0x2,
            Mode::StructuredAppend => 0x3,
            Mode::Byte => 0x4,
            Mode::Fnc1First => 0x5,
            Mode::Eci => 0x7,
            Mode::Kanji => 0x8,
            Mode::Fnc1Second => 0x9,
            Mode::Hanzi => 0xD,
        }
    }

    pub fn from_bits(bits: u32) -> Result<Mode> {
        match bits {
            0x0 => Ok(Mode::Terminator),
            0x1 => Ok(Mode::Numeric),
            0x2 => Ok(Mode::Alphanumeric),
            0x3 => Ok(Mode::StructuredAppend),
            0x4 => Ok(Mode::Byte),
            0x5 => Ok(Mode::Fnc1First),
            0x7 => Ok(Mode::Eci),
            0x8 => Ok(Mode::Kanji),
            0x9 => Ok(Mode::Fnc1Second),
            0xD => Ok(Mode::Hanzi),
            _ => Err(Error::format(format!("unsupported mode indicator {:#x}", bits))),
        }
    }

    /// Width in bits of the character-count indicator that follows this
    /// mode's indicator, which depends on which of the three version bands
    /// (1-9, 10-26, 27-40) the symbol falls in.
    pub fn character_count_bits(self, version: Version) -> u32 {
        let band = match version.number() {
            1..=9 => 0,
            10..=26 => 1,
            _ => 2,
        };
        match self {
            Mode::Numeric => [10, 12, 14][band],
            Mode::Alphanumeric => [9, 11, 13][band],
            Mode::Byte => [8, 16, 16][band],
            Mode::Kanji | Mode::Hanzi => [8, 10, 12][band],
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_round_trip() {
        for &m in &[
            Mode::Terminator,
            Mode::Numeric,
            Mode::Alphanumeric,
            Mode::StructuredAppend,
            Mode::Byte,
            Mode::Fnc1First,
            Mode::Eci,
            Mode::Kanji,
            Mode::Fnc1Second,
            Mode::Hanzi,
        ] {
            assert_eq!(Mode::from_bits(m.bits()).unwrap(), m);
        }
    }

    #[test]
    fn character_count_bits_by_band() {
        let v1 = Version::new(1).unwrap();
        let v10 = Version::new(10).unwrap();
        let v27 = Version::new(27).unwrap();
        assert_eq!(Mode::Numeric.character_count_bits(v1), 10);
        assert_eq!(Mode::Numeric.character_count_bits(v10), 12);
        assert_eq!(Mode::Numeric.character_count_bits(v27), 14);
        assert_eq!(Mode::Byte.character_count_bits(v1), 8);
        assert_eq!(Mode::Byte.character_count_bits(v10), 16);
    }
}
