//! Decode/encode hints, mirroring the loosely-typed hint maps real
//! barcode libraries expose but as concrete fields with defaults.

use crate::qr::error_correction_level::ErrorCorrectionLevel;
use encoding_rs::Encoding;

#[derive(Clone, Debug, Default)]
pub struct DecodeHints {
    /// Spend extra effort (more skip granularity, more cross-checks).
    pub try_harder: bool,
    /// Image is known to be a pure, unrotated barcode with no surrounding
    /// scene; skips the full finder-pattern search machinery.
    pub pure_barcode: bool,
    /// Treat an unprefixed FNC1 stream as GS1 data. 1-D formats only;
    /// QR symbols carry their own FNC1 mode indicators, so this is
    /// unused here.
    pub assume_gs1: bool,
    /// Force this character set instead of guessing byte-mode segments.
    pub character_set: Option<&'static str>,
}

#[derive(Clone, Copy, Debug)]
pub struct EncodeHints {
    pub error_correction_level: ErrorCorrectionLevel,
    /// Quiet-zone width in modules.
    pub margin: u32,
    /// Forces a specific mask pattern (0..=7) instead of the minimum
    /// penalty search across all eight.
    pub mask_pattern: Option<u8>,
    /// Encode byte-mode content with this charset instead of the
    /// Windows-1252/ISO-8859-1 default; emits a leading ECI segment when
    /// non-default.
    pub character_set: Option<&'static Encoding>,
}

impl Default for EncodeHints {
    fn default() -> EncodeHints {
        EncodeHints {
            error_correction_level: ErrorCorrectionLevel::L,
            margin: 4,
            mask_pattern: None,
            character_set: None,
        }
    }
}
