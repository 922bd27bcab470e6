use qr_codec::hints::{DecodeHints, EncodeHints};
use qr_codec::luminance::GrayLuminanceSource;
use qr_codec::qr::error_correction_level::ErrorCorrectionLevel;
use qr_codec::{decode, encode, to_image};

fn image_to_source(image: &image::GrayImage) -> GrayLuminanceSource {
    GrayLuminanceSource::from_image(image)
}

#[test]
fn round_trips_alphanumeric_content_at_level_l() {
    let _ = env_logger::try_init();
    let hints = EncodeHints {
        error_correction_level: ErrorCorrectionLevel::L,
        ..Default::default()
    };
    let symbol = encode("HELLO WORLD", hints).unwrap();
    let image = to_image(&symbol, 4, 4);
    let source = image_to_source(&image);

    let result = decode(&source, &DecodeHints::default()).unwrap();
    assert_eq!(result.text, "HELLO WORLD");
}

#[test]
fn round_trips_numeric_content_at_level_m() {
    let hints = EncodeHints {
        error_correction_level: ErrorCorrectionLevel::M,
        ..Default::default()
    };
    let symbol = encode("12345678", hints).unwrap();
    let image = to_image(&symbol, 4, 4);
    let source = image_to_source(&image);

    let result = decode(&source, &DecodeHints::default()).unwrap();
    assert_eq!(result.text, "12345678");
}

#[test]
fn round_trips_byte_mode_content() {
    let hints = EncodeHints {
        error_correction_level: ErrorCorrectionLevel::Q,
        ..Default::default()
    };
    let symbol = encode("Hello, world! 123", hints).unwrap();
    let image = to_image(&symbol, 4, 4);
    let source = image_to_source(&image);

    let result = decode(&source, &DecodeHints::default()).unwrap();
    assert_eq!(result.text, "Hello, world! 123");
}

#[test]
fn forced_mask_pattern_still_decodes() {
    let hints = EncodeHints {
        error_correction_level: ErrorCorrectionLevel::H,
        mask_pattern: Some(2),
        ..Default::default()
    };
    let symbol = encode("AC-47", hints).unwrap();
    assert_eq!(symbol.mask_pattern, 2);

    let image = to_image(&symbol, 4, 4);
    let source = image_to_source(&image);
    let result = decode(&source, &DecodeHints::default()).unwrap();
    assert_eq!(result.text, "AC-47");
}

#[test]
fn decode_survives_a_few_flipped_modules() {
    let hints = EncodeHints {
        error_correction_level: ErrorCorrectionLevel::H,
        ..Default::default()
    };
    let symbol = encode("ROBUSTNESS TEST", hints).unwrap();
    let mut image = to_image(&symbol, 4, 4);

    // Flip a handful of pixels deep inside the symbol body; level H
    // tolerates up to 30% codeword corruption.
    for i in 0..6u32 {
        let x = 20 + i * 4;
        let y = 20 + i * 4;
        if x < image.width() && y < image.height() {
            let px = image.get_pixel_mut(x, y);
            px.0[0] = 255 - px.0[0];
        }
    }

    let source = image_to_source(&image);
    let result = decode(&source, &DecodeHints::default());
    assert!(result.is_ok());
    assert_eq!(result.unwrap().text, "ROBUSTNESS TEST");
}

#[test]
fn blank_image_is_not_found() {
    let data = vec![255u8; 64 * 64];
    let source = GrayLuminanceSource::new(64, 64, data);
    assert!(decode(&source, &DecodeHints::default()).is_err());
}

#[test]
fn round_trips_kanji_content_via_shift_jis_hint() {
    let hints = EncodeHints {
        error_correction_level: ErrorCorrectionLevel::M,
        character_set: Some(encoding_rs::SHIFT_JIS),
        ..Default::default()
    };
    let symbol = encode("\u{65E5}\u{672C}\u{8A9E}", hints).unwrap();
    let image = to_image(&symbol, 4, 4);
    let source = image_to_source(&image);

    let result = decode(&source, &DecodeHints::default()).unwrap();
    assert_eq!(result.text, "\u{65E5}\u{672C}\u{8A9E}");
}
