use std::io::Cursor;

use super::*;

#[test]
fn decode_image_premultiplies_pixels() {
    let src_rgba = vec![200u8, 80u8, 40u8, 64u8];
    let img = image::RgbaImage::from_raw(1, 1, src_rgba).unwrap();

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let prepared = decode_image(&buf).unwrap();
    assert_eq!(prepared.width, 1);
    assert_eq!(prepared.height, 1);
    assert_eq!(
        prepared.rgba8_premul.as_slice(),
        &[
            ((200u16 * 64 + 127) / 255) as u8,
            ((80u16 * 64 + 127) / 255) as u8,
            ((40u16 * 64 + 127) / 255) as u8,
            64u8
        ]
    );
}

#[test]
fn zero_alpha_pixels_premultiply_to_black() {
    let mut px = vec![255u8, 255, 255, 0];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(px, [0, 0, 0, 0]);
}

#[test]
fn sprite_stems_reject_path_tricks() {
    assert_eq!(validated_sprite_stem("happy_screaming").unwrap(), "happy_screaming");
    assert_eq!(validated_sprite_stem("speaking-low2").unwrap(), "speaking-low2");

    assert!(validated_sprite_stem("").is_err());
    assert!(validated_sprite_stem("../secrets").is_err());
    assert!(validated_sprite_stem("a/b").is_err());
    assert!(validated_sprite_stem("a\\b").is_err());
    assert!(validated_sprite_stem("name.png").is_err());
}

#[test]
fn explicit_missing_font_is_a_media_error() {
    let missing = std::env::temp_dir().join(format!(
        "skitcast_no_such_font_{}_{}.ttf",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0)
    ));
    let err = AssetStore::open(std::env::temp_dir(), Some(&missing)).unwrap_err();
    assert!(matches!(err, SkitcastError::Media(_)));
    assert!(err.to_string().contains("font"), "err: {err}");
}
