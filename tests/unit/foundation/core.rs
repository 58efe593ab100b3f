use super::*;

#[test]
fn frame_range_contains_boundaries() {
    let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
    assert!(!r.contains(FrameIndex(1)));
    assert!(r.contains(FrameIndex(2)));
    assert!(r.contains(FrameIndex(4)));
    assert!(!r.contains(FrameIndex(5)));
}

#[test]
fn frame_range_rejects_inverted_bounds() {
    assert!(FrameRange::new(FrameIndex(5), FrameIndex(2)).is_err());
}

#[test]
fn fps_rounds_to_nearest_frame() {
    let fps = Fps::new(30).unwrap();
    assert_eq!(fps.secs_to_frame_round(0.0), 0);
    assert_eq!(fps.secs_to_frame_round(1.0), 30);
    // 0.049s is closer to frame 1 than frame 2 at 30fps (frame period 33.3ms).
    assert_eq!(fps.secs_to_frame_round(0.049), 1);
    assert_eq!(fps.secs_to_frame_round(0.051), 2);
}

#[test]
fn fps_rejects_zero() {
    assert!(Fps::new(0).is_err());
}

#[test]
fn adjacent_spans_share_frame_boundaries() {
    let fps = Fps::new(30).unwrap();
    let a = fps.frame_range(0.0, 1.337);
    let b = fps.frame_range(1.337, 2.5);
    assert_eq!(a.end, b.start);
    assert_eq!(a.len_frames() + b.len_frames(), fps.secs_to_frame_round(2.5));
}

#[test]
fn hex_colors_parse() {
    assert_eq!(Rgba8::from_hex("#ffffff").unwrap(), Rgba8::WHITE);
    assert_eq!(Rgba8::from_hex("#000000").unwrap(), Rgba8::BLACK);
    let c = Rgba8::from_hex("#8040c080").unwrap();
    assert_eq!((c.r, c.g, c.b, c.a), (0x80, 0x40, 0xc0, 0x80));

    assert!(Rgba8::from_hex("ffffff").is_err());
    assert!(Rgba8::from_hex("#fff").is_err());
    assert!(Rgba8::from_hex("#gggggg").is_err());
}

#[test]
fn premul_scales_color_by_alpha() {
    let c = Rgba8 {
        r: 255,
        g: 128,
        b: 0,
        a: 128,
    };
    let p = c.premul();
    assert_eq!(p, [128, 64, 0, 128]);

    assert_eq!(Rgba8::WHITE.premul(), [255, 255, 255, 255]);
}
