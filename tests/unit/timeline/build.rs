use super::*;
use crate::foundation::core::{FrameIndex, Fps};
use crate::script::model::{Directive, DurationSpec};
use crate::speech::engine::SpeechClip;

fn resolved(line: u32, kind: DirectiveKind, duration_secs: Option<f64>) -> ResolvedDirective {
    ResolvedDirective {
        directive: Directive { line, kind },
        duration_secs,
        audio: None,
    }
}

fn emotion(line: u32, name: &str, secs: f64) -> ResolvedDirective {
    resolved(
        line,
        DirectiveKind::EmotionDisplay {
            emotion: name.to_string(),
            duration: DurationSpec::Seconds(secs),
        },
        Some(secs),
    )
}

fn espeech(line: u32, name: &str, secs: f64, text: &str) -> ResolvedDirective {
    let mut r = resolved(
        line,
        DirectiveKind::EmotionalSpeech {
            emotion: name.to_string(),
            duration: DurationSpec::Auto,
            text: text.to_string(),
        },
        Some(secs),
    );
    r.audio = Some(SpeechClip::silence(secs));
    r
}

fn textspeech(line: u32, secs: f64, text: &str) -> ResolvedDirective {
    let mut r = resolved(
        line,
        DirectiveKind::TextSpeech {
            duration: DurationSpec::Seconds(secs),
            text: text.to_string(),
        },
        Some(secs),
    );
    r.audio = Some(SpeechClip::silence(secs));
    r
}

fn end(line: u32, total_secs: f64, fps: u32) -> ResolvedDirective {
    resolved(
        line,
        DirectiveKind::End {
            output: "out.mp4".into(),
            fps: Fps(fps),
            total_secs,
        },
        None,
    )
}

#[test]
fn short_content_pads_with_a_background_hold() {
    let plan = build_plan(&[
        emotion(1, "happy", 1.0),
        espeech(2, "happy", 2.0, "Hi."),
        end(3, 12.0, 30),
    ])
    .unwrap();

    plan.validate().unwrap();
    assert_eq!(plan.segments.len(), 3);

    assert_eq!(plan.segments[0].start_secs, 0.0);
    assert_eq!(plan.segments[0].duration_secs, 1.0);
    assert!(matches!(
        plan.segments[0].visual,
        VisualContent::Sprite { ref emotion } if emotion == "happy"
    ));

    assert_eq!(plan.segments[1].start_secs, 1.0);
    assert_eq!(plan.segments[1].duration_secs, 2.0);
    assert!(plan.segments[1].audio.is_some());

    assert_eq!(plan.segments[2].start_secs, 3.0);
    assert_eq!(plan.segments[2].end_secs(), 12.0);
    assert!(matches!(plan.segments[2].visual, VisualContent::Background));
    assert!(plan.segments[2].audio.is_none());

    assert_eq!(plan.total_frames(), 360);
}

#[test]
fn exact_fill_emits_no_padding() {
    let plan = build_plan(&[
        emotion(1, "joy", 4.0),
        textspeech(2, 8.0, "and so it goes"),
        end(3, 12.0, 30),
    ])
    .unwrap();

    plan.validate().unwrap();
    assert_eq!(plan.segments.len(), 2);
    assert_eq!(plan.segments[1].end_secs(), 12.0);
    assert!(matches!(
        plan.segments[1].visual,
        VisualContent::Caption { .. }
    ));
}

#[test]
fn overflow_names_the_offending_directive() {
    let err = build_plan(&[
        emotion(2, "happy", 6.0),
        espeech(3, "anger", 7.0, "too long"),
        end(4, 12.0, 30),
    ])
    .unwrap_err();

    match err {
        SkitcastError::Overflow { index, line, msg } => {
            assert_eq!(index, 1);
            assert_eq!(line, 3);
            assert!(msg.contains("espeech"), "msg: {msg}");
            assert!(msg.contains("13.000"), "msg: {msg}");
        }
        other => panic!("expected overflow error, got {other}"),
    }
}

#[test]
fn state_directives_shape_segments_without_occupying_time() {
    let black = Rgba8::from_hex("#000000").unwrap();
    let plan = build_plan(&[
        resolved(
            1,
            DirectiveKind::SetResolution {
                canvas: Canvas {
                    width: 640,
                    height: 360,
                },
            },
            None,
        ),
        resolved(
            2,
            DirectiveKind::Background {
                color: black,
                duration: None,
            },
            None,
        ),
        emotion(3, "smile", 2.0),
        end(4, 5.0, 30),
    ])
    .unwrap();

    assert_eq!(plan.canvas.width, 640);
    assert_eq!(plan.canvas.height, 360);
    assert_eq!(plan.segments.len(), 2);
    assert_eq!(plan.segments[0].background, black);
    // Padding inherits the background in effect at the end of the script.
    assert_eq!(plan.segments[1].background, black);
}

#[test]
fn background_changes_apply_to_later_segments_only() {
    let red = Rgba8::from_hex("#ff0000").unwrap();
    let plan = build_plan(&[
        emotion(1, "happy", 1.0),
        resolved(
            2,
            DirectiveKind::Background {
                color: red,
                duration: None,
            },
            None,
        ),
        emotion(3, "happy", 1.0),
        end(4, 2.0, 30),
    ])
    .unwrap();

    assert_eq!(plan.segments[0].background, Rgba8::WHITE);
    assert_eq!(plan.segments[1].background, red);
}

#[test]
fn content_free_script_is_one_background_hold() {
    let plan = build_plan(&[end(1, 12.0, 24)]).unwrap();

    plan.validate().unwrap();
    assert_eq!(plan.segments.len(), 1);
    assert_eq!(plan.segments[0].start_secs, 0.0);
    assert_eq!(plan.segments[0].end_secs(), 12.0);
    assert!(matches!(plan.segments[0].visual, VisualContent::Background));
    assert_eq!(plan.total_frames(), 288);
}

#[test]
fn frame_ranges_stay_contiguous_under_rounding() {
    let plan = build_plan(&[
        emotion(1, "a", 0.35),
        emotion(2, "b", 0.35),
        emotion(3, "c", 0.30),
        end(4, 1.0, 30),
    ])
    .unwrap();

    let ranges: Vec<_> = plan
        .segments
        .iter()
        .map(|s| s.frame_range(plan.fps))
        .collect();
    assert_eq!((ranges[0].start.0, ranges[0].end.0), (0, 11));
    assert_eq!((ranges[1].start.0, ranges[1].end.0), (11, 21));
    assert_eq!((ranges[2].start.0, ranges[2].end.0), (21, 30));

    let summed: u64 = ranges.iter().map(|r| r.len_frames()).sum();
    assert_eq!(summed, plan.total_frames());

    assert_eq!(plan.segment_for_frame(FrameIndex(10)).unwrap().0, 0);
    assert_eq!(plan.segment_for_frame(FrameIndex(11)).unwrap().0, 1);
    assert_eq!(plan.segment_for_frame(FrameIndex(29)).unwrap().0, 2);
    assert!(plan.segment_for_frame(FrameIndex(30)).is_none());
}

#[test]
fn unresolved_content_duration_is_rejected() {
    let err = build_plan(&[
        resolved(
            1,
            DirectiveKind::EmotionDisplay {
                emotion: "happy".to_string(),
                duration: DurationSpec::Auto,
            },
            None,
        ),
        end(2, 5.0, 30),
    ])
    .unwrap_err();

    assert!(matches!(err, SkitcastError::Validation(_)));
}

#[test]
fn missing_end_directive_is_rejected() {
    assert!(matches!(
        build_plan(&[emotion(1, "happy", 1.0)]),
        Err(SkitcastError::Validation(_))
    ));
}
