use super::*;
use crate::assets::media::VideoSourceInfo;
use crate::foundation::core::{Canvas, Fps, Rgba8};
use crate::speech::engine::SpeechClip;
use crate::timeline::plan::Segment;

fn segment(start: f64, duration: f64, visual: VisualContent) -> Segment {
    Segment {
        start_secs: start,
        duration_secs: duration,
        background: Rgba8::WHITE,
        visual,
        line: 1,
        audio: None,
    }
}

fn plan(total_secs: f64, segments: Vec<Segment>) -> RenderPlan {
    RenderPlan {
        canvas: Canvas::default(),
        fps: Fps(30),
        output: "out.mp4".into(),
        total_secs,
        segments,
    }
}

fn sprite(emotion: &str) -> VisualContent {
    VisualContent::Sprite {
        emotion: emotion.to_string(),
    }
}

#[test]
fn background_hold_frames_share_one_signature() {
    let p = plan(2.0, vec![segment(0.0, 2.0, VisualContent::Background)]);

    let first = frame_signature(&p, FrameIndex(0), 0.0);
    assert_eq!(first, frame_signature(&p, FrameIndex(30), 0.0));
    assert_eq!(first, frame_signature(&p, FrameIndex(59), 0.0));
    // Rounding can ask for a frame just past the last segment.
    assert_eq!(first, frame_signature(&p, FrameIndex(60), 0.0));
}

#[test]
fn sprite_hold_elides_within_a_segment_but_not_across() {
    let p = plan(
        4.0,
        vec![
            segment(0.0, 2.0, sprite("happy")),
            segment(2.0, 2.0, sprite("anger")),
        ],
    );

    let a = frame_signature(&p, FrameIndex(0), 0.0);
    assert_eq!(a, frame_signature(&p, FrameIndex(59), 0.0));
    assert_ne!(a, frame_signature(&p, FrameIndex(60), 0.0));
}

#[test]
fn crossfade_frames_get_distinct_signatures() {
    let p = plan(
        4.0,
        vec![
            segment(0.0, 2.0, sprite("happy")),
            segment(2.0, 2.0, sprite("anger")),
        ],
    );

    // Window is 1s centered at t=2 (frames 45..75 at 30fps).
    let steady = frame_signature(&p, FrameIndex(10), 1.0);
    assert_eq!(steady, frame_signature(&p, FrameIndex(44), 1.0));

    let in_window_a = frame_signature(&p, FrameIndex(50), 1.0);
    let in_window_b = frame_signature(&p, FrameIndex(51), 1.0);
    assert_ne!(in_window_a, steady);
    assert_ne!(in_window_a, in_window_b);
}

#[test]
fn caption_elides_only_at_full_opacity() {
    let p = plan(
        4.0,
        vec![segment(
            0.0,
            4.0,
            VisualContent::Caption {
                text: "hello".to_string(),
            },
        )],
    );

    // 0.5s fade at each end; frames 15..=105 sit at alpha 1.
    let mid = frame_signature(&p, FrameIndex(20), 0.0);
    assert_eq!(mid, frame_signature(&p, FrameIndex(60), 0.0));
    assert_eq!(mid, frame_signature(&p, FrameIndex(105), 0.0));

    let fading = frame_signature(&p, FrameIndex(5), 0.0);
    assert_ne!(fading, mid);
    assert_ne!(fading, frame_signature(&p, FrameIndex(6), 0.0));
}

#[test]
fn sub_video_signature_follows_source_frames() {
    let source = VideoSourceInfo {
        source_path: "clip.mp4".into(),
        width: 640,
        height: 360,
        duration_secs: 2.0,
        fps: 10.0,
        has_audio: false,
    };
    let p = plan(2.0, vec![segment(0.0, 2.0, VisualContent::SubVideo { source })]);

    // 30fps over a 10fps source: output frames 0 and 1 both show source frame 0.
    let a = frame_signature(&p, FrameIndex(0), 0.0);
    let b = frame_signature(&p, FrameIndex(1), 0.0);
    let c = frame_signature(&p, FrameIndex(2), 0.0);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn audio_track_presence_is_derived_from_the_plan() {
    let silent = plan(1.0, vec![segment(0.0, 1.0, VisualContent::Background)]);
    assert!(!plan_has_audio(&silent));

    let mut speech = plan(1.0, vec![segment(0.0, 1.0, sprite("happy"))]);
    speech.segments[0].audio = Some(SpeechClip::silence(1.0));
    assert!(plan_has_audio(&speech));

    let source = VideoSourceInfo {
        source_path: "clip.mp4".into(),
        width: 640,
        height: 360,
        duration_secs: 1.0,
        fps: 30.0,
        has_audio: true,
    };
    let with_video = plan(1.0, vec![segment(0.0, 1.0, VisualContent::SubVideo { source })]);
    assert!(plan_has_audio(&with_video));
}

#[test]
fn chunk_size_zero_degrades_to_single_frames() {
    assert_eq!(normalized_chunk_size(0), 1);
    assert_eq!(normalized_chunk_size(64), 64);
}

#[test]
fn zero_worker_override_is_rejected() {
    let err = build_thread_pool(Some(0)).unwrap_err();
    assert!(err.to_string().contains("threads"));
    assert!(build_thread_pool(Some(2)).is_ok());
}
