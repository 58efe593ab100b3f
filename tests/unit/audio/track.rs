use super::*;
use crate::foundation::core::{Canvas, Rgba8};
use crate::speech::engine::SpeechClip;
use crate::timeline::plan::Segment;

#[test]
fn frame_to_sample_rounds_to_nearest() {
    assert_eq!(frame_to_sample(0, Fps(30), 48_000), 0);
    assert_eq!(frame_to_sample(1, Fps(30), 48_000), 1600);
    assert_eq!(frame_to_sample(30, Fps(30), 48_000), 48_000);
    // 48000/7 = 6857.14..., rounds down to 6857.
    assert_eq!(frame_to_sample(1, Fps(7), 48_000), 6857);
}

fn plan_with_segments(total_secs: f64, segments: Vec<Segment>) -> RenderPlan {
    RenderPlan {
        canvas: Canvas::default(),
        fps: Fps(30),
        output: "out.mp4".into(),
        total_secs,
        segments,
    }
}

fn speech_segment(start: f64, duration: f64, clip: SpeechClip) -> Segment {
    Segment {
        start_secs: start,
        duration_secs: duration,
        background: Rgba8::WHITE,
        visual: VisualContent::Caption {
            text: "x".to_string(),
        },
        line: 1,
        audio: Some(clip),
    }
}

fn background_segment(start: f64, duration: f64) -> Segment {
    Segment {
        start_secs: start,
        duration_secs: duration,
        background: Rgba8::WHITE,
        visual: VisualContent::Background,
        line: 0,
        audio: None,
    }
}

fn constant_clip(secs: f64, value: f32) -> SpeechClip {
    let frames = (secs * f64::from(MIX_SAMPLE_RATE)).round() as usize;
    SpeechClip::from_pcm(vec![value; frames * 2])
}

#[test]
fn track_length_matches_the_frame_count() {
    let plan = plan_with_segments(2.0, vec![background_segment(0.0, 2.0)]);
    let mix = mix_plan_audio(&plan).unwrap();
    assert_eq!(mix.len(), 2 * 48_000 * 2);
    assert!(mix.iter().all(|&s| s == 0.0));
}

#[test]
fn clip_lands_at_its_segment_start_sample() {
    let plan = plan_with_segments(
        3.0,
        vec![
            background_segment(0.0, 1.0),
            speech_segment(1.0, 2.0, constant_clip(2.0, 0.5)),
        ],
    );
    let mix = mix_plan_audio(&plan).unwrap();

    let start = 48_000 * 2;
    assert_eq!(mix[start - 2], 0.0);
    assert_eq!(mix[start - 1], 0.0);
    assert_eq!(mix[start], 0.5);
    assert_eq!(mix[start + 1], 0.5);
    let last = mix.len() - 2;
    assert_eq!(mix[last], 0.5);
}

#[test]
fn audio_past_the_segment_end_is_trimmed() {
    // 3s of audio in a 1s segment followed by silence.
    let plan = plan_with_segments(
        2.0,
        vec![
            speech_segment(0.0, 1.0, constant_clip(3.0, 0.25)),
            background_segment(1.0, 1.0),
        ],
    );
    let mix = mix_plan_audio(&plan).unwrap();

    let boundary = 48_000 * 2;
    assert_eq!(mix[boundary - 2], 0.25);
    assert_eq!(mix[boundary], 0.0);
    assert!(mix[boundary..].iter().all(|&s| s == 0.0));
}

#[test]
fn short_audio_is_followed_by_silence() {
    let plan = plan_with_segments(
        2.0,
        vec![speech_segment(0.0, 2.0, constant_clip(0.5, 0.75))],
    );
    let mix = mix_plan_audio(&plan).unwrap();

    let clip_end = (48_000 / 2) * 2;
    assert_eq!(mix[clip_end - 2], 0.75);
    assert_eq!(mix[clip_end], 0.0);
}

#[test]
fn mix_clamps_to_unit_range() {
    let plan = plan_with_segments(
        1.0,
        vec![speech_segment(0.0, 1.0, constant_clip(1.0, 2.0))],
    );
    let mix = mix_plan_audio(&plan).unwrap();
    assert!(mix.iter().all(|&s| s <= 1.0));
    assert_eq!(mix[0], 1.0);
}

#[test]
fn f32le_file_round_trips_bytes() {
    let path = std::env::temp_dir().join(format!(
        "skitcast_mix_{}_{}.f32le",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0)
    ));
    let samples = [0.0f32, 0.5, -0.5, 1.0];
    write_mix_to_f32le_file(&samples, &path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(bytes.len(), samples.len() * 4);
    let back: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    assert_eq!(back, samples);
}
