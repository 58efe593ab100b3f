use std::path::PathBuf;

use crate::assets::media::VideoSourceInfo;
use crate::foundation::{
    core::{Canvas, Fps, FrameIndex, FrameRange, Rgba8},
    error::{SkitcastError, SkitcastResult},
};
use crate::speech::engine::SpeechClip;

/// Tolerance for cursor arithmetic over summed f64 durations.
pub(crate) const TIME_EPSILON: f64 = 1e-9;

/// What a segment shows for its whole duration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum VisualContent {
    /// Emotion sprite held over the background.
    Sprite { emotion: String },
    /// Word-wrapped caption card.
    Caption { text: String },
    /// Frames re-sampled from an external video.
    SubVideo { source: VideoSourceInfo },
    /// Bare background hold.
    Background,
}

/// One resolved slice of the timeline.
///
/// Segments are contiguous and non-overlapping; each carries the background
/// color in effect at its start and the source line of the directive it came
/// from, for diagnostics raised after building.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    pub start_secs: f64,
    pub duration_secs: f64,
    pub background: Rgba8,
    pub visual: VisualContent,
    /// 1-based script line of the originating directive (0 for synthesized
    /// padding).
    pub line: u32,
    /// Synthesized narration, placed at the segment start when mixing.
    ///
    /// Raw PCM never round-trips through the serialized plan.
    #[serde(skip)]
    pub audio: Option<SpeechClip>,
}

impl Segment {
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }

    /// Half-open output frame range covered by this segment.
    ///
    /// Both boundaries round to the nearest frame, so adjacent segments map
    /// to adjacent frame ranges sharing a boundary.
    pub fn frame_range(&self, fps: Fps) -> FrameRange {
        fps.frame_range(self.start_secs, self.end_secs())
    }
}

/// The compiled timeline: ordered segments plus global framing.
///
/// Built once by the timeline builder and only read afterwards.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RenderPlan {
    pub canvas: Canvas,
    pub fps: Fps,
    pub output: PathBuf,
    pub total_secs: f64,
    pub segments: Vec<Segment>,
}

impl RenderPlan {
    /// Number of output frames for the declared total duration.
    pub fn total_frames(&self) -> u64 {
        self.fps.secs_to_frame_round(self.total_secs)
    }

    /// Segment covering the given output frame, with its index.
    pub fn segment_for_frame(&self, frame: FrameIndex) -> Option<(usize, &Segment)> {
        let idx = self
            .segments
            .partition_point(|s| s.frame_range(self.fps).end.0 <= frame.0);
        let segment = self.segments.get(idx)?;
        if segment.frame_range(self.fps).contains(frame) {
            Some((idx, segment))
        } else {
            None
        }
    }

    /// Check the plan invariants: positive framing, positive segment
    /// durations, contiguity from 0 through the declared total.
    pub fn validate(&self) -> SkitcastResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(SkitcastError::validation("canvas width/height must be > 0"));
        }
        if !self.total_secs.is_finite() || self.total_secs <= 0.0 {
            return Err(SkitcastError::validation("total duration must be > 0"));
        }

        let mut cursor = 0.0f64;
        for (idx, segment) in self.segments.iter().enumerate() {
            if !segment.duration_secs.is_finite() || segment.duration_secs <= 0.0 {
                return Err(SkitcastError::validation(format!(
                    "segment {idx} has non-positive duration"
                )));
            }
            if (segment.start_secs - cursor).abs() > TIME_EPSILON {
                return Err(SkitcastError::validation(format!(
                    "segment {idx} starts at {:.9}s but the previous segment ends at {cursor:.9}s",
                    segment.start_secs
                )));
            }
            cursor = segment.end_secs();
        }
        if (cursor - self.total_secs).abs() > TIME_EPSILON {
            return Err(SkitcastError::validation(format!(
                "segments end at {cursor:.9}s but the declared total is {:.9}s",
                self.total_secs
            )));
        }
        Ok(())
    }
}
