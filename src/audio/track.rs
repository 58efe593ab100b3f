use std::path::Path;

use crate::assets::media::{MIX_SAMPLE_RATE, decode_audio_f32_stereo};
use crate::foundation::{
    core::Fps,
    error::{SkitcastError, SkitcastResult},
};
use crate::timeline::plan::{RenderPlan, VisualContent};

/// Convert a frame index to the nearest sample frame at `sample_rate`.
pub(crate) fn frame_to_sample(frame: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame) * u128::from(sample_rate);
    let den = u128::from(fps.0);
    ((num + den / 2) / den) as u64
}

/// Mix the plan's audio into one interleaved stereo track.
///
/// The track spans exactly the output frame count. Each segment's audio is
/// placed at the sample of its start frame and trimmed at its end frame;
/// shorter audio is followed by the silence already in the buffer. Sub-video
/// audio is decoded here and placed the same way. Everything else stays
/// silent.
#[tracing::instrument(skip(plan))]
pub fn mix_plan_audio(plan: &RenderPlan) -> SkitcastResult<Vec<f32>> {
    let track_frames = frame_to_sample(plan.total_frames(), plan.fps, MIX_SAMPLE_RATE) as usize;
    let mut out = vec![0.0f32; track_frames * 2];

    for segment in &plan.segments {
        let range = segment.frame_range(plan.fps);
        let start = frame_to_sample(range.start.0, plan.fps, MIX_SAMPLE_RATE) as usize;
        let end = frame_to_sample(range.end.0, plan.fps, MIX_SAMPLE_RATE) as usize;

        if let Some(clip) = &segment.audio {
            place_stereo(&mut out, start, end, &clip.pcm);
        } else if let VisualContent::SubVideo { source } = &segment.visual
            && source.has_audio
        {
            let pcm = decode_audio_f32_stereo(&source.source_path, MIX_SAMPLE_RATE)?;
            place_stereo(&mut out, start, end, &pcm.interleaved_f32);
        }
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    tracing::debug!(samples = out.len(), "audio track mixed");
    Ok(out)
}

/// Add `src` stereo frames into `out` starting at `start_frame`, stopping at
/// `end_frame` or the end of the source, whichever comes first.
fn place_stereo(out: &mut [f32], start_frame: usize, end_frame: usize, src: &[f32]) {
    let out_frames = out.len() / 2;
    let src_frames = src.len() / 2;
    let n = end_frame
        .saturating_sub(start_frame)
        .min(src_frames)
        .min(out_frames.saturating_sub(start_frame));
    for i in 0..n {
        let dst = (start_frame + i) * 2;
        let s = i * 2;
        out[dst] += src[s];
        out[dst + 1] += src[s + 1];
    }
}

/// Write interleaved `f32` PCM samples to a raw little-endian `.f32le` file.
pub(crate) fn write_mix_to_f32le_file(
    samples_interleaved: &[f32],
    out_path: &Path,
) -> SkitcastResult<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            SkitcastError::media(format!(
                "failed to create audio mix output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        SkitcastError::media(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/audio/track.rs"]
mod tests;
