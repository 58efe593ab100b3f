use std::collections::HashMap;
use std::path::PathBuf;

use rayon::prelude::*;

use crate::assets::media::MIX_SAMPLE_RATE;
use crate::assets::store::AssetStore;
use crate::audio::track::{mix_plan_audio, write_mix_to_f32le_file};
use crate::compose::frame::{
    ComposeOptions, FrameComposer, FrameRgba, caption_alpha, crossfade_at, sub_video_source_time,
};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{SkitcastError, SkitcastResult};
use crate::script::parse::parse_script;
use crate::speech::engine::SpeechSynthesizer;
use crate::speech::resolve::resolve_durations;
use crate::timeline::build::build_plan;
use crate::timeline::plan::{RenderPlan, VisualContent};

#[derive(Clone, Debug)]
/// Threading and chunking controls for multi-frame rendering.
pub struct RenderThreading {
    /// Enable parallel rendering when `true`.
    pub parallel: bool,
    /// Chunk size in frames for batched scheduling.
    pub chunk_size: usize,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
    /// Enable static-frame signature elision in parallel mode.
    pub static_frame_elision: bool,
}

impl Default for RenderThreading {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: 64,
            threads: None,
            static_frame_elision: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Aggregated rendering counters.
pub struct RenderStats {
    /// Total requested frames.
    pub frames_total: u64,
    /// Frames that were actually rendered.
    pub frames_rendered: u64,
    /// Frames reused via static-frame elision.
    pub frames_elided: u64,
}

/// Options for rendering a compiled plan.
#[derive(Clone, Debug, Default)]
pub struct RenderOpts {
    /// Composition policy (crossfade window).
    pub compose: ComposeOptions,
    /// Threading/chunking configuration.
    pub threading: RenderThreading,
}

/// Compile a script source into a render plan.
///
/// Pipeline:
/// 1. [`parse_script`]
/// 2. [`resolve_durations`] (TTS fan-out for `auto` durations)
/// 3. [`build_plan`] (contiguous timeline, overflow checks, padding)
#[tracing::instrument(skip(source, engine))]
pub fn compile_script(source: &str, engine: &dyn SpeechSynthesizer) -> SkitcastResult<RenderPlan> {
    let script = parse_script(source)?;
    let resolved = resolve_durations(&script, engine)?;
    build_plan(&resolved)
}

/// Render every frame of `plan` into `sink`, in strictly increasing order.
///
/// The mixed audio track is written to a temp f32le file and handed to the sink
/// through [`SinkConfig`]; the temp file is removed on every exit path. Frames are
/// produced chunk by chunk so memory stays bounded by `threading.chunk_size`.
#[tracing::instrument(skip(plan, assets, sink, opts))]
pub fn render_plan_to_sink(
    plan: &RenderPlan,
    assets: &AssetStore,
    sink: &mut dyn FrameSink,
    opts: &RenderOpts,
) -> SkitcastResult<RenderStats> {
    plan.validate()?;
    let total = plan.total_frames();
    if total == 0 {
        return Err(SkitcastError::validation(
            "render plan resolves to zero frames",
        ));
    }

    // Fallible setup happens before the sink spawns anything.
    let pool = if opts.threading.parallel {
        Some(build_thread_pool(opts.threading.threads)?)
    } else {
        None
    };
    let mut sequential_composer = if opts.threading.parallel {
        None
    } else {
        Some(FrameComposer::new(assets, opts.compose)?)
    };

    let mut audio_tmp = TempFileGuard(None);
    let audio_cfg = if plan_has_audio(plan) {
        let mixed = mix_plan_audio(plan)?;
        let path = std::env::temp_dir().join(format!(
            "skitcast_audio_mix_{}_{}.f32le",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        write_mix_to_f32le_file(&mixed, &path)?;
        audio_tmp.0 = Some(path.clone());
        Some(AudioInputConfig {
            path,
            sample_rate: MIX_SAMPLE_RATE,
            channels: 2,
        })
    } else {
        None
    };

    sink.begin(SinkConfig {
        width: plan.canvas.width,
        height: plan.canvas.height,
        fps: plan.fps,
        audio: audio_cfg,
    })?;

    let chunk_size = normalized_chunk_size(opts.threading.chunk_size);
    let mut stats = RenderStats::default();

    let mut chunk_start = 0u64;
    while chunk_start < total {
        let chunk_end = (chunk_start + chunk_size).min(total);
        let chunk_out = if let Some(pool) = pool.as_ref() {
            render_chunk_parallel(plan, assets, chunk_start, chunk_end, opts, pool)?
        } else {
            let composer = sequential_composer
                .as_mut()
                .ok_or_else(|| SkitcastError::render("sequential composer missing"))?;
            render_chunk_sequential(plan, assets, chunk_start, chunk_end, composer)?
        };

        for (offset, &u) in chunk_out.frame_to_unique.iter().enumerate() {
            let frame = chunk_out.unique_frames.get(u).ok_or_else(|| {
                SkitcastError::render("internal error: unique frame index out of range during push")
            })?;
            sink.push_frame(FrameIndex(chunk_start + offset as u64), frame)?;
        }

        stats.frames_total += chunk_out.stats.frames_total;
        stats.frames_rendered += chunk_out.stats.frames_rendered;
        stats.frames_elided += chunk_out.stats.frames_elided;
        chunk_start = chunk_end;
    }

    sink.end()?;
    drop(audio_tmp);
    tracing::debug!(
        frames_total = stats.frames_total,
        frames_rendered = stats.frames_rendered,
        frames_elided = stats.frames_elided,
        "render finished"
    );
    Ok(stats)
}

/// Render `plan` to an MP4 by streaming frames into the system `ffmpeg`.
pub fn render_plan_to_mp4(
    plan: &RenderPlan,
    assets: &AssetStore,
    out_path: impl Into<PathBuf>,
    opts: &RenderOpts,
) -> SkitcastResult<RenderStats> {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(out_path));
    render_plan_to_sink(plan, assets, &mut sink, opts)
}

fn plan_has_audio(plan: &RenderPlan) -> bool {
    plan.segments.iter().any(|s| {
        s.audio.is_some()
            || matches!(&s.visual, VisualContent::SubVideo { source } if source.has_audio)
    })
}

struct ChunkOut {
    unique_frames: Vec<FrameRgba>,
    frame_to_unique: Vec<usize>,
    stats: RenderStats,
}

fn render_chunk_sequential(
    plan: &RenderPlan,
    assets: &AssetStore,
    start: u64,
    end: u64,
    composer: &mut FrameComposer,
) -> SkitcastResult<ChunkOut> {
    let count = (end - start) as usize;
    let mut frames = Vec::with_capacity(count);
    for f in start..end {
        frames.push(composer.compose(plan, assets, FrameIndex(f))?);
    }
    Ok(ChunkOut {
        unique_frames: frames,
        frame_to_unique: (0..count).collect(),
        stats: RenderStats {
            frames_total: count as u64,
            frames_rendered: count as u64,
            frames_elided: 0,
        },
    })
}

fn render_chunk_parallel(
    plan: &RenderPlan,
    assets: &AssetStore,
    start: u64,
    end: u64,
    opts: &RenderOpts,
    pool: &rayon::ThreadPool,
) -> SkitcastResult<ChunkOut> {
    let count = (end - start) as usize;
    let mut unique_offsets = Vec::<usize>::with_capacity(count);
    let mut frame_to_unique = Vec::<usize>::with_capacity(count);
    if opts.threading.static_frame_elision {
        let mut first = HashMap::<FrameSignature, usize>::new();
        for offset in 0..count {
            let sig = frame_signature(
                plan,
                FrameIndex(start + offset as u64),
                opts.compose.crossfade_secs,
            );
            if let Some(&slot) = first.get(&sig) {
                frame_to_unique.push(slot);
            } else {
                let slot = unique_offsets.len();
                unique_offsets.push(offset);
                first.insert(sig, slot);
                frame_to_unique.push(slot);
            }
        }
    } else {
        for offset in 0..count {
            unique_offsets.push(offset);
            frame_to_unique.push(offset);
        }
    }

    let rendered = pool.install(|| {
        unique_offsets
            .par_iter()
            .map_init(
                || FrameComposer::new(assets, opts.compose),
                |worker, &offset| -> SkitcastResult<FrameRgba> {
                    let composer = worker.as_mut().map_err(|e| {
                        SkitcastError::render(format!("worker composer init failed: {e}"))
                    })?;
                    composer.compose(plan, assets, FrameIndex(start + offset as u64))
                },
            )
            .collect::<Vec<_>>()
    });

    let mut unique_frames = Vec::<FrameRgba>::with_capacity(rendered.len());
    for item in rendered {
        unique_frames.push(item?);
    }

    let total = count as u64;
    let rendered_count = unique_frames.len() as u64;
    Ok(ChunkOut {
        unique_frames,
        frame_to_unique,
        stats: RenderStats {
            frames_total: total,
            frames_rendered: rendered_count,
            frames_elided: total.saturating_sub(rendered_count),
        },
    })
}

/// Content signature for one output frame, used for static-frame elision.
///
/// Two frames with equal signatures rasterize to identical pixels: every animated
/// quantity feeding the compositor (caption fade, crossfade opacity, sub-video
/// source frame) is folded in.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
enum FrameSignature {
    /// Background fill only (background segments and past-the-end frames).
    Hold { segment: usize },
    /// Sprite hold. Entry and exit crossfade windows occupy disjoint alpha
    /// ranges, so the opacity bits alone identify the sprite pair being blended.
    Sprite {
        segment: usize,
        fade_bits: Option<u32>,
    },
    Caption {
        segment: usize,
        alpha_bits: u32,
    },
    Video {
        segment: usize,
        source_ms: u64,
    },
}

fn frame_signature(plan: &RenderPlan, frame: FrameIndex, crossfade_secs: f64) -> FrameSignature {
    let t = plan.fps.frames_to_secs(frame.0);
    let Some((idx, segment)) = plan.segment_for_frame(frame) else {
        return FrameSignature::Hold {
            segment: plan.segments.len().saturating_sub(1),
        };
    };
    match &segment.visual {
        VisualContent::Background => FrameSignature::Hold { segment: idx },
        VisualContent::Sprite { .. } => FrameSignature::Sprite {
            segment: idx,
            fade_bits: crossfade_at(plan, idx, t, crossfade_secs).map(|draw| draw.alpha.to_bits()),
        },
        VisualContent::Caption { .. } => FrameSignature::Caption {
            segment: idx,
            alpha_bits: caption_alpha(t - segment.start_secs, segment.duration_secs).to_bits(),
        },
        VisualContent::SubVideo { source } => {
            let src_t =
                sub_video_source_time(t - segment.start_secs, source.fps, source.duration_secs);
            FrameSignature::Video {
                segment: idx,
                source_ms: (src_t * 1000.0).round() as u64,
            }
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> SkitcastResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(SkitcastError::validation(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| SkitcastError::render(format!("failed to build rayon thread pool: {e}")))
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    if chunk_size == 0 { 1 } else { chunk_size as u64 }
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
