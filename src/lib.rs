//! Skitcast compiles small skit scripts into finished videos.
//!
//! A script is a flat list of directives: emotion sprites, narrated text with
//! synthesized speech, inserted clips, and timing. The pipeline turns it into
//! pixels and sound in four stages:
//!
//! 1. **Parse**: script text -> [`Script`] (directives with line positions)
//! 2. **Resolve**: measure `auto` durations by synthesizing speech up front
//! 3. **Build**: resolved directives -> [`RenderPlan`] (contiguous segments)
//! 4. **Render**: compose frames, mix the 48 kHz track, stream to `ffmpeg`
//!
//! Key constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic-by-default**: the same script and speech engine always
//!   compile to the same plan, and the first error always names the same
//!   directive.
//! - **Premultiplied RGBA8** end-to-end until the encoder flattens alpha.
#![forbid(unsafe_code)]

pub mod assets;
pub mod audio;
pub mod compose;
pub mod encode;
pub mod foundation;
pub mod render;
pub mod script;
pub mod speech;
pub mod timeline;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange, Rgba8};
pub use crate::foundation::error::{SkitcastError, SkitcastResult};

pub use crate::assets::media::{AudioPcm, VideoSourceInfo};
pub use crate::assets::store::AssetStore;
pub use crate::audio::track::mix_plan_audio;
pub use crate::compose::frame::{ComposeOptions, FrameComposer, FrameRgba};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use crate::render::pipeline::{
    RenderOpts, RenderStats, RenderThreading, compile_script, render_plan_to_mp4,
    render_plan_to_sink,
};
pub use crate::script::model::{Directive, DirectiveKind, DurationSpec, Script};
pub use crate::script::parse::parse_script;
pub use crate::speech::engine::{SpeechClip, SpeechSynthesizer, StubSynthesizer};
pub use crate::speech::espeak::EspeakSynthesizer;
pub use crate::speech::resolve::{ResolvedDirective, resolve_durations};
pub use crate::timeline::build::build_plan;
pub use crate::timeline::plan::{RenderPlan, Segment, VisualContent};
