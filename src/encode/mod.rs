//! Encoding sinks.
//!
//! Sinks consume composited frames in timeline order; the pipeline drives them after
//! the audio mixdown is written.

/// `ffmpeg`-based sink (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
