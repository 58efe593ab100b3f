//! Asset loading: sprites, fonts, and ffmpeg-backed media collaborators.

pub mod media;
pub mod store;
