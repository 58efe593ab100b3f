//! Speech synthesis and duration resolution.

pub mod engine;
pub mod espeak;
pub mod resolve;
