//! Audio track mixdown.

pub mod track;
