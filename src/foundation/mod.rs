//! Shared primitives: error taxonomy, frame/time math, colors.

pub mod core;
pub mod error;
