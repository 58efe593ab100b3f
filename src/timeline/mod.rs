//! Timeline compilation: resolved directives to a contiguous segment plan.

pub mod build;
pub mod plan;
