//! Render orchestration: script compilation and chunked frame production.

pub mod pipeline;
