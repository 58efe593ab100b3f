//! Frame composition: plan segments to premultiplied-RGBA frames.

pub mod frame;
pub mod surface;
