use crate::foundation::error::{SkitcastError, SkitcastResult};

/// Absolute 0-based frame index in timeline space.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open frame range `[start, end)` in timeline space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// Inclusive range start.
    pub start: FrameIndex,
    /// Exclusive range end.
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> SkitcastResult<Self> {
        if start.0 > end.0 {
            return Err(SkitcastError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Number of frames contained in the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Return `true` when the range has no frames.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// Return `true` when `f` is inside `[start, end)`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }
}

/// Integer frames-per-second of the output video.
///
/// Scripts declare fps as a positive integer, so no rational form is needed;
/// all seconds↔frames conversions round to nearest to keep cumulative frame
/// counts within one frame of `round(total_secs * fps)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps(pub u32);

impl Fps {
    /// Create a validated FPS value.
    pub fn new(fps: u32) -> SkitcastResult<Self> {
        if fps == 0 {
            return Err(SkitcastError::validation("fps must be > 0"));
        }
        Ok(Self(fps))
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        1.0 / f64::from(self.0)
    }

    /// Convert frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) / f64::from(self.0)
    }

    /// Nearest frame index for a non-negative time in seconds.
    pub fn secs_to_frame_round(self, secs: f64) -> u64 {
        (secs * f64::from(self.0)).round().max(0.0) as u64
    }

    /// Frame range covering `[start_secs, end_secs)`, rounding each boundary
    /// to the nearest frame.
    ///
    /// Adjacent time spans sharing a boundary map to adjacent frame ranges
    /// sharing a boundary, so per-span rounding error never accumulates.
    /// Rounding is monotone, so an ordered span always yields `start <= end`.
    pub fn frame_range(self, start_secs: f64, end_secs: f64) -> FrameRange {
        FrameRange {
            start: FrameIndex(self.secs_to_frame_round(start_secs)),
            end: FrameIndex(self.secs_to_frame_round(end_secs.max(start_secs))),
        }
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Straight-alpha RGBA8 color as written in scripts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque white, the default background.
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };

    /// Opaque black, the caption text color.
    pub const BLACK: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(s: &str) -> SkitcastResult<Self> {
        let digits = s
            .strip_prefix('#')
            .ok_or_else(|| SkitcastError::validation(format!("color '{s}' must start with '#'")))?;
        if !digits.is_ascii() {
            return Err(SkitcastError::validation(format!(
                "color '{s}' has non-hex digits"
            )));
        }
        let byte = |i: usize| -> SkitcastResult<u8> {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| SkitcastError::validation(format!("color '{s}' has non-hex digits")))
        };
        match digits.len() {
            6 => Ok(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: 255,
            }),
            8 => Ok(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => Err(SkitcastError::validation(format!(
                "color '{s}' must be #rrggbb or #rrggbbaa"
            ))),
        }
    }

    /// Premultiplied `[r, g, b, a]` bytes.
    pub fn premul(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
