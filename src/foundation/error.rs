/// Convenience result type used across skitcast.
pub type SkitcastResult<T> = Result<T, SkitcastError>;

/// Top-level error taxonomy for the script-to-video pipeline.
///
/// Every stage either returns a fully valid output or fails with one of these;
/// no stage hands a partially resolved script or plan to the next.
#[derive(thiserror::Error, Debug)]
pub enum SkitcastError {
    /// Invalid caller-provided data outside the script itself (options, colors,
    /// frame ranges).
    #[error("validation error: {0}")]
    Validation(String),

    /// Malformed script text. Carries the 1-based source line.
    #[error("parse error at line {line}: {msg}")]
    Parse { line: u32, msg: String },

    /// Illegal "auto" duration or a speech-engine failure while resolving one.
    #[error("resolution error at directive {index} (line {line}): {msg}")]
    Resolution { index: usize, line: u32, msg: String },

    /// Content durations exceed the declared total video duration.
    #[error("timeline overflow at directive {index} (line {line}): {msg}")]
    Overflow { index: usize, line: u32, msg: String },

    /// Media collaborator failure (ffprobe/ffmpeg decode, sprite or font load).
    #[error("media error: {0}")]
    Media(String),

    /// Frame composition failure.
    #[error("render error: {0}")]
    Render(String),

    /// Encode sink failure.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SkitcastError {
    /// Build a [`SkitcastError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SkitcastError::Parse`] value.
    pub fn parse(line: u32, msg: impl Into<String>) -> Self {
        Self::Parse {
            line,
            msg: msg.into(),
        }
    }

    /// Build a [`SkitcastError::Resolution`] value.
    pub fn resolution(index: usize, line: u32, msg: impl Into<String>) -> Self {
        Self::Resolution {
            index,
            line,
            msg: msg.into(),
        }
    }

    /// Build a [`SkitcastError::Overflow`] value.
    pub fn overflow(index: usize, line: u32, msg: impl Into<String>) -> Self {
        Self::Overflow {
            index,
            line,
            msg: msg.into(),
        }
    }

    /// Build a [`SkitcastError::Media`] value.
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    /// Build a [`SkitcastError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`SkitcastError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}
