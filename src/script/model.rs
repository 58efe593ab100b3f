use std::path::PathBuf;

use crate::foundation::{
    core::{Canvas, Fps, Rgba8},
    error::{SkitcastError, SkitcastResult},
};

/// Requested timing for a directive.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DurationSpec {
    /// Explicit duration in seconds, already validated positive.
    Seconds(f64),
    /// Derive the duration from the synthesized utterance's natural length.
    ///
    /// Only legal on speech-bearing directives; the resolver rejects it
    /// anywhere else.
    Auto,
}

/// One parsed script instruction with its source position.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Directive {
    /// 1-based source line of the directive's opening token.
    pub line: u32,
    pub kind: DirectiveKind,
}

/// The closed set of script instructions.
///
/// Both surface syntaxes (bracket commands and block tags) parse into this
/// model; ordering is source order and significant.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DirectiveKind {
    /// Set the output canvas size. At most one, before any content directive.
    SetResolution { canvas: Canvas },
    /// Change the background color for subsequent segments.
    ///
    /// A duration may be written in the script but never produces a segment;
    /// only `auto` here is an error (raised by the resolver, not the parser).
    Background {
        color: Rgba8,
        duration: Option<DurationSpec>,
    },
    /// Hold an emotion sprite for the given duration.
    EmotionDisplay {
        emotion: String,
        duration: DurationSpec,
    },
    /// Hold an emotion sprite while speaking the utterance.
    EmotionalSpeech {
        emotion: String,
        duration: DurationSpec,
        text: String,
    },
    /// Show a word-wrapped caption card while speaking the utterance.
    TextSpeech { duration: DurationSpec, text: String },
    /// Splice in an external video at its natural length.
    InsertVideo { path: PathBuf },
    /// Terminal directive carrying the merged framing parameters.
    ///
    /// The bracket syntax splits these across `[START]` and `[END]`; the tag
    /// syntax has them all on `<end/>`. The parser merges either form here.
    End {
        output: PathBuf,
        fps: Fps,
        total_secs: f64,
    },
}

impl DirectiveKind {
    /// Directive name as written in scripts, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            DirectiveKind::SetResolution { .. } => "resolution",
            DirectiveKind::Background { .. } => "background",
            DirectiveKind::EmotionDisplay { .. } => "emotion",
            DirectiveKind::EmotionalSpeech { .. } => "espeech",
            DirectiveKind::TextSpeech { .. } => "textspeech",
            DirectiveKind::InsertVideo { .. } => "insert",
            DirectiveKind::End { .. } => "end",
        }
    }

    /// True for directives that occupy time on the final timeline.
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            DirectiveKind::EmotionDisplay { .. }
                | DirectiveKind::EmotionalSpeech { .. }
                | DirectiveKind::TextSpeech { .. }
                | DirectiveKind::InsertVideo { .. }
        )
    }

    /// The utterance and speech style for speech-bearing directives.
    pub fn speech(&self) -> Option<(&str, &str)> {
        match self {
            DirectiveKind::EmotionalSpeech { emotion, text, .. } => Some((text, emotion)),
            DirectiveKind::TextSpeech { text, .. } => Some((text, NEUTRAL_STYLE)),
            _ => None,
        }
    }

    /// The written duration spec, if the directive carries one.
    pub fn duration_spec(&self) -> Option<DurationSpec> {
        match self {
            DirectiveKind::Background { duration, .. } => *duration,
            DirectiveKind::EmotionDisplay { duration, .. }
            | DirectiveKind::EmotionalSpeech { duration, .. }
            | DirectiveKind::TextSpeech { duration, .. } => Some(*duration),
            _ => None,
        }
    }
}

/// Speech style used for caption narration, which has no emotion of its own.
pub const NEUTRAL_STYLE: &str = "neutral";

/// A fully parsed script: ordered directives with the terminal `End` last.
///
/// Parse-time validation guarantees exactly one `End` and that it is last;
/// [`Script::framing`] relies on that.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Script {
    pub directives: Vec<Directive>,
}

/// Global parameters merged from the framing directives.
#[derive(Clone, Debug, PartialEq)]
pub struct Framing<'a> {
    pub output: &'a std::path::Path,
    pub fps: Fps,
    pub total_secs: f64,
}

impl Script {
    /// Framing parameters from the terminal directive.
    pub fn framing(&self) -> SkitcastResult<Framing<'_>> {
        match self.directives.last() {
            Some(Directive {
                kind:
                    DirectiveKind::End {
                        output,
                        fps,
                        total_secs,
                    },
                ..
            }) => Ok(Framing {
                output,
                fps: *fps,
                total_secs: *total_secs,
            }),
            _ => Err(SkitcastError::validation(
                "script has no terminal end directive",
            )),
        }
    }
}
