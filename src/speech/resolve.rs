use rayon::prelude::*;

use crate::foundation::error::{SkitcastError, SkitcastResult};
use crate::script::model::{Directive, DurationSpec, Script};
use crate::speech::engine::{SpeechClip, SpeechSynthesizer};

/// Attempts per utterance before a synthesis failure is surfaced.
const SYNTH_ATTEMPTS: u32 = 3;

/// A directive annotated with concrete timing and any synthesized narration.
#[derive(Clone, Debug)]
pub struct ResolvedDirective {
    pub directive: Directive,
    /// Concrete duration in seconds. `None` for directives whose duration is
    /// not the resolver's to decide: state changes, `insert` (probed by the
    /// timeline builder) and the terminal `end`.
    pub duration_secs: Option<f64>,
    /// Narration audio for speech-bearing directives, at its natural length
    /// even when an explicit duration will trim or pad it later.
    pub audio: Option<SpeechClip>,
}

/// Replace every written duration with a concrete number of seconds.
///
/// Explicit durations pass through untouched. `auto` durations come from the
/// synthesized utterance's natural length, so every speech-bearing directive
/// is synthesized here, concurrently, and the results are reassembled in
/// script order. `auto` on a directive without an utterance is rejected
/// before any engine call is issued. The first failure in script order wins.
pub fn resolve_durations(
    script: &Script,
    engine: &dyn SpeechSynthesizer,
) -> SkitcastResult<Vec<ResolvedDirective>> {
    // Contract check first: a script that misuses `auto` must not reach the
    // engine at all.
    for (index, directive) in script.directives.iter().enumerate() {
        if directive.kind.duration_spec() == Some(DurationSpec::Auto)
            && directive.kind.speech().is_none()
        {
            return Err(SkitcastError::resolution(
                index,
                directive.line,
                format!(
                    "'auto' duration on '{}', which carries no utterance to measure",
                    directive.kind.name()
                ),
            ));
        }
    }

    let jobs: Vec<(usize, &str, &str)> = script
        .directives
        .iter()
        .enumerate()
        .filter_map(|(index, d)| d.kind.speech().map(|(text, style)| (index, text, style)))
        .collect();

    let synthesized = jobs
        .par_iter()
        .map(|(index, text, style)| (*index, synthesize_with_retry(engine, text, style)))
        .collect::<Vec<_>>();

    let mut clips: Vec<Option<SpeechClip>> = vec![None; script.directives.len()];
    for (index, result) in synthesized {
        let directive = &script.directives[index];
        let clip = result.map_err(|e| {
            SkitcastError::resolution(index, directive.line, format!("speech synthesis failed: {e}"))
        })?;
        if clip.duration_secs <= 0.0 {
            return Err(SkitcastError::resolution(
                index,
                directive.line,
                "speech engine returned an empty clip",
            ));
        }
        clips[index] = Some(clip);
    }

    let mut resolved = Vec::with_capacity(script.directives.len());
    for (index, directive) in script.directives.iter().enumerate() {
        let audio = clips[index].take();
        let duration_secs = match directive.kind.duration_spec() {
            Some(DurationSpec::Seconds(secs)) => Some(secs),
            Some(DurationSpec::Auto) => audio.as_ref().map(|clip| clip.duration_secs),
            None => None,
        };
        resolved.push(ResolvedDirective {
            directive: directive.clone(),
            duration_secs,
            audio,
        });
    }
    Ok(resolved)
}

fn synthesize_with_retry(
    engine: &dyn SpeechSynthesizer,
    text: &str,
    style: &str,
) -> SkitcastResult<SpeechClip> {
    let mut last_err = None;
    for attempt in 1..=SYNTH_ATTEMPTS {
        match engine.synthesize(text, style) {
            Ok(clip) => return Ok(clip),
            Err(err) => {
                if attempt < SYNTH_ATTEMPTS {
                    tracing::warn!(attempt, error = %err, "speech synthesis failed, retrying");
                }
                last_err = Some(err);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| SkitcastError::media("speech synthesis failed")))
}

#[cfg(test)]
#[path = "../../tests/unit/speech/resolve.rs"]
mod tests;
