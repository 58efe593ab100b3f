use crate::assets::media::probe_video;
use crate::foundation::{
    core::{Canvas, Rgba8},
    error::{SkitcastError, SkitcastResult},
};
use crate::script::model::DirectiveKind;
use crate::speech::resolve::ResolvedDirective;
use crate::timeline::plan::{RenderPlan, Segment, TIME_EPSILON, VisualContent};

/// Compile the resolved directive sequence into a [`RenderPlan`].
///
/// A running cursor starts at 0. Content directives emit one segment each and
/// advance the cursor; state directives update builder-wide defaults
/// (background color, canvas) applied to subsequent segments. Insert
/// directives are timed here from the probed container duration. Content that
/// runs past the declared total is an overflow error naming the directive; a
/// shortfall is filled with a final background hold so the plan always covers
/// exactly `[0, total)`.
#[tracing::instrument(skip(resolved))]
pub fn build_plan(resolved: &[ResolvedDirective]) -> SkitcastResult<RenderPlan> {
    let (output, fps, total_secs) = match resolved.last().map(|r| &r.directive.kind) {
        Some(DirectiveKind::End {
            output,
            fps,
            total_secs,
        }) => (output.clone(), *fps, *total_secs),
        _ => {
            return Err(SkitcastError::validation(
                "script has no terminal end directive",
            ));
        }
    };

    let mut canvas = Canvas::default();
    let mut background = Rgba8::WHITE;
    let mut cursor = 0.0f64;
    let mut segments = Vec::new();

    for (index, item) in resolved.iter().enumerate() {
        let line = item.directive.line;
        let visual = match &item.directive.kind {
            DirectiveKind::SetResolution { canvas: c } => {
                canvas = *c;
                continue;
            }
            DirectiveKind::Background { color, .. } => {
                background = *color;
                continue;
            }
            DirectiveKind::End { .. } => continue,
            DirectiveKind::EmotionDisplay { emotion, .. }
            | DirectiveKind::EmotionalSpeech { emotion, .. } => VisualContent::Sprite {
                emotion: emotion.clone(),
            },
            DirectiveKind::TextSpeech { text, .. } => VisualContent::Caption { text: text.clone() },
            DirectiveKind::InsertVideo { path } => {
                let source = probe_video(path)?;
                if source.duration_secs <= 0.0 {
                    return Err(SkitcastError::media(format!(
                        "inserted video '{}' has no duration",
                        path.display()
                    )));
                }
                VisualContent::SubVideo { source }
            }
        };

        let duration_secs = match &visual {
            VisualContent::SubVideo { source } => source.duration_secs,
            _ => item.duration_secs.ok_or_else(|| {
                SkitcastError::validation(format!(
                    "'{}' directive at line {line} reached the timeline builder without a resolved duration",
                    item.directive.kind.name()
                ))
            })?,
        };

        if cursor + duration_secs - total_secs > TIME_EPSILON {
            return Err(SkitcastError::overflow(
                index,
                line,
                format!(
                    "'{}' ends at {:.3}s, past the declared total of {total_secs:.3}s",
                    item.directive.kind.name(),
                    cursor + duration_secs
                ),
            ));
        }

        segments.push(Segment {
            start_secs: cursor,
            duration_secs,
            background,
            visual,
            line,
            audio: item.audio.clone(),
        });
        cursor += duration_secs;
    }

    if total_secs - cursor > TIME_EPSILON {
        segments.push(Segment {
            start_secs: cursor,
            duration_secs: total_secs - cursor,
            background,
            visual: VisualContent::Background,
            line: 0,
            audio: None,
        });
    }

    let plan = RenderPlan {
        canvas,
        fps,
        output,
        total_secs,
        segments,
    };
    plan.validate()?;
    tracing::debug!(
        segments = plan.segments.len(),
        frames = plan.total_frames(),
        "timeline compiled"
    );
    Ok(plan)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/build.rs"]
mod tests;
