use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::assets::media::MIX_SAMPLE_RATE;
use crate::foundation::error::{SkitcastError, SkitcastResult};

/// One synthesized utterance.
///
/// PCM is interleaved stereo `f32` at [`MIX_SAMPLE_RATE`], shared so resolved
/// directives can be cloned without copying samples.
#[derive(Clone, Debug)]
pub struct SpeechClip {
    /// Interleaved stereo samples.
    pub pcm: Arc<Vec<f32>>,
    /// Natural duration of the synthesized audio in seconds.
    pub duration_secs: f64,
}

impl SpeechClip {
    /// Wrap decoded PCM, deriving the duration from the sample count.
    pub fn from_pcm(pcm: Vec<f32>) -> Self {
        let frames = pcm.len() / 2;
        Self {
            pcm: Arc::new(pcm),
            duration_secs: frames as f64 / f64::from(MIX_SAMPLE_RATE),
        }
    }

    /// Silence of the given duration.
    pub fn silence(duration_secs: f64) -> Self {
        let frames = (duration_secs.max(0.0) * f64::from(MIX_SAMPLE_RATE)).round() as usize;
        Self {
            pcm: Arc::new(vec![0.0; frames * 2]),
            duration_secs,
        }
    }
}

/// Text-to-speech collaborator.
///
/// Implementations must be callable from multiple resolver tasks at once and
/// must report the same duration for identical `(text, style)` pairs, or
/// "auto" timing stops being reproducible.
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` spoken in the given emotion style.
    fn synthesize(&self, text: &str, style: &str) -> SkitcastResult<SpeechClip>;
}

/// Deterministic synthesizer for tests and dry runs.
///
/// Returns silence whose duration comes from a per-text override or the
/// default, and counts invocations so callers can assert that no engine call
/// was issued. Optionally fails the first N calls to exercise retry paths.
pub struct StubSynthesizer {
    default_secs: f64,
    by_text: Vec<(String, f64)>,
    fail_first: AtomicUsize,
    calls: AtomicUsize,
}

impl StubSynthesizer {
    /// Stub returning `default_secs` of silence for every utterance.
    pub fn new(default_secs: f64) -> Self {
        Self {
            default_secs,
            by_text: Vec::new(),
            fail_first: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Override the duration reported for one exact utterance.
    pub fn with_text(mut self, text: impl Into<String>, secs: f64) -> Self {
        self.by_text.push((text.into(), secs));
        self
    }

    /// Fail the first `n` synthesize calls before succeeding.
    pub fn failing_first(self, n: usize) -> Self {
        self.fail_first.store(n, Ordering::Relaxed);
        self
    }

    /// Number of synthesize calls seen so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl SpeechSynthesizer for StubSynthesizer {
    fn synthesize(&self, text: &str, _style: &str) -> SkitcastResult<SpeechClip> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self
            .fail_first
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SkitcastError::media("stub synthesizer failure"));
        }
        let secs = self
            .by_text
            .iter()
            .find(|(t, _)| t == text)
            .map(|(_, s)| *s)
            .unwrap_or(self.default_secs);
        Ok(SpeechClip::silence(secs))
    }
}
