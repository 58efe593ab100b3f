use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::assets::media::{MIX_SAMPLE_RATE, decode_audio_f32_stereo};
use crate::foundation::error::{SkitcastError, SkitcastResult};
use crate::speech::engine::{SpeechClip, SpeechSynthesizer};

/// Synthesizer backed by the `espeak-ng` binary.
///
/// Each utterance is rendered to a temporary WAV file and decoded to the
/// pipeline's PCM format. The emotion style only modulates pitch; espeak has
/// no real emotional registers.
pub struct EspeakSynthesizer {
    voice: String,
    speed_wpm: u32,
    /// Availability is probed once per engine, not once per retry.
    available: OnceLock<bool>,
}

impl EspeakSynthesizer {
    pub fn new() -> Self {
        Self {
            voice: "en".to_string(),
            speed_wpm: 175,
            available: OnceLock::new(),
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// True when `espeak-ng` is runnable from `PATH`.
    pub fn is_available() -> bool {
        Command::new("espeak-ng")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn temp_wav_path(&self) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("skitcast_tts_{}_{}.wav", std::process::id(), nanos))
    }
}

impl Default for EspeakSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pitch for an emotion style on espeak's 0..=99 scale (default 50).
fn style_pitch(style: &str) -> u32 {
    match style {
        "anger" | "anger_screaming" | "fearful" | "worried" => 35,
        "happy" | "happy_screaming" | "joy" | "smile" | "mischief" | "greedy" => 62,
        _ => 50,
    }
}

impl SpeechSynthesizer for EspeakSynthesizer {
    fn synthesize(&self, text: &str, style: &str) -> SkitcastResult<SpeechClip> {
        if !*self.available.get_or_init(Self::is_available) {
            return Err(SkitcastError::media(
                "espeak-ng is not on PATH; install it or supply another speech engine",
            ));
        }
        let wav_path = self.temp_wav_path();
        let _guard = TempWavGuard {
            path: wav_path.clone(),
        };

        // Text goes over stdin so quoting in the utterance cannot be
        // mistaken for flags.
        let mut child = Command::new("espeak-ng")
            .arg("-v")
            .arg(&self.voice)
            .arg("-p")
            .arg(style_pitch(style).to_string())
            .arg("-s")
            .arg(self.speed_wpm.to_string())
            .arg("-w")
            .arg(&wav_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SkitcastError::media(format!("failed to start espeak-ng: {e}")))?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| SkitcastError::media(format!("failed to send text to espeak-ng: {e}")))?;
        }
        drop(child.stdin.take());

        let out = child
            .wait_with_output()
            .map_err(|e| SkitcastError::media(format!("failed to wait for espeak-ng: {e}")))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(SkitcastError::media(format!(
                "espeak-ng failed with status {}: {}",
                out.status,
                stderr.trim()
            )));
        }

        let pcm = decode_audio_f32_stereo(&wav_path, MIX_SAMPLE_RATE)?;
        let clip = SpeechClip::from_pcm(pcm.interleaved_f32);
        if clip.duration_secs <= 0.0 {
            return Err(SkitcastError::media(format!(
                "espeak-ng produced no audio for {text:?}"
            )));
        }
        Ok(clip)
    }
}

struct TempWavGuard {
    path: PathBuf,
}

impl Drop for TempWavGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
