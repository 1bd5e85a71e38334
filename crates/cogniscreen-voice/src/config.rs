//! Session and listening configuration.
//!
//! The retry budget (3), answer timeout (10s), and confidence threshold (0.4)
//! are product-tuned values, not derived constants, so all of them can be
//! overridden from the environment without code edits.

use std::time::Duration;

/// Controls the session controller: question count, retry budget, timing.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | COGNISCREEN_TOTAL_QUESTIONS | 10 | Questions per session. |
/// | COGNISCREEN_ANSWER_TIMEOUT_SECS | 10 | Wall-clock limit per listen attempt. |
/// | COGNISCREEN_MAX_ATTEMPTS | 3 | Attempts per exchange, including the first. |
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Questions per session. The question bank must supply exactly this many.
    pub total_questions: usize,
    /// Hard wall-clock timeout for one listen attempt.
    pub answer_timeout: Duration,
    /// Total attempts per exchange (first try included).
    pub max_attempts: u32,
    /// Pause between speaking a prompt and opening the microphone.
    pub inter_prompt_pause: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            total_questions: 10,
            answer_timeout: Duration::from_secs(10),
            max_attempts: 3,
            inter_prompt_pause: Duration::from_millis(500),
        }
    }
}

impl SessionConfig {
    /// Load overrides from environment. Unset or invalid values keep defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            total_questions: env_usize(
                "COGNISCREEN_TOTAL_QUESTIONS",
                defaults.total_questions,
            ),
            answer_timeout: Duration::from_secs(env_u64(
                "COGNISCREEN_ANSWER_TIMEOUT_SECS",
                defaults.answer_timeout.as_secs(),
            )),
            max_attempts: env_u32("COGNISCREEN_MAX_ATTEMPTS", defaults.max_attempts).max(1),
            inter_prompt_pause: defaults.inter_prompt_pause,
        }
    }
}

/// Controls the device-backed listen pipeline (capture + endpointing + STT).
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// Sample rate (8000/16000/32000/48000 for WebRTC VAD). Default 16000.
    pub sample_rate: u32,
    /// Chunk size in samples (default 480 = 30ms at 16kHz). Required by VAD.
    pub chunk_size: usize,
    /// Trailing silence after speech that ends the utterance (default 800ms).
    pub gap_ms: u64,
    /// Shorter voiced segments are discarded as noise (default 200ms).
    pub min_speech_ms: u64,
    /// Initial silence after which the attempt resolves as no-speech (default 6s).
    pub no_speech_after: Duration,
    /// VAD aggressiveness 0-3 (default 2).
    pub vad_mode: u8,
    /// Transcripts below this confidence are rejected (default 0.4).
    pub confidence_threshold: f32,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            chunk_size: 480, // 30ms at 16kHz
            gap_ms: 800,
            min_speech_ms: 200,
            no_speech_after: Duration::from_secs(6),
            vad_mode: 2,
            confidence_threshold: 0.4,
        }
    }
}

impl ListenConfig {
    /// Load overrides from environment (`COGNISCREEN_CONFIDENCE_THRESHOLD`,
    /// `COGNISCREEN_GAP_MS`). Unset or invalid values keep defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gap_ms: env_u64("COGNISCREEN_GAP_MS", defaults.gap_ms),
            confidence_threshold: env_f32(
                "COGNISCREEN_CONFIDENCE_THRESHOLD",
                defaults.confidence_threshold,
            )
            .clamp(0.0, 1.0),
            ..defaults
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_f32(name: &str, default: f32) -> f32 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_defaults() {
        let c = SessionConfig::default();
        assert_eq!(c.total_questions, 10);
        assert_eq!(c.max_attempts, 3);
        assert_eq!(c.answer_timeout, Duration::from_secs(10));
    }

    #[test]
    fn listen_defaults() {
        let c = ListenConfig::default();
        assert_eq!(c.sample_rate, 16000);
        assert_eq!(c.chunk_size, 480);
        assert_eq!(c.gap_ms, 800);
        assert!((c.confidence_threshold - 0.4).abs() < 1e-6);
    }
}
