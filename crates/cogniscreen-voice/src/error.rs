//! Error types for the voice session controller.
//!
//! Two layers: per-attempt speech failures (`SpeakError`, `ListenError`) that
//! the retry policy absorbs, and session-level failures (`VoiceError`) that
//! end the interview in the `Failed` state.

use thiserror::Error;

/// Result type alias for session operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Failure of one `speak` call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpeakError {
    /// No usable speech synthesis backend on this platform. Fatal at first use.
    #[error("speech synthesis unsupported")]
    Unsupported,

    #[error("speech synthesis error: {0}")]
    Platform(String),
}

/// Failure of one `listen` call. The first three categories are retryable by
/// the exchange policy; `Platform` is not.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ListenError {
    /// Nothing was detected before natural end-of-speech.
    #[error("no speech detected")]
    NoSpeech,

    /// Best transcript came back below the confidence threshold.
    #[error("transcript confidence {confidence} below threshold")]
    LowConfidence { confidence: f32 },

    /// No result within the wall-clock timeout; recognition was forcibly stopped.
    #[error("listening timed out")]
    Timeout,

    #[error("speech recognition error: {0}")]
    Platform(String),
}

impl ListenError {
    /// True for failure categories the retry policy may re-attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ListenError::Platform(_))
    }
}

/// Session-ending failures. Recoverable conditions (an unanswered question, an
/// evaluator error) never surface here; they are converted into zero-score
/// answers at the point of occurrence.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("마이크 사용 권한이 필요합니다.")]
    PermissionDenied,

    /// Profile collection is mandatory; exhausting the retry budget there is fatal.
    #[error("음성 입력을 받는 데 실패하여 테스트를 중단합니다.")]
    ProfileCollectionExhausted,

    #[error("Speech output failed: {0}")]
    Speak(#[from] SpeakError),

    #[error("Speech recognition failed: {0}")]
    Listen(ListenError),

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error(transparent)]
    Core(#[from] cogniscreen_core::CoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<cpal::DevicesError> for VoiceError {
    fn from(err: cpal::DevicesError) -> Self {
        VoiceError::AudioDevice(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for VoiceError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        VoiceError::AudioDevice(err.to_string())
    }
}

impl From<cpal::BuildStreamError> for VoiceError {
    fn from(err: cpal::BuildStreamError) -> Self {
        VoiceError::AudioDevice(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for VoiceError {
    fn from(err: cpal::PlayStreamError) -> Self {
        VoiceError::AudioDevice(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_listen_errors_are_not_retryable() {
        assert!(ListenError::NoSpeech.is_retryable());
        assert!(ListenError::Timeout.is_retryable());
        assert!(ListenError::LowConfidence { confidence: 0.3 }.is_retryable());
        assert!(!ListenError::Platform("device lost".to_string()).is_retryable());
    }
}
