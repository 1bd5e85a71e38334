//! The speech capability contract: the only seam through which the session
//! controller touches audio I/O.
//!
//! Implementations guarantee single-flight discipline in both directions:
//! `speak` flushes any in-flight utterance before starting (a stuck output
//! queue is a known platform hazard), and starting a new `listen` stops a
//! still-running recognition session first. Both operations tear down their
//! resources exactly once whatever the outcome.

use crate::error::{ListenError, SpeakError};
use std::time::Duration;

/// Final transcript of one recognized utterance, with the recognizer's
/// confidence in it (0.0 - 1.0).
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub confidence: f32,
}

impl Transcript {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Closed vocabulary supplied to recognition for categorical answers (gender,
/// age bracket). Absent hints, recognition is open-vocabulary.
#[derive(Debug, Clone, Default)]
pub struct GrammarHints {
    phrases: Vec<String>,
}

impl GrammarHints {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phrases: phrases.into_iter().map(Into::into).collect(),
        }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Hint string for recognizers that accept a free-form biasing prompt.
    pub fn as_prompt(&self) -> String {
        self.phrases.join(", ")
    }
}

/// Spoken output and recognition input for one session.
///
/// Not `Send`: device-backed implementations own the audio sink, which must
/// stay on the session's task. Keep one instance per session; sharing one
/// across sessions would couple their audio streams.
#[async_trait::async_trait(?Send)]
pub trait SpeechCapability {
    /// Speak `text`, suspending until playback ends or fails. Any utterance
    /// still in flight is cancelled and flushed first.
    async fn speak(&self, text: &str) -> Result<(), SpeakError>;

    /// Run one recognition session and resolve with the highest-confidence
    /// transcript of the final utterance. Emits a short audible cue when the
    /// microphone opens. A still-running previous `listen` from this instance
    /// is stopped first.
    async fn listen(
        &self,
        timeout: Duration,
        hints: Option<&GrammarHints>,
    ) -> Result<Transcript, ListenError>;

    /// True only while an utterance is playing.
    fn is_speaking(&self) -> bool;

    /// True only while a recognition session is open.
    fn is_listening(&self) -> bool;
}

#[async_trait::async_trait(?Send)]
impl<T: SpeechCapability + ?Sized> SpeechCapability for std::sync::Arc<T> {
    async fn speak(&self, text: &str) -> Result<(), SpeakError> {
        (**self).speak(text).await
    }

    async fn listen(
        &self,
        timeout: Duration,
        hints: Option<&GrammarHints>,
    ) -> Result<Transcript, ListenError> {
        (**self).listen(timeout, hints).await
    }

    fn is_speaking(&self) -> bool {
        (**self).is_speaking()
    }

    fn is_listening(&self) -> bool {
        (**self).is_listening()
    }
}
