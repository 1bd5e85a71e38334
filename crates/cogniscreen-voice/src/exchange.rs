//! Retry/timeout policy for one exchange: speak a prompt, listen, parse, and
//! on a recognized failure apologize, re-speak the prompt, and retry within a
//! bounded attempt budget.
//!
//! A "repeat" transcript re-issues the prompt without consuming an attempt.
//! Exhausting the budget yields [`ExchangeOutcome::Exhausted`], distinct from
//! per-attempt failures; the caller decides whether that is fatal (profile
//! collection) or recoverable (in-test answers).

use crate::config::SessionConfig;
use crate::error::{ListenError, VoiceError, VoiceResult};
use crate::normalize::is_repeat_request;
use crate::speech::{GrammarHints, SpeechCapability};
use std::time::Duration;
use tracing::{debug, info};

/// Spoken acknowledgement before re-issuing the prompt on a repeat request.
pub const REPEAT_ACK: &str = "네, 다시 질문해 드릴게요.";
/// Apology when nothing was heard.
pub const APOLOGY_NO_SPEECH: &str = "아무런 답변이 들리지 않았습니다. 다시 한 번 말씀해주시겠어요?";
/// Apology when the answer window expired.
pub const APOLOGY_TIMEOUT: &str = "답변 시간이 초과되었습니다. 다시 한 번 말씀해주시겠어요?";
/// Apology when the answer was heard but unclear.
pub const APOLOGY_LOW_CONFIDENCE: &str =
    "죄송합니다, 답변이 명확하게 들리지 않았습니다. 다시 한 번 말씀해주시겠어요?";
/// Apology when the transcript could not be understood as an answer.
pub const APOLOGY_UNPARSABLE: &str = "죄송합니다, 잘 이해하지 못했어요. 다시 말씀해주세요.";

/// Result of one bounded exchange.
#[derive(Debug)]
pub enum ExchangeOutcome<T> {
    /// A transcript was captured and parsed within the budget.
    Captured { value: T, transcript: String },
    /// All attempts were consumed without a usable answer.
    Exhausted,
}

/// Bounded retry policy for a single prompt-then-listen exchange.
#[derive(Debug, Clone)]
pub struct ExchangePolicy {
    /// Total attempts, first try included.
    pub max_attempts: u32,
    /// Wall-clock limit per listen attempt.
    pub timeout: Duration,
    /// Pause between speaking and opening the microphone.
    pub pause: Duration,
}

impl ExchangePolicy {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            timeout: config.answer_timeout,
            pause: config.inter_prompt_pause,
        }
    }

    fn apology_for(err: &ListenError) -> &'static str {
        match err {
            ListenError::NoSpeech => APOLOGY_NO_SPEECH,
            ListenError::Timeout => APOLOGY_TIMEOUT,
            ListenError::LowConfidence { .. } => APOLOGY_LOW_CONFIDENCE,
            ListenError::Platform(_) => APOLOGY_UNPARSABLE,
        }
    }

    /// Run one exchange. `parse` returns `None` for unparsable transcripts;
    /// `on_transcript` surfaces every captured transcript to the presentation
    /// layer, including ones that fail to parse.
    pub async fn run<S, T, P, F>(
        &self,
        speech: &S,
        prompt: &str,
        hints: Option<&GrammarHints>,
        parse: P,
        on_transcript: F,
    ) -> VoiceResult<ExchangeOutcome<T>>
    where
        S: SpeechCapability + ?Sized,
        P: Fn(&str) -> Option<T>,
        F: FnMut(&str),
    {
        speech.speak(prompt).await?;
        tokio::time::sleep(self.pause).await;
        self.run_after_prompt(speech, prompt, hints, parse, on_transcript)
            .await
    }

    /// As [`run`](Self::run), but the caller has already spoken the prompt;
    /// retries still re-speak it.
    pub async fn run_after_prompt<S, T, P, F>(
        &self,
        speech: &S,
        prompt: &str,
        hints: Option<&GrammarHints>,
        parse: P,
        mut on_transcript: F,
    ) -> VoiceResult<ExchangeOutcome<T>>
    where
        S: SpeechCapability + ?Sized,
        P: Fn(&str) -> Option<T>,
        F: FnMut(&str),
    {
        let mut attempts = 0u32;
        while attempts < self.max_attempts {
            match speech.listen(self.timeout, hints).await {
                Ok(transcript) => {
                    on_transcript(&transcript.text);

                    if is_repeat_request(&transcript.text) {
                        // Re-ask without touching the attempt budget.
                        debug!("repeat requested; re-issuing prompt");
                        speech.speak(REPEAT_ACK).await?;
                        speech.speak(prompt).await?;
                        tokio::time::sleep(self.pause).await;
                        continue;
                    }

                    if let Some(value) = parse(&transcript.text) {
                        return Ok(ExchangeOutcome::Captured {
                            value,
                            transcript: transcript.text,
                        });
                    }

                    attempts += 1;
                    debug!(attempts, "transcript unparsable: {}", transcript.text);
                    if attempts < self.max_attempts {
                        speech.speak(APOLOGY_UNPARSABLE).await?;
                        speech.speak(prompt).await?;
                        tokio::time::sleep(self.pause).await;
                    }
                }
                Err(err) if err.is_retryable() => {
                    attempts += 1;
                    debug!(attempts, "listen attempt failed: {}", err);
                    if attempts < self.max_attempts {
                        speech.speak(Self::apology_for(&err)).await?;
                        speech.speak(prompt).await?;
                        tokio::time::sleep(self.pause).await;
                    }
                }
                Err(err) => return Err(VoiceError::Listen(err)),
            }
        }

        info!(max_attempts = self.max_attempts, "exchange exhausted");
        Ok(ExchangeOutcome::Exhausted)
    }
}
