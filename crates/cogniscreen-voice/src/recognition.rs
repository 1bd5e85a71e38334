//! Speech recognition: the input half of the speech capability.
//!
//! An `SttBackend` converts a captured PCM utterance into a [`Transcript`]
//! with a confidence estimate. Grammar hints, when present, bias recognition
//! toward a closed vocabulary.

use crate::error::ListenError;
use crate::speech::{GrammarHints, Transcript};
use serde::Deserialize;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Converts one PCM utterance (mono f32) to a transcript.
pub trait SttBackend: Send + Sync {
    fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
        hints: Option<&GrammarHints>,
    ) -> Result<Transcript, ListenError>;
}

/// Encode f32 PCM (mono) to 16-bit WAV bytes for API upload.
fn pcm_f32_to_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = samples.len() * 2; // 16-bit samples
    let file_len = 44u32 + data_len as u32;

    let mut buf = Vec::with_capacity(44 + data_len);
    // RIFF header
    buf.write_all(b"RIFF").unwrap();
    buf.write_all(&(file_len - 8).to_le_bytes()).unwrap();
    buf.write_all(b"WAVE").unwrap();
    // fmt subchunk
    buf.write_all(b"fmt ").unwrap();
    buf.write_all(&16u32.to_le_bytes()).unwrap();
    buf.write_all(&1u16.to_le_bytes()).unwrap(); // PCM
    buf.write_all(&1u16.to_le_bytes()).unwrap(); // mono
    buf.write_all(&sample_rate.to_le_bytes()).unwrap();
    buf.write_all(&(sample_rate * 2).to_le_bytes()).unwrap(); // byte rate
    buf.write_all(&2u16.to_le_bytes()).unwrap(); // block align
    buf.write_all(&16u16.to_le_bytes()).unwrap(); // bits per sample
    // data subchunk
    buf.write_all(b"data").unwrap();
    buf.write_all(&(data_len as u32).to_le_bytes()).unwrap();
    for &s in samples {
        let i = (s.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        buf.write_all(&i.to_le_bytes()).unwrap();
    }
    buf
}

#[derive(Deserialize)]
struct VerboseTranscription {
    text: String,
    #[serde(default)]
    segments: Vec<TranscriptionSegment>,
}

#[derive(Deserialize)]
struct TranscriptionSegment {
    avg_logprob: f32,
}

/// Production STT over an OpenAI-compatible `/audio/transcriptions` endpoint
/// (whisper-style). Configure with `STT_API_URL`, `STT_API_KEY`, optional
/// `STT_MODEL` and `STT_LANGUAGE` (default `ko`).
///
/// Confidence is derived from the mean segment `avg_logprob` of the
/// `verbose_json` response; grammar hints are passed through the `prompt`
/// field, which biases whisper toward the hinted vocabulary.
#[derive(Debug, Clone)]
pub struct RemoteStt {
    base_url: String,
    api_key: String,
    model: String,
    language: String,
    client: reqwest::blocking::Client,
}

impl RemoteStt {
    /// Build from environment. Returns `None` when no API key is configured.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("STT_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())?;
        let base_url = std::env::var("STT_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model = std::env::var("STT_MODEL").unwrap_or_else(|_| "whisper-1".to_string());
        let language = std::env::var("STT_LANGUAGE").unwrap_or_else(|_| "ko".to_string());
        Self::new(base_url, api_key, model, language).ok()
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, ListenError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ListenError::Platform(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            language: language.into(),
            client,
        })
    }
}

impl SttBackend for RemoteStt {
    fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
        hints: Option<&GrammarHints>,
    ) -> Result<Transcript, ListenError> {
        if samples.is_empty() {
            return Err(ListenError::NoSpeech);
        }
        let wav = pcm_f32_to_wav(samples, sample_rate);
        let url = format!(
            "{}/audio/transcriptions",
            self.base_url.trim_end_matches('/')
        );
        let part = reqwest::blocking::multipart::Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| ListenError::Platform(e.to_string()))?;
        let mut form = reqwest::blocking::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", self.language.clone())
            .text("response_format", "verbose_json");
        if let Some(hints) = hints.filter(|h| !h.is_empty()) {
            form = form.text("prompt", hints.as_prompt());
        }

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| ListenError::Platform(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(ListenError::Platform(format!(
                "STT API error {}: {}",
                status, body
            )));
        }

        let parsed: VerboseTranscription = res
            .json()
            .map_err(|e| ListenError::Platform(e.to_string()))?;
        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(ListenError::NoSpeech);
        }

        let confidence = if parsed.segments.is_empty() {
            1.0
        } else {
            let mean_logprob: f32 = parsed
                .segments
                .iter()
                .map(|s| s.avg_logprob)
                .sum::<f32>()
                / parsed.segments.len() as f32;
            mean_logprob.exp().clamp(0.0, 1.0)
        };
        debug!(confidence, "transcribed: {}", text);
        Ok(Transcript { text, confidence })
    }
}

/// Scripted STT: pops pre-seeded transcripts in order. For tests and for
/// running the pipeline without a recognition API key.
#[derive(Debug, Default)]
pub struct ScriptedStt {
    queue: Mutex<VecDeque<Transcript>>,
}

impl ScriptedStt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transcripts<I>(transcripts: I) -> Self
    where
        I: IntoIterator<Item = Transcript>,
    {
        Self {
            queue: Mutex::new(transcripts.into_iter().collect()),
        }
    }
}

impl SttBackend for ScriptedStt {
    fn transcribe(
        &self,
        _samples: &[f32],
        _sample_rate: u32,
        _hints: Option<&GrammarHints>,
    ) -> Result<Transcript, ListenError> {
        self.queue
            .lock()
            .map_err(|e| ListenError::Platform(e.to_string()))?
            .pop_front()
            .ok_or(ListenError::NoSpeech)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_encoding_has_riff_header_and_length() {
        let wav = pcm_f32_to_wav(&[0.0, 0.5, -0.5, 1.0], 16000);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 4 * 2);
    }

    #[test]
    fn scripted_stt_pops_in_order() {
        let stt = ScriptedStt::with_transcripts([
            Transcript::new("남자입니다", 0.9),
            Transcript::new("칠십대", 0.8),
        ]);
        assert_eq!(stt.transcribe(&[], 16000, None).unwrap().text, "남자입니다");
        assert_eq!(stt.transcribe(&[], 16000, None).unwrap().text, "칠십대");
        assert_eq!(
            stt.transcribe(&[], 16000, None),
            Err(ListenError::NoSpeech)
        );
    }
}
