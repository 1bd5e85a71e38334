//! Speech synthesis and playback: the output half of the speech capability.
//!
//! A `TtsBackend` turns text into audio bytes; `SpeakerOutput` owns the rodio
//! sink that plays them. Playback is single-flight: `flush()` before every new
//! utterance clears anything still queued so the output can never wedge on a
//! stuck queue.

use crate::error::SpeakError;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::time::Duration;
use tracing::info;

/// Frequency of the short cue played when the microphone opens.
const CUE_FREQ_HZ: f32 = 880.0;
const CUE_DURATION: Duration = Duration::from_millis(100);

/// Backend that turns text into audio bytes (WAV/MP3). Return an empty vec to
/// skip playback.
pub trait TtsBackend: Send + Sync {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeakError>;
}

/// Placeholder TTS: returns empty audio so nothing plays. For tests and for
/// running without a synthesis API key.
#[derive(Debug, Default)]
pub struct SilentTts;

impl TtsBackend for SilentTts {
    fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SpeakError> {
        Ok(Vec::new())
    }
}

/// Production TTS over an OpenAI-compatible `/audio/speech` endpoint.
/// Configure with `TTS_API_URL`, `TTS_API_KEY`, optional `TTS_MODEL` and
/// `TTS_VOICE`.
#[derive(Debug, Clone)]
pub struct RemoteTts {
    base_url: String,
    api_key: String,
    model: String,
    voice: String,
    client: reqwest::blocking::Client,
}

impl RemoteTts {
    /// Build from environment. Returns `None` when no API key is configured.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("TTS_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())?;
        let base_url = std::env::var("TTS_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model = std::env::var("TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string());
        let voice = std::env::var("TTS_VOICE").unwrap_or_else(|_| "nova".to_string());
        Self::new(base_url, api_key, model, voice).ok()
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
    ) -> Result<Self, SpeakError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SpeakError::Platform(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            voice: voice.into(),
            client,
        })
    }
}

impl TtsBackend for RemoteTts {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeakError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/audio/speech", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| SpeakError::Platform(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(SpeakError::Platform(format!(
                "TTS API error {}: {}",
                status, body
            )));
        }
        let bytes = res
            .bytes()
            .map_err(|e| SpeakError::Platform(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Owns the audio output sink for one session. Not `Send`; keep it on the
/// session task.
pub struct SpeakerOutput {
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
    sink: Sink,
}

impl SpeakerOutput {
    /// Open the default output device.
    pub fn new() -> Result<Self, SpeakError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| SpeakError::Platform(e.to_string()))?;
        let sink =
            Sink::try_new(&stream_handle).map_err(|e| SpeakError::Platform(e.to_string()))?;
        info!("speaker output ready");
        Ok(Self {
            _stream: stream,
            _stream_handle: stream_handle,
            sink,
        })
    }

    /// Queue decoded audio bytes (WAV/MP3) for playback.
    pub fn play_bytes(&self, bytes: &[u8]) -> Result<(), SpeakError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let source = rodio::Decoder::new(Cursor::new(bytes.to_vec()))
            .map_err(|e| SpeakError::Platform(format!("decode failed: {}", e)))?;
        self.sink.append(source.convert_samples::<f32>());
        Ok(())
    }

    /// Short sine cue signalling "listening" to the user.
    pub fn play_listen_cue(&self) {
        let cue = rodio::source::SineWave::new(CUE_FREQ_HZ)
            .take_duration(CUE_DURATION)
            .amplify(0.1);
        self.sink.append(cue);
    }

    /// Stop playback immediately and clear the queue.
    pub fn flush(&self) {
        self.sink.stop();
    }

    /// Whether queued samples remain (playing or pending).
    pub fn is_playing(&self) -> bool {
        !self.sink.empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_tts_returns_empty() {
        let tts = SilentTts;
        assert!(tts.synthesize("안녕하세요").unwrap().is_empty());
    }
}
