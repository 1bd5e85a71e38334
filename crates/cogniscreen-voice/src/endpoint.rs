//! Utterance endpointing: WebRTC VAD plus gap logic, producing at most one
//! utterance per recognition session.
//!
//! Unlike a conversational turn-taker this detector is one-shot: it buffers
//! from the first voiced frame and commits as soon as the trailing-silence gap
//! is reached. The caller decides what an empty outcome means (no-speech vs
//! timeout).

use crate::config::ListenConfig;
use crate::error::{VoiceError, VoiceResult};
use std::time::{Duration, Instant};
use tracing::debug;
use webrtc_vad::{SampleRate, Vad, VadMode};

/// Outcome of feeding one chunk into the detector.
#[derive(Debug)]
pub enum EndpointEvent {
    /// Still waiting (for first speech, or for the gap).
    Pending,
    /// First voiced frame of the utterance.
    SpeechStarted,
    /// Gap reached: the complete utterance, speech start to last voiced frame.
    Utterance(Vec<f32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorState {
    AwaitingSpeech,
    Voiced,
    Trailing,
}

/// One-shot end-of-utterance detector.
///
/// Not `Send` (the VAD holds a raw handle); construct and drive it on the
/// capture thread.
pub struct UtteranceDetector {
    vad: Vad,
    state: DetectorState,
    buffer: Vec<f32>,
    speech_start: Option<Instant>,
    last_voice: Option<Instant>,
    gap: Duration,
    min_speech: Duration,
    chunk_size: usize,
}

impl UtteranceDetector {
    pub fn new(config: &ListenConfig) -> VoiceResult<Self> {
        if !matches!(config.sample_rate, 8000 | 16000 | 32000 | 48000) {
            return Err(VoiceError::Config(format!(
                "WebRTC VAD supports 8000/16000/32000/48000 Hz, got {}",
                config.sample_rate
            )));
        }
        if config.vad_mode > 3 {
            return Err(VoiceError::Config(format!(
                "VAD mode must be 0-3, got {}",
                config.vad_mode
            )));
        }

        let mode = match config.vad_mode {
            0 => VadMode::Quality,
            1 => VadMode::LowBitrate,
            2 => VadMode::Aggressive,
            _ => VadMode::VeryAggressive,
        };
        let rate = match config.sample_rate {
            8000 => SampleRate::Rate8kHz,
            16000 => SampleRate::Rate16kHz,
            32000 => SampleRate::Rate32kHz,
            _ => SampleRate::Rate48kHz,
        };

        let mut vad = Vad::new();
        vad.set_mode(mode);
        vad.set_sample_rate(rate);

        Ok(Self {
            vad,
            state: DetectorState::AwaitingSpeech,
            buffer: Vec::new(),
            speech_start: None,
            last_voice: None,
            gap: Duration::from_millis(config.gap_ms),
            min_speech: Duration::from_millis(config.min_speech_ms),
            chunk_size: config.chunk_size,
        })
    }

    /// True once at least one voiced frame has been seen.
    pub fn heard_speech(&self) -> bool {
        self.state != DetectorState::AwaitingSpeech
    }

    /// Feed one 30ms chunk. Chunks of the wrong size are skipped upstream.
    pub fn push_chunk(&mut self, samples: &[f32]) -> VoiceResult<EndpointEvent> {
        if samples.len() != self.chunk_size {
            return Err(VoiceError::Config(format!(
                "expected {} samples, got {}",
                self.chunk_size,
                samples.len()
            )));
        }

        let pcm: Vec<i16> = samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
            .collect();
        let voiced = self
            .vad
            .is_voice_segment(&pcm)
            .map_err(|e| VoiceError::AudioDevice(format!("VAD failed: {:?}", e)))?;

        let now = Instant::now();
        match (self.state, voiced) {
            (DetectorState::AwaitingSpeech, true) => {
                debug!("utterance started");
                self.state = DetectorState::Voiced;
                self.speech_start = Some(now);
                self.last_voice = Some(now);
                self.buffer.extend_from_slice(samples);
                Ok(EndpointEvent::SpeechStarted)
            }
            (DetectorState::AwaitingSpeech, false) => Ok(EndpointEvent::Pending),
            (DetectorState::Voiced, true) | (DetectorState::Trailing, true) => {
                self.state = DetectorState::Voiced;
                self.last_voice = Some(now);
                self.buffer.extend_from_slice(samples);
                Ok(EndpointEvent::Pending)
            }
            (DetectorState::Voiced, false) => {
                self.state = DetectorState::Trailing;
                Ok(EndpointEvent::Pending)
            }
            (DetectorState::Trailing, false) => {
                let silence = self
                    .last_voice
                    .map(|t| now.duration_since(t))
                    .unwrap_or_default();
                if silence >= self.gap {
                    self.commit()
                } else {
                    Ok(EndpointEvent::Pending)
                }
            }
        }
    }

    fn commit(&mut self) -> VoiceResult<EndpointEvent> {
        let spoken = match (self.speech_start, self.last_voice) {
            (Some(start), Some(last)) => last.duration_since(start),
            _ => Duration::ZERO,
        };
        if spoken < self.min_speech {
            debug!("voiced segment too short ({:?}), discarding", spoken);
            self.state = DetectorState::AwaitingSpeech;
            self.speech_start = None;
            self.last_voice = None;
            self.buffer.clear();
            return Ok(EndpointEvent::Pending);
        }
        debug!(
            "utterance committed: {:?} speech, {} samples",
            spoken,
            self.buffer.len()
        );
        self.state = DetectorState::AwaitingSpeech;
        Ok(EndpointEvent::Utterance(std::mem::take(&mut self.buffer)))
    }
}
