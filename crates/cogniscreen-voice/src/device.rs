//! Device-backed [`SpeechCapability`]: TTS playback through the speaker
//! output, recognition through mic capture + endpointing + an STT backend.
//!
//! Owns the audio devices for its session. The flush-before-speak and
//! single-flight-listen guarantees of the contract are implemented here; the
//! blocking capture loop runs on a worker thread and is forcibly ended by
//! dropping its stream on timeout or supersession.

use crate::capture::MicCapture;
use crate::config::ListenConfig;
use crate::endpoint::{EndpointEvent, UtteranceDetector};
use crate::error::{ListenError, SpeakError, VoiceError, VoiceResult};
use crate::recognition::{RemoteStt, ScriptedStt, SttBackend};
use crate::speech::{GrammarHints, SpeechCapability, Transcript};
use crate::synthesis::{RemoteTts, SilentTts, SpeakerOutput, TtsBackend};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Raises a flag for the duration of an operation; lowering happens in `Drop`,
/// so teardown is exactly-once on every exit path.
struct FlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlagGuard<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag }
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Speech capability backed by the local audio devices and pluggable TTS/STT
/// backends. One instance per session.
pub struct DeviceSpeech {
    tts: Box<dyn TtsBackend>,
    stt: Box<dyn SttBackend>,
    output: SpeakerOutput,
    listen_config: ListenConfig,
    speaking: AtomicBool,
    listening: AtomicBool,
    /// Cancel flag of the in-flight listen, if any. Setting it stops that
    /// listen before a new one starts (single-flight).
    active_listen: Mutex<Option<Arc<AtomicBool>>>,
}

impl DeviceSpeech {
    pub fn new(
        tts: Box<dyn TtsBackend>,
        stt: Box<dyn SttBackend>,
        listen_config: ListenConfig,
    ) -> Result<Self, SpeakError> {
        let output = SpeakerOutput::new()?;
        Ok(Self {
            tts,
            stt,
            output,
            listen_config,
            speaking: AtomicBool::new(false),
            listening: AtomicBool::new(false),
            active_listen: Mutex::new(None),
        })
    }

    /// Wire from environment: remote TTS/STT when API keys are configured,
    /// silent/scripted placeholders otherwise.
    pub fn from_env() -> VoiceResult<Self> {
        let tts: Box<dyn TtsBackend> = match RemoteTts::from_env() {
            Some(remote) => Box::new(remote),
            None => {
                info!("no TTS_API_KEY; speech output is silent");
                Box::new(SilentTts)
            }
        };
        let stt: Box<dyn SttBackend> = match RemoteStt::from_env() {
            Some(remote) => Box::new(remote),
            None => {
                info!("no STT_API_KEY; recognition will report no-speech");
                Box::new(ScriptedStt::new())
            }
        };
        Ok(Self::new(tts, stt, ListenConfig::from_env()).map_err(VoiceError::Speak)?)
    }

    fn supersede_active_listen(&self) -> Result<Arc<AtomicBool>, ListenError> {
        let mut active = self
            .active_listen
            .lock()
            .map_err(|e| ListenError::Platform(e.to_string()))?;
        if let Some(prev) = active.take() {
            debug!("stopping still-running recognition session");
            prev.store(true, Ordering::SeqCst);
        }
        let cancel = Arc::new(AtomicBool::new(false));
        *active = Some(Arc::clone(&cancel));
        Ok(cancel)
    }

    fn clear_active_listen(&self, cancel: &Arc<AtomicBool>) {
        if let Ok(mut active) = self.active_listen.lock() {
            if let Some(current) = active.as_ref() {
                if Arc::ptr_eq(current, cancel) {
                    *active = None;
                }
            }
        }
    }
}

/// Blocking capture loop: open the mic, feed the endpoint detector, return one
/// utterance. The stream is dropped on every exit path, which releases the
/// device (the forced-stop path for timeout and supersession).
fn capture_utterance(
    config: ListenConfig,
    timeout: Duration,
    cancel: Arc<AtomicBool>,
) -> Result<Vec<f32>, ListenError> {
    let (chunk_tx, chunk_rx) = mpsc::channel();
    let capture = MicCapture::new(&config).map_err(|e| ListenError::Platform(e.to_string()))?;
    let _stream = capture
        .start(chunk_tx)
        .map_err(|e| ListenError::Platform(e.to_string()))?;
    let mut detector =
        UtteranceDetector::new(&config).map_err(|e| ListenError::Platform(e.to_string()))?;

    let started = Instant::now();
    loop {
        if cancel.load(Ordering::SeqCst) {
            return Err(ListenError::Platform(
                "superseded by a newer listen".to_string(),
            ));
        }
        let elapsed = started.elapsed();
        if !detector.heard_speech() && elapsed >= config.no_speech_after {
            return Err(ListenError::NoSpeech);
        }
        if elapsed >= timeout {
            return Err(ListenError::Timeout);
        }

        match chunk_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(chunk) => {
                if chunk.samples.len() != config.chunk_size {
                    continue;
                }
                match detector.push_chunk(&chunk.samples) {
                    Ok(EndpointEvent::Utterance(samples)) => return Ok(samples),
                    Ok(_) => {}
                    Err(e) => return Err(ListenError::Platform(e.to_string())),
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(ListenError::Platform("capture stream closed".to_string()));
            }
        }
    }
}

#[async_trait::async_trait(?Send)]
impl SpeechCapability for DeviceSpeech {
    async fn speak(&self, text: &str) -> Result<(), SpeakError> {
        // Flush-before-speak: never let a previous utterance wedge the queue.
        self.output.flush();

        let bytes = self.tts.synthesize(text)?;
        if bytes.is_empty() {
            return Ok(());
        }

        let _guard = FlagGuard::raise(&self.speaking);
        self.output.play_bytes(&bytes)?;
        while self.output.is_playing() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        Ok(())
    }

    async fn listen(
        &self,
        timeout: Duration,
        hints: Option<&GrammarHints>,
    ) -> Result<Transcript, ListenError> {
        let cancel = self.supersede_active_listen()?;

        // Audible cue: tell the user the microphone is open.
        self.output.play_listen_cue();

        let guard = FlagGuard::raise(&self.listening);
        let config = self.listen_config.clone();
        let sample_rate = config.sample_rate;
        let worker_cancel = Arc::clone(&cancel);
        let outcome = tokio::task::spawn_blocking(move || {
            capture_utterance(config, timeout, worker_cancel)
        })
        .await
        .map_err(|e| ListenError::Platform(e.to_string()));

        self.clear_active_listen(&cancel);
        drop(guard);

        let samples = outcome??;
        let transcript = self.stt.transcribe(&samples, sample_rate, hints)?;
        if transcript.text.trim().is_empty() {
            return Err(ListenError::NoSpeech);
        }
        if transcript.confidence < self.listen_config.confidence_threshold {
            warn!(
                confidence = transcript.confidence,
                "transcript below confidence threshold"
            );
            return Err(ListenError::LowConfidence {
                confidence: transcript.confidence,
            });
        }
        Ok(transcript)
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}
