//! # CogniScreen Voice - Interactive voice interview pipeline
//!
//! Drives a complete voice-only cognitive assessment session: microphone
//! permission, spoken profile collection, question delivery, answer capture
//! with bounded retries, evaluation handoff, and result persistence.
//!
//! The audio path is mic capture (cpal) -> VAD endpointing (webrtc-vad) ->
//! STT backend, and TTS backend -> speaker playback (rodio). The session
//! controller in [`session`] only ever sees the [`speech::SpeechCapability`]
//! seam, so everything above the devices runs in tests against scripted
//! implementations.

pub mod capture;
pub mod config;
pub mod device;
pub mod endpoint;
pub mod error;
pub mod exchange;
pub mod normalize;
pub mod permission;
pub mod recognition;
pub mod session;
pub mod speech;
pub mod synthesis;

pub use config::{ListenConfig, SessionConfig};
pub use device::DeviceSpeech;
pub use error::{ListenError, SpeakError, VoiceError, VoiceResult};
pub use exchange::{ExchangeOutcome, ExchangePolicy};
pub use permission::{AlwaysDenied, AlwaysGranted, MicrophonePermission, PlatformPermission};
pub use session::{
    InterviewSession, ProfileStage, SessionEvent, SessionNotice, SessionOutcome, SessionState,
};
pub use speech::{GrammarHints, SpeechCapability, Transcript};
