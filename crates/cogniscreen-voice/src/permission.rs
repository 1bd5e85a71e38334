//! Microphone permission collaborator.
//!
//! The platform probe mirrors the usual web pattern of requesting a media
//! stream and immediately releasing it: it asks the default input device for a
//! config and treats any failure as denial.

use crate::capture::MicCapture;
use tracing::warn;

/// Asks the platform for microphone access before the interview starts.
pub trait MicrophonePermission: Send + Sync {
    fn request_access(&self) -> bool;
}

/// Probes the default input device; denial when there is none or it cannot be
/// configured.
#[derive(Debug, Default)]
pub struct PlatformPermission;

impl MicrophonePermission for PlatformPermission {
    fn request_access(&self) -> bool {
        match MicCapture::list_input_devices() {
            Ok(devices) if !devices.is_empty() => true,
            Ok(_) => {
                warn!("no input devices found; microphone access denied");
                false
            }
            Err(e) => {
                warn!("microphone probe failed: {}", e);
                false
            }
        }
    }
}

/// Test double: always grants.
#[derive(Debug, Default)]
pub struct AlwaysGranted;

impl MicrophonePermission for AlwaysGranted {
    fn request_access(&self) -> bool {
        true
    }
}

/// Test double: always denies.
#[derive(Debug, Default)]
pub struct AlwaysDenied;

impl MicrophonePermission for AlwaysDenied {
    fn request_access(&self) -> bool {
        false
    }
}
