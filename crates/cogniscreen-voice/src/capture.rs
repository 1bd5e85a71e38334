//! Microphone capture via CPAL.
//!
//! Capture runs only for the duration of one `listen` call: the returned
//! `Stream` is dropped when the recognition session ends, which releases the
//! device. Chunks go over a std channel because the consumer (VAD loop) is a
//! blocking thread.

use crate::config::ListenConfig;
use crate::error::{VoiceError, VoiceResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::sync::mpsc;
use tracing::{info, warn};

/// One chunk of mono f32 samples (-1.0..1.0), `chunk_size` long.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
}

/// Opens the default input device for one recognition session.
pub struct MicCapture {
    device: Device,
    stream_config: StreamConfig,
    chunk_size: usize,
}

impl MicCapture {
    pub fn new(config: &ListenConfig) -> VoiceResult<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| VoiceError::AudioDevice("no input device available".to_string()))?;

        info!(
            "mic capture on '{}' ({}Hz mono)",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            config.sample_rate
        );

        // Fails here (not at stream build) when the device rejects the rate.
        device.default_input_config()?;

        let stream_config = StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.chunk_size as u32),
        };

        Ok(Self {
            device,
            stream_config,
            chunk_size: config.chunk_size,
        })
    }

    /// Start capturing; chunks are delivered until the returned stream is
    /// dropped. Dropping the stream is the forced-stop path for timeouts.
    pub fn start(self, chunk_tx: mpsc::Sender<AudioChunk>) -> VoiceResult<Stream> {
        let chunk_size = self.chunk_size;
        let mut buffer = Vec::with_capacity(chunk_size);

        let stream = self.device.build_input_stream(
            &self.stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    buffer.push(sample);
                    if buffer.len() >= chunk_size {
                        let chunk = AudioChunk {
                            samples: std::mem::replace(
                                &mut buffer,
                                Vec::with_capacity(chunk_size),
                            ),
                        };
                        // Receiver gone means the listen ended; stop quietly.
                        if chunk_tx.send(chunk).is_err() {
                            return;
                        }
                    }
                }
            },
            move |err| {
                warn!("input stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;
        Ok(stream)
    }

    /// Names of available input devices, for diagnostics and the permission probe.
    pub fn list_input_devices() -> VoiceResult<Vec<String>> {
        let devices = cpal::default_host().input_devices()?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_devices_does_not_panic() {
        // May be empty in CI without audio hardware.
        if let Ok(devices) = MicCapture::list_input_devices() {
            println!("input devices: {:?}", devices);
        }
    }
}
