//! Transient microphone probe via `cpal`.
//!
//! Desktop platforms have no portable "query microphone permission" API, so
//! [`CpalMicrophone`] answers by opening the default input stream and
//! dropping it straight away.  On macOS the first probe triggers the system
//! consent prompt; a refusal surfaces as a stream build/play error.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::{AccessError, MicrophoneAccess, SystemPermission};

/// [`MicrophoneAccess`] backed by the default cpal host.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalMicrophone;

impl CpalMicrophone {
    pub fn new() -> Self {
        Self
    }
}

impl MicrophoneAccess for CpalMicrophone {
    fn query(&self) -> Option<SystemPermission> {
        None
    }

    fn probe(&self) -> Result<(), AccessError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(AccessError::NoDevice)?;

        let supported = device
            .default_input_config()
            .map_err(|e| AccessError::Device(e.to_string()))?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        let stream = device
            .build_input_stream_raw(
                &config,
                sample_format,
                |_data: &cpal::Data, _: &cpal::InputCallbackInfo| {},
                |err: cpal::StreamError| {
                    log::warn!("permission probe stream error: {err}");
                },
                None,
            )
            .map_err(|e| match e {
                cpal::BuildStreamError::DeviceNotAvailable => AccessError::NoDevice,
                other => AccessError::Denied(other.to_string()),
            })?;

        stream
            .play()
            .map_err(|e| AccessError::Denied(e.to_string()))?;

        // Release the device before reporting success.
        drop(stream);
        log::debug!("permission probe: input device opened and released");
        Ok(())
    }
}
