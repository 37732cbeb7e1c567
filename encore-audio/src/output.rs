//! Device output sink - cpal stream pulling frames from the shared player
//!
//! The stream runs for the lifetime of an open source; the transport mode
//! gates whether the player renders audio or silence. The callback uses
//! `try_lock` so the real-time thread never blocks on the control thread -
//! on contention it outputs silence for that buffer.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

use crate::player::Player;

/// Largest stereo scratch buffer for channel-count adaptation
const MAX_BUFFER_SIZE: usize = 16384;

/// Errors raised while talking to the output device
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("No audio output device found")]
    NoDevice,
    #[error("Failed to query device config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("Failed to build audio stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("Failed to start audio stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

/// An open cpal output stream bound to one player
pub struct OutputSink {
    stream: cpal::Stream,
    sample_rate: u32,
}

impl OutputSink {
    /// Sample rate of the default output device, queried before decoding so
    /// the source can be resampled to match
    pub fn device_sample_rate() -> Result<u32, DeviceError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(DeviceError::NoDevice)?;
        let config = device.default_output_config()?;
        Ok(config.sample_rate().0)
    }

    /// Build and start a stream that renders from `player`
    pub fn start(player: Arc<Mutex<Player>>) -> Result<Self, DeviceError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(DeviceError::NoDevice)?;
        let config = device.default_output_config()?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        let mut scratch = vec![0.0f32; MAX_BUFFER_SIZE];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Some(mut player) = player.try_lock() else {
                    // Contention with the control thread - skip this buffer
                    data.fill(0.0);
                    return;
                };
                if channels == 2 {
                    player.render(data);
                } else {
                    // Render stereo, then adapt to the device layout
                    let frames = data.len() / channels;
                    let stereo = &mut scratch[..(frames * 2).min(MAX_BUFFER_SIZE)];
                    player.render(stereo);
                    adapt_channels(stereo, data, channels);
                }
            },
            |err| {
                warn!("audio stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        info!(sample_rate, channels, "output stream started");

        Ok(Self {
            stream,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Ask the device to resume; a no-op if it is already running
    pub fn resume(&self) -> Result<(), DeviceError> {
        self.stream.play()?;
        Ok(())
    }
}

/// Map rendered stereo frames onto a mono or multichannel device buffer
fn adapt_channels(stereo: &[f32], out: &mut [f32], channels: usize) {
    if channels == 1 {
        for (i, sample) in out.iter_mut().enumerate() {
            let j = i * 2;
            if j + 1 < stereo.len() {
                *sample = (stereo[j] + stereo[j + 1]) * 0.5;
            } else {
                *sample = 0.0;
            }
        }
        return;
    }

    let frames = out.len() / channels;
    for frame in 0..frames {
        let j = frame * 2;
        let (l, r) = if j + 1 < stereo.len() {
            (stereo[j], stereo[j + 1])
        } else {
            (0.0, 0.0)
        };
        let base = frame * channels;
        out[base] = l;
        out[base + 1] = r;
        for extra in &mut out[base + 2..base + channels] {
            *extra = 0.0;
        }
    }
}
