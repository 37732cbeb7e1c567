//! Preview player - short auditions independent of the performance session
//!
//! A deliberately small second engine for identifying tracks: two states,
//! no tempo/pitch/pan/volume, one audition at a time. Clicking the track
//! that is already auditioning toggles it off; auditioning a different
//! track replaces the current one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::source::{TrackLoader, TrackSource};

/// Audition state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewState {
    #[default]
    Idle,
    Playing,
}

struct PreviewShared {
    source: TrackSource,
    done: bool,
}

/// One-shot audition player. At most one preview runs at a time.
#[derive(Default)]
pub struct PreviewPlayer {
    shared: Option<Arc<Mutex<PreviewShared>>>,
    stream: Option<cpal::Stream>,
    current: Option<PathBuf>,
}

impl PreviewPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PreviewState {
        if self.is_playing() {
            PreviewState::Playing
        } else {
            PreviewState::Idle
        }
    }

    /// Whether an audition is currently sounding
    pub fn is_playing(&self) -> bool {
        self.shared
            .as_ref()
            .map(|shared| !shared.lock().done)
            .unwrap_or(false)
    }

    /// Path of the track being auditioned, if any
    pub fn current(&self) -> Option<&Path> {
        if self.is_playing() {
            self.current.as_deref()
        } else {
            None
        }
    }

    /// Audition a track.
    ///
    /// The same path while already auditioning toggles the preview off; a
    /// different path stops the current audition first. Returns whether a
    /// preview is sounding after the call.
    pub fn preview(&mut self, path: &Path) -> bool {
        if self.is_playing() && self.current.as_deref() == Some(path) {
            self.stop();
            return false;
        }
        self.stop();

        match self.start(path) {
            Ok(()) => {
                debug!(path = %path.display(), "preview started");
                self.current = Some(path.to_path_buf());
                true
            }
            Err(message) => {
                warn!("cannot preview {}: {message}", path.display());
                false
            }
        }
    }

    /// Stop any running audition and return to Idle
    pub fn stop(&mut self) {
        self.stream = None;
        self.shared = None;
        self.current = None;
    }

    fn start(&mut self, path: &Path) -> Result<(), String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| "no audio output device".to_string())?;
        let config = device.default_output_config().map_err(|e| e.to_string())?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        let track = TrackLoader::with_sample_rate(sample_rate)
            .load(path)
            .map_err(|e| e.to_string())?;

        let shared = Arc::new(Mutex::new(PreviewShared {
            source: TrackSource::new(track),
            done: false,
        }));
        let shared_for_callback = Arc::clone(&shared);

        let mut scratch = vec![0.0f32; 16384];

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    data.fill(0.0);
                    let Some(mut shared) = shared_for_callback.try_lock() else {
                        return;
                    };
                    if shared.done {
                        return;
                    }
                    let frames = data.len() / channels;
                    if channels == 2 {
                        let produced = shared.source.read(data);
                        if produced < frames {
                            shared.done = true;
                        }
                    } else {
                        let stereo = &mut scratch[..(frames * 2).min(16384)];
                        let produced = shared.source.read(stereo);
                        for f in 0..produced {
                            let base = f * channels;
                            if channels == 1 {
                                data[f] = (stereo[f * 2] + stereo[f * 2 + 1]) * 0.5;
                            } else {
                                data[base] = stereo[f * 2];
                                data[base + 1] = stereo[f * 2 + 1];
                            }
                        }
                        if produced < frames {
                            shared.done = true;
                        }
                    }
                },
                |err| {
                    warn!("preview stream error: {err}");
                },
                None,
            )
            .map_err(|e| e.to_string())?;

        stream.play().map_err(|e| e.to_string())?;

        self.shared = Some(shared);
        self.stream = Some(stream);
        Ok(())
    }
}
