//! Playback engine - the control surface over one performance session
//!
//! One engine instance drives the live performance context. It owns the
//! decoder/transform/mixer pipeline and the device stream exclusively; both
//! are torn down and recreated wholesale on every open. Operational failures
//! (bad file, busy device) come back as `false`, never as panics, so a
//! remote control layer can degrade gracefully.

use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::output::OutputSink;
use crate::player::{EngineEvent, Player, StatusSnapshot};
use crate::session::TransportMode;
use crate::source::{TrackLoader, TrackSource};

/// The playback control surface.
///
/// All state-mutating calls are expected from a single control thread; the
/// device callback thread only ever reaches the shared player through its
/// mutex. The engine holds the cpal stream, so it must stay on the thread
/// that created it.
pub struct PlaybackEngine {
    player: Arc<Mutex<Player>>,
    sink: Option<OutputSink>,
    event_rx: Receiver<EngineEvent>,
}

impl PlaybackEngine {
    pub fn new(config: &EngineConfig) -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            player: Arc::new(Mutex::new(Player::new(config, event_tx))),
            sink: None,
            event_rx,
        }
    }

    /// Subscribe to transport changes and finished notifications.
    /// Receivers are independent; each sees every event from clone time on.
    pub fn events(&self) -> Receiver<EngineEvent> {
        self.event_rx.clone()
    }

    /// Open a source file for performance.
    ///
    /// Always safe to call: any current source and device stream are torn
    /// down first. On success the session is Stopped at position zero; on
    /// any failure it is cleanly Unloaded and `false` is returned.
    pub fn open(&mut self, path: &Path) -> bool {
        self.player.lock().stop();
        self.sink = None;

        let sample_rate = match OutputSink::device_sample_rate() {
            Ok(rate) => rate,
            Err(err) => {
                warn!("cannot open {}: {err}", path.display());
                self.player.lock().unload();
                return false;
            }
        };

        let track = match TrackLoader::with_sample_rate(sample_rate).load(path) {
            Ok(track) => track,
            Err(err) => {
                warn!("cannot open {}: {err}", path.display());
                self.player.lock().unload();
                return false;
            }
        };

        self.player
            .lock()
            .load(TrackSource::new(track), path.to_path_buf());

        match OutputSink::start(Arc::clone(&self.player)) {
            Ok(sink) => {
                info!(path = %path.display(), "source opened");
                self.sink = Some(sink);
                true
            }
            Err(err) => {
                warn!("cannot start output for {}: {err}", path.display());
                self.player.lock().unload();
                false
            }
        }
    }

    /// Close any open source and return to Unloaded
    pub fn close(&mut self) {
        self.sink = None;
        self.player.lock().unload();
    }

    /// Start or resume playback. Valid from Stopped or Paused; a refused
    /// call (wrong mode, no source, device failure) returns `false` and
    /// leaves the mode unchanged.
    pub fn play(&mut self) -> bool {
        let Some(sink) = &self.sink else {
            return false;
        };
        if !self.player.lock().session().can_play() {
            return false;
        }
        if let Err(err) = sink.resume() {
            warn!("cannot resume output: {err}");
            return false;
        }
        self.player.lock().play()
    }

    /// Pause playback, keeping position. Valid only from Playing.
    pub fn pause(&mut self) -> bool {
        self.player.lock().pause()
    }

    /// Stop playback and rewind to the start. Valid from Playing or Paused.
    pub fn stop(&mut self) -> bool {
        self.player.lock().stop()
    }

    /// Seek by 0-1000 scrub value; ignored when no source is open
    pub fn seek_thousandths(&mut self, value: u32) {
        self.player.lock().seek_thousandths(value);
    }

    /// Seek to an absolute frame in the untransformed stream
    pub fn seek_frames(&mut self, frame: u64) {
        self.player.lock().seek_frames(frame);
    }

    // Parameter setters clamp silently and apply in any mode, including
    // Unloaded, where they carry over to the next open.

    pub fn set_tempo_percent(&mut self, percent: f32) {
        self.player.lock().set_tempo_percent(percent);
    }

    pub fn set_pitch_semitones(&mut self, semitones: i32) {
        self.player.lock().set_pitch_semitones(semitones);
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.player.lock().set_pan(pan);
    }

    /// Volume on the internal 0.0-1.0 scale
    pub fn set_volume(&mut self, volume: f32) {
        self.player.lock().set_volume(volume);
    }

    /// Volume on the 0-100 control scale
    pub fn set_volume_api(&mut self, volume: f32) {
        self.player.lock().set_volume_api(volume);
    }

    // --- queries ---

    pub fn transport_mode(&self) -> TransportMode {
        self.player.lock().session().mode()
    }

    pub fn can_play(&self) -> bool {
        self.player.lock().session().can_play()
    }

    pub fn can_pause(&self) -> bool {
        self.player.lock().session().can_pause()
    }

    pub fn can_stop(&self) -> bool {
        self.player.lock().session().can_stop()
    }

    /// Atomic snapshot of the whole session for status reporting
    pub fn status(&self) -> StatusSnapshot {
        self.player.lock().status()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        // Stop the device before the shared player goes away
        self.sink = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_file_leaves_session_unloaded() {
        let mut engine = PlaybackEngine::new(&EngineConfig::default());
        assert!(!engine.open(Path::new("/nonexistent/missing.mp3")));

        let status = engine.status();
        assert_eq!(status.mode, TransportMode::Unloaded);
        assert_eq!(status.length_seconds, 0.0);
        assert!(status.source_path.is_none());
        assert!(!status.can_play && !status.can_pause && !status.can_stop);
    }

    #[test]
    fn transport_refuses_everything_while_unloaded() {
        let mut engine = PlaybackEngine::new(&EngineConfig::default());
        assert!(!engine.play());
        assert!(!engine.pause());
        assert!(!engine.stop());
        engine.seek_thousandths(500);
        assert_eq!(engine.status().position_thousandths, 0);
    }

    #[test]
    fn parameters_clamp_and_survive_while_unloaded() {
        let mut engine = PlaybackEngine::new(&EngineConfig::default());
        engine.set_tempo_percent(300.0);
        engine.set_pitch_semitones(20);
        engine.set_pan(-2.0);
        engine.set_volume_api(150.0);

        let status = engine.status();
        assert_eq!(status.tempo_percent, 200.0);
        assert_eq!(status.pitch_semitones, 12);
        assert_eq!(status.pan, -1.0);
        assert!((status.volume - 100.0).abs() < 1e-4);
    }
}
