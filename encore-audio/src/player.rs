//! Transport core - owns the pipeline and enforces the state machine
//!
//! All mutation goes through one `Player` behind a mutex: the control thread
//! issues transport and parameter calls, the audio callback calls `render`.
//! Whichever side takes the lock first at end-of-stream wins; the loser's
//! transition is a guarded no-op, so the finished notification can never
//! double-fire.

use std::path::PathBuf;

use crossbeam_channel::Sender;
use tracing::info;

use crate::config::EngineConfig;
use crate::mixer::ChannelMixer;
use crate::session::{PlaybackSession, TransportMode};
use crate::source::TrackSource;
use crate::stretch::TimeStretcher;

/// Status changes emitted by the engine.
///
/// Consumers subscribe through a channel receiver rather than ad-hoc event
/// hooks; the engine never calls back into its callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Fired on every transport transition, including re-entry into the
    /// same mode (e.g. opening a file while already stopped)
    TransportModeChanged(TransportMode),
    /// Fired exactly once per natural end of stream, never on explicit Stop
    PlaybackFinished,
}

/// Point-in-time view of the session for status reporting
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub mode: TransportMode,
    pub source_path: Option<PathBuf>,
    pub position_seconds: f64,
    pub effective_position_seconds: f64,
    pub remaining_seconds: f64,
    pub effective_remaining_seconds: f64,
    pub position_thousandths: u32,
    pub length_seconds: f64,
    pub tempo_percent: f32,
    pub pitch_semitones: i32,
    pub pan: f32,
    /// Volume on the 0-100 control scale
    pub volume: f32,
    pub can_play: bool,
    pub can_pause: bool,
    pub can_stop: bool,
}

/// Decoder -> transform -> mixer chain, rebuilt wholesale on every open
struct Pipeline {
    source: TrackSource,
    stretch: TimeStretcher,
    mix: ChannelMixer,
}

impl Pipeline {
    fn new(source: TrackSource) -> Self {
        let stretch = TimeStretcher::new(source.sample_rate());
        Self {
            source,
            stretch,
            mix: ChannelMixer::new(),
        }
    }

    /// Render transformed, mixed frames; returns frames written
    fn render(&mut self, out: &mut [f32]) -> usize {
        let frames = self.stretch.pull(&mut self.source, out);
        self.mix.process(&mut out[..frames * 2]);
        frames
    }

    fn finished(&self) -> bool {
        self.source.is_exhausted() && self.stretch.is_drained()
    }

    fn seek_to_frame(&mut self, frame: u64) {
        self.source.seek_to_frame(frame);
        self.stretch.reset();
    }

    fn position_frames(&self) -> u64 {
        self.source.position_frames()
    }
}

/// The playback engine core: session state plus the owned pipeline.
///
/// Exclusively owned by one `PlaybackEngine`; shared with the audio callback
/// only behind a mutex.
pub struct Player {
    session: PlaybackSession,
    pipeline: Option<Pipeline>,
    event_tx: Sender<EngineEvent>,
}

impl Player {
    pub fn new(config: &EngineConfig, event_tx: Sender<EngineEvent>) -> Self {
        Self {
            session: PlaybackSession::new(config.pan_default, config.volume_default_internal()),
            pipeline: None,
            event_tx,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// Install a freshly decoded source and enter Stopped.
    /// Current tempo/pitch/pan/volume settings are pushed into the new
    /// pipeline immediately.
    pub fn load(&mut self, source: TrackSource, path: PathBuf) {
        let length = source.total_frames();
        let rate = source.sample_rate();

        let mut pipeline = Pipeline::new(source);
        pipeline
            .stretch
            .set_tempo_percent(self.session.tempo_percent());
        pipeline
            .stretch
            .set_pitch_semitones(self.session.pitch_semitones());
        pipeline.mix.set_pan(self.session.pan());
        pipeline.mix.set_volume(self.session.volume());

        info!(path = %path.display(), frames = length, rate, "source loaded");
        self.pipeline = Some(pipeline);
        self.session.set_loaded(path, length, rate);
        self.set_mode(TransportMode::Stopped);
    }

    /// Tear down the pipeline and return to Unloaded.
    /// Parameters survive and apply to the next open.
    pub fn unload(&mut self) {
        self.pipeline = None;
        self.session.set_unloaded();
        self.set_mode(TransportMode::Unloaded);
    }

    pub fn play(&mut self) -> bool {
        if !self.session.can_play() || self.pipeline.is_none() {
            return false;
        }
        self.set_mode(TransportMode::Playing);
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.session.can_pause() {
            return false;
        }
        self.set_mode(TransportMode::Paused);
        true
    }

    pub fn stop(&mut self) -> bool {
        if !self.session.can_stop() {
            return false;
        }
        if let Some(pipeline) = &mut self.pipeline {
            pipeline.seek_to_frame(0);
        }
        self.session.set_position_frames(0);
        self.set_mode(TransportMode::Stopped);
        true
    }

    /// Reposition within the open source; ignored when unloaded.
    /// Transport mode is unchanged.
    pub fn seek_frames(&mut self, frame: u64) {
        let Some(pipeline) = &mut self.pipeline else {
            return;
        };
        let clamped = frame.min(self.session.length_frames());
        pipeline.seek_to_frame(clamped);
        self.session.set_position_frames(clamped);
    }

    /// Seek by 0-1000 scrub value; ignored when unloaded
    pub fn seek_thousandths(&mut self, value: u32) {
        if self.pipeline.is_none() {
            return;
        }
        let frame = self.session.frames_for_thousandths(value);
        self.seek_frames(frame);
    }

    // Parameter setters clamp and forward to the live pipeline so the next
    // rendered frame reflects them. They are accepted in every mode,
    // including Unloaded, where they become the defaults for the next open.

    pub fn set_tempo_percent(&mut self, percent: f32) {
        self.session.set_tempo_percent(percent);
        if let Some(pipeline) = &mut self.pipeline {
            pipeline
                .stretch
                .set_tempo_percent(self.session.tempo_percent());
        }
    }

    pub fn set_pitch_semitones(&mut self, semitones: i32) {
        self.session.set_pitch_semitones(semitones);
        if let Some(pipeline) = &mut self.pipeline {
            pipeline
                .stretch
                .set_pitch_semitones(self.session.pitch_semitones());
        }
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.session.set_pan(pan);
        if let Some(pipeline) = &mut self.pipeline {
            pipeline.mix.set_pan(self.session.pan());
        }
    }

    /// Volume on the internal 0.0-1.0 scale
    pub fn set_volume(&mut self, volume: f32) {
        self.session.set_volume(volume);
        if let Some(pipeline) = &mut self.pipeline {
            pipeline.mix.set_volume(self.session.volume());
        }
    }

    /// Volume on the 0-100 control scale
    pub fn set_volume_api(&mut self, volume: f32) {
        self.session.set_volume_api(volume);
        if let Some(pipeline) = &mut self.pipeline {
            pipeline.mix.set_volume(self.session.volume());
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            mode: self.session.mode(),
            source_path: self.session.source_path().cloned(),
            position_seconds: self.session.position_seconds(),
            effective_position_seconds: self.session.effective_position_seconds(),
            remaining_seconds: self.session.remaining_seconds(),
            effective_remaining_seconds: self.session.effective_remaining_seconds(),
            position_thousandths: self.session.position_thousandths(),
            length_seconds: self.session.length_seconds(),
            tempo_percent: self.session.tempo_percent(),
            pitch_semitones: self.session.pitch_semitones(),
            pan: self.session.pan(),
            volume: self.session.volume_api(),
            can_play: self.session.can_play(),
            can_pause: self.session.can_pause(),
            can_stop: self.session.can_stop(),
        }
    }

    /// Fill an interleaved stereo buffer for the output device.
    ///
    /// Called from the audio thread under the shared lock. Renders silence
    /// unless Playing. On natural end of stream the position rewinds, the
    /// finished event fires, and the mode drops to Stopped - all before the
    /// lock is released, so a racing Stop() sees a consistent session.
    pub fn render(&mut self, out: &mut [f32]) {
        if self.session.mode() != TransportMode::Playing {
            out.fill(0.0);
            return;
        }
        let Some(pipeline) = self.pipeline.as_mut() else {
            out.fill(0.0);
            return;
        };

        let want = out.len() / 2;
        let frames = pipeline.render(out);
        if frames < want {
            out[frames * 2..].fill(0.0);
        }
        self.session.set_position_frames(pipeline.position_frames());

        if frames < want && pipeline.finished() {
            pipeline.seek_to_frame(0);
            self.session.set_position_frames(0);
            let _ = self.event_tx.send(EngineEvent::PlaybackFinished);
            self.set_mode(TransportMode::Stopped);
        }
    }

    /// Record the new mode and notify subscribers
    fn set_mode(&mut self, mode: TransportMode) {
        self.session.set_mode(mode);
        let _ = self.event_tx.send(EngineEvent::TransportModeChanged(mode));
    }
}
