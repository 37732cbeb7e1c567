//! Playback session - transport mode and position/duration bookkeeping

use std::path::PathBuf;

/// Hard floor for pitch transposition, in semitones
pub const PITCH_FLOOR: i32 = -12;
/// Default pitch transposition
pub const PITCH_DEFAULT: i32 = 0;
/// Hard ceiling for pitch transposition, in semitones
pub const PITCH_CEILING: i32 = 12;
/// Hard floor for tempo, in percent of original speed
pub const TEMPO_FLOOR: f32 = 50.0;
/// Default tempo (original speed)
pub const TEMPO_DEFAULT: f32 = 100.0;
/// Hard ceiling for tempo, in percent of original speed
pub const TEMPO_CEILING: f32 = 200.0;
/// Hard floor for pan (fully one channel)
pub const PAN_FLOOR: f32 = -1.0;
/// Fallback pan when no configured default applies
pub const PAN_DEFAULT: f32 = 0.0;
/// Hard ceiling for pan (fully the other channel)
pub const PAN_CEILING: f32 = 1.0;
/// Hard floor for volume (internal 0.0-1.0 scale)
pub const VOLUME_FLOOR: f32 = 0.0;
/// Hard ceiling for volume (internal 0.0-1.0 scale)
pub const VOLUME_CEILING: f32 = 1.0;
/// Volume ceiling on the external control scale (0-100)
pub const API_VOLUME_CEILING: f32 = 100.0;

/// Transport state of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// No source is open
    #[default]
    Unloaded,
    Stopped,
    Playing,
    Paused,
}

/// Live state of one playback session.
///
/// Holds the transport mode, the clamped performance parameters, and the
/// position/length of the open source in *untransformed* frames. All derived
/// time values are computed on demand from `(position, length, tempo)` so
/// they can never drift apart.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    mode: TransportMode,
    source_path: Option<PathBuf>,
    tempo_percent: f32,
    pitch_semitones: i32,
    pan: f32,
    volume: f32,
    /// Current offset into the untransformed decoded stream, in frames
    position_frames: u64,
    /// Total frames in the untransformed decoded stream; 0 when unloaded
    length_frames: u64,
    sample_rate: u32,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(PAN_DEFAULT, 0.5)
    }
}

impl PlaybackSession {
    /// Create an empty (Unloaded) session with the given pan/volume defaults.
    /// Volume is on the internal 0.0-1.0 scale.
    pub fn new(pan_default: f32, volume_default: f32) -> Self {
        Self {
            mode: TransportMode::Unloaded,
            source_path: None,
            tempo_percent: TEMPO_DEFAULT,
            pitch_semitones: PITCH_DEFAULT,
            pan: pan_default.clamp(PAN_FLOOR, PAN_CEILING),
            volume: volume_default.clamp(VOLUME_FLOOR, VOLUME_CEILING),
            position_frames: 0,
            length_frames: 0,
            sample_rate: 0,
        }
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: TransportMode) {
        self.mode = mode;
    }

    pub fn source_path(&self) -> Option<&PathBuf> {
        self.source_path.as_ref()
    }

    /// Record a freshly opened source. Resets position, keeps parameters.
    pub(crate) fn set_loaded(&mut self, path: PathBuf, length_frames: u64, sample_rate: u32) {
        self.source_path = Some(path);
        self.length_frames = length_frames;
        self.sample_rate = sample_rate;
        self.position_frames = 0;
    }

    /// Clear the source. Parameters survive so they apply to the next open.
    pub(crate) fn set_unloaded(&mut self) {
        self.source_path = None;
        self.length_frames = 0;
        self.sample_rate = 0;
        self.position_frames = 0;
    }

    // --- parameters (setters clamp, never reject) ---

    pub fn tempo_percent(&self) -> f32 {
        self.tempo_percent
    }

    pub fn set_tempo_percent(&mut self, percent: f32) {
        self.tempo_percent = percent.clamp(TEMPO_FLOOR, TEMPO_CEILING);
    }

    pub fn pitch_semitones(&self) -> i32 {
        self.pitch_semitones
    }

    pub fn set_pitch_semitones(&mut self, semitones: i32) {
        self.pitch_semitones = semitones.clamp(PITCH_FLOOR, PITCH_CEILING);
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.pan = pan.clamp(PAN_FLOOR, PAN_CEILING);
    }

    /// Volume on the internal 0.0-1.0 scale
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(VOLUME_FLOOR, VOLUME_CEILING);
    }

    /// Volume on the external 0-100 control scale
    pub fn volume_api(&self) -> f32 {
        self.volume * API_VOLUME_CEILING
    }

    pub fn set_volume_api(&mut self, volume: f32) {
        self.set_volume(volume / API_VOLUME_CEILING);
    }

    // --- position/length ---

    pub fn position_frames(&self) -> u64 {
        self.position_frames
    }

    pub(crate) fn set_position_frames(&mut self, frames: u64) {
        self.position_frames = frames.min(self.length_frames);
    }

    pub fn length_frames(&self) -> u64 {
        self.length_frames
    }

    /// Length of the open source in seconds at original tempo; 0 when unloaded
    pub fn length_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.length_frames as f64 / self.sample_rate as f64
    }

    /// Nominal position in seconds, independent of tempo
    pub fn position_seconds(&self) -> f64 {
        if self.length_frames == 0 {
            return 0.0;
        }
        (self.position_frames as f64 / self.length_frames as f64) * self.length_seconds()
    }

    /// Wall-clock position in seconds at the current tempo.
    /// At 200% tempo the same nominal position is reached in half the time.
    pub fn effective_position_seconds(&self) -> f64 {
        self.position_seconds() / self.tempo_ratio()
    }

    /// Nominal seconds left at original tempo, never negative
    pub fn remaining_seconds(&self) -> f64 {
        (self.length_seconds() - self.position_seconds()).max(0.0)
    }

    /// Wall-clock seconds left at the current tempo
    pub fn effective_remaining_seconds(&self) -> f64 {
        self.remaining_seconds() / self.tempo_ratio()
    }

    /// Position as 0-1000 progress units for a scrub bar.
    /// Deliberately tempo-independent so the bar reads the same at any speed.
    pub fn position_thousandths(&self) -> u32 {
        if self.length_frames == 0 {
            return 0;
        }
        let progress = (self.position_frames as f64 * 1000.0) / self.length_frames as f64;
        progress.round() as u32
    }

    /// Convert a 0-1000 scrub value to a frame offset, clamped to the stream
    pub fn frames_for_thousandths(&self, value: u32) -> u64 {
        let value = value.min(1000) as f64;
        let frames = (value / 1000.0) * self.length_frames as f64;
        (frames.round() as u64).min(self.length_frames)
    }

    fn tempo_ratio(&self) -> f64 {
        self.tempo_percent as f64 / 100.0
    }

    // --- derived transport predicates ---

    /// Whether a Play command makes sense in the current mode
    pub fn can_play(&self) -> bool {
        self.mode == TransportMode::Stopped || self.mode == TransportMode::Paused
    }

    /// Whether a Pause command makes sense in the current mode
    pub fn can_pause(&self) -> bool {
        self.mode == TransportMode::Playing
    }

    /// Whether a Stop command makes sense in the current mode
    pub fn can_stop(&self) -> bool {
        self.mode == TransportMode::Playing || self.mode == TransportMode::Paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_session() -> PlaybackSession {
        let mut session = PlaybackSession::new(0.0, 0.7);
        session.set_loaded(PathBuf::from("/music/track.mp3"), 480_000, 48_000);
        session.set_mode(TransportMode::Stopped);
        session
    }

    #[test]
    fn tempo_clamps_to_hard_limits() {
        let mut session = PlaybackSession::default();
        for raw in [0.0, 10.0, 49.9, 50.0, 100.0, 200.0, 250.0, 300.0] {
            session.set_tempo_percent(raw);
            assert!(session.tempo_percent() >= TEMPO_FLOOR);
            assert!(session.tempo_percent() <= TEMPO_CEILING);
        }
        session.set_tempo_percent(130.0);
        session.set_tempo_percent(130.0);
        assert_eq!(session.tempo_percent(), 130.0);
    }

    #[test]
    fn pitch_clamps_to_hard_limits() {
        let mut session = PlaybackSession::default();
        for raw in -20..=20 {
            session.set_pitch_semitones(raw);
            assert!(session.pitch_semitones() >= PITCH_FLOOR);
            assert!(session.pitch_semitones() <= PITCH_CEILING);
        }
        session.set_pitch_semitones(-20);
        assert_eq!(session.pitch_semitones(), -12);
        session.set_pitch_semitones(20);
        assert_eq!(session.pitch_semitones(), 12);
    }

    #[test]
    fn pan_and_volume_clamp() {
        let mut session = PlaybackSession::default();
        session.set_pan(-3.0);
        assert_eq!(session.pan(), -1.0);
        session.set_pan(3.0);
        assert_eq!(session.pan(), 1.0);
        session.set_volume(1.5);
        assert_eq!(session.volume(), 1.0);
        session.set_volume(-0.5);
        assert_eq!(session.volume(), 0.0);
        session.set_volume_api(70.0);
        assert!((session.volume() - 0.7).abs() < 1e-6);
        assert!((session.volume_api() - 70.0).abs() < 1e-4);
    }

    #[test]
    fn position_seconds_guards_empty_stream() {
        let session = PlaybackSession::default();
        assert_eq!(session.position_seconds(), 0.0);
        assert_eq!(session.remaining_seconds(), 0.0);
        assert_eq!(session.position_thousandths(), 0);
    }

    #[test]
    fn effective_position_scales_inversely_with_tempo() {
        let mut session = loaded_session();
        session.set_position_frames(240_000); // halfway, 5.0s nominal

        session.set_tempo_percent(100.0);
        let nominal = session.position_seconds();
        assert!((nominal - 5.0).abs() < 1e-9);
        assert!((session.effective_position_seconds() - nominal).abs() < 1e-9);

        session.set_tempo_percent(200.0);
        assert!((session.effective_position_seconds() - nominal / 2.0).abs() < 1e-9);

        session.set_tempo_percent(50.0);
        assert!((session.effective_position_seconds() - nominal * 2.0).abs() < 1e-9);
    }

    #[test]
    fn effective_remaining_scales_inversely_with_tempo() {
        let mut session = loaded_session();
        session.set_position_frames(120_000); // 2.5s in, 7.5s left

        session.set_tempo_percent(200.0);
        assert!((session.remaining_seconds() - 7.5).abs() < 1e-9);
        assert!((session.effective_remaining_seconds() - 3.75).abs() < 1e-9);
    }

    #[test]
    fn thousandths_round_trip() {
        let mut session = loaded_session();
        for value in [0u32, 250, 500, 750, 1000] {
            let frames = session.frames_for_thousandths(value);
            session.set_position_frames(frames);
            let read_back = session.position_thousandths();
            assert!(
                (read_back as i64 - value as i64).abs() <= 1,
                "wanted {} got {}",
                value,
                read_back
            );
        }
        assert_eq!(
            session.frames_for_thousandths(1000),
            session.length_frames()
        );
        assert_eq!(session.frames_for_thousandths(2000), session.length_frames());
    }

    #[test]
    fn transport_predicates_follow_mode() {
        let mut session = loaded_session();

        session.set_mode(TransportMode::Stopped);
        assert!(session.can_play() && !session.can_pause() && !session.can_stop());

        session.set_mode(TransportMode::Playing);
        assert!(!session.can_play() && session.can_pause() && session.can_stop());

        session.set_mode(TransportMode::Paused);
        assert!(session.can_play() && !session.can_pause() && session.can_stop());

        session.set_mode(TransportMode::Unloaded);
        assert!(!session.can_play() && !session.can_pause() && !session.can_stop());
    }

    #[test]
    fn unload_clears_source_but_keeps_parameters() {
        let mut session = loaded_session();
        session.set_tempo_percent(150.0);
        session.set_pitch_semitones(3);
        session.set_unloaded();
        session.set_mode(TransportMode::Unloaded);

        assert_eq!(session.length_frames(), 0);
        assert!(session.source_path().is_none());
        assert_eq!(session.tempo_percent(), 150.0);
        assert_eq!(session.pitch_semitones(), 3);
    }
}
