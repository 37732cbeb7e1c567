//! Dispatches parsed commands onto the playback engine
//!
//! The surface owns no playback state: every adjustment reads the current
//! value from the engine, steps it by the configured increment, and writes
//! it back through the clamping setters. Playlist commands are returned to
//! the caller, which owns track selection.

use encore_audio::{
    EngineConfig, PlaybackEngine, PITCH_DEFAULT, TEMPO_DEFAULT,
};

use crate::commands::{
    ControlCommand, PanAction, PitchAction, PlaylistAction, TempoAction, TransportAction,
    VolumeAction,
};

/// Result of dispatching one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The command was applied to the engine; for transport commands the
    /// flag carries the engine's success indicator, for parameter commands
    /// it is always true (setters clamp, they cannot fail).
    Applied(bool),
    /// A playlist command the caller must handle itself
    Playlist(PlaylistAction),
}

/// Translates named commands into engine calls
pub struct ControlSurface {
    config: EngineConfig,
}

impl ControlSurface {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply one command to the engine
    pub fn dispatch(&self, engine: &mut PlaybackEngine, command: ControlCommand) -> Dispatch {
        match command {
            ControlCommand::Transport(action) => {
                let ok = match action {
                    TransportAction::Play => engine.play(),
                    TransportAction::Pause => engine.pause(),
                    TransportAction::Stop => engine.stop(),
                };
                Dispatch::Applied(ok)
            }

            ControlCommand::Playlist(action) => Dispatch::Playlist(action),

            ControlCommand::Volume(action) => {
                let current = engine.status().volume;
                match action {
                    VolumeAction::Louder => {
                        engine.set_volume_api(current + self.config.volume_increment)
                    }
                    VolumeAction::Quieter => {
                        engine.set_volume_api(current - self.config.volume_increment)
                    }
                    VolumeAction::Reset => engine.set_volume_api(self.config.volume_default),
                }
                Dispatch::Applied(true)
            }

            ControlCommand::Pan(action) => {
                let current = engine.status().pan;
                match action {
                    PanAction::MoreVoice => engine.set_pan(current + self.config.pan_increment),
                    PanAction::MoreInstrument => {
                        engine.set_pan(current - self.config.pan_increment)
                    }
                    PanAction::Reset => engine.set_pan(self.config.pan_default),
                }
                Dispatch::Applied(true)
            }

            ControlCommand::Tempo(action) => {
                let current = engine.status().tempo_percent;
                match action {
                    TempoAction::Slower => {
                        engine.set_tempo_percent(current - self.config.tempo_increment)
                    }
                    TempoAction::Faster => {
                        engine.set_tempo_percent(current + self.config.tempo_increment)
                    }
                    TempoAction::Reset => engine.set_tempo_percent(TEMPO_DEFAULT),
                }
                Dispatch::Applied(true)
            }

            ControlCommand::Pitch(action) => {
                let current = engine.status().pitch_semitones;
                match action {
                    PitchAction::TransposeUp => {
                        engine.set_pitch_semitones(current + self.config.pitch_increment)
                    }
                    PitchAction::TransposeDown => {
                        engine.set_pitch_semitones(current - self.config.pitch_increment)
                    }
                    PitchAction::Reset => engine.set_pitch_semitones(PITCH_DEFAULT),
                }
                Dispatch::Applied(true)
            }
        }
    }
}
