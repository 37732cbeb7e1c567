//! Engine configuration - defaults and step sizes for the control surface
//!
//! Settings are provided by the host application at startup; nothing here is
//! persisted by the engine itself.

use crate::session;

/// Defaults and increments used when the engine is driven by named commands
/// (louder/quieter, more-voice/more-instrument, slower/faster, transpose-up/down).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Startup volume on the 0-100 control scale
    pub volume_default: f32,
    /// Volume step per louder/quieter command, 0-100 scale
    pub volume_increment: f32,
    /// Startup pan position
    pub pan_default: f32,
    /// Pan step per more-voice/more-instrument command
    pub pan_increment: f32,
    /// Tempo step per slower/faster command, in percent points
    pub tempo_increment: f32,
    /// Pitch step per transpose command, in semitones
    pub pitch_increment: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            volume_default: 70.0,
            volume_increment: 5.0,
            pan_default: session::PAN_DEFAULT,
            pan_increment: 0.1,
            tempo_increment: 5.0,
            pitch_increment: 1,
        }
    }
}

impl EngineConfig {
    /// Startup volume converted to the internal 0.0-1.0 scale
    pub fn volume_default_internal(&self) -> f32 {
        (self.volume_default / session::API_VOLUME_CEILING)
            .clamp(session::VOLUME_FLOOR, session::VOLUME_CEILING)
    }
}
