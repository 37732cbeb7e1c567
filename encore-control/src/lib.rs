//! Control surface adapter for Encore
//!
//! Translates the named remote-control vocabulary (play/pause/stop,
//! louder/quieter, more-voice/more-instrument, slower/faster,
//! transpose-up/transpose-down, reset) into calls on the playback engine.
//! The adapter owns no playback state; playlist navigation is handed back
//! to the caller.

mod commands;
mod surface;

pub use commands::{
    CommandError, ControlCommand, PanAction, PitchAction, PlaylistAction, TempoAction,
    TransportAction, VolumeAction,
};
pub use surface::{ControlSurface, Dispatch};
