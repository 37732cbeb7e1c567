//! Audio engine for Encore - playback session, transform pipeline, output
//!
//! This crate provides the core playback pipeline for live performance:
//! - Session: transport state machine and position/duration arithmetic
//! - Source: Symphonia-backed decoding to a seekable PCM stream
//! - Stretch: independent tempo and pitch transform (time-domain)
//! - Mixer: per-frame pan and volume gains
//! - Output: cpal device sink pulling from the shared player
//! - Engine: the control surface consumed by UI and remote control layers
//! - Preview: a minimal secondary player for track auditions

mod config;
mod engine;
mod mixer;
mod output;
mod player;
mod preview;
mod session;
mod source;
mod stretch;

pub use config::EngineConfig;
pub use engine::PlaybackEngine;
pub use mixer::ChannelMixer;
pub use output::{DeviceError, OutputSink};
pub use player::{EngineEvent, Player, StatusSnapshot};
pub use preview::{PreviewPlayer, PreviewState};
pub use session::{
    PlaybackSession, TransportMode, API_VOLUME_CEILING, PAN_CEILING, PAN_DEFAULT, PAN_FLOOR,
    PITCH_CEILING, PITCH_DEFAULT, PITCH_FLOOR, TEMPO_CEILING, TEMPO_DEFAULT, TEMPO_FLOOR,
    VOLUME_CEILING, VOLUME_FLOOR,
};
pub use source::{DecodedTrack, LoadError, TrackLoader, TrackSource};
pub use stretch::TimeStretcher;
