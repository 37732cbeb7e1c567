//! Command definitions for the Encore control surface
//!
//! The string vocabulary matches the legacy remote-control protocol and is
//! part of the compatibility surface: verbs name a channel (transport,
//! playlist, volume, pan, tempo, pitch) and actions name the adjustment.
//! Parsing is case-insensitive and tolerant of surrounding whitespace.

use thiserror::Error;

// Accepted action strings, one set per verb
pub const TRANSPORT_PLAY: &str = "play";
pub const TRANSPORT_PAUSE: &str = "pause";
pub const TRANSPORT_STOP: &str = "stop";
pub const PLAYLIST_PREVIOUS: &str = "previous";
pub const PLAYLIST_NEXT: &str = "next";
pub const PLAYLIST_RESTART: &str = "from-the-top";
pub const VOLUME_LOUDER: &str = "louder";
pub const VOLUME_QUIETER: &str = "quieter";
pub const PAN_MORE_VOICE: &str = "more-voice";
pub const PAN_MORE_INSTRUMENT: &str = "more-instrument";
pub const TEMPO_SLOWER: &str = "slower";
pub const TEMPO_FASTER: &str = "faster";
pub const PITCH_UP: &str = "transpose-up";
pub const PITCH_DOWN: &str = "transpose-down";
pub const ACTION_RESET: &str = "reset";

/// Transport channel actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAction {
    Play,
    Pause,
    Stop,
}

/// Playlist channel actions. Track selection is owned by the caller, not the
/// engine; these parse but are handed back undispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistAction {
    Previous,
    Next,
    FromTheTop,
}

/// Volume channel actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeAction {
    Louder,
    Quieter,
    Reset,
}

/// Pan channel actions (voice vs instrument balance)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanAction {
    MoreVoice,
    MoreInstrument,
    Reset,
}

/// Tempo channel actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempoAction {
    Slower,
    Faster,
    Reset,
}

/// Pitch channel actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchAction {
    TransposeUp,
    TransposeDown,
    Reset,
}

/// A parsed control command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Transport(TransportAction),
    Playlist(PlaylistAction),
    Volume(VolumeAction),
    Pan(PanAction),
    Tempo(TempoAction),
    Pitch(PitchAction),
}

/// Errors produced while parsing command strings
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command verb: {0}")]
    UnknownVerb(String),
    #[error("Unknown action '{action}' for verb '{verb}'")]
    UnknownAction { verb: String, action: String },
    #[error("Empty command")]
    Empty,
    #[error("Ambiguous action '{0}': prefix it with a verb")]
    Ambiguous(String),
}

impl ControlCommand {
    /// Parse a verb/action pair, e.g. ("volume", "louder")
    pub fn parse(verb: &str, action: &str) -> Result<Self, CommandError> {
        let verb_norm = verb.trim().to_ascii_lowercase();
        let action_norm = action.trim().to_ascii_lowercase();

        let unknown = || CommandError::UnknownAction {
            verb: verb_norm.clone(),
            action: action_norm.clone(),
        };

        match verb_norm.as_str() {
            "transport" => match action_norm.as_str() {
                TRANSPORT_PLAY => Ok(Self::Transport(TransportAction::Play)),
                TRANSPORT_PAUSE => Ok(Self::Transport(TransportAction::Pause)),
                TRANSPORT_STOP => Ok(Self::Transport(TransportAction::Stop)),
                _ => Err(unknown()),
            },
            "playlist" => match action_norm.as_str() {
                PLAYLIST_PREVIOUS => Ok(Self::Playlist(PlaylistAction::Previous)),
                PLAYLIST_NEXT => Ok(Self::Playlist(PlaylistAction::Next)),
                PLAYLIST_RESTART => Ok(Self::Playlist(PlaylistAction::FromTheTop)),
                _ => Err(unknown()),
            },
            "volume" => match action_norm.as_str() {
                VOLUME_LOUDER => Ok(Self::Volume(VolumeAction::Louder)),
                VOLUME_QUIETER => Ok(Self::Volume(VolumeAction::Quieter)),
                ACTION_RESET => Ok(Self::Volume(VolumeAction::Reset)),
                _ => Err(unknown()),
            },
            "pan" => match action_norm.as_str() {
                PAN_MORE_VOICE => Ok(Self::Pan(PanAction::MoreVoice)),
                PAN_MORE_INSTRUMENT => Ok(Self::Pan(PanAction::MoreInstrument)),
                ACTION_RESET => Ok(Self::Pan(PanAction::Reset)),
                _ => Err(unknown()),
            },
            "tempo" => match action_norm.as_str() {
                TEMPO_SLOWER => Ok(Self::Tempo(TempoAction::Slower)),
                TEMPO_FASTER => Ok(Self::Tempo(TempoAction::Faster)),
                ACTION_RESET => Ok(Self::Tempo(TempoAction::Reset)),
                _ => Err(unknown()),
            },
            "pitch" => match action_norm.as_str() {
                PITCH_UP => Ok(Self::Pitch(PitchAction::TransposeUp)),
                PITCH_DOWN => Ok(Self::Pitch(PitchAction::TransposeDown)),
                ACTION_RESET => Ok(Self::Pitch(PitchAction::Reset)),
                _ => Err(unknown()),
            },
            _ => Err(CommandError::UnknownVerb(verb_norm)),
        }
    }

    /// Parse a whole command line, either "verb action" or a bare action
    /// whose verb is unambiguous ("louder", "play", "transpose-up", ...).
    /// A bare "reset" is rejected since every channel has one.
    pub fn parse_line(line: &str) -> Result<Self, CommandError> {
        let mut tokens = line.split_whitespace();
        let first = tokens.next().ok_or(CommandError::Empty)?;

        match tokens.next() {
            Some(second) => Self::parse(first, second),
            None => {
                let word = first.trim().to_ascii_lowercase();
                match word.as_str() {
                    TRANSPORT_PLAY | TRANSPORT_PAUSE | TRANSPORT_STOP => {
                        Self::parse("transport", &word)
                    }
                    PLAYLIST_PREVIOUS | PLAYLIST_NEXT | PLAYLIST_RESTART => {
                        Self::parse("playlist", &word)
                    }
                    VOLUME_LOUDER | VOLUME_QUIETER => Self::parse("volume", &word),
                    PAN_MORE_VOICE | PAN_MORE_INSTRUMENT => Self::parse("pan", &word),
                    TEMPO_SLOWER | TEMPO_FASTER => Self::parse("tempo", &word),
                    PITCH_UP | PITCH_DOWN => Self::parse("pitch", &word),
                    ACTION_RESET => Err(CommandError::Ambiguous(word)),
                    _ => Err(CommandError::UnknownVerb(word)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_verb_action_pair() {
        let cases = [
            ("transport", "play", ControlCommand::Transport(TransportAction::Play)),
            ("transport", "pause", ControlCommand::Transport(TransportAction::Pause)),
            ("transport", "stop", ControlCommand::Transport(TransportAction::Stop)),
            ("playlist", "previous", ControlCommand::Playlist(PlaylistAction::Previous)),
            ("playlist", "next", ControlCommand::Playlist(PlaylistAction::Next)),
            ("playlist", "from-the-top", ControlCommand::Playlist(PlaylistAction::FromTheTop)),
            ("volume", "louder", ControlCommand::Volume(VolumeAction::Louder)),
            ("volume", "quieter", ControlCommand::Volume(VolumeAction::Quieter)),
            ("volume", "reset", ControlCommand::Volume(VolumeAction::Reset)),
            ("pan", "more-voice", ControlCommand::Pan(PanAction::MoreVoice)),
            ("pan", "more-instrument", ControlCommand::Pan(PanAction::MoreInstrument)),
            ("pan", "reset", ControlCommand::Pan(PanAction::Reset)),
            ("tempo", "slower", ControlCommand::Tempo(TempoAction::Slower)),
            ("tempo", "faster", ControlCommand::Tempo(TempoAction::Faster)),
            ("tempo", "reset", ControlCommand::Tempo(TempoAction::Reset)),
            ("pitch", "transpose-up", ControlCommand::Pitch(PitchAction::TransposeUp)),
            ("pitch", "transpose-down", ControlCommand::Pitch(PitchAction::TransposeDown)),
            ("pitch", "reset", ControlCommand::Pitch(PitchAction::Reset)),
        ];
        for (verb, action, expected) in cases {
            assert_eq!(ControlCommand::parse(verb, action), Ok(expected));
        }
    }

    #[test]
    fn parsing_is_case_insensitive_and_trims() {
        assert_eq!(
            ControlCommand::parse(" Transport ", " PLAY "),
            Ok(ControlCommand::Transport(TransportAction::Play))
        );
        assert_eq!(
            ControlCommand::parse_line("  Louder "),
            Ok(ControlCommand::Volume(VolumeAction::Louder))
        );
    }

    #[test]
    fn rejects_unknown_verbs_and_actions() {
        assert_eq!(
            ControlCommand::parse("mixer", "play"),
            Err(CommandError::UnknownVerb("mixer".into()))
        );
        assert!(matches!(
            ControlCommand::parse("tempo", "bananas"),
            Err(CommandError::UnknownAction { .. })
        ));
        assert_eq!(
            ControlCommand::parse_line(""),
            Err(CommandError::Empty)
        );
    }

    #[test]
    fn bare_words_resolve_unambiguous_verbs() {
        assert_eq!(
            ControlCommand::parse_line("play"),
            Ok(ControlCommand::Transport(TransportAction::Play))
        );
        assert_eq!(
            ControlCommand::parse_line("transpose-up"),
            Ok(ControlCommand::Pitch(PitchAction::TransposeUp))
        );
        assert_eq!(
            ControlCommand::parse_line("next"),
            Ok(ControlCommand::Playlist(PlaylistAction::Next))
        );
        assert_eq!(
            ControlCommand::parse_line("reset"),
            Err(CommandError::Ambiguous("reset".into()))
        );
        assert_eq!(
            ControlCommand::parse_line("volume reset"),
            Ok(ControlCommand::Volume(VolumeAction::Reset))
        );
    }
}
