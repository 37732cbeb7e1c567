//! Encore - live performance audio player
//!
//! Line-oriented console front end over the playback engine: open a track,
//! drive the transport with the remote-control vocabulary, audition tracks
//! with the preview player. Typing `help` lists the commands.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::Result;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use encore_audio::{EngineConfig, EngineEvent, PlaybackEngine, PreviewPlayer, TransportMode};
use encore_control::{CommandError, ControlCommand, ControlSurface, Dispatch, PlaylistAction};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = EngineConfig::default();
    let mut engine = PlaybackEngine::new(&config);
    let mut preview = PreviewPlayer::new();
    let surface = ControlSurface::new(config);

    // Print transport changes and finished notifications as they happen
    let events = engine.events();
    let event_printer = thread::spawn(move || {
        while let Ok(event) = events.recv() {
            match event {
                EngineEvent::TransportModeChanged(mode) => {
                    println!("* transport: {}", mode_name(mode));
                }
                EngineEvent::PlaybackFinished => {
                    println!("* playback finished");
                }
            }
        }
    });

    // Open a track straight away if one was given on the command line
    if let Some(arg) = std::env::args().nth(1) {
        open_track(&mut engine, Path::new(&arg));
    }

    println!("encore - type 'help' for commands");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = stdin.lock().lines().next() else {
            break;
        };
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut tokens = trimmed.split_whitespace();
        let head = tokens.next().unwrap_or_default().to_ascii_lowercase();

        match head.as_str() {
            "quit" | "exit" => break,
            "help" => print_help(),
            "open" => match rest_as_path(trimmed, "open") {
                Some(path) => open_track(&mut engine, &path),
                None => println!("usage: open <file>"),
            },
            "preview" => match rest_as_path(trimmed, "preview") {
                Some(path) => {
                    if preview.preview(&path) {
                        println!("previewing {}", path.display());
                    } else {
                        println!("preview stopped");
                    }
                }
                None => println!("usage: preview <file>"),
            },
            "seek" => match tokens.next().and_then(|t| t.parse::<u32>().ok()) {
                Some(value) => engine.seek_thousandths(value),
                None => println!("usage: seek <0-1000>"),
            },
            "status" => print_status(&engine),
            _ => match ControlCommand::parse_line(trimmed) {
                Ok(command) => {
                    debug!(?command, "dispatching");
                    match surface.dispatch(&mut engine, command) {
                        Dispatch::Applied(true) => {}
                        Dispatch::Applied(false) => println!("(unavailable)"),
                        Dispatch::Playlist(action) => {
                            // No playlist attached in the console front end
                            println!("(no playlist: {})", playlist_name(action));
                        }
                    }
                }
                Err(CommandError::Ambiguous(word)) => {
                    println!("'{word}' is ambiguous: try 'volume {word}', 'tempo {word}', ...");
                }
                Err(err) => println!("{err}"),
            },
        }
    }

    preview.stop();
    engine.close();
    drop(engine);
    let _ = event_printer.join();
    Ok(())
}

fn open_track(engine: &mut PlaybackEngine, path: &Path) {
    if engine.open(path) {
        let status = engine.status();
        println!(
            "opened {} ({})",
            path.display(),
            format_seconds(status.length_seconds)
        );
    } else {
        println!("cannot open {}", path.display());
    }
}

/// Everything after the leading keyword, preserving spaces in the path
fn rest_as_path(line: &str, keyword: &str) -> Option<PathBuf> {
    let rest = line[keyword.len()..].trim();
    if rest.is_empty() {
        None
    } else {
        Some(PathBuf::from(rest))
    }
}

fn print_status(engine: &PlaybackEngine) {
    let s = engine.status();
    println!("transport : {}", mode_name(s.mode));
    if let Some(path) = &s.source_path {
        println!("track     : {}", path.display());
    }
    println!(
        "position  : {} / {}  ({}%)",
        format_seconds(s.position_seconds),
        format_seconds(s.length_seconds),
        s.position_thousandths as f32 / 10.0
    );
    println!(
        "effective : {} elapsed, {} remaining",
        format_seconds(s.effective_position_seconds),
        format_seconds(s.effective_remaining_seconds)
    );
    println!(
        "tempo {:.0}%  pitch {:+} st  pan {:+.1}  volume {:.0}",
        s.tempo_percent, s.pitch_semitones, s.pan, s.volume
    );
}

fn print_help() {
    println!("open <file>        load a track for performance");
    println!("preview <file>     audition a track (same file again stops it)");
    println!("play / pause / stop");
    println!("seek <0-1000>      scrub within the track");
    println!("louder / quieter / volume reset");
    println!("more-voice / more-instrument / pan reset");
    println!("slower / faster / tempo reset");
    println!("transpose-up / transpose-down / pitch reset");
    println!("status             show the session snapshot");
    println!("quit");
}

fn mode_name(mode: TransportMode) -> &'static str {
    match mode {
        TransportMode::Unloaded => "unloaded",
        TransportMode::Stopped => "stopped",
        TransportMode::Playing => "playing",
        TransportMode::Paused => "paused",
    }
}

fn playlist_name(action: PlaylistAction) -> &'static str {
    match action {
        PlaylistAction::Previous => "previous",
        PlaylistAction::Next => "next",
        PlaylistAction::FromTheTop => "from-the-top",
    }
}

fn format_seconds(seconds: f64) -> String {
    let total = seconds.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
