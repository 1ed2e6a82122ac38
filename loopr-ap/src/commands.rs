//! Text command surface
//!
//! Each line read by the `loopr-ap` binary is one command. The commands
//! mirror the player's physical buttons: a short press (tap) and a long
//! press (hold) of the same button do different things, and the tempo
//! buttons move the adjust target instead of the tempo while fine-adjusting.
//!
//! | Command | Button | Engine operation |
//! |---|---|---|
//! | `toggle` | play tap | finish adjust, else play/pause toggle |
//! | `pos-hold` | play hold | adjust position |
//! | `a` / `b` | mark tap | toggle the loop point |
//! | `a-hold` / `b-hold` | mark hold | adjust the loop point |
//! | `tempo+ [n]` / `tempo- [n]` | tempo | tempo ±n%, or ±n×0.1s while adjusting |
//! | `adjust+ <s>` / `adjust- <s>` | | move the adjust target by ±s seconds |
//! | `stop` | stop tap | stop |
//! | `save` | save | export the A-B region |

use crate::error::Result;
use crate::playback::{AdjustTarget, EngineSnapshot, PlaybackEngine};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Seconds moved per tempo-button step while fine-adjusting
pub const FINE_ADJUST_STEP_SECS: f64 = 0.1;

/// Press duration of a button command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Press {
    Tap,
    Hold,
}

/// Which loop point a mark command addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    A,
    B,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Resume,
    /// Play button tap
    Toggle,
    /// Play button hold
    PositionHold,
    Stop,
    Mark(Marker, Press),
    /// Tempo buttons, signed step count
    Tempo(i32),
    /// Explicit fine-adjust by seconds
    Adjust(f64),
    Done,
    Save,
    Status,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Invalid argument for {command}: {argument}")]
    InvalidArgument { command: String, argument: String },

    #[error("{0} requires an argument")]
    MissingArgument(String),
}

fn parse_arg<T: FromStr>(command: &str, arg: Option<&str>) -> std::result::Result<Option<T>, CommandError> {
    arg.map(|raw| {
        raw.parse::<T>().map_err(|_| CommandError::InvalidArgument {
            command: command.to_string(),
            argument: raw.to_string(),
        })
    })
    .transpose()
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or("").to_ascii_lowercase();
        let arg = parts.next();

        let command = match name.as_str() {
            "play" => Command::Play,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "toggle" | "p" => Command::Toggle,
            "pos-hold" => Command::PositionHold,
            "stop" | "s" => Command::Stop,
            "a" => Command::Mark(Marker::A, Press::Tap),
            "a-hold" => Command::Mark(Marker::A, Press::Hold),
            "b" => Command::Mark(Marker::B, Press::Tap),
            "b-hold" => Command::Mark(Marker::B, Press::Hold),
            "tempo+" | "+" => Command::Tempo(parse_arg::<u16>(&name, arg)?.unwrap_or(1) as i32),
            "tempo-" | "-" => Command::Tempo(-(parse_arg::<u16>(&name, arg)?.unwrap_or(1) as i32)),
            "adjust+" | "adjust-" => {
                let secs: f64 = parse_arg(&name, arg)?
                    .ok_or_else(|| CommandError::MissingArgument(name.clone()))?;
                if !secs.is_finite() {
                    return Err(CommandError::InvalidArgument {
                        command: name,
                        argument: secs.to_string(),
                    });
                }
                Command::Adjust(if name == "adjust-" { -secs.abs() } else { secs.abs() })
            }
            "done" => Command::Done,
            "save" => Command::Save,
            "status" | "?" => Command::Status,
            "quit" | "exit" | "q" => Command::Quit,
            _ => return Err(CommandError::Unknown(line.trim().to_string())),
        };
        Ok(command)
    }
}

/// Result of a dispatched command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok,
    Saved(String),
    Snapshot(EngineSnapshot),
    Quit,
}

/// Run `command` against `engine`. Exports go to `output_dir`.
pub fn dispatch(engine: &PlaybackEngine, command: &Command, output_dir: &Path) -> Result<Reply> {
    let adjusting = engine.adjust_target().is_some();

    match command {
        Command::Play => engine.play()?,
        Command::Pause => engine.pause()?,
        Command::Resume => engine.resume()?,
        Command::Toggle if adjusting => engine.finish_adjust()?,
        Command::Toggle => engine.toggle_play_pause()?,
        Command::PositionHold => engine.start_adjust(AdjustTarget::Position)?,
        Command::Stop => engine.stop()?,
        Command::Mark(Marker::A, Press::Tap) => engine.toggle_loop_a()?,
        Command::Mark(Marker::B, Press::Tap) => engine.toggle_loop_b()?,
        Command::Mark(Marker::A, Press::Hold) => engine.start_adjust(AdjustTarget::A)?,
        Command::Mark(Marker::B, Press::Hold) => engine.start_adjust(AdjustTarget::B)?,
        Command::Tempo(steps) if adjusting => {
            engine.adjust_by(*steps as f64 * FINE_ADJUST_STEP_SECS)?
        }
        Command::Tempo(steps) => engine.change_tempo(*steps)?,
        Command::Adjust(secs) => engine.adjust_by(*secs)?,
        Command::Done => engine.finish_adjust()?,
        Command::Save => return Ok(Reply::Saved(engine.save_loop_region(output_dir)?)),
        Command::Status => return Ok(Reply::Snapshot(engine.snapshot())),
        Command::Quit => return Ok(Reply::Quit),
    }
    Ok(Reply::Ok)
}
