//! Simulator scripts.
//!
//! A script is a line-oriented list of things a user (or the system) does to
//! the mock device:
//!
//! ```text
//! # press up twice, then drag the Control Center slider
//! up
//! wait 150
//! up
//! wait 150
//! set 0.9
//! background
//! down            # ignored: app is not active
//! foreground
//! interrupt begin
//! interrupt end
//! exact-step on
//! stop
//! start
//! ```
//!
//! `#` starts a comment; blank lines are ignored.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;
use volume_core::{AppActivity, InterruptionPhase};

use crate::application::monitor::VolumeButtonMonitor;
use crate::application::platform::PlatformNotification;
use crate::infrastructure::notifications::LocalNotificationCenter;
use crate::infrastructure::platform::mock::MockPlatform;

/// Script run when the simulator is given no `--script`.
pub const DEMO_SCRIPT: &str = include_str!("../../scripts/demo.vms");

/// Error type for script parsing.
#[derive(Debug, Error, PartialEq)]
pub enum ScriptError {
    #[error("line {line}: unknown command `{command}`")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: `{command}` needs an argument")]
    MissingArgument { line: usize, command: String },

    #[error("line {line}: invalid argument `{value}` for `{command}`")]
    InvalidArgument {
        line: usize,
        command: String,
        value: String,
    },
}

/// One parsed script line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptCommand {
    /// Hardware volume-up press.
    Up,
    /// Hardware volume-down press.
    Down,
    /// External volume change (Control Center, lock screen).
    Set(f32),
    /// App resigns active.
    Background,
    /// App becomes active.
    Foreground,
    Interrupt(InterruptionPhase),
    ExactStep(bool),
    Start,
    Stop,
    Rebaseline,
    Wait(Duration),
}

/// Parses a whole script.
///
/// # Errors
///
/// Returns the first [`ScriptError`] encountered, with a 1-based line number.
pub fn parse_script(source: &str) -> Result<Vec<ScriptCommand>, ScriptError> {
    let mut commands = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        commands.push(parse_line(line, content)?);
    }
    Ok(commands)
}

fn parse_line(line: usize, content: &str) -> Result<ScriptCommand, ScriptError> {
    let mut words = content.split_whitespace();
    let command = words.next().unwrap_or_default();
    let argument = words.next();

    let missing = || ScriptError::MissingArgument {
        line,
        command: command.to_string(),
    };
    let invalid = |value: &str| ScriptError::InvalidArgument {
        line,
        command: command.to_string(),
        value: value.to_string(),
    };

    match command {
        "up" => Ok(ScriptCommand::Up),
        "down" => Ok(ScriptCommand::Down),
        "background" => Ok(ScriptCommand::Background),
        "foreground" => Ok(ScriptCommand::Foreground),
        "start" => Ok(ScriptCommand::Start),
        "stop" => Ok(ScriptCommand::Stop),
        "rebaseline" => Ok(ScriptCommand::Rebaseline),
        "set" => {
            let value = argument.ok_or_else(missing)?;
            match value.parse::<f32>() {
                Ok(volume) if (0.0..=1.0).contains(&volume) => Ok(ScriptCommand::Set(volume)),
                _ => Err(invalid(value)),
            }
        }
        "wait" => {
            let value = argument.ok_or_else(missing)?;
            value
                .parse::<u64>()
                .map(|ms| ScriptCommand::Wait(Duration::from_millis(ms)))
                .map_err(|_| invalid(value))
        }
        "interrupt" => match argument.ok_or_else(missing)? {
            "begin" | "began" => Ok(ScriptCommand::Interrupt(InterruptionPhase::Began)),
            "end" | "ended" => Ok(ScriptCommand::Interrupt(InterruptionPhase::Ended)),
            other => Err(invalid(other)),
        },
        "exact-step" => match argument.ok_or_else(missing)? {
            "on" => Ok(ScriptCommand::ExactStep(true)),
            "off" => Ok(ScriptCommand::ExactStep(false)),
            other => Err(invalid(other)),
        },
        other => Err(ScriptError::UnknownCommand {
            line,
            command: other.to_string(),
        }),
    }
}

/// Everything a script acts upon.
pub struct ScriptTarget<'a> {
    pub monitor: &'a VolumeButtonMonitor,
    pub device: &'a Arc<MockPlatform>,
    pub notifications: &'a Arc<LocalNotificationCenter>,
    /// Suppression flag passed to `start` commands.
    pub suppress_native_ui: bool,
}

/// Executes `commands` in order, sleeping on the Tokio timer for `wait`.
pub async fn run_script(target: &ScriptTarget<'_>, commands: &[ScriptCommand]) {
    for command in commands {
        match *command {
            ScriptCommand::Up => {
                let volume = target.device.press_volume_up();
                info!(volume, "pressed volume up");
            }
            ScriptCommand::Down => {
                let volume = target.device.press_volume_down();
                info!(volume, "pressed volume down");
            }
            ScriptCommand::Set(volume) => {
                target.device.set_system_volume(volume);
                info!(volume, "system volume changed externally");
            }
            ScriptCommand::Background => {
                target
                    .notifications
                    .post(PlatformNotification::AppActivity(AppActivity::Inactive));
            }
            ScriptCommand::Foreground => {
                target
                    .notifications
                    .post(PlatformNotification::AppActivity(AppActivity::Active));
            }
            ScriptCommand::Interrupt(phase) => {
                if phase == InterruptionPhase::Began {
                    target.device.deactivate_session();
                }
                target
                    .notifications
                    .post(PlatformNotification::Interruption(phase));
            }
            ScriptCommand::ExactStep(enabled) => target.monitor.set_exact_step_mode(enabled),
            ScriptCommand::Start => target.monitor.start(target.suppress_native_ui),
            ScriptCommand::Stop => target.monitor.stop(),
            ScriptCommand::Rebaseline => {
                let baseline = target.monitor.rebaseline();
                info!(baseline, "rebaselined");
            }
            ScriptCommand::Wait(duration) => tokio::time::sleep(duration).await,
        }
    }
}
