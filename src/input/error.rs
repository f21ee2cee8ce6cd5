use std::{fmt::Display, io};

use thiserror::Error;

/// The two independent control namespaces of a joystick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Button,
    Axis,
}

impl Display for ControlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlKind::Button => write!(f, "Button"),
            ControlKind::Axis => write!(f, "Axis"),
        }
    }
}

/// Possible errors for a [crate::input::gamepad::Gamepad] session
#[derive(Error, Debug)]
pub enum GamepadError {
    #[error("could not open gamepad {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: io::Error,
    },
    #[error("gamepad {device} disconnected: {reason}")]
    Disconnected { device: String, reason: String },
    #[error("{kind} {name} was not found")]
    UnknownControl { kind: ControlKind, name: String },
    #[error("background updates are already running")]
    AlreadyRunning,
    #[error("unable to spawn the update thread: {0}")]
    Spawn(#[source] io::Error),
}

impl GamepadError {
    /// Returns true if the error means the session can no longer be read
    pub fn is_disconnected(&self) -> bool {
        matches!(self, GamepadError::Disconnected { .. })
    }
}
