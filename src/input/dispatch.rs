//! Applies decoded joystick records to the state store and fires the
//! matching callbacks.
use std::{fmt::Display, sync::Mutex};

use crate::drivers::joystick::event::{Event, EventKind};

use super::{callbacks::CallbackRegistry, lock, state::InputState};

/// Identifies the control an event refers to. Controls with a symbolic name
/// are reported by name, everything else by its raw index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entity {
    Name(String),
    Index(u8),
}

impl Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Name(name) => write!(f, "{name}"),
            Entity::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Result of applying a single record
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Button {
        timestamp: u32,
        button: Entity,
        pressed: bool,
        /// True if this was the initial state replayed on open
        init: bool,
    },
    Axis {
        timestamp: u32,
        axis: Entity,
        position: f64,
        /// True if this was the initial state replayed on open
        init: bool,
    },
    Unknown {
        timestamp: u32,
        kind: u8,
        index: u8,
        value: i16,
    },
}

impl InputEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InputEvent::Button { init: false, .. } => EventKind::Button,
            InputEvent::Button { init: true, .. } => EventKind::InitButton,
            InputEvent::Axis { init: false, .. } => EventKind::Axis,
            InputEvent::Axis { init: true, .. } => EventKind::InitAxis,
            InputEvent::Unknown { .. } => EventKind::Unknown,
        }
    }

    pub fn is_init(&self) -> bool {
        self.kind().is_init()
    }

    pub fn timestamp(&self) -> u32 {
        match self {
            InputEvent::Button { timestamp, .. }
            | InputEvent::Axis { timestamp, .. }
            | InputEvent::Unknown { timestamp, .. } => *timestamp,
        }
    }

    /// The control this event refers to, if it is a known kind
    pub fn entity(&self) -> Option<&Entity> {
        match self {
            InputEvent::Button { button, .. } => Some(button),
            InputEvent::Axis { axis, .. } => Some(axis),
            InputEvent::Unknown { .. } => None,
        }
    }
}

impl Display for InputEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputEvent::Button {
                timestamp,
                button,
                pressed,
                init,
            } => {
                let initially = if *init { "initially " } else { "" };
                let state = if *pressed { "pressed" } else { "released" };
                write!(f, "{timestamp:010}: Button {button} {initially}{state}")
            }
            InputEvent::Axis {
                timestamp,
                axis,
                position,
                init,
            } => {
                let initially = if *init { "initially " } else { "" };
                let percent = position * 100.0;
                write!(f, "{timestamp:010}: Axis {axis} {initially}at {percent:+06.1} %")
            }
            InputEvent::Unknown {
                timestamp,
                kind,
                index,
                value,
            } => write!(
                f,
                "{timestamp:010}: Unknown event {kind}, Index {index}, Value {value}"
            ),
        }
    }
}

/// Apply the given record to the state store and invoke the callbacks
/// subscribed to it. Live records for controls that were never announced
/// by an initial event are returned but change nothing.
///
/// Neither lock is held while callbacks run, and every subscriber set is
/// copied right before it is iterated, so callbacks are free to query the
/// state or change subscriptions.
pub fn apply(
    event: &Event,
    state: &Mutex<InputState>,
    callbacks: &Mutex<CallbackRegistry>,
) -> InputEvent {
    let index = event.index;
    let timestamp = event.timestamp;
    lock(state).set_last_timestamp(timestamp);

    match event.kind() {
        EventKind::Button => {
            let pressed = event.pressed();
            let (button, known) = {
                let mut state = lock(state);
                let known = state.set_button(index, pressed);
                (state.button_entity(index), known)
            };
            let result = InputEvent::Button {
                timestamp,
                button,
                pressed,
                init: false,
            };
            if !known {
                log::trace!("Ignoring button {index} that was never initialized");
                return result;
            }

            if pressed {
                let handlers = lock(callbacks).pressed_snapshot(index);
                for handler in handlers {
                    handler();
                }
            } else {
                let handlers = lock(callbacks).released_snapshot(index);
                for handler in handlers {
                    handler();
                }
            }
            let handlers = lock(callbacks).changed_snapshot(index);
            for handler in handlers {
                handler(pressed);
            }

            result
        }
        EventKind::Axis => {
            let position = event.position();
            let (axis, known) = {
                let mut state = lock(state);
                let known = state.set_axis(index, position);
                (state.axis_entity(index), known)
            };
            let result = InputEvent::Axis {
                timestamp,
                axis,
                position,
                init: false,
            };
            if !known {
                log::trace!("Ignoring axis {index} that was never initialized");
                return result;
            }

            let handlers = lock(callbacks).moved_snapshot(index);
            for handler in handlers {
                handler(position);
            }

            result
        }
        EventKind::InitButton => {
            let pressed = event.pressed();
            let button = {
                let mut state = lock(state);
                state.init_button(index, pressed);
                state.button_entity(index)
            };
            // A replayed initial state means a new connection; subscriptions
            // made against the previous one are dropped.
            lock(callbacks).reset_button(index);
            log::debug!("Button {button} initially {pressed}");

            InputEvent::Button {
                timestamp,
                button,
                pressed,
                init: true,
            }
        }
        EventKind::InitAxis => {
            let position = event.position();
            let axis = {
                let mut state = lock(state);
                state.init_axis(index, position);
                state.axis_entity(index)
            };
            lock(callbacks).reset_axis(index);
            log::debug!("Axis {axis} initially at {position}");

            InputEvent::Axis {
                timestamp,
                axis,
                position,
                init: true,
            }
        }
        EventKind::Unknown => {
            log::trace!("Ignoring unknown event type {:#04x}", event.kind_byte);
            InputEvent::Unknown {
                timestamp,
                kind: event.kind_byte,
                index,
                value: event.value,
            }
        }
    }
}
