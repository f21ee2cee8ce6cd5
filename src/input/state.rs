//! Last observed state of every button and axis of a session.
use std::collections::HashMap;

use super::{
    dispatch::Entity,
    error::{ControlKind, GamepadError},
    names::NameTable,
};

/// State of a single button
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    /// Last observed state
    pub pressed: bool,
    /// Set on every press, cleared when read
    pub was_pressed: bool,
    /// Set on every release, cleared when read
    pub was_released: bool,
}

/// State of a single axis
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisState {
    /// Position normalized to -1.0..=1.0
    pub position: f64,
}

/// Holds the state of every control seen so far along with the name table
/// used to address them.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    names: NameTable,
    buttons: HashMap<u8, ButtonState>,
    axes: HashMap<u8, AxisState>,
    last_timestamp: u32,
}

impl InputState {
    pub fn new(names: NameTable) -> Self {
        Self {
            names,
            ..Default::default()
        }
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    /// Timestamp of the most recently processed record
    pub fn last_timestamp(&self) -> u32 {
        self.last_timestamp
    }

    pub fn set_last_timestamp(&mut self, timestamp: u32) {
        self.last_timestamp = timestamp;
    }

    /// Resolve a button by name or numeric index. The button must have been
    /// reported by the device.
    pub fn button_index(&self, name: &str) -> Result<u8, GamepadError> {
        let index = self
            .names
            .button_index(name)
            .or_else(|| name.parse().ok())
            .ok_or_else(|| unknown(ControlKind::Button, name))?;
        if !self.buttons.contains_key(&index) {
            return Err(unknown(ControlKind::Button, name));
        }
        Ok(index)
    }

    /// Resolve an axis by name or numeric index. The axis must have been
    /// reported by the device.
    pub fn axis_index(&self, name: &str) -> Result<u8, GamepadError> {
        let index = self
            .names
            .axis_index(name)
            .or_else(|| name.parse().ok())
            .ok_or_else(|| unknown(ControlKind::Axis, name))?;
        if !self.axes.contains_key(&index) {
            return Err(unknown(ControlKind::Axis, name));
        }
        Ok(index)
    }

    /// Returns the symbolic name of the button if it has one, otherwise its index
    pub fn button_entity(&self, index: u8) -> Entity {
        match self.names.button_name(index) {
            Some(name) => Entity::Name(name.to_string()),
            None => Entity::Index(index),
        }
    }

    /// Returns the symbolic name of the axis if it has one, otherwise its index
    pub fn axis_entity(&self, index: u8) -> Entity {
        match self.names.axis_name(index) {
            Some(name) => Entity::Name(name.to_string()),
            None => Entity::Index(index),
        }
    }

    pub fn is_pressed(&self, name: &str) -> Result<bool, GamepadError> {
        let index = self.button_index(name)?;
        Ok(self.buttons.get(&index).is_some_and(|b| b.pressed))
    }

    pub fn axis(&self, name: &str) -> Result<f64, GamepadError> {
        let index = self.axis_index(name)?;
        Ok(self.axes.get(&index).map(|a| a.position).unwrap_or_default())
    }

    /// Returns true if the button was pressed since the last call, clearing
    /// the flag.
    pub fn consume_was_pressed(&mut self, name: &str) -> Result<bool, GamepadError> {
        let index = self.button_index(name)?;
        let Some(button) = self.buttons.get_mut(&index) else {
            return Ok(false);
        };
        Ok(std::mem::take(&mut button.was_pressed))
    }

    /// Returns true if the button was released since the last call, clearing
    /// the flag.
    pub fn consume_was_released(&mut self, name: &str) -> Result<bool, GamepadError> {
        let index = self.button_index(name)?;
        let Some(button) = self.buttons.get_mut(&index) else {
            return Ok(false);
        };
        Ok(std::mem::take(&mut button.was_released))
    }

    pub fn button(&self, index: u8) -> Option<&ButtonState> {
        self.buttons.get(&index)
    }

    pub fn axis_state(&self, index: u8) -> Option<&AxisState> {
        self.axes.get(&index)
    }

    /// Seed a button from its initial state, resetting its edge flags
    pub fn init_button(&mut self, index: u8, pressed: bool) {
        self.buttons.insert(
            index,
            ButtonState {
                pressed,
                ..Default::default()
            },
        );
    }

    /// Record a live button transition. Returns false without changing
    /// anything if the button was never announced by an initial event.
    pub fn set_button(&mut self, index: u8, pressed: bool) -> bool {
        let Some(button) = self.buttons.get_mut(&index) else {
            return false;
        };
        button.pressed = pressed;
        if pressed {
            button.was_pressed = true;
        } else {
            button.was_released = true;
        }
        true
    }

    /// Seed an axis from its initial position
    pub fn init_axis(&mut self, index: u8, position: f64) {
        self.axes.insert(index, AxisState { position });
    }

    /// Record a live axis move. Returns false without changing anything if
    /// the axis was never announced by an initial event.
    pub fn set_axis(&mut self, index: u8, position: f64) -> bool {
        let Some(axis) = self.axes.get_mut(&index) else {
            return false;
        };
        axis.position = position;
        true
    }

    /// Indices of every button reported by the device, sorted
    pub fn known_buttons(&self) -> Vec<u8> {
        let mut indices: Vec<u8> = self.buttons.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Indices of every axis reported by the device, sorted
    pub fn known_axes(&self) -> Vec<u8> {
        let mut indices: Vec<u8> = self.axes.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Number of controls the device has reported so far
    pub fn total_known(&self) -> usize {
        self.buttons.len() + self.axes.len()
    }

    /// The device is considered usable once more than a single control has
    /// been reported.
    pub fn is_ready(&self) -> bool {
        self.total_known() > 1
    }
}

fn unknown(kind: ControlKind, name: &str) -> GamepadError {
    GamepadError::UnknownControl {
        kind,
        name: name.to_string(),
    }
}
