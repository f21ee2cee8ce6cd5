//! Named access to Linux joystick devices.
//!
//! Records read from `/dev/input/jsN` are decoded by [drivers::joystick] and
//! applied by [input::gamepad::Gamepad], which tracks button and axis state,
//! edge flags and per-control callbacks. Controller name tables are loaded
//! from YAML files by [config].
pub mod config;
pub mod drivers;
pub mod input;
