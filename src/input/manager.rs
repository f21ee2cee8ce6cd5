//! Automatic selection of a name table for a connected joystick.
use std::error::Error;

use crate::{
    config::{self, ControllerConfig},
    drivers::joystick::driver::{available, device_name, js_path},
};

use super::{gamepad::Gamepad, names::NameTable};

/// Returns the name table for a device with the given kernel name. Unknown
/// devices get the generic table.
pub fn name_table_for(configs: &[ControllerConfig], device_name: &str) -> NameTable {
    let Some(config) = ControllerConfig::find_for_device_name(configs, device_name) else {
        log::warn!("Gamepad with name '{device_name}' not known!");
        return NameTable::generic();
    };

    match config.name_table() {
        Ok(table) => {
            log::debug!("Using '{}' mapping for '{device_name}'", config.full_name);
            table
        }
        Err(e) => {
            log::warn!("Invalid mapping '{}': {e}", config.name);
            NameTable::generic()
        }
    }
}

/// Open the joystick with the given number using the mapping that matches
/// its reported name. Returns `None` if the device does not exist.
pub fn load_controller(number: u32) -> Result<Option<Gamepad>, Box<dyn Error + Send + Sync>> {
    if !available(number) {
        log::debug!("No joystick at {}", js_path(number));
        return Ok(None);
    }

    let name = device_name(number)?;
    log::debug!("Found '{name}' at {}", js_path(number));
    let configs = config::load_controller_configs();
    let names = name_table_for(&configs, &name);
    let gamepad = Gamepad::open(number, names)?;

    Ok(Some(gamepad))
}
