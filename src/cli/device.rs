use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

use jsplumber::config::{self, ControllerConfig};
use jsplumber::drivers::joystick::driver::{all_js_nums, device_name, js_path};
use jsplumber::input::gamepad::Gamepad;
use jsplumber::input::manager::load_controller;
use jsplumber::input::names::GENERIC_NAME;

/// How often the watch command checks whether the device is still connected
const CONNECTED_POLL_RATE: Duration = Duration::from_secs(1);

#[derive(Tabled)]
struct JoystickRow {
    index: u32,
    path: String,
    name: String,
    controller: String,
}

pub async fn handle_list() -> Result<(), Box<dyn Error>> {
    let configs = config::load_controller_configs();
    let numbers = all_js_nums();
    let count = numbers.len();

    let mut rows = Vec::with_capacity(count);
    for index in numbers {
        let name = match device_name(index) {
            Ok(name) => name,
            Err(e) => {
                log::debug!("Unable to read name of {}: {e}", js_path(index));
                String::from("-")
            }
        };
        let controller = ControllerConfig::find_for_device_name(&configs, &name)
            .map(|config| config.full_name.trim().to_string())
            .unwrap_or_else(|| GENERIC_NAME.to_string());
        rows.push(JoystickRow {
            index,
            path: js_path(index),
            name,
            controller,
        });
    }

    let mut table = Table::new(rows);
    table
        .with(Style::modern_rounded())
        .with(Panel::header("Joysticks"));
    println!("{table}");
    println!("Found {count} joystick(s)");

    Ok(())
}

pub async fn handle_events(
    index: u32,
    init: bool,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let task = tokio::task::spawn_blocking(move || -> Result<(), Box<dyn Error + Send + Sync>> {
        let gamepad = open_gamepad(index, config)?;
        println!("{} ({})", gamepad.full_name(), gamepad.device());
        loop {
            match gamepad.next_event(!init) {
                Ok(event) => println!("{event}"),
                Err(e) if e.is_disconnected() => {
                    log::info!("{e}");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    });

    if let Err(e) = task.await? {
        return Err(e.to_string().into());
    }

    Ok(())
}

pub async fn handle_watch(index: u32, config: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let task = tokio::task::spawn_blocking(
        move || -> Result<Arc<Gamepad>, Box<dyn Error + Send + Sync>> {
            let gamepad = Arc::new(open_gamepad(index, config)?);
            gamepad.start_background_updates(true)?;
            subscribe_all(&gamepad)?;
            Ok(gamepad)
        },
    );
    let gamepad = match task.await? {
        Ok(gamepad) => gamepad,
        Err(e) => return Err(e.to_string().into()),
    };
    log::info!(
        "Watching {} ({}). Press Ctrl+C to stop.",
        gamepad.full_name(),
        gamepad.device()
    );

    let monitor = gamepad.clone();
    let disconnected = tokio::spawn(async move {
        while monitor.is_connected() {
            tokio::time::sleep(CONNECTED_POLL_RATE).await;
        }
    });

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            log::info!("Stopping");
        }
        _ = disconnected => {
            log::info!("Gamepad {} disconnected", gamepad.device());
        }
    }
    gamepad.disconnect();

    Ok(())
}

/// Open the given joystick, either with an explicit controller config or the
/// one matching the device name.
fn open_gamepad(
    index: u32,
    config: Option<PathBuf>,
) -> Result<Gamepad, Box<dyn Error + Send + Sync>> {
    if let Some(path) = config {
        let names = ControllerConfig::load_name_table(&path)?;
        return Ok(Gamepad::open(index, names)?);
    }

    match load_controller(index)? {
        Some(gamepad) => Ok(gamepad),
        None => Err(format!("Gamepad {} is not available", js_path(index)).into()),
    }
}

/// Log every change of every control the device has reported
fn subscribe_all(gamepad: &Gamepad) -> Result<(), Box<dyn Error + Send + Sync>> {
    for button in gamepad.known_buttons() {
        let label = button.to_string();
        gamepad.add_button_changed_handler(&button.to_string(), move |pressed| {
            let state = if pressed { "pressed" } else { "released" };
            log::info!("Button {label} {state}");
        })?;
    }
    for axis in gamepad.known_axes() {
        let label = axis.to_string();
        gamepad.add_axis_moved_handler(&axis.to_string(), move |position| {
            log::info!("Axis {label} at {:+06.1} %", position * 100.0);
        })?;
    }

    Ok(())
}
