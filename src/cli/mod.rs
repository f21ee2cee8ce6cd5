pub mod device;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use device::{handle_events, handle_list, handle_watch};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List all joystick devices
    List,
    /// Print every event read from a joystick
    Events {
        /// Joystick number (e.g. 0 for /dev/input/js0)
        #[arg(short, long, default_value_t = 0)]
        index: u32,
        /// Also print the initial state replayed when the device is opened
        #[arg(long)]
        init: bool,
        /// Use the given controller config instead of detecting one
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Track a joystick in the background and log every change
    Watch {
        /// Joystick number (e.g. 0 for /dev/input/js0)
        #[arg(short, long, default_value_t = 0)]
        index: u32,
        /// Use the given controller config instead of detecting one
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub async fn main_cli(args: Args) -> Result<(), Box<dyn Error>> {
    match args.cmd {
        Commands::List => handle_list().await?,
        Commands::Events {
            index,
            init,
            config,
        } => handle_events(index, init, config).await?,
        Commands::Watch { index, config } => handle_watch(index, config).await?,
    }

    Ok(())
}
