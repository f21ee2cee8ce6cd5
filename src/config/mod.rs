pub mod path;

use std::{collections::BTreeMap, io, io::Read, path::Path};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::names::{NameTable, NameTableError};

use path::{get_controllers_paths, get_multidir_sorted_files};

/// Represents all possible errors loading a [ControllerConfig]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
    #[error("Invalid name table: {0}")]
    InvalidTable(#[from] NameTableError),
}

/// Loads every controller config in all default locations, in load order.
/// Files that fail to parse are skipped with a warning.
pub fn load_controller_configs() -> Vec<ControllerConfig> {
    let paths = get_controllers_paths();
    let files = get_multidir_sorted_files(paths.as_slice(), |entry| {
        entry
            .path()
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml")
    });

    let mut configs = Vec::with_capacity(files.len());
    for file in files {
        log::trace!("Found file: {}", file.display());
        match ControllerConfig::from_yaml_file(&file) {
            Ok(config) => configs.push(config),
            Err(e) => {
                log::warn!("Failed to parse controller config {}: {e}", file.display());
            }
        }
    }

    configs
}

/// [ControllerConfig] describes the button and axis names of a single
/// controller model, and the kernel device names it applies to.
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ControllerConfig {
    pub version: u32,
    pub kind: String,
    /// Short identifier, e.g. "ps4"
    pub name: String,
    /// Human readable controller name, e.g. "PlayStation 4 controller"
    pub full_name: String,
    /// Names reported by the JSIOCGNAME ioctl that this config applies to
    pub device_names: Option<Vec<String>>,
    /// Button index to name mapping
    #[serde(default)]
    pub buttons: BTreeMap<u8, String>,
    /// Axis index to name mapping
    #[serde(default)]
    pub axes: BTreeMap<u8, String>,
}

impl ControllerConfig {
    /// Load a [ControllerConfig] from the given YAML string
    pub fn from_yaml(content: String) -> Result<ControllerConfig, LoadError> {
        let config: ControllerConfig = serde_yaml::from_str(content.as_str())?;
        Ok(config)
    }

    /// Load a [ControllerConfig] from the given YAML file
    pub fn from_yaml_file<P>(path: P) -> Result<ControllerConfig, LoadError>
    where
        P: AsRef<Path>,
    {
        let mut file = std::fs::File::open(path)?;
        let mut content = String::default();
        file.read_to_string(&mut content)?;
        Self::from_yaml(content)
    }

    /// Returns true if this config applies to a device reporting the given name
    pub fn matches_device_name(&self, name: &str) -> bool {
        let Some(names) = self.device_names.as_ref() else {
            return false;
        };
        names.iter().any(|n| n.trim() == name.trim())
    }

    /// Returns the first config that applies to the given device name
    pub fn find_for_device_name<'a>(
        configs: &'a [ControllerConfig],
        name: &str,
    ) -> Option<&'a ControllerConfig> {
        configs.iter().find(|config| config.matches_device_name(name))
    }

    /// Build the immutable name table described by this config
    pub fn name_table(&self) -> Result<NameTable, NameTableError> {
        NameTable::new(
            self.full_name.trim(),
            self.buttons.clone(),
            self.axes.clone(),
        )
    }

    /// Load a config file and build its name table in one step
    pub fn load_name_table<P>(path: P) -> Result<NameTable, LoadError>
    where
        P: AsRef<Path>,
    {
        let config = Self::from_yaml_file(path)?;
        Ok(config.name_table()?)
    }
}
