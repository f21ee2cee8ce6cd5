//! Symbolic names for the buttons and axes of a controller model.
//!
//! A [NameTable] is an immutable bijection between device indices and names,
//! one per control namespace. Devices may have no names at all, in which case
//! controls are only addressable by their numeric index.
use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use super::error::ControlKind;

/// Display name of the table used when no controller model is known
pub const GENERIC_NAME: &str = "Generic (numbers only)";

#[derive(Error, Debug, PartialEq)]
pub enum NameTableError {
    #[error("{kind} name '{name}' is used by both index {first} and {second}")]
    DuplicateName {
        kind: ControlKind,
        name: String,
        first: u8,
        second: u8,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameTable {
    full_name: String,
    buttons: BTreeMap<u8, String>,
    axes: BTreeMap<u8, String>,
    button_index: HashMap<String, u8>,
    axis_index: HashMap<String, u8>,
}

impl NameTable {
    /// Build a name table from index to name mappings. Fails if a name is
    /// assigned to more than one index within a namespace.
    pub fn new(
        full_name: impl Into<String>,
        buttons: BTreeMap<u8, String>,
        axes: BTreeMap<u8, String>,
    ) -> Result<Self, NameTableError> {
        let button_index = reverse(ControlKind::Button, &buttons)?;
        let axis_index = reverse(ControlKind::Axis, &axes)?;

        Ok(Self {
            full_name: full_name.into(),
            buttons,
            axes,
            button_index,
            axis_index,
        })
    }

    /// A table without any names
    pub fn generic() -> Self {
        Self {
            full_name: GENERIC_NAME.to_string(),
            buttons: BTreeMap::new(),
            axes: BTreeMap::new(),
            button_index: HashMap::new(),
            axis_index: HashMap::new(),
        }
    }

    /// Human readable name of the controller model
    pub fn full_name(&self) -> &str {
        self.full_name.as_str()
    }

    pub fn button_name(&self, index: u8) -> Option<&str> {
        self.buttons.get(&index).map(String::as_str)
    }

    pub fn axis_name(&self, index: u8) -> Option<&str> {
        self.axes.get(&index).map(String::as_str)
    }

    pub fn button_index(&self, name: &str) -> Option<u8> {
        self.button_index.get(name).copied()
    }

    pub fn axis_index(&self, name: &str) -> Option<u8> {
        self.axis_index.get(name).copied()
    }

    /// Button names in index order
    pub fn button_names(&self) -> Vec<String> {
        self.buttons.values().cloned().collect()
    }

    /// Axis names in index order
    pub fn axis_names(&self) -> Vec<String> {
        self.axes.values().cloned().collect()
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::generic()
    }
}

fn reverse(
    kind: ControlKind,
    names: &BTreeMap<u8, String>,
) -> Result<HashMap<String, u8>, NameTableError> {
    let mut index = HashMap::with_capacity(names.len());
    for (&idx, name) in names.iter() {
        if let Some(first) = index.insert(name.clone(), idx) {
            return Err(NameTableError::DuplicateName {
                kind,
                name: name.clone(),
                first,
                second: idx,
            });
        }
    }
    Ok(index)
}
