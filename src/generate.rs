use std::fs::{self, File};
use std::io::Write;

use jsplumber::config::ControllerConfig;
use schemars::schema_for;

const SCHEMA_DIR: &str = "./rootfs/usr/share/jsplumber/schema";

fn main() {
    let controller_schema = schema_for!(ControllerConfig);
    fs::create_dir_all(SCHEMA_DIR).expect("Failed to create schema directory");
    let mut file = File::create(format!("{SCHEMA_DIR}/controller_v1.json"))
        .expect("Failed to create schema file");
    write!(
        file,
        "{}",
        serde_json::to_string_pretty(&controller_schema).unwrap()
    )
    .expect("Failed to write schema");
}
