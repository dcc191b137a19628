#![allow(dead_code)]

use std::path::{Path, PathBuf};

use irdrop::config::{InputFile, RunConfig};

pub const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data");

pub fn data(name: &str) -> PathBuf {
    PathBuf::from(DATA_DIR).join(name)
}

/// The minimal one-cell dump set, one file per format.
pub fn minimal_inputs() -> Vec<InputFile> {
    ["minimal.cdev", "minimal.spiprof", "minimal.pgarc", "minimal.lib"]
        .into_iter()
        .map(|name| InputFile::infer(data(name)).unwrap())
        .collect()
}

/// A config writing its database and report under `dir`.
pub fn config(dir: &Path, inputs: Vec<InputFile>) -> RunConfig {
    RunConfig::builder()
        .database(dir.join("redhawk.db"))
        .report(dir.join("irdrop_errors.txt"))
        .inputs(inputs)
        .build()
        .unwrap()
}
