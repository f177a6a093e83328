pub use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use tera::Tera;

use crate::pdk::PdkName;
use crate::schematic::context::FridaCtx;

pub mod blocks;
pub mod cli;
pub mod config;
pub mod error;
pub mod measure;
pub mod netlist;
pub mod paths;
pub mod pdk;
pub mod plan;
pub mod schematic;
pub mod sim;
pub mod units;

pub const BUILD_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/build");

lazy_static! {
    pub static ref TEMPLATES: Tera =
        match Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/*")) {
            Ok(t) => t,
            Err(e) => panic!("Error parsing templates: {e}"),
        };
}

pub fn bus_bit(name: &str, index: usize) -> String {
    format!("{name}[{index}]")
}

/// Creates a generation context with the given PDK active.
pub fn setup_ctx(pdk: PdkName) -> FridaCtx {
    FridaCtx::new(pdk.descriptor())
}

#[cfg(test)]
pub mod tests {
    use std::path::PathBuf;

    use super::BUILD_PATH;

    pub(crate) fn test_work_dir(name: &str) -> PathBuf {
        PathBuf::from(BUILD_PATH).join(name)
    }
}
