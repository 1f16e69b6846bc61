//! Fabric Isolation Configuration
//!
//! Engine settings (file plus environment overrides) and the TOML inventory
//! describing switches, ports, nodes, networks and attachments.

pub mod engine;
pub mod inventory;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use thiserror::Error;

pub use engine::EngineConfig;
pub use inventory::InventoryFile;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse inventory: {0}")]
    Parse(String),

    #[error("Failed to render inventory: {0}")]
    Render(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
