//! Inventory files
//!
//! A TOML document describing the physical fabric (switches, ports, nodes
//! with their nics), the networks and the committed attachments. The CLI
//! loads it into the in-memory persistence layer and writes it back once
//! actions have been applied.

use std::collections::HashSet;
use std::path::Path;

use fabric_net_core::{Network, NetworkAttachment, Node, Port, SwitchRecord};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryFile {
    pub switches: Vec<SwitchRecord>,
    pub ports: Vec<Port>,
    pub nodes: Vec<Node>,
    pub networks: Vec<Network>,
    pub attachments: Vec<NetworkAttachment>,
}

impl InventoryFile {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let inventory: InventoryFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        inventory.check_labels()?;
        Ok(inventory)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Render(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let inventory = Self::from_toml(&content)?;
        debug!(
            "loaded inventory {}: {} switches, {} ports, {} nodes, {} networks, {} attachments",
            path.display(),
            inventory.switches.len(),
            inventory.ports.len(),
            inventory.nodes.len(),
            inventory.networks.len(),
            inventory.attachments.len()
        );
        Ok(inventory)
    }

    /// Write the inventory next to `path` and rename it into place.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        let staging = path.with_extension("toml.tmp");
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        std::fs::write(&staging, content).map_err(io_err)?;
        std::fs::rename(&staging, path).map_err(io_err)?;
        info!("saved inventory to {}", path.display());
        Ok(())
    }

    /// Labels must be unique per kind; everything else is checked when the
    /// records are loaded into persistence.
    fn check_labels(&self) -> Result<(), ConfigError> {
        fn unique<'a>(
            kind: &str,
            labels: impl Iterator<Item = &'a str>,
        ) -> Result<(), ConfigError> {
            let mut seen = HashSet::new();
            for label in labels {
                if !seen.insert(label) {
                    return Err(ConfigError::Invalid(format!(
                        "duplicate {} '{}'",
                        kind, label
                    )));
                }
            }
            Ok(())
        }

        unique("switch", self.switches.iter().map(|s| s.label.as_str()))?;
        unique("node", self.nodes.iter().map(|n| n.label.as_str()))?;
        unique("network", self.networks.iter().map(|n| n.label.as_str()))?;

        let mut ports = HashSet::new();
        for port in &self.ports {
            if !ports.insert((port.switch.as_str(), port.label.as_str())) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate port {}:{}",
                    port.switch, port.label
                )));
            }
        }
        Ok(())
    }
}
