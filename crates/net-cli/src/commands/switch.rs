//! Switch configuration checks

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fabric_net_config::InventoryFile;
use fabric_switch_drivers::{AnsibleConnector, DriverRegistry, MockFabric};

/// Outcome of checking one switch and its ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchCheck {
    pub label: String,
    pub problems: Vec<String>,
}

impl SwitchCheck {
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

pub struct SwitchCommand {
    drivers: DriverRegistry,
}

impl SwitchCommand {
    pub fn new() -> Self {
        // nothing is dialled while validating
        let connector = AnsibleConnector::new("ansible-playbook", Duration::from_secs(1));
        Self {
            drivers: DriverRegistry::with_defaults(Arc::new(connector), MockFabric::new()),
        }
    }

    /// Check every switch configuration and port name in `inventory`.
    pub fn check(&self, inventory: &InventoryFile) -> Vec<SwitchCheck> {
        inventory
            .switches
            .iter()
            .map(|record| {
                let mut problems = Vec::new();
                match self
                    .drivers
                    .validate(record)
                    .and_then(|()| self.drivers.driver(record))
                {
                    Err(err) => problems.push(err.to_string()),
                    Ok(driver) => {
                        for port in inventory.ports.iter().filter(|p| p.switch == record.label) {
                            if let Err(err) = driver.validate_port_name(&port.label) {
                                problems.push(err.to_string());
                            }
                        }
                    }
                }
                SwitchCheck {
                    label: record.label.clone(),
                    problems,
                }
            })
            .collect()
    }

    pub fn validate(&self, inventory_path: &Path) -> Result<()> {
        let inventory = InventoryFile::load(inventory_path)
            .with_context(|| format!("cannot load inventory {}", inventory_path.display()))?;

        let checks = self.check(&inventory);
        let mut invalid = 0;
        for check in &checks {
            if check.is_valid() {
                println!("✓ {}", check.label);
            } else {
                invalid += 1;
                println!("✗ {}", check.label);
                for problem in &check.problems {
                    println!("    {}", problem);
                }
            }
        }

        if invalid > 0 {
            anyhow::bail!("{} of {} switches are invalid", invalid, checks.len());
        }
        Ok(())
    }
}

impl Default for SwitchCommand {
    fn default() -> Self {
        Self::new()
    }
}
