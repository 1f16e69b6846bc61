//! Engine settings

use std::path::{Path, PathBuf};
use std::time::Duration;

use fabric_net_core::VlanPool;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Prefix of environment overrides, e.g. `FABRIC_COMMAND_TIMEOUT_SECS=30`
pub const ENV_PREFIX: &str = "FABRIC";

/// Runtime settings of the action engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound for one remote command batch
    pub command_timeout_secs: u64,
    /// Program used to run device playbooks
    pub ansible_playbook: String,
    /// Where the action journal is written; no journal when unset
    pub journal_dir: Option<PathBuf>,
    /// Terminal actions kept for status queries
    pub history_limit: usize,
    /// VLANs handed out to networks created without an explicit id
    pub vlan_pool: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: 120,
            ansible_playbook: "ansible-playbook".to_string(),
            journal_dir: None,
            history_limit: 1024,
            vlan_pool: "100-200".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load settings from an optional file, then apply `FABRIC_*`
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("loading engine configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "command_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid(
                "history_limit must be greater than zero".to_string(),
            ));
        }
        if self.ansible_playbook.trim().is_empty() {
            return Err(ConfigError::Invalid("ansible_playbook must not be empty".to_string()));
        }
        self.vlan_pool()?;
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Fresh pool over the configured range
    pub fn vlan_pool(&self) -> Result<VlanPool, ConfigError> {
        VlanPool::new(&self.vlan_pool)
            .map_err(|e| ConfigError::Invalid(format!("vlan_pool: {}", e)))
    }
}
