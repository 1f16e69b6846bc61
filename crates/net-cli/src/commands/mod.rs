//! CLI commands

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use fabric_net_api::AppContext;
use fabric_net_config::{EngineConfig, InventoryFile};

pub mod action;
pub mod network;
pub mod port;
pub mod status;
pub mod switch;
pub mod vlans;

pub use action::ActionCommand;
pub use network::NetworkCommand;
pub use port::PortCommand;
pub use status::StatusCommand;
pub use switch::SwitchCommand;
pub use vlans::VlansCommand;

/// Load engine settings and the inventory, and bring the engine up.
pub async fn bootstrap(config: Option<&Path>, inventory: &Path) -> Result<Arc<AppContext>> {
    let engine = EngineConfig::load(config).context("cannot load engine configuration")?;
    let file = InventoryFile::load(inventory)
        .with_context(|| format!("cannot load inventory {}", inventory.display()))?;
    AppContext::bootstrap(engine, file).await
}
