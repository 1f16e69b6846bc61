//! Connect, detach and revert requests

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use fabric_net_api::AppContext;
use fabric_net_core::{ActionId, ActionStatus, ActionType, Channel, NicRef};
use log::info;

/// Queues one request, applies it, and writes the updated inventory back.
pub struct ActionCommand {
    context: Arc<AppContext>,
    inventory_path: PathBuf,
}

impl ActionCommand {
    pub fn new(context: Arc<AppContext>, inventory_path: impl Into<PathBuf>) -> Self {
        Self {
            context,
            inventory_path: inventory_path.into(),
        }
    }

    pub async fn connect(&self, nic: &NicRef, network: &str, channel: Channel) -> Result<ActionId> {
        let id = self
            .context
            .networking_api
            .enqueue(ActionType::Connect, nic, network, Some(channel))
            .await
            .with_context(|| format!("cannot connect {} to {}", nic, network))?;
        self.run(id).await
    }

    pub async fn detach(&self, nic: &NicRef, network: &str, channel: Option<Channel>) -> Result<ActionId> {
        let id = self
            .context
            .networking_api
            .enqueue(ActionType::Detach, nic, network, channel)
            .await
            .with_context(|| format!("cannot detach {} from {}", nic, network))?;
        self.run(id).await
    }

    pub async fn revert(&self, switch: &str, port: &str) -> Result<ActionId> {
        let id = self
            .context
            .networking_api
            .revert_port(switch, port)
            .await
            .with_context(|| format!("cannot revert port {}:{}", switch, port))?;
        self.run(id).await
    }

    async fn run(&self, id: ActionId) -> Result<ActionId> {
        info!("action {} queued", id);
        self.context.applier.drain().await;

        let report = self.context.networking_api.status(id).await?;
        if report.status == ActionStatus::Completed {
            let inventory = self.context.inventory.to_file().await;
            inventory.save(&self.inventory_path).with_context(|| {
                format!("cannot write inventory {}", self.inventory_path.display())
            })?;
            println!("{} {}", id, report.status);
            return Ok(id);
        }

        anyhow::bail!(
            "action {} {}: {}",
            id,
            report.status,
            report.error.unwrap_or_default()
        )
    }
}
