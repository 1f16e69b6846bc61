//! Network commands

use std::sync::Arc;

use anyhow::{Context, Result};
use fabric_net_api::AppContext;

pub struct NetworkCommand {
    context: Arc<AppContext>,
}

impl NetworkCommand {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Channel names usable on `network`, native first.
    pub async fn channels(&self, network: &str) -> Result<Vec<String>> {
        let channels = self
            .context
            .networking_api
            .legal_channels(network)
            .await
            .with_context(|| format!("cannot list channels of network {}", network))?;
        Ok(channels.iter().map(ToString::to_string).collect())
    }

    pub async fn execute_channels(&self, network: &str) -> Result<()> {
        for channel in self.channels(network).await? {
            println!("{}", channel);
        }
        Ok(())
    }
}
