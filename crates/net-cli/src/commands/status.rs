//! Action status command

use std::sync::Arc;

use anyhow::{Context, Result};
use fabric_net_api::AppContext;
use fabric_net_core::{ActionId, ActionStatusReport};

pub struct StatusCommand {
    context: Arc<AppContext>,
}

impl StatusCommand {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    pub async fn report(&self, id: ActionId) -> Result<ActionStatusReport> {
        if self.context.applier.journal().is_none() {
            anyhow::bail!("no journal_dir configured, earlier actions cannot be looked up");
        }
        self.context
            .networking_api
            .status(id)
            .await
            .with_context(|| format!("no record of action {}", id))
    }

    pub async fn execute(&self, id: ActionId, json: bool) -> Result<()> {
        let report = self.report(id).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        match &report.error {
            Some(error) => println!("{} {}: {}", report.id, report.status, error),
            None => println!("{} {}", report.id, report.status),
        }
        Ok(())
    }
}
