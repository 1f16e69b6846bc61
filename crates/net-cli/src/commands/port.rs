//! Port inspection

use std::sync::Arc;

use anyhow::{Context, Result};
use fabric_net_api::{AppContext, PortReport};
use fabric_net_core::format_vlan_ranges;

pub struct PortCommand {
    context: Arc<AppContext>,
}

impl PortCommand {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    pub async fn show(&self, switch: &str, port: &str, json: bool) -> Result<()> {
        let report = self
            .context
            .networking_api
            .show_port(switch, port)
            .await
            .with_context(|| format!("cannot read port {}:{}", switch, port))?;

        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", render(&report));
        }
        Ok(())
    }
}

pub fn render(report: &PortReport) -> String {
    let native = report
        .state
        .native
        .map(|vlan| vlan.to_string())
        .unwrap_or_else(|| "-".to_string());
    let trunks = if report.state.trunks.is_empty() {
        "-".to_string()
    } else {
        format_vlan_ranges(&report.state.trunks)
    };
    let nic = report
        .nic
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{:<10} {}\n{:<10} {}\n{:<10} {}\n{:<10} {}\n{:<10} {}\n",
        "port", report.port, "mode", report.mode, "native", native, "trunks", trunks, "nic", nic
    )
}
