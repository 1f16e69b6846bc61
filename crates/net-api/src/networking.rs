//! Networking request handling
//!
//! Requests are validated here, synchronously, against the inventory and the
//! switch driver. Only requests that pass every check become queued actions;
//! the device is never touched from this layer except to read port state.

use std::sync::Arc;

use fabric_net_apply::{Inventory, NetworkApplier};
use fabric_net_core::channel::{legal_channels, resolve};
use fabric_net_core::{
    ActionId, ActionKind, ActionStatusReport, ActionType, ApiError, Channel, NetworkError,
    NetworkingAction, NicRef, Port, PortRef, Result, SwitchRecord, ValidationError,
};
use fabric_switch_core::{PortMode, PortState};
use fabric_switch_drivers::DriverRegistry;
use log::{debug, info, warn};
use serde::Serialize;

/// Live view of one switch port
#[derive(Debug, Clone, Serialize)]
pub struct PortReport {
    pub port: PortRef,
    pub mode: PortMode,
    pub state: PortState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nic: Option<NicRef>,
}

fn permission_denied(operation: impl Into<String>) -> NetworkError {
    ApiError::PermissionDenied {
        operation: operation.into(),
    }
    .into()
}

pub struct NetworkingApi {
    inventory: Arc<dyn Inventory>,
    drivers: Arc<DriverRegistry>,
    applier: Arc<NetworkApplier>,
}

impl NetworkingApi {
    pub fn new(
        inventory: Arc<dyn Inventory>,
        drivers: Arc<DriverRegistry>,
        applier: Arc<NetworkApplier>,
    ) -> Self {
        Self {
            inventory,
            drivers,
            applier,
        }
    }

    /// Validate a connect or detach request and queue it.
    ///
    /// `channel` is required to connect. A detach without a channel uses the
    /// channel of the existing attachment.
    pub async fn enqueue(
        &self,
        op: ActionType,
        nic_ref: &NicRef,
        network_label: &str,
        channel: Option<Channel>,
    ) -> Result<ActionId> {
        if op == ActionType::RevertPort {
            return Err(NetworkError::bad_argument(
                "port reverts are requested by switch and port, not by network",
            ));
        }

        let node = self.inventory.node(&nic_ref.node).await?;
        let nic = self.inventory.nic(nic_ref).await?;
        let project = node.project.as_deref().ok_or_else(|| {
            permission_denied(format!("node {} is not allocated to a project", node.label))
        })?;

        let network = self.inventory.network(network_label).await?;
        if !network.is_accessible_by(project) {
            return Err(permission_denied(format!(
                "project {} has no access to network {}",
                project, network.label
            )));
        }

        let port = nic.port.ok_or_else(|| {
            NetworkError::bad_argument(format!("nic {} is not connected to a switch port", nic_ref))
        })?;
        let attachments = self.inventory.attachments_for_nic(nic_ref).await?;
        let existing = attachments.iter().find(|a| a.network == network.label);

        let channel = match op {
            ActionType::Connect => {
                if existing.is_some() {
                    return Err(ApiError::Conflict {
                        resource: format!("nic {}", nic_ref),
                        message: format!("already attached to network {}", network.label),
                    }
                    .into());
                }
                channel.ok_or_else(|| NetworkError::bad_argument("a channel is required to connect"))?
            }
            _ => {
                let existing = existing.ok_or_else(|| {
                    NetworkError::not_found(format!(
                        "attachment of {} to network {}",
                        nic_ref, network.label
                    ))
                })?;
                match channel {
                    Some(requested) if requested != existing.channel => {
                        return Err(ValidationError::IllegalChannel {
                            channel: requested.to_string(),
                            network: network.label.clone(),
                        }
                        .into())
                    }
                    _ => existing.channel,
                }
            }
        };
        let vlan = resolve(&network, &channel)?;

        if self.applier.queue().has_open_action_for(nic_ref).await {
            return Err(ValidationError::Blocked {
                message: format!("nic {} already has a pending action", nic_ref),
            }
            .into());
        }

        let record = self.inventory.switch(&port.switch).await?;
        let driver = self.drivers.driver(&record)?;
        driver.ensure_legal_operation(&attachments, op, Some(&channel))?;

        let kind = match op {
            ActionType::Connect => ActionKind::Connect {
                network: network.label.clone(),
                channel,
                vlan,
            },
            _ => ActionKind::Detach {
                network: network.label.clone(),
                channel,
                vlan,
            },
        };
        debug!("{} {} {} on {} (VLAN {})", op, nic_ref, network.label, channel, vlan);
        self.applier
            .submit(NetworkingAction::new(nic_ref.clone(), kind))
            .await
    }

    /// Queue removal of every VLAN from a port, powering it off.
    pub async fn revert_port(&self, switch: &str, port: &str) -> Result<ActionId> {
        let port_ref = PortRef::new(switch, port);
        let nic = self.inventory.port(&port_ref).await?.nic.ok_or_else(|| {
            NetworkError::bad_argument(format!("port {} has no nic connected", port_ref))
        })?;
        info!("revert of port {} requested", port_ref);
        self.applier
            .submit(NetworkingAction::new(nic, ActionKind::RevertPort))
            .await
    }

    /// Status of an action. Actions the queue no longer remembers are looked
    /// up in the journal, when one is kept.
    pub async fn status(&self, id: ActionId) -> Result<ActionStatusReport> {
        match self.applier.queue().status(id).await {
            Ok(report) => Ok(report),
            Err(NetworkError::Api(ApiError::NotFound { resource })) => {
                let Some(journal) = self.applier.journal() else {
                    return Err(NetworkError::not_found(resource));
                };
                journal
                    .latest(id)
                    .await?
                    .map(|entry| ActionStatusReport {
                        id,
                        status: entry.status,
                        error: entry.error,
                    })
                    .ok_or_else(|| NetworkError::not_found(resource))
            }
            Err(err) => Err(err),
        }
    }

    /// Drop a pending action before it reaches the device.
    pub async fn cancel(&self, id: ActionId) -> Result<ActionStatusReport> {
        self.applier.cancel(id).await.map(|action| action.report())
    }

    /// Channels a nic may use on `network`, native first.
    pub async fn legal_channels(&self, network: &str) -> Result<Vec<Channel>> {
        let network = self.inventory.network(network).await?;
        legal_channels(&network)
    }

    /// Validate the driver configuration of a switch and store it.
    pub async fn register_switch(&self, record: SwitchRecord) -> Result<()> {
        self.drivers.validate(&record)?;
        self.inventory.add_switch(record).await
    }

    /// Register a port after the switch driver has accepted its name.
    pub async fn register_port(&self, switch: &str, port: &str) -> Result<()> {
        let record = self.inventory.switch(switch).await?;
        let driver = self.drivers.driver(&record)?;
        driver.validate_port_name(port)?;
        self.inventory
            .add_port(Port {
                switch: switch.to_string(),
                label: port.to_string(),
                nic: None,
            })
            .await
    }

    /// Read the current VLAN state of a port from the device.
    pub async fn show_port(&self, switch: &str, port: &str) -> Result<PortReport> {
        let port_ref = PortRef::new(switch, port);
        let known = self.inventory.port(&port_ref).await?;
        let record = self.inventory.switch(switch).await?;
        let driver = self.drivers.driver(&record)?;

        let mut session = driver.session().await?;
        let state = session.port_state(port).await;
        if let Err(err) = session.close().await {
            warn!("closing session on {} failed: {}", switch, err);
        }
        let state = state?;

        Ok(PortReport {
            port: port_ref,
            mode: state.mode(),
            state,
            nic: known.nic,
        })
    }
}
