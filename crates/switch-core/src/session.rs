//! Device sessions and the port state machine

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use fabric_net_core::{DeviceError, NetworkError, Result, VlanId};
use log::{debug, info, warn};

use crate::driver::Capability;
use crate::state::PortState;

/// One step the applier wants a port to take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortTransition {
    /// Power the port on and make `vlan` its untagged VLAN
    SetNative(VlanId),
    AddTrunk(VlanId),
    RemoveTrunk(VlanId),
    /// Drop the untagged VLAN and power the port off
    RemoveNative(VlanId),
    /// Tear everything down: trunks first, then the native VLAN, then power
    Revert,
}

impl fmt::Display for PortTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortTransition::SetNative(vlan) => write!(f, "set native vlan {}", vlan),
            PortTransition::AddTrunk(vlan) => write!(f, "add trunk vlan {}", vlan),
            PortTransition::RemoveTrunk(vlan) => write!(f, "remove trunk vlan {}", vlan),
            PortTransition::RemoveNative(vlan) => write!(f, "remove native vlan {}", vlan),
            PortTransition::Revert => f.write_str("revert port"),
        }
    }
}

pub(crate) fn unexpected(switch: &str, port: &str, message: impl Into<String>) -> NetworkError {
    DeviceError::UnexpectedState {
        switch: switch.to_string(),
        port: port.to_string(),
        message: message.into(),
    }
    .into()
}

/// An open connection to one switch.
///
/// The primitive operations map onto command batches; each one either
/// fully succeeds or returns an error. Transport resources are released by
/// [`Session::close`], or on drop if the session is abandoned mid-action.
#[async_trait]
pub trait Session: Send {
    fn switch_label(&self) -> &str;

    /// Capabilities of the driver that opened this session.
    fn capabilities(&self) -> &BTreeSet<Capability>;

    /// Query the device for the current state of `port`.
    async fn port_state(&mut self, port: &str) -> Result<PortState>;

    /// Power the port on and set its untagged VLAN.
    async fn set_native_vlan(&mut self, port: &str, vlan: VlanId) -> Result<()>;

    /// Remove the untagged VLAN and power the port off.
    async fn remove_native_vlan(&mut self, port: &str, vlan: VlanId) -> Result<()>;

    async fn add_trunk_vlan(&mut self, port: &str, vlan: VlanId) -> Result<()>;

    async fn remove_trunk_vlan(&mut self, port: &str, vlan: VlanId) -> Result<()>;

    /// Remove several tagged VLANs. The default issues one batch per VLAN.
    async fn remove_trunk_vlans(&mut self, port: &str, vlans: &BTreeSet<VlanId>) -> Result<()> {
        for vlan in vlans {
            self.remove_trunk_vlan(port, *vlan).await?;
        }
        Ok(())
    }

    async fn port_off(&mut self, port: &str) -> Result<()>;

    async fn close(self: Box<Self>) -> Result<()>;

    /// Drive `port` through `transition`, reading the device state first
    /// so that transitions already in effect are no-ops and transitions that
    /// do not fit the observed state fail with an unexpected-state error.
    async fn apply(&mut self, port: &str, transition: &PortTransition) -> Result<()> {
        let state = self.port_state(port).await?;
        debug!(
            "{}:{} is {} before {}",
            self.switch_label(),
            port,
            state,
            transition
        );

        match transition {
            PortTransition::SetNative(vlan) => match state.native {
                Some(native) if native == *vlan => {
                    info!("{}:{} already has native vlan {}", self.switch_label(), port, vlan);
                    Ok(())
                }
                Some(native) => Err(unexpected(
                    self.switch_label(),
                    port,
                    format!("native vlan is {}, refusing to replace it with {}", native, vlan),
                )),
                None if state.trunks.contains(vlan) => Err(unexpected(
                    self.switch_label(),
                    port,
                    format!("vlan {} is already tagged on the port", vlan),
                )),
                None => self.set_native_vlan(port, *vlan).await,
            },

            PortTransition::AddTrunk(vlan) => {
                if !state.enabled {
                    return Err(unexpected(
                        self.switch_label(),
                        port,
                        format!("cannot tag vlan {} on a port that is off", vlan),
                    ));
                }
                if state.native == Some(*vlan) {
                    return Err(unexpected(
                        self.switch_label(),
                        port,
                        format!("vlan {} is the native vlan of the port", vlan),
                    ));
                }
                if state.trunks.contains(vlan) {
                    info!("{}:{} already carries vlan {} tagged", self.switch_label(), port, vlan);
                    return Ok(());
                }
                self.add_trunk_vlan(port, *vlan).await
            }

            PortTransition::RemoveTrunk(vlan) => {
                if !state.trunks.contains(vlan) {
                    warn!(
                        "{}:{} does not carry vlan {} tagged, nothing to remove",
                        self.switch_label(),
                        port,
                        vlan
                    );
                    return Ok(());
                }
                self.remove_trunk_vlan(port, *vlan).await
            }

            PortTransition::RemoveNative(vlan) => {
                if !state.trunks.is_empty() {
                    return Err(unexpected(
                        self.switch_label(),
                        port,
                        "tagged vlans are still present, refusing to remove the native vlan",
                    ));
                }
                match state.native {
                    Some(native) if native == *vlan => self.remove_native_vlan(port, *vlan).await,
                    Some(native) => Err(unexpected(
                        self.switch_label(),
                        port,
                        format!("native vlan is {}, expected {}", native, vlan),
                    )),
                    None if state.enabled => {
                        warn!(
                            "{}:{} has no native vlan, powering it off",
                            self.switch_label(),
                            port
                        );
                        self.port_off(port).await
                    }
                    None => Ok(()),
                }
            }

            PortTransition::Revert => {
                if !state.trunks.is_empty() {
                    if self.capabilities().contains(&Capability::BatchTrunkRemoval) {
                        self.remove_trunk_vlans(port, &state.trunks).await?;
                    } else {
                        for vlan in &state.trunks {
                            self.remove_trunk_vlan(port, *vlan).await?;
                        }
                    }
                }
                match state.native {
                    Some(native) => self.remove_native_vlan(port, native).await,
                    None if state.enabled => self.port_off(port).await,
                    None => Ok(()),
                }
            }
        }
    }
}
