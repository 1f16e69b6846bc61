//! Switch driver contract

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use fabric_net_core::{ActionType, Channel, NetworkAttachment, Result, SwitchType};
use serde::{Deserialize, Serialize};

use crate::legality::check_native_networks;
use crate::session::Session;

/// Optional features a driver may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Untagged VLAN per port
    NativeVlan,
    /// Tagged VLANs per port
    TrunkVlans,
    /// All tagged VLANs of a port can be removed in one command batch
    BatchTrunkRemoval,
    /// Running configuration is written to startup configuration after changes
    PersistConfig,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::NativeVlan => "native-vlan",
            Capability::TrunkVlans => "trunk-vlans",
            Capability::BatchTrunkRemoval => "batch-trunk-removal",
            Capability::PersistConfig => "persist-config",
        };
        f.write_str(name)
    }
}

/// Per switch family implementation of the device-control contract.
///
/// One instance exists per registered switch. Drivers hold no VLAN state of
/// their own; everything they know about a port comes from the device
/// through a [`Session`].
#[async_trait]
pub trait SwitchDriver: Send + Sync {
    /// Validate driver-specific connection parameters at registration time,
    /// before any network call.
    fn validate(config: &serde_json::Value) -> Result<()>
    where
        Self: Sized;

    fn switch_type(&self) -> SwitchType;

    /// Label of the switch this driver instance controls.
    fn label(&self) -> &str;

    /// Enforce the family's port naming grammar.
    fn validate_port_name(&self, port: &str) -> Result<()>;

    /// Reject operations that would violate port invariants, given the
    /// nic's committed attachments. Families may layer extra restrictions
    /// on top of the shared checks.
    fn ensure_legal_operation(
        &self,
        attachments: &[NetworkAttachment],
        op: ActionType,
        channel: Option<&Channel>,
    ) -> Result<()> {
        check_native_networks(attachments, op, channel)
    }

    fn capabilities(&self) -> BTreeSet<Capability>;

    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Open a session against the physical device. Resources held by the
    /// session are released when it is closed or dropped.
    async fn session(&self) -> Result<Box<dyn Session>>;
}
