use std::str::FromStr;

use mac_address::MacAddress;
use serde::{Deserialize, Serialize};

use crate::error::SharedTypeError;
use crate::node::NicRef;
use crate::vlan::Channel;

/// Who owns a network. Public networks may be joined by any project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkOwner {
    Public,
    Project(String),
}

/// A logical isolation domain backed by one or more VLANs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub label: String,
    pub owner: NetworkOwner,
    /// Projects permitted to attach nics to this network
    #[serde(default)]
    pub access: Vec<String>,
    /// Assigned VLAN id(s) in range syntax, e.g. "1511" or "200-203".
    /// Must not change while any attachment references the network.
    pub network_id: String,
}

impl Network {
    pub fn new(label: impl Into<String>, owner: NetworkOwner, network_id: impl Into<String>) -> Self {
        let owner_access = match &owner {
            NetworkOwner::Project(project) => vec![project.clone()],
            NetworkOwner::Public => Vec::new(),
        };

        Self {
            label: label.into(),
            owner,
            access: owner_access,
            network_id: network_id.into(),
        }
    }

    pub fn is_public(&self) -> bool {
        self.owner == NetworkOwner::Public
    }

    /// Whether nics of `project` may attach to this network.
    pub fn is_accessible_by(&self, project: &str) -> bool {
        if self.is_public() {
            return true;
        }
        if let NetworkOwner::Project(owner) = &self.owner {
            if owner == project {
                return true;
            }
        }
        self.access.iter().any(|p| p == project)
    }
}

/// Committed (nic, network, channel) relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkAttachment {
    pub nic: NicRef,
    pub network: String,
    pub channel: Channel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacAddr(pub MacAddress);

struct MacAddrVisitor;

impl<'de> serde::de::Visitor<'de> for MacAddrVisitor {
    type Value = MacAddr;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a MAC address string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse::<MacAddress>()
            .map(MacAddr)
            .map_err(|_| E::custom(format!("invalid MAC address: {}", v)))
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(MacAddrVisitor)
    }
}

impl Serialize for MacAddr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl FromStr for MacAddr {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<MacAddress>()
            .map(MacAddr)
            .map_err(|_| SharedTypeError::InvalidValue {
                field: "mac_address",
                value: s.to_string(),
            })
    }
}

impl std::fmt::Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
