use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SharedTypeError;
use crate::node::NicRef;

/// Switch families with a driver implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchType {
    /// Dell S-series running OS9, driven through Ansible
    DellNos9,
    /// In-memory switch used by tests and dry runs
    Mock,
}

impl fmt::Display for SwitchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchType::DellNos9 => write!(f, "dellnos9"),
            SwitchType::Mock => write!(f, "mock"),
        }
    }
}

impl FromStr for SwitchType {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dellnos9" => Ok(SwitchType::DellNos9),
            "mock" => Ok(SwitchType::Mock),
            _ => Err(SharedTypeError::Unsupported(format!("switch type '{}'", s))),
        }
    }
}

/// Registered switch. `config` holds the driver-specific connection
/// parameters and is validated against the driver's schema before the
/// record is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchRecord {
    pub label: String,
    #[serde(rename = "type")]
    pub switch_type: SwitchType,
    pub config: serde_json::Value,
}

/// Identifies a port by its switch and family-specific port label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortRef {
    pub switch: String,
    pub port: String,
}

impl PortRef {
    pub fn new(switch: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            switch: switch.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.switch, self.port)
    }
}

/// Physical switch interface; carries at most one nic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub switch: String,
    pub label: String,
    #[serde(default)]
    pub nic: Option<NicRef>,
}

impl Port {
    pub fn port_ref(&self) -> PortRef {
        PortRef::new(self.switch.clone(), self.label.clone())
    }
}
