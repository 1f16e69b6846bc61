use std::fmt;

use serde::{Deserialize, Serialize};

use crate::network::MacAddr;
use crate::switch::PortRef;

/// Identifies a nic by its node and nic labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NicRef {
    pub node: String,
    pub nic: String,
}

impl NicRef {
    pub fn new(node: impl Into<String>, nic: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            nic: nic.into(),
        }
    }
}

impl fmt::Display for NicRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.node, self.nic)
    }
}

/// A node's network interface; wired to at most one switch port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nic {
    pub label: String,
    pub macaddr: MacAddr,
    #[serde(default)]
    pub port: Option<PortRef>,
}

/// A bare-metal node. `project` is the tenant currently holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub label: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub nics: Vec<Nic>,
}

impl Node {
    pub fn nic(&self, label: &str) -> Option<&Nic> {
        self.nics.iter().find(|nic| nic.label == label)
    }

    pub fn nic_ref(&self, label: &str) -> NicRef {
        NicRef::new(self.label.clone(), label)
    }
}
