//! Queued networking intents and their lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SharedTypeError;
use crate::node::NicRef;
use crate::vlan::{Channel, VlanId};

/// Opaque handle returned by `enqueue` and used to poll status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(Uuid);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActionId {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(ActionId)
            .map_err(|_| SharedTypeError::InvalidValue {
                field: "action_id",
                value: s.to_string(),
            })
    }
}

/// Operation class used by legality checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Connect,
    Detach,
    RevertPort,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Connect => write!(f, "connect"),
            ActionType::Detach => write!(f, "detach"),
            ActionType::RevertPort => write!(f, "revert_port"),
        }
    }
}

/// What an action does. The VLAN is resolved from the channel when the
/// action is enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ActionKind {
    Connect {
        network: String,
        channel: Channel,
        vlan: VlanId,
    },
    Detach {
        network: String,
        channel: Channel,
        vlan: VlanId,
    },
    /// Remove every VLAN from the nic's port and power it off
    RevertPort,
}

impl ActionKind {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionKind::Connect { .. } => ActionType::Connect,
            ActionKind::Detach { .. } => ActionType::Detach,
            ActionKind::RevertPort => ActionType::RevertPort,
        }
    }

    pub fn channel(&self) -> Option<Channel> {
        match self {
            ActionKind::Connect { channel, .. } | ActionKind::Detach { channel, .. } => {
                Some(*channel)
            }
            ActionKind::RevertPort => None,
        }
    }

    pub fn network(&self) -> Option<&str> {
        match self {
            ActionKind::Connect { network, .. } | ActionKind::Detach { network, .. } => {
                Some(network)
            }
            ActionKind::RevertPort => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Completed | ActionStatus::Failed)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Pending => write!(f, "pending"),
            ActionStatus::InProgress => write!(f, "in_progress"),
            ActionStatus::Completed => write!(f, "completed"),
            ActionStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkingAction {
    pub id: ActionId,
    pub nic: NicRef,
    pub kind: ActionKind,
    pub status: ActionStatus,
    /// Human readable failure detail, set only when `status` is `Failed`
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NetworkingAction {
    pub fn new(nic: NicRef, kind: ActionKind) -> Self {
        let now = Utc::now();
        Self {
            id: ActionId::new(),
            nic,
            kind,
            status: ActionStatus::Pending,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn report(&self) -> ActionStatusReport {
        ActionStatusReport {
            id: self.id,
            status: self.status,
            error: self.error.clone(),
        }
    }
}

/// Answer to a status poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStatusReport {
    pub id: ActionId,
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
