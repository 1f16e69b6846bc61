use serde::{Deserialize, Serialize};

use crate::action::ActionId;
use crate::node::NicRef;

/// Lifecycle notifications published by the action queue and applier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SystemEvent {
    ActionQueued { id: ActionId, nic: NicRef },
    ActionStarted { id: ActionId },
    ActionCompleted { id: ActionId },
    ActionFailed { id: ActionId, error: String },
    /// A pending action was dropped before any device call
    ActionCancelled { id: ActionId },
}

impl SystemEvent {
    pub fn action_id(&self) -> ActionId {
        match self {
            SystemEvent::ActionQueued { id, .. }
            | SystemEvent::ActionStarted { id }
            | SystemEvent::ActionCompleted { id }
            | SystemEvent::ActionFailed { id, .. }
            | SystemEvent::ActionCancelled { id } => *id,
        }
    }
}
