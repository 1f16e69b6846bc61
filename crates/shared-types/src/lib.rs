pub mod action;
pub mod error;
pub mod events;
pub mod network;
pub mod node;
pub mod switch;
pub mod vlan;

pub use action::{
    ActionId, ActionKind, ActionStatus, ActionStatusReport, ActionType, NetworkingAction,
};
pub use error::SharedTypeError;
pub use events::SystemEvent;
pub use network::{MacAddr, Network, NetworkAttachment, NetworkOwner};
pub use node::{Nic, NicRef, Node};
pub use switch::{Port, PortRef, SwitchRecord, SwitchType};
pub use vlan::{Channel, VlanId};
