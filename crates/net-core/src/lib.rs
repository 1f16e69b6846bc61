//! Fabric Isolation Core
//!
//! Error taxonomy, VLAN range syntax and the channel allocator shared by the
//! switch drivers, the action queue and the API layer.

pub mod channel;
pub mod error;
pub mod vlan;

pub use channel::VlanPool;
pub use error::{ApiError, DeviceError, NetworkError, ValidationError};
pub use fabric_shared_types::*;
pub use vlan::{format_vlan_ranges, parse_vlan_ranges};

/// Result type for fabric operations
pub type Result<T> = std::result::Result<T, NetworkError>;
