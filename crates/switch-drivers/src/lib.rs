//! Fabric Switch Drivers
//!
//! Driver families implementing the switch core contracts:
//! - Dell Networking OS9, driven through Ansible playbooks
//! - an in-memory mock with fault injection
//!
//! plus the registry that maps switch types to drivers.

pub mod ansible;
pub mod dellos9;
pub mod mock;
pub mod registry;

#[cfg(test)]
mod tests;

pub use ansible::{AnsibleConnector, AnsibleRunner};
pub use dellos9::{DellNos9Config, DellNos9Driver};
pub use mock::{MockFabric, MockFault, MockOperation, MockSwitchDriver};
pub use registry::DriverRegistry;
