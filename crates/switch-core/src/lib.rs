//! Fabric Switch Core
//!
//! Contracts every switch family implements: the driver (validation,
//! legality, capabilities, session acquisition), the session (show and
//! config batches against one device connection) and the transport that
//! carries command batches to the device.

pub mod driver;
pub mod legality;
pub mod session;
pub mod state;
pub mod transport;


pub use driver::{Capability, SwitchDriver};
pub use legality::check_native_networks;
pub use session::{PortTransition, Session};
pub use state::{PortMode, PortState};
pub use transport::{CommandRunner, Connector, DeviceTarget};
