//! Device transport contracts
//!
//! The engine never speaks a wire protocol itself. A [`Connector`] opens a
//! [`CommandRunner`] for one device; the runner executes exec-mode commands
//! and ordered configuration batches. Implementations may use SSH, HTTP or an
//! automation tool.

use std::fmt;

use async_trait::async_trait;
use fabric_net_core::Result;

/// Where and as whom to reach a device.
#[derive(Clone)]
pub struct DeviceTarget {
    /// Switch label, used in errors and logs
    pub switch: String,
    pub hostname: String,
    pub username: String,
    pub password: String,
    /// Operating system identifier understood by the transport, e.g. "dellos9"
    pub network_os: String,
}

impl fmt::Debug for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceTarget")
            .field("switch", &self.switch)
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("network_os", &self.network_os)
            .finish()
    }
}

/// Executes commands against one device connection.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run exec-mode commands (show, write memory) and return one output
    /// per command, in order.
    async fn exec(&self, operation: &str, commands: &[String]) -> Result<Vec<String>>;

    /// Apply `commands` in order as one configuration transaction. An error
    /// means the batch as a whole failed; no command in it may be assumed
    /// applied.
    async fn configure(&self, operation: &str, commands: &[String]) -> Result<()>;
}

/// Opens runners for devices.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &DeviceTarget) -> Result<Box<dyn CommandRunner>>;
}
