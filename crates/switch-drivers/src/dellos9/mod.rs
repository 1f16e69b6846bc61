//! Dell Networking OS9 driver
//!
//! Talks to the switch through a [`Connector`] (Ansible by default) using
//! the `dellos9_command` and `dellos9_config` modules. Port state is read
//! from `show running-config interface` (admin state) and
//! `show interface switchport` (VLAN membership).

pub mod commands;
pub mod parse;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use fabric_net_core::{NetworkError, Result, SwitchRecord, SwitchType, ValidationError, VlanId};
use fabric_switch_core::{
    Capability, CommandRunner, Connector, DeviceTarget, PortState, Session, SwitchDriver,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use self::commands::CommandSet;

/// Interface classes accepted in `interface_type`.
pub const INTERFACE_TYPES: &[&str] = &[
    "GigabitEthernet",
    "TenGigabitEthernet",
    "TwentyFiveGigE",
    "fortyGigE",
    "fiftyGigE",
    "hundredGigE",
];

const NETWORK_OS: &str = "dellos9";

/// Connection parameters stored with a Dell OS9 switch record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DellNos9Config {
    pub hostname: String,
    pub username: String,
    pub password: String,
    /// Interface class used in every port command, e.g. "TenGigabitEthernet"
    pub interface_type: String,
    /// Write the running configuration to startup after each change
    #[serde(default)]
    pub save: bool,
}

impl DellNos9Config {
    pub fn from_value(config: &serde_json::Value) -> Result<Self> {
        let parsed: Self = serde_json::from_value(config.clone()).map_err(|e| schema(e.to_string()))?;

        for (field, value) in [
            ("hostname", &parsed.hostname),
            ("username", &parsed.username),
            ("password", &parsed.password),
        ] {
            if value.trim().is_empty() {
                return Err(schema(format!("'{}' must not be empty", field)));
            }
        }

        if !INTERFACE_TYPES.contains(&parsed.interface_type.as_str()) {
            return Err(schema(format!(
                "unknown interface_type '{}', expected one of {}",
                parsed.interface_type,
                INTERFACE_TYPES.join(", ")
            )));
        }

        Ok(parsed)
    }
}

fn schema(message: String) -> NetworkError {
    ValidationError::Schema {
        driver: SwitchType::DellNos9.to_string(),
        message,
    }
    .into()
}

/// Driver for one Dell OS9 switch.
pub struct DellNos9Driver {
    label: String,
    config: DellNos9Config,
    connector: Arc<dyn Connector>,
}

impl DellNos9Driver {
    pub fn new(record: &SwitchRecord, connector: Arc<dyn Connector>) -> Result<Self> {
        Ok(Self {
            label: record.label.clone(),
            config: DellNos9Config::from_value(&record.config)?,
            connector,
        })
    }

    fn target(&self) -> DeviceTarget {
        DeviceTarget {
            switch: self.label.clone(),
            hostname: self.config.hostname.clone(),
            username: self.config.username.clone(),
            password: self.config.password.clone(),
            network_os: NETWORK_OS.to_string(),
        }
    }
}

#[async_trait]
impl SwitchDriver for DellNos9Driver {
    fn validate(config: &serde_json::Value) -> Result<()> {
        DellNos9Config::from_value(config).map(|_| ())
    }

    fn switch_type(&self) -> SwitchType {
        SwitchType::DellNos9
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn validate_port_name(&self, port: &str) -> Result<()> {
        if parse::is_valid_port_name(port) {
            Ok(())
        } else {
            Err(NetworkError::bad_argument(format!(
                "invalid port name '{}': ports on this switch are named like 1/0/1 or 1/2",
                port
            )))
        }
    }

    fn capabilities(&self) -> BTreeSet<Capability> {
        let mut capabilities = BTreeSet::from([Capability::NativeVlan, Capability::TrunkVlans]);
        if self.config.save {
            capabilities.insert(Capability::PersistConfig);
        }
        capabilities
    }

    async fn session(&self) -> Result<Box<dyn Session>> {
        let runner = self.connector.connect(&self.target()).await?;
        debug!("opened dellos9 session on {}", self.label);
        Ok(Box::new(DellNos9Session {
            label: self.label.clone(),
            capabilities: self.capabilities(),
            commands: CommandSet::new(self.config.interface_type.clone()),
            save: self.config.save,
            runner,
        }))
    }
}

/// Session on one Dell OS9 switch.
pub struct DellNos9Session {
    label: String,
    capabilities: BTreeSet<Capability>,
    commands: CommandSet,
    save: bool,
    runner: Box<dyn CommandRunner>,
}

impl DellNos9Session {
    async fn configure(&mut self, operation: &str, commands: Vec<String>) -> Result<()> {
        info!("{} on {}: {:?}", operation, self.label, commands);
        self.runner.configure(operation, &commands).await?;
        if self.save {
            self.runner
                .exec("save configuration", &self.commands.save())
                .await?;
        }
        Ok(())
    }

    /// Run every show command in one round trip; missing outputs read as
    /// empty.
    async fn show(&self, operation: &str, commands: Vec<String>) -> Result<Vec<String>> {
        let expected = commands.len();
        let mut outputs = self.runner.exec(operation, &commands).await?;
        outputs.resize(expected, String::new());
        Ok(outputs)
    }
}

#[async_trait]
impl Session for DellNos9Session {
    fn switch_label(&self) -> &str {
        &self.label
    }

    fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    async fn port_state(&mut self, port: &str) -> Result<PortState> {
        let commands = vec![
            self.commands.show_running_config(port),
            self.commands.show_switchport(port),
        ];
        let outputs = self.show("show port information", commands).await?;
        let (running, switchport) = (&outputs[0], &outputs[1]);

        if !parse::parse_admin_state(&self.label, port, running)? {
            return Ok(PortState::off());
        }
        Ok(PortState {
            enabled: true,
            native: parse::parse_native_vlan(&self.label, port, switchport)?,
            trunks: parse::parse_trunk_vlans(&self.label, port, switchport)?,
        })
    }

    async fn set_native_vlan(&mut self, port: &str, vlan: VlanId) -> Result<()> {
        let commands = self.commands.add_native_vlan(port, vlan);
        self.configure("add native vlan", commands).await
    }

    async fn remove_native_vlan(&mut self, port: &str, vlan: VlanId) -> Result<()> {
        let commands = self.commands.remove_native_vlan(port, vlan);
        self.configure("remove native vlan", commands).await
    }

    async fn add_trunk_vlan(&mut self, port: &str, vlan: VlanId) -> Result<()> {
        let commands = self.commands.add_trunk_vlan(port, vlan);
        self.configure("add vlan to trunk", commands).await
    }

    async fn remove_trunk_vlan(&mut self, port: &str, vlan: VlanId) -> Result<()> {
        let commands = self.commands.remove_trunk_vlan(port, vlan);
        self.configure(&format!("remove vlan {}", vlan), commands).await
    }

    async fn port_off(&mut self, port: &str) -> Result<()> {
        let commands = self.commands.port_off(port);
        self.configure("port off", commands).await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        debug!("closing dellos9 session on {}", self.label);
        Ok(())
    }
}
