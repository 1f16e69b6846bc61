//! In-memory switch for tests and dry runs
//!
//! All mock switches of a process share one [`MockFabric`], so state set
//! through one session is visible to the next, much like a real device.
//! Failures can be injected per switch and operation.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use fabric_net_core::{DeviceError, NetworkError, Result, SwitchRecord, SwitchType, ValidationError, VlanId};
use fabric_switch_core::{Capability, PortState, Session, SwitchDriver};
use log::debug;
use serde::{Deserialize, Serialize};

/// Operations a fault can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Connect,
    PortState,
    SetNative,
    RemoveNative,
    AddTrunk,
    RemoveTrunk,
    PortOff,
}

/// How an injected fault surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFault {
    Communication,
    Timeout,
}

#[derive(Default)]
struct FabricState {
    ports: HashMap<(String, String), PortState>,
    faults: HashMap<(String, MockOperation), VecDeque<MockFault>>,
    journal: Vec<String>,
}

/// Shared state of every mock switch.
#[derive(Clone, Default)]
pub struct MockFabric {
    state: Arc<Mutex<FabricState>>,
}

impl MockFabric {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FabricState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn port_state(&self, switch: &str, port: &str) -> PortState {
        self.lock()
            .ports
            .get(&(switch.to_string(), port.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Overwrite a port, e.g. to simulate configuration done by hand.
    pub fn set_port_state(&self, switch: &str, port: &str, state: PortState) {
        self.lock()
            .ports
            .insert((switch.to_string(), port.to_string()), state);
    }

    /// Make the next `operation` on `switch` fail. Faults queue up and are
    /// consumed one per call.
    pub fn inject_fault(&self, switch: &str, operation: MockOperation, fault: MockFault) {
        self.lock()
            .faults
            .entry((switch.to_string(), operation))
            .or_default()
            .push_back(fault);
    }

    /// Every successful device change, as "switch port operation".
    pub fn journal(&self) -> Vec<String> {
        self.lock().journal.clone()
    }

    fn check_fault(&self, switch: &str, operation: MockOperation) -> Result<()> {
        let fault = self
            .lock()
            .faults
            .get_mut(&(switch.to_string(), operation))
            .and_then(VecDeque::pop_front);

        match fault {
            None => Ok(()),
            Some(MockFault::Communication) => Err(DeviceError::Communication {
                switch: switch.to_string(),
                message: format!("injected failure on {:?}", operation),
            }
            .into()),
            Some(MockFault::Timeout) => Err(DeviceError::Timeout {
                switch: switch.to_string(),
                operation: format!("{:?}", operation),
                seconds: 0,
            }
            .into()),
        }
    }

    fn update(
        &self,
        switch: &str,
        port: &str,
        operation: MockOperation,
        entry: String,
        change: impl FnOnce(&mut PortState),
    ) -> Result<()> {
        self.check_fault(switch, operation)?;
        let mut state = self.lock();
        change(
            state
                .ports
                .entry((switch.to_string(), port.to_string()))
                .or_default(),
        );
        state.journal.push(format!("{} {} {}", switch, port, entry));
        Ok(())
    }
}

/// Optional connection parameters; the mock never dials anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockConfig {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

pub struct MockSwitchDriver {
    label: String,
    fabric: MockFabric,
}

impl MockSwitchDriver {
    pub fn new(record: &SwitchRecord, fabric: MockFabric) -> Result<Self> {
        Self::validate(&record.config)?;
        Ok(Self {
            label: record.label.clone(),
            fabric,
        })
    }
}

#[async_trait]
impl SwitchDriver for MockSwitchDriver {
    fn validate(config: &serde_json::Value) -> Result<()> {
        if config.is_null() {
            return Ok(());
        }
        serde_json::from_value::<MockConfig>(config.clone())
            .map(|_| ())
            .map_err(|e| {
                ValidationError::Schema {
                    driver: SwitchType::Mock.to_string(),
                    message: e.to_string(),
                }
                .into()
            })
    }

    fn switch_type(&self) -> SwitchType {
        SwitchType::Mock
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn validate_port_name(&self, port: &str) -> Result<()> {
        if port.is_empty() || port.chars().any(char::is_whitespace) {
            return Err(NetworkError::bad_argument(format!(
                "invalid port name '{}'",
                port
            )));
        }
        Ok(())
    }

    fn capabilities(&self) -> BTreeSet<Capability> {
        BTreeSet::from([
            Capability::NativeVlan,
            Capability::TrunkVlans,
            Capability::BatchTrunkRemoval,
        ])
    }

    async fn session(&self) -> Result<Box<dyn Session>> {
        self.fabric.check_fault(&self.label, MockOperation::Connect)?;
        debug!("opened mock session on {}", self.label);
        Ok(Box::new(MockSession {
            label: self.label.clone(),
            capabilities: self.capabilities(),
            fabric: self.fabric.clone(),
        }))
    }
}

pub struct MockSession {
    label: String,
    capabilities: BTreeSet<Capability>,
    fabric: MockFabric,
}

#[async_trait]
impl Session for MockSession {
    fn switch_label(&self) -> &str {
        &self.label
    }

    fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    async fn port_state(&mut self, port: &str) -> Result<PortState> {
        self.fabric.check_fault(&self.label, MockOperation::PortState)?;
        Ok(self.fabric.port_state(&self.label, port))
    }

    async fn set_native_vlan(&mut self, port: &str, vlan: VlanId) -> Result<()> {
        self.fabric.update(
            &self.label,
            port,
            MockOperation::SetNative,
            format!("native {}", vlan),
            |state| {
                state.enabled = true;
                state.native = Some(vlan);
            },
        )
    }

    async fn remove_native_vlan(&mut self, port: &str, vlan: VlanId) -> Result<()> {
        self.fabric.update(
            &self.label,
            port,
            MockOperation::RemoveNative,
            format!("no native {}", vlan),
            |state| *state = PortState::off(),
        )
    }

    async fn add_trunk_vlan(&mut self, port: &str, vlan: VlanId) -> Result<()> {
        self.fabric.update(
            &self.label,
            port,
            MockOperation::AddTrunk,
            format!("tagged {}", vlan),
            |state| {
                state.trunks.insert(vlan);
            },
        )
    }

    async fn remove_trunk_vlan(&mut self, port: &str, vlan: VlanId) -> Result<()> {
        self.fabric.update(
            &self.label,
            port,
            MockOperation::RemoveTrunk,
            format!("no tagged {}", vlan),
            |state| {
                state.trunks.remove(&vlan);
            },
        )
    }

    async fn remove_trunk_vlans(&mut self, port: &str, vlans: &BTreeSet<VlanId>) -> Result<()> {
        let listed = fabric_net_core::format_vlan_ranges(vlans);
        self.fabric.update(
            &self.label,
            port,
            MockOperation::RemoveTrunk,
            format!("no tagged {}", listed),
            |state| {
                for vlan in vlans {
                    state.trunks.remove(vlan);
                }
            },
        )
    }

    async fn port_off(&mut self, port: &str) -> Result<()> {
        self.fabric.update(
            &self.label,
            port,
            MockOperation::PortOff,
            "shutdown".to_string(),
            |state| *state = PortState::off(),
        )
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
