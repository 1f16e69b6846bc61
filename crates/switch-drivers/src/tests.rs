//! Switch driver tests

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fabric_net_core::{
    DeviceError, NetworkError, Result, SwitchRecord, SwitchType, ValidationError, VlanId,
};
use fabric_switch_core::{
    Capability, CommandRunner, Connector, DeviceTarget, PortMode, PortState, PortTransition,
    SwitchDriver,
};
use mockall::mock;
use serde_json::json;

use crate::ansible::parse_playbook_output;
use crate::dellos9::DellNos9Driver;
use crate::mock::{MockFabric, MockFault, MockOperation, MockSwitchDriver};
use crate::registry::DriverRegistry;

fn vlan(id: u16) -> VlanId {
    VlanId::new(id).unwrap()
}

fn dell_config() -> serde_json::Value {
    json!({
        "hostname": "10.0.0.5",
        "username": "admin",
        "password": "secret",
        "interface_type": "TenGigabitEthernet",
    })
}

fn dell_record(config: serde_json::Value) -> SwitchRecord {
    SwitchRecord {
        label: "dell-01".to_string(),
        switch_type: SwitchType::DellNos9,
        config,
    }
}

fn mock_record(label: &str) -> SwitchRecord {
    SwitchRecord {
        label: label.to_string(),
        switch_type: SwitchType::Mock,
        config: json!({}),
    }
}

fn is_schema_error(result: Result<()>) -> bool {
    matches!(
        result,
        Err(NetworkError::Validation(ValidationError::Schema { .. }))
    )
}

#[derive(Default, Clone)]
struct EmulatedPort {
    enabled: bool,
    switchport: bool,
    untagged: Option<u16>,
    tagged: BTreeSet<u16>,
}

#[derive(Default)]
struct EmulatorState {
    ports: HashMap<String, EmulatedPort>,
    batches: Vec<(String, Vec<String>)>,
    saves: usize,
}

/// Interprets the Dell OS9 commands the driver emits and renders show
/// output the way the switch does.
#[derive(Clone, Default)]
struct DellEmulator {
    state: Arc<Mutex<EmulatorState>>,
}

enum Context {
    None,
    Port(String),
    Vlan(u16),
}

impl DellEmulator {
    fn port(&self, port: &str) -> EmulatedPort {
        self.state
            .lock()
            .unwrap()
            .ports
            .get(port)
            .cloned()
            .unwrap_or_default()
    }

    fn batch_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .batches
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn render_running_config(port: &str, state: &EmulatedPort) -> String {
        let mut out = format!("!\ninterface TenGigabitEthernet {}\n no ip address\n", port);
        if state.switchport {
            out.push_str(" portmode hybrid\n switchport\n");
        }
        out.push_str(if state.enabled { " no shutdown\n" } else { " shutdown\n" });
        out
    }

    fn render_switchport(port: &str, state: &EmulatedPort) -> String {
        let mut out = String::from(
            "Codes:  U - Untagged, T - Tagged\n        x - Dot1x untagged, X - Dot1x tagged\n\n",
        );
        out.push_str(&format!(
            "Name: TenGigabitEthernet {}\n802.1QTagged: Hybrid\nVlan membership:\nQ Vlans\n",
            port
        ));
        if let Some(untagged) = state.untagged {
            out.push_str(&format!("U {}\n", untagged));
        }
        if !state.tagged.is_empty() {
            let tagged: Vec<String> = state.tagged.iter().map(|v| v.to_string()).collect();
            out.push_str(&format!("T {}\n", tagged.join(",")));
        }
        if let Some(untagged) = state.untagged {
            out.push_str(&format!("\nNative VlanId: {}.\n", untagged));
        }
        out
    }
}

#[async_trait]
impl CommandRunner for DellEmulator {
    async fn exec(&self, _operation: &str, commands: &[String]) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        let mut outputs = Vec::new();
        for command in commands {
            let words: Vec<&str> = command.split_whitespace().collect();
            match words.as_slice() {
                ["show", "running-config", "interface", _, port] => {
                    let port_state = state.ports.get(*port).cloned().unwrap_or_default();
                    outputs.push(Self::render_running_config(port, &port_state));
                }
                ["show", "interface", "switchport", _, port] => {
                    let port_state = state.ports.get(*port).cloned().unwrap_or_default();
                    outputs.push(Self::render_switchport(port, &port_state));
                }
                ["write", "memory"] => {
                    state.saves += 1;
                    outputs.push(String::new());
                }
                _ => panic!("unexpected exec command: {}", command),
            }
        }
        Ok(outputs)
    }

    async fn configure(&self, operation: &str, commands: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .batches
            .push((operation.to_string(), commands.to_vec()));

        let mut context = Context::None;
        for command in commands {
            let words: Vec<&str> = command.split_whitespace().collect();
            match words.as_slice() {
                ["interface", "vlan", id] => {
                    context = Context::Vlan(id.parse().unwrap());
                    continue;
                }
                ["interface", _, port] => {
                    context = Context::Port(port.to_string());
                    continue;
                }
                _ => {}
            }
            match (words.as_slice(), &context) {
                (["portmode", "hybrid"], Context::Port(_))
                | (["no", "portmode", "hybrid"], Context::Port(_)) => {}
                (["switchport"], Context::Port(p)) => {
                    state.ports.entry(p.clone()).or_default().switchport = true
                }
                (["no", "switchport"], Context::Port(p)) => {
                    state.ports.entry(p.clone()).or_default().switchport = false
                }
                (["no", "shutdown"], Context::Port(p)) => {
                    state.ports.entry(p.clone()).or_default().enabled = true
                }
                (["shutdown"], Context::Port(p)) => {
                    state.ports.entry(p.clone()).or_default().enabled = false
                }
                (["untagged", _, port], Context::Vlan(id)) => {
                    state.ports.entry(port.to_string()).or_default().untagged = Some(*id)
                }
                (["no", "untagged", _, port], Context::Vlan(_)) => {
                    state.ports.entry(port.to_string()).or_default().untagged = None
                }
                (["tagged", _, port], Context::Vlan(id)) => {
                    state.ports.entry(port.to_string()).or_default().tagged.insert(*id);
                }
                (["no", "tagged", _, port], Context::Vlan(id)) => {
                    state.ports.entry(port.to_string()).or_default().tagged.remove(id);
                }
                _ => panic!("unexpected config command: {}", command),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for DellEmulator {
    async fn connect(&self, target: &DeviceTarget) -> Result<Box<dyn CommandRunner>> {
        assert_eq!(target.network_os, "dellos9");
        Ok(Box::new(self.clone()))
    }
}

mock! {
    pub Runner {}

    #[async_trait]
    impl CommandRunner for Runner {
        async fn exec(&self, operation: &str, commands: &[String]) -> Result<Vec<String>>;
        async fn configure(&self, operation: &str, commands: &[String]) -> Result<()>;
    }
}

struct SingleRunner(Mutex<Option<MockRunner>>);

#[async_trait]
impl Connector for SingleRunner {
    async fn connect(&self, _target: &DeviceTarget) -> Result<Box<dyn CommandRunner>> {
        let runner = self.0.lock().unwrap().take().expect("runner already used");
        Ok(Box::new(runner))
    }
}

#[test]
fn test_dell_config_validation() {
    assert!(DellNos9Driver::validate(&dell_config()).is_ok());

    let mut with_save = dell_config();
    with_save["save"] = json!(true);
    assert!(DellNos9Driver::validate(&with_save).is_ok());

    let mut missing = dell_config();
    missing.as_object_mut().unwrap().remove("password");
    assert!(is_schema_error(DellNos9Driver::validate(&missing)));

    let mut unknown = dell_config();
    unknown["port_speed"] = json!("10G");
    assert!(is_schema_error(DellNos9Driver::validate(&unknown)));

    let mut bad_type = dell_config();
    bad_type["interface_type"] = json!("ethernet");
    assert!(is_schema_error(DellNos9Driver::validate(&bad_type)));

    let mut empty_host = dell_config();
    empty_host["hostname"] = json!("  ");
    assert!(is_schema_error(DellNos9Driver::validate(&empty_host)));

    assert!(is_schema_error(DellNos9Driver::validate(&json!("not an object"))));
}

#[test]
fn test_dell_port_names_and_capabilities() {
    let driver = DellNos9Driver::new(&dell_record(dell_config()), Arc::new(DellEmulator::default()))
        .unwrap();

    assert!(driver.validate_port_name("1/3").is_ok());
    assert!(driver.validate_port_name("1/0/1").is_ok());
    assert!(matches!(
        driver.validate_port_name("Te 1/3"),
        Err(NetworkError::Validation(ValidationError::BadArgument { .. }))
    ));

    assert!(driver.has_capability(Capability::NativeVlan));
    assert!(driver.has_capability(Capability::TrunkVlans));
    assert!(!driver.has_capability(Capability::BatchTrunkRemoval));
    assert!(!driver.has_capability(Capability::PersistConfig));
}

#[tokio::test]
async fn test_dell_port_lifecycle() {
    let emulator = DellEmulator::default();
    let driver =
        DellNos9Driver::new(&dell_record(dell_config()), Arc::new(emulator.clone())).unwrap();

    let mut session = driver.session().await.unwrap();
    assert!(!session.capabilities().contains(&Capability::BatchTrunkRemoval));
    assert_eq!(session.port_state("1/3").await.unwrap(), PortState::off());

    session.apply("1/3", &PortTransition::SetNative(vlan(100))).await.unwrap();
    session.apply("1/3", &PortTransition::AddTrunk(vlan(101))).await.unwrap();
    session.apply("1/3", &PortTransition::AddTrunk(vlan(105))).await.unwrap();

    let state = session.port_state("1/3").await.unwrap();
    assert_eq!(state.mode(), PortMode::NativeTrunks);
    assert_eq!(state.native, Some(vlan(100)));
    assert_eq!(state.trunks, BTreeSet::from([vlan(101), vlan(105)]));

    // a repeated add is a no-op, not a second batch
    session.apply("1/3", &PortTransition::AddTrunk(vlan(105))).await.unwrap();

    session.apply("1/3", &PortTransition::Revert).await.unwrap();
    assert_eq!(session.port_state("1/3").await.unwrap(), PortState::off());
    session.close().await.unwrap();

    assert_eq!(
        emulator.batch_names(),
        vec![
            "add native vlan",
            "add vlan to trunk",
            "add vlan to trunk",
            "remove vlan 101",
            "remove vlan 105",
            "remove native vlan",
        ]
    );
    let port = emulator.port("1/3");
    assert!(!port.enabled);
    assert!(!port.switchport);
    assert!(port.tagged.is_empty());
    assert_eq!(port.untagged, None);
}

#[tokio::test]
async fn test_dell_native_batch_contents() {
    let emulator = DellEmulator::default();
    let driver =
        DellNos9Driver::new(&dell_record(dell_config()), Arc::new(emulator.clone())).unwrap();
    let mut session = driver.session().await.unwrap();
    session.set_native_vlan("1/3", vlan(1512)).await.unwrap();

    let batches = emulator.state.lock().unwrap().batches.clone();
    assert_eq!(
        batches[0].1,
        vec![
            "interface TenGigabitEthernet 1/3",
            "portmode hybrid",
            "switchport",
            "no shutdown",
            "interface vlan 1512",
            "untagged TenGigabitEthernet 1/3",
        ]
    );
}

#[tokio::test]
async fn test_dell_save_after_change() {
    let emulator = DellEmulator::default();
    let mut config = dell_config();
    config["save"] = json!(true);
    let driver = DellNos9Driver::new(&dell_record(config), Arc::new(emulator.clone())).unwrap();
    assert!(driver.has_capability(Capability::PersistConfig));

    let mut session = driver.session().await.unwrap();
    session.apply("1/1", &PortTransition::SetNative(vlan(300))).await.unwrap();
    session.apply("1/1", &PortTransition::RemoveNative(vlan(300))).await.unwrap();

    assert_eq!(emulator.state.lock().unwrap().saves, 2);
}

#[tokio::test]
async fn test_dell_failed_batch_skips_save() {
    let mut runner = MockRunner::new();
    runner.expect_configure().times(1).returning(|_, _| {
        Err(DeviceError::Communication {
            switch: "dell-01".to_string(),
            message: "connection reset".to_string(),
        }
        .into())
    });
    runner.expect_exec().times(0);

    let mut config = dell_config();
    config["save"] = json!(true);
    let connector = SingleRunner(Mutex::new(Some(runner)));
    let driver = DellNos9Driver::new(&dell_record(config), Arc::new(connector)).unwrap();

    let mut session = driver.session().await.unwrap();
    let result = session.set_native_vlan("1/1", vlan(300)).await;
    assert!(matches!(
        result,
        Err(NetworkError::Device(DeviceError::Communication { .. }))
    ));
}

#[tokio::test]
async fn test_dell_unreadable_running_config() {
    let mut runner = MockRunner::new();
    runner
        .expect_exec()
        .times(1)
        .returning(|_, _| Ok(vec!["% Error: Invalid input".to_string()]));

    let connector = SingleRunner(Mutex::new(Some(runner)));
    let driver = DellNos9Driver::new(&dell_record(dell_config()), Arc::new(connector)).unwrap();

    let mut session = driver.session().await.unwrap();
    assert!(matches!(
        session.port_state("1/1").await,
        Err(NetworkError::Device(DeviceError::UnexpectedState { .. }))
    ));
}

#[tokio::test]
async fn test_dell_port_state_single_round_trip() {
    let mut runner = MockRunner::new();
    runner
        .expect_exec()
        .times(1)
        .withf(|_, commands| commands.len() == 2)
        .returning(|_, commands| {
            let mut outputs = Vec::new();
            for command in commands {
                outputs.push(if command.starts_with("show running-config") {
                    " switchport\n no shutdown\n".to_string()
                } else {
                    "Name: TenGigabitEthernet 1/1\nNative VlanId:     300.\nT    301-302\n"
                        .to_string()
                });
            }
            Ok(outputs)
        });

    let connector = SingleRunner(Mutex::new(Some(runner)));
    let driver = DellNos9Driver::new(&dell_record(dell_config()), Arc::new(connector)).unwrap();
    let mut session = driver.session().await.unwrap();

    let state = session.port_state("1/1").await.unwrap();
    assert_eq!(state.native, Some(vlan(300)));
    assert_eq!(state.trunks, BTreeSet::from([vlan(301), vlan(302)]));
}

#[tokio::test]
async fn test_mock_fabric_faults() {
    let fabric = MockFabric::new();
    let driver = MockSwitchDriver::new(&mock_record("sw0"), fabric.clone()).unwrap();

    fabric.inject_fault("sw0", MockOperation::AddTrunk, MockFault::Timeout);

    let mut session = driver.session().await.unwrap();
    session.apply("p1", &PortTransition::SetNative(vlan(10))).await.unwrap();
    assert!(matches!(
        session.apply("p1", &PortTransition::AddTrunk(vlan(11))).await,
        Err(NetworkError::Device(DeviceError::Timeout { .. }))
    ));

    // faults are one-shot
    session.apply("p1", &PortTransition::AddTrunk(vlan(11))).await.unwrap();
    assert_eq!(fabric.port_state("sw0", "p1").mode(), PortMode::NativeTrunks);

    fabric.inject_fault("sw0", MockOperation::Connect, MockFault::Communication);
    assert!(driver.session().await.is_err());
    assert!(driver.session().await.is_ok());
}

#[tokio::test]
async fn test_mock_revert_uses_batch_removal() {
    let fabric = MockFabric::new();
    let driver = MockSwitchDriver::new(&mock_record("sw0"), fabric.clone()).unwrap();
    assert!(driver.has_capability(Capability::BatchTrunkRemoval));

    let mut session = driver.session().await.unwrap();
    assert_eq!(session.capabilities(), &driver.capabilities());
    session.apply("p1", &PortTransition::SetNative(vlan(10))).await.unwrap();
    session.apply("p1", &PortTransition::AddTrunk(vlan(11))).await.unwrap();
    session.apply("p1", &PortTransition::AddTrunk(vlan(12))).await.unwrap();
    session.apply("p1", &PortTransition::Revert).await.unwrap();

    assert_eq!(
        fabric.journal(),
        vec![
            "sw0 p1 native 10",
            "sw0 p1 tagged 11",
            "sw0 p1 tagged 12",
            "sw0 p1 no tagged 11-12",
            "sw0 p1 no native 10",
        ]
    );
    assert_eq!(fabric.port_state("sw0", "p1"), PortState::off());
}

#[test]
fn test_mock_config_validation() {
    assert!(MockSwitchDriver::validate(&json!({})).is_ok());
    assert!(MockSwitchDriver::validate(&serde_json::Value::Null).is_ok());
    assert!(MockSwitchDriver::validate(&json!({"hostname": "lab"})).is_ok());
    assert!(is_schema_error(MockSwitchDriver::validate(&json!({"vendor": "x"}))));
}

#[test]
fn test_registry() {
    let registry = DriverRegistry::with_defaults(Arc::new(DellEmulator::default()), MockFabric::new());
    assert_eq!(
        registry.registered_types(),
        vec![SwitchType::DellNos9, SwitchType::Mock]
    );

    assert!(registry.validate(&dell_record(dell_config())).is_ok());
    assert!(is_schema_error(registry.validate(&dell_record(json!({})))));
    assert!(registry.validate(&mock_record("sw0")).is_ok());

    let first = registry.driver(&mock_record("sw0")).unwrap();
    let second = registry.driver(&mock_record("sw0")).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.label(), "sw0");

    let dell = registry.driver(&dell_record(dell_config())).unwrap();
    assert_eq!(dell.switch_type(), SwitchType::DellNos9);

    assert!(registry.evict("sw0"));
    assert!(!registry.evict("sw0"));
    let third = registry.driver(&mock_record("sw0")).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));

    // a changed record rebuilds the driver, an invalid one is refused
    let mut relabelled = mock_record("sw0");
    relabelled.config = json!({"hostname": "lab"});
    let fourth = registry.driver(&relabelled).unwrap();
    assert!(!Arc::ptr_eq(&third, &fourth));
    relabelled.config = json!({"vendor": "x"});
    assert!(registry.driver(&relabelled).is_err());

    let mut stale = dell_config();
    stale.as_object_mut().unwrap().remove("password");
    assert!(is_schema_error(registry.driver(&dell_record(stale)).map(|_| ())));

    let empty = DriverRegistry::new();
    assert!(matches!(
        empty.validate(&mock_record("sw0")),
        Err(NetworkError::Validation(ValidationError::BadArgument { .. }))
    ));
}

#[test]
fn test_playbook_report_parsing() {
    let report = r#"[WARNING]: provided hosts list is empty
{
    "plays": [{
        "play": {"name": "dell-01"},
        "tasks": [{
            "task": {"name": "show port information"},
            "hosts": {
                "dell-01": {
                    "changed": false,
                    "stdout": ["Name: TenGigabitEthernet 1/3"]
                }
            }
        }]
    }],
    "stats": {"dell-01": {"failures": 0, "unreachable": 0}}
}"#;
    assert_eq!(
        parse_playbook_output("dell-01", report).unwrap(),
        vec!["Name: TenGigabitEthernet 1/3"]
    );

    let failed = r#"{"plays": [{"tasks": [{"hosts": {"dell-01": {"failed": true, "msg": "command timeout triggered"}}}]}]}"#;
    let err = parse_playbook_output("dell-01", failed).unwrap_err();
    assert!(err.is_device());
    assert!(err.to_string().contains("command timeout triggered"));

    let unreachable = r#"{"plays": [{"tasks": [{"hosts": {"dell-01": {"unreachable": true, "msg": "ssh: connect refused"}}}]}]}"#;
    assert!(parse_playbook_output("dell-01", unreachable)
        .unwrap_err()
        .to_string()
        .contains("unreachable"));

    assert!(parse_playbook_output("dell-01", "ERROR! the playbook could not be found").is_err());
    assert!(parse_playbook_output("dell-02", report).is_err());
}
