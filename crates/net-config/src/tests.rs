//! Configuration tests

use std::io::Write;

use fabric_net_core::{Channel, NetworkOwner, SwitchType, VlanId};
use tempfile::{NamedTempFile, TempDir};

use crate::{ConfigError, EngineConfig, InventoryFile};

const INVENTORY: &str = r#"
[[switches]]
label = "dell-01"
type = "dellnos9"

[switches.config]
hostname = "10.0.0.5"
username = "admin"
password = "secret"
interface_type = "TenGigabitEthernet"

[[switches]]
label = "lab"
type = "mock"
config = {}

[[ports]]
switch = "dell-01"
label = "1/3"
nic = { node = "node-a", nic = "eth0" }

[[nodes]]
label = "node-a"
project = "anvil"

[[nodes.nics]]
label = "eth0"
macaddr = "aa:bb:cc:dd:ee:01"
port = { switch = "dell-01", port = "1/3" }

[[networks]]
label = "net-0"
owner = { project = "anvil" }
access = ["anvil"]
network_id = "1511"

[[networks]]
label = "pxe"
owner = "public"
network_id = "200-203"

[[attachments]]
nic = { node = "node-a", nic = "eth0" }
network = "net-0"
channel = "vlan/native"
"#;

#[test]
fn test_engine_defaults() {
    let config = EngineConfig::default();
    assert_eq!(config.command_timeout_secs, 120);
    assert_eq!(config.ansible_playbook, "ansible-playbook");
    assert_eq!(config.history_limit, 1024);
    assert!(config.journal_dir.is_none());

    let mut pool = config.vlan_pool().unwrap();
    assert_eq!(pool.available(), 101);
    assert_eq!(pool.allocate().map(|v| v.as_u16()), Some(100));
}

#[test]
fn test_engine_file_and_environment() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "command_timeout_secs = 30").unwrap();
    writeln!(file, "journal_dir = \"/var/lib/fabric/journal\"").unwrap();
    writeln!(file, "vlan_pool = \"1000-1099\"").unwrap();

    std::env::set_var("FABRIC_HISTORY_LIMIT", "16");
    let loaded = EngineConfig::load(Some(file.path()));
    std::env::remove_var("FABRIC_HISTORY_LIMIT");

    let config = loaded.unwrap();
    assert_eq!(config.command_timeout_secs, 30);
    assert_eq!(config.history_limit, 16);
    assert_eq!(config.ansible_playbook, "ansible-playbook");
    assert_eq!(
        config.journal_dir.as_deref(),
        Some(std::path::Path::new("/var/lib/fabric/journal"))
    );
    assert_eq!(config.vlan_pool().unwrap().available(), 100);
}

#[test]
fn test_engine_rejects_bad_values() {
    let mut config = EngineConfig::default();
    config.vlan_pool = "300-200".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut config = EngineConfig::default();
    config.command_timeout_secs = 0;
    assert!(config.validate().is_err());

    let mut file: NamedTempFile = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "history_limit = 0").unwrap();
    assert!(EngineConfig::load(Some(file.path())).is_err());
}

#[test]
fn test_inventory_parse() {
    let inventory = InventoryFile::from_toml(INVENTORY).unwrap();

    assert_eq!(inventory.switches.len(), 2);
    assert_eq!(inventory.switches[0].switch_type, SwitchType::DellNos9);
    assert_eq!(inventory.switches[0].config["interface_type"], "TenGigabitEthernet");
    assert_eq!(inventory.switches[1].switch_type, SwitchType::Mock);

    let node = &inventory.nodes[0];
    assert_eq!(node.project.as_deref(), Some("anvil"));
    let nic = node.nic("eth0").unwrap();
    assert_eq!(nic.port.as_ref().unwrap().port, "1/3");

    assert_eq!(
        inventory.networks[0].owner,
        NetworkOwner::Project("anvil".to_string())
    );
    assert!(inventory.networks[1].is_public());
    assert!(inventory.networks[1].access.is_empty());

    assert_eq!(inventory.attachments[0].channel, Channel::Native);
    assert_eq!(inventory.ports[0].nic.as_ref().unwrap().nic, "eth0");
}

#[test]
fn test_inventory_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fabric.toml");

    let mut inventory = InventoryFile::from_toml(INVENTORY).unwrap();
    inventory.attachments[0].channel = Channel::Tagged(VlanId::new(1511).unwrap());
    inventory.save(&path).unwrap();

    let reloaded = InventoryFile::load(&path).unwrap();
    assert_eq!(reloaded, inventory);
    assert!(!dir.path().join("fabric.toml.tmp").exists());
}

#[test]
fn test_inventory_rejects_duplicates() {
    let duplicated = r#"
[[networks]]
label = "pxe"
owner = "public"
network_id = "200"

[[networks]]
label = "pxe"
owner = "public"
network_id = "300"
"#;
    assert!(matches!(
        InventoryFile::from_toml(duplicated),
        Err(ConfigError::Invalid(_))
    ));

    assert!(matches!(
        InventoryFile::from_toml("switches = 5"),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        InventoryFile::load(std::path::Path::new("/nonexistent/fabric.toml")),
        Err(ConfigError::Io { .. })
    ));
}
