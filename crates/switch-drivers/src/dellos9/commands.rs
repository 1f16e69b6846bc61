//! Dell OS9 command batches

use fabric_net_core::VlanId;

/// Builds command batches for one interface class, e.g. "TenGigabitEthernet".
#[derive(Debug, Clone)]
pub struct CommandSet {
    interface_type: String,
}

impl CommandSet {
    pub fn new(interface_type: impl Into<String>) -> Self {
        Self {
            interface_type: interface_type.into(),
        }
    }

    fn interface(&self, port: &str) -> String {
        format!("interface {} {}", self.interface_type, port)
    }

    fn member(&self, port: &str) -> String {
        format!("{} {}", self.interface_type, port)
    }

    pub fn show_running_config(&self, port: &str) -> String {
        format!("show running-config interface {} {}", self.interface_type, port)
    }

    pub fn show_switchport(&self, port: &str) -> String {
        format!("show interface switchport {} {}", self.interface_type, port)
    }

    pub fn port_on(&self, port: &str) -> Vec<String> {
        vec![
            self.interface(port),
            "portmode hybrid".to_string(),
            "switchport".to_string(),
            "no shutdown".to_string(),
        ]
    }

    pub fn port_off(&self, port: &str) -> Vec<String> {
        vec![
            self.interface(port),
            "no switchport".to_string(),
            "no portmode hybrid".to_string(),
            "shutdown".to_string(),
        ]
    }

    /// Power the port on and add it untagged to `vlan`.
    pub fn add_native_vlan(&self, port: &str, vlan: VlanId) -> Vec<String> {
        let mut commands = self.port_on(port);
        commands.push(format!("interface vlan {}", vlan));
        commands.push(format!("untagged {}", self.member(port)));
        commands
    }

    /// Drop the untagged membership and power the port off in one batch.
    pub fn remove_native_vlan(&self, port: &str, vlan: VlanId) -> Vec<String> {
        let mut commands = vec![
            format!("interface vlan {}", vlan),
            format!("no untagged {}", self.member(port)),
        ];
        commands.extend(self.port_off(port));
        commands
    }

    pub fn add_trunk_vlan(&self, port: &str, vlan: VlanId) -> Vec<String> {
        vec![
            self.interface(port),
            format!("interface vlan {}", vlan),
            format!("tagged {}", self.member(port)),
        ]
    }

    pub fn remove_trunk_vlan(&self, port: &str, vlan: VlanId) -> Vec<String> {
        vec![
            format!("interface vlan {}", vlan),
            format!("no tagged {}", self.member(port)),
        ]
    }

    pub fn save(&self) -> Vec<String> {
        vec!["write memory".to_string()]
    }
}
