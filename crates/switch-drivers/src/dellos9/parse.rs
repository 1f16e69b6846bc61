//! Decoding Dell OS9 show output

use std::collections::BTreeSet;
use std::sync::OnceLock;

use fabric_net_core::{parse_vlan_ranges, DeviceError, NetworkError, Result, VlanId};
use log::error;
use regex::Regex;

fn port_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+/\d+(/\d+)?$").expect("static regex"))
}

fn trunk_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "T12,14-18,23" once spaces are stripped
    RE.get_or_init(|| Regex::new(r"T(\d+(-\d+)?)(,\d+(-\d+)?)*").expect("static regex"))
}

fn native_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"NativeVlanId:(\d+)\.").expect("static regex"))
}

/// Ports are named `unit/port` or `unit/slot/port`, e.g. "1/2" or "1/0/1".
pub fn is_valid_port_name(port: &str) -> bool {
    port_name_re().is_match(port)
}

fn unexpected(switch: &str, port: &str, message: impl Into<String>) -> NetworkError {
    DeviceError::UnexpectedState {
        switch: switch.to_string(),
        port: port.to_string(),
        message: message.into(),
    }
    .into()
}

/// Whether the running configuration shows the port administratively up.
pub fn parse_admin_state(switch: &str, port: &str, running_config: &str) -> Result<bool> {
    let mut shutdown = false;
    for line in running_config.lines().map(str::trim) {
        if line == "no shutdown" {
            return Ok(true);
        }
        if line == "shutdown" {
            shutdown = true;
        }
    }

    if shutdown {
        Ok(false)
    } else {
        Err(unexpected(
            switch,
            port,
            "running configuration shows neither 'shutdown' nor 'no shutdown'",
        ))
    }
}

/// Tagged VLANs listed on the `T` line of `show interface switchport`.
pub fn parse_trunk_vlans(switch: &str, port: &str, switchport: &str) -> Result<BTreeSet<VlanId>> {
    let compact = switchport.replace(' ', "");
    match trunk_re().find(&compact) {
        Some(found) => parse_vlan_ranges(&found.as_str()[1..]).map_err(|e| {
            unexpected(switch, port, format!("cannot read tagged vlans: {}", e))
        }),
        None => Ok(BTreeSet::new()),
    }
}

/// The untagged VLAN from the "Native VlanId: N." line, if present.
pub fn parse_native_vlan(switch: &str, port: &str, switchport: &str) -> Result<Option<VlanId>> {
    let compact = switchport.replace(' ', "");
    let Some(captures) = native_re().captures(&compact) else {
        error!("no native vlan reported for {}:{}", switch, port);
        return Ok(None);
    };

    let raw = &captures[1];
    raw.parse::<u16>()
        .ok()
        .and_then(|id| VlanId::new(id).ok())
        .map(Some)
        .ok_or_else(|| unexpected(switch, port, format!("invalid native vlan '{}'", raw)))
}
