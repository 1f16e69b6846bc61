//! Port VLAN state as reported by a device

use std::collections::BTreeSet;
use std::fmt;

use fabric_net_core::{format_vlan_ranges, VlanId};
use serde::{Deserialize, Serialize};

/// Decoded state of one switch port.
///
/// Built from device output on every query; nothing keeps a copy between
/// sessions, the switch itself is the only source of truth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortState {
    /// Port is administratively up with switching enabled
    pub enabled: bool,
    /// Untagged VLAN, if any
    pub native: Option<VlanId>,
    /// Tagged VLANs, excluding the native one
    pub trunks: BTreeSet<VlanId>,
}

/// Coarse position of a port in the VLAN state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortMode {
    Off,
    /// Enabled, but carrying no VLAN
    Empty,
    NativeOnly,
    NativeTrunks,
    /// Tagged VLANs without a native one; only reachable by configuration
    /// done outside this engine
    TrunksOnly,
}

impl PortState {
    pub fn off() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> PortMode {
        if !self.enabled {
            return PortMode::Off;
        }
        match (self.native.is_some(), self.trunks.is_empty()) {
            (false, true) => PortMode::Empty,
            (true, true) => PortMode::NativeOnly,
            (true, false) => PortMode::NativeTrunks,
            (false, false) => PortMode::TrunksOnly,
        }
    }

    pub fn carries(&self, vlan: VlanId) -> bool {
        self.native == Some(vlan) || self.trunks.contains(&vlan)
    }
}

impl fmt::Display for PortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PortMode::Off => "OFF",
            PortMode::Empty => "EMPTY",
            PortMode::NativeOnly => "NATIVE_ONLY",
            PortMode::NativeTrunks => "NATIVE+TRUNKS",
            PortMode::TrunksOnly => "TRUNKS_ONLY",
        };
        f.write_str(name)
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mode())?;
        match (self.native, self.trunks.is_empty()) {
            (Some(native), true) => write!(f, "(native={})", native),
            (Some(native), false) => write!(
                f,
                "(native={}, trunks={})",
                native,
                format_vlan_ranges(&self.trunks)
            ),
            (None, false) => write!(f, "(trunks={})", format_vlan_ranges(&self.trunks)),
            (None, true) => Ok(()),
        }
    }
}
