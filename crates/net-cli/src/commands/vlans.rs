//! VLAN range command

use anyhow::{Context, Result};
use fabric_net_core::{format_vlan_ranges, parse_vlan_ranges};

pub struct VlansCommand;

impl VlansCommand {
    /// Normalised form of `spec` with its VLAN count.
    pub fn describe(spec: &str) -> Result<String> {
        let vlans = parse_vlan_ranges(spec)
            .with_context(|| format!("'{}' is not a valid VLAN range", spec))?;
        Ok(format!("{} ({} VLANs)", format_vlan_ranges(&vlans), vlans.len()))
    }

    pub fn execute(spec: &str) -> Result<()> {
        println!("{}", Self::describe(spec)?);
        Ok(())
    }
}
