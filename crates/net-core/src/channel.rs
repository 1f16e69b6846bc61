//! Channel allocator
//!
//! Maps caller-facing channels onto the VLANs assigned to a network. The
//! native channel rides on the lowest VLAN of the allocation; every VLAN of
//! the allocation is also reachable as a tagged channel.

use std::collections::BTreeSet;

use log::debug;

use fabric_shared_types::{Channel, Network, VlanId};

use crate::error::ValidationError;
use crate::vlan::parse_vlan_ranges;
use crate::Result;

/// VLANs assigned to `network`. A network always carries at least one.
pub fn network_vlans(network: &Network) -> Result<BTreeSet<VlanId>> {
    parse_vlan_ranges(&network.network_id)
}

/// Resolve `channel` to the concrete VLAN it uses on `network`.
pub fn resolve(network: &Network, channel: &Channel) -> Result<VlanId> {
    let vlans = network_vlans(network)?;

    let resolved = match channel {
        Channel::Native => vlans.iter().next().copied(),
        Channel::Tagged(vlan) => vlans.get(vlan).copied(),
    };

    debug!(
        "resolved channel {} on network {} to {:?}",
        channel, network.label, resolved
    );

    resolved.ok_or_else(|| {
        ValidationError::IllegalChannel {
            channel: channel.to_string(),
            network: network.label.clone(),
        }
        .into()
    })
}

/// Channels a nic may use to reach `network`: the native channel first, then
/// each tagged channel in ascending VLAN order.
pub fn legal_channels(network: &Network) -> Result<Vec<Channel>> {
    let vlans = network_vlans(network)?;
    let mut channels = Vec::with_capacity(vlans.len() + 1);
    channels.push(Channel::Native);
    channels.extend(vlans.into_iter().map(Channel::Tagged));
    Ok(channels)
}

/// Pool of VLAN ids handed out to newly created networks.
#[derive(Debug, Clone)]
pub struct VlanPool {
    free: BTreeSet<VlanId>,
    in_use: BTreeSet<VlanId>,
}

impl VlanPool {
    /// Build a pool from range syntax, e.g. "100-200".
    pub fn new(spec: &str) -> Result<Self> {
        Ok(Self {
            free: parse_vlan_ranges(spec)?,
            in_use: BTreeSet::new(),
        })
    }

    /// Take the lowest free VLAN.
    pub fn allocate(&mut self) -> Option<VlanId> {
        let vlan = self.free.pop_first()?;
        self.in_use.insert(vlan);
        debug!("allocated VLAN {} from pool", vlan);
        Some(vlan)
    }

    /// Reserve a specific VLAN, e.g. one chosen by an administrator or
    /// already recorded on an existing network.
    pub fn claim(&mut self, vlan: VlanId) -> Result<()> {
        if self.free.remove(&vlan) {
            self.in_use.insert(vlan);
            return Ok(());
        }

        let reason = if self.in_use.contains(&vlan) {
            "already allocated"
        } else {
            "not part of the pool"
        };
        Err(ValidationError::BadArgument {
            message: format!("cannot claim VLAN {}: {}", vlan, reason),
        }
        .into())
    }

    /// Return a VLAN to the pool. Returns false if it was not allocated.
    pub fn release(&mut self, vlan: VlanId) -> bool {
        if self.in_use.remove(&vlan) {
            self.free.insert(vlan);
            true
        } else {
            false
        }
    }

    /// Whether `vlan` belongs to the pool, free or not.
    pub fn contains(&self, vlan: VlanId) -> bool {
        self.free.contains(&vlan) || self.in_use.contains(&vlan)
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }
}
