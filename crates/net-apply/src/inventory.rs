//! Persistence collaborator
//!
//! The engine reads switch, port, node and network records through the
//! [`Inventory`] trait and commits attachments back through it once an
//! action completes. [`MemoryInventory`] keeps everything in process and
//! converts to and from an inventory file.

use std::collections::BTreeSet;

use async_trait::async_trait;
use fabric_net_config::InventoryFile;
use fabric_net_core::channel::network_vlans;
use fabric_net_core::{
    ApiError, Network, NetworkAttachment, NetworkError, NetworkOwner, Nic, NicRef, Node, Port,
    PortRef, Result, SwitchRecord, VlanId, VlanPool,
};
use indexmap::IndexMap;
use log::{debug, info};
use tokio::sync::RwLock;

/// Records the engine consumes and the attachment writes it performs.
#[async_trait]
pub trait Inventory: Send + Sync {
    async fn switch(&self, label: &str) -> Result<SwitchRecord>;

    async fn port(&self, port: &PortRef) -> Result<Port>;

    async fn node(&self, label: &str) -> Result<Node>;

    async fn nic(&self, nic: &NicRef) -> Result<Nic>;

    async fn network(&self, label: &str) -> Result<Network>;

    async fn attachments_for_nic(&self, nic: &NicRef) -> Result<Vec<NetworkAttachment>>;

    /// Record a completed connect.
    async fn commit_attachment(&self, attachment: NetworkAttachment) -> Result<()>;

    /// Drop the attachment of `nic` to `network` after a completed detach.
    async fn remove_attachment(&self, nic: &NicRef, network: &str) -> Result<NetworkAttachment>;

    /// Drop every attachment of `nic` after a completed port revert.
    async fn clear_attachments(&self, nic: &NicRef) -> Result<Vec<NetworkAttachment>>;

    /// Store a validated switch record.
    async fn add_switch(&self, record: SwitchRecord) -> Result<()>;

    /// Store a port whose name the switch driver has accepted.
    async fn add_port(&self, port: Port) -> Result<()>;
}

fn conflict(resource: impl Into<String>, message: impl Into<String>) -> NetworkError {
    ApiError::Conflict {
        resource: resource.into(),
        message: message.into(),
    }
    .into()
}

#[derive(Default)]
struct Records {
    switches: IndexMap<String, SwitchRecord>,
    ports: IndexMap<PortRef, Port>,
    nodes: IndexMap<String, Node>,
    networks: IndexMap<String, Network>,
    attachments: Vec<NetworkAttachment>,
    pool: Option<VlanPool>,
}

impl Records {
    fn nic(&self, nic: &NicRef) -> Result<&Nic> {
        self.nodes
            .get(&nic.node)
            .and_then(|node| node.nic(&nic.nic))
            .ok_or_else(|| NetworkError::not_found(format!("nic {}", nic)))
    }

    /// Cable `nic` to `port` on both sides, refusing a nic that is already
    /// cabled elsewhere or a port that holds another nic.
    fn link(&mut self, nic: &NicRef, port: &PortRef) -> Result<()> {
        if let Some(cabled) = &self.nic(nic)?.port {
            if cabled != port {
                return Err(conflict(
                    format!("nic {}", nic),
                    format!("cabled to port {}, not {}", cabled, port),
                ));
            }
        }
        if let Some(other) = self
            .ports
            .values()
            .find(|p| p.nic.as_ref() == Some(nic) && &p.port_ref() != port)
        {
            return Err(conflict(
                format!("nic {}", nic),
                format!("already claimed by port {}", other.port_ref()),
            ));
        }

        let entry = self
            .ports
            .get_mut(port)
            .ok_or_else(|| NetworkError::not_found(format!("port {} of nic {}", port, nic)))?;
        if let Some(other) = entry.nic.as_ref().filter(|other| *other != nic) {
            return Err(conflict(
                format!("port {}", port),
                format!("already connected to {}", other),
            ));
        }
        entry.nic = Some(nic.clone());

        if let Some(entry) = self
            .nodes
            .get_mut(&nic.node)
            .and_then(|node| node.nics.iter_mut().find(|n| n.label == nic.nic))
        {
            entry.port = Some(port.clone());
        }
        Ok(())
    }

    /// Make every nic's port point back at it. A port holds at most one nic.
    fn link_nic_ports(&mut self) -> Result<()> {
        let cabled: Vec<(NicRef, PortRef)> = self
            .nodes
            .values()
            .flat_map(|node| {
                node.nics.iter().filter_map(move |nic| {
                    nic.port
                        .clone()
                        .map(|port| (NicRef::new(node.label.clone(), nic.label.clone()), port))
                })
            })
            .collect();
        for (nic, port) in &cabled {
            self.link(nic, port)?;
        }
        Ok(())
    }

    fn vlans_in_use(&self) -> BTreeSet<VlanId> {
        self.networks
            .values()
            .filter_map(|network| network_vlans(network).ok())
            .flatten()
            .collect()
    }

    /// Store `network`. With `claim`, VLANs of the network that fall inside
    /// the pool are reserved in it.
    fn insert_network(&mut self, network: Network, claim: bool) -> Result<()> {
        if self.networks.contains_key(&network.label) {
            return Err(conflict(
                format!("network {}", network.label),
                "label already in use",
            ));
        }

        let vlans = network_vlans(&network)?;
        let in_use = self.vlans_in_use();
        if let Some(taken) = vlans.iter().find(|vlan| in_use.contains(vlan)) {
            return Err(conflict(
                format!("network {}", network.label),
                format!("VLAN {} is already assigned to another network", taken),
            ));
        }

        if let Some(pool) = self.pool.as_mut().filter(|_| claim) {
            for vlan in &vlans {
                if pool.contains(*vlan) {
                    pool.claim(*vlan)?;
                }
            }
        }

        self.networks.insert(network.label.clone(), network);
        Ok(())
    }
}

/// In-process implementation of [`Inventory`].
#[derive(Default)]
pub struct MemoryInventory {
    records: RwLock<Records>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Networks created without an explicit VLAN draw from `pool`.
    pub fn with_pool(pool: VlanPool) -> Self {
        Self {
            records: RwLock::new(Records {
                pool: Some(pool),
                ..Records::default()
            }),
        }
    }

    /// Load an inventory file, checking that every reference resolves.
    pub async fn load(file: InventoryFile, pool: Option<VlanPool>) -> Result<Self> {
        let inventory = match pool {
            Some(pool) => Self::with_pool(pool),
            None => Self::new(),
        };

        for record in file.switches {
            inventory.add_switch(record).await?;
        }
        for node in file.nodes {
            inventory.add_node(node).await?;
        }
        for port in file.ports {
            inventory.add_port(port).await?;
        }
        for network in file.networks {
            inventory.records.write().await.insert_network(network, true)?;
        }

        inventory.records.write().await.link_nic_ports()?;

        for attachment in file.attachments {
            inventory.commit_attachment(attachment).await?;
        }

        Ok(inventory)
    }

    /// Snapshot of every record, e.g. to write back to disk.
    pub async fn to_file(&self) -> InventoryFile {
        let records = self.records.read().await;
        InventoryFile {
            switches: records.switches.values().cloned().collect(),
            ports: records.ports.values().cloned().collect(),
            nodes: records.nodes.values().cloned().collect(),
            networks: records.networks.values().cloned().collect(),
            attachments: records.attachments.clone(),
        }
    }

    pub async fn add_node(&self, node: Node) -> Result<()> {
        let mut records = self.records.write().await;
        if records.nodes.contains_key(&node.label) {
            return Err(conflict(format!("node {}", node.label), "label already in use"));
        }
        debug!("added node {} with {} nics", node.label, node.nics.len());
        records.nodes.insert(node.label.clone(), node);
        Ok(())
    }

    /// Create a network, drawing a VLAN from the pool when `network_id` is
    /// not given.
    pub async fn create_network(
        &self,
        label: &str,
        owner: NetworkOwner,
        network_id: Option<String>,
    ) -> Result<Network> {
        let mut records = self.records.write().await;

        let Some(network_id) = network_id else {
            let pool = records.pool.as_mut().ok_or_else(|| {
                NetworkError::bad_argument("no VLAN pool configured, network_id is required")
            })?;
            let vlan = pool
                .allocate()
                .ok_or_else(|| conflict("vlan pool", "no free VLAN left"))?;

            let network = Network::new(label, owner, vlan.to_string());
            if let Err(err) = records.insert_network(network.clone(), false) {
                if let Some(pool) = records.pool.as_mut() {
                    pool.release(vlan);
                }
                return Err(err);
            }
            info!("created network {} on pool VLAN {}", network.label, vlan);
            return Ok(network);
        };

        let network = Network::new(label, owner, network_id);
        records.insert_network(network.clone(), true)?;
        info!("created network {} on VLAN(s) {}", network.label, network.network_id);
        Ok(network)
    }

    /// Cable a nic to a port.
    pub async fn connect_nic(&self, nic: &NicRef, port: &PortRef) -> Result<()> {
        self.records.write().await.link(nic, port)
    }

}

#[async_trait]
impl Inventory for MemoryInventory {
    async fn switch(&self, label: &str) -> Result<SwitchRecord> {
        self.records
            .read()
            .await
            .switches
            .get(label)
            .cloned()
            .ok_or_else(|| NetworkError::not_found(format!("switch {}", label)))
    }

    async fn port(&self, port: &PortRef) -> Result<Port> {
        self.records
            .read()
            .await
            .ports
            .get(port)
            .cloned()
            .ok_or_else(|| NetworkError::not_found(format!("port {}", port)))
    }

    async fn node(&self, label: &str) -> Result<Node> {
        self.records
            .read()
            .await
            .nodes
            .get(label)
            .cloned()
            .ok_or_else(|| NetworkError::not_found(format!("node {}", label)))
    }

    async fn nic(&self, nic: &NicRef) -> Result<Nic> {
        self.records.read().await.nic(nic).cloned()
    }

    async fn network(&self, label: &str) -> Result<Network> {
        self.records
            .read()
            .await
            .networks
            .get(label)
            .cloned()
            .ok_or_else(|| NetworkError::not_found(format!("network {}", label)))
    }

    async fn attachments_for_nic(&self, nic: &NicRef) -> Result<Vec<NetworkAttachment>> {
        let records = self.records.read().await;
        records.nic(nic)?;
        Ok(records
            .attachments
            .iter()
            .filter(|a| &a.nic == nic)
            .cloned()
            .collect())
    }

    async fn commit_attachment(&self, attachment: NetworkAttachment) -> Result<()> {
        let mut records = self.records.write().await;
        records.nic(&attachment.nic)?;
        if !records.networks.contains_key(&attachment.network) {
            return Err(NetworkError::not_found(format!("network {}", attachment.network)));
        }

        let existing: Vec<&NetworkAttachment> = records
            .attachments
            .iter()
            .filter(|a| a.nic == attachment.nic)
            .collect();
        if existing.iter().any(|a| a.network == attachment.network) {
            return Err(conflict(
                format!("nic {}", attachment.nic),
                format!("already attached to network {}", attachment.network),
            ));
        }
        if existing.iter().any(|a| a.channel == attachment.channel) {
            return Err(conflict(
                format!("nic {}", attachment.nic),
                format!("channel {} already in use", attachment.channel),
            ));
        }

        debug!(
            "committed attachment {} -> {} on {}",
            attachment.nic, attachment.network, attachment.channel
        );
        records.attachments.push(attachment);
        Ok(())
    }

    async fn remove_attachment(&self, nic: &NicRef, network: &str) -> Result<NetworkAttachment> {
        let mut records = self.records.write().await;
        let position = records
            .attachments
            .iter()
            .position(|a| &a.nic == nic && a.network == network)
            .ok_or_else(|| {
                NetworkError::not_found(format!("attachment of {} to network {}", nic, network))
            })?;
        Ok(records.attachments.remove(position))
    }

    async fn clear_attachments(&self, nic: &NicRef) -> Result<Vec<NetworkAttachment>> {
        let mut records = self.records.write().await;
        let (removed, kept): (Vec<_>, Vec<_>) = records
            .attachments
            .drain(..)
            .partition(|a| &a.nic == nic);
        records.attachments = kept;
        Ok(removed)
    }

    async fn add_switch(&self, record: SwitchRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.switches.contains_key(&record.label) {
            return Err(conflict(format!("switch {}", record.label), "label already in use"));
        }
        info!("registered {} switch {}", record.switch_type, record.label);
        records.switches.insert(record.label.clone(), record);
        Ok(())
    }

    async fn add_port(&self, port: Port) -> Result<()> {
        let mut records = self.records.write().await;
        if !records.switches.contains_key(&port.switch) {
            return Err(NetworkError::not_found(format!("switch {}", port.switch)));
        }
        let key = port.port_ref();
        if records.ports.contains_key(&key) {
            return Err(conflict(format!("port {}", key), "already registered"));
        }

        let Port { switch, label, nic } = port;
        records.ports.insert(
            key.clone(),
            Port {
                switch,
                label,
                nic: None,
            },
        );
        if let Some(nic) = nic {
            if let Err(err) = records.link(&nic, &key) {
                records.ports.shift_remove(&key);
                return Err(err);
            }
        }
        debug!("registered port {}", key);
        Ok(())
    }
}
