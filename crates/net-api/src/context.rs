use std::sync::Arc;

use anyhow::{Context, Result};
use fabric_event_bus::{ActionEventLogger, EventBus};
use fabric_net_apply::{ActionJournal, ActionQueue, MemoryInventory, NetworkApplier, WorkerHandle};
use fabric_net_config::{EngineConfig, InventoryFile};
use fabric_switch_drivers::{AnsibleConnector, DriverRegistry, MockFabric};
use log::info;

use crate::NetworkingApi;

/// Everything a process needs to accept and apply networking requests.
#[derive(Clone)]
pub struct AppContext {
    pub config: EngineConfig,
    pub event_bus: EventBus,
    pub inventory: Arc<MemoryInventory>,
    pub drivers: Arc<DriverRegistry>,
    pub mock_fabric: MockFabric,
    pub applier: Arc<NetworkApplier>,
    pub networking_api: Arc<NetworkingApi>,
}

impl AppContext {
    pub async fn bootstrap(config: EngineConfig, inventory: InventoryFile) -> Result<Arc<Self>> {
        let event_bus = EventBus::new();
        event_bus
            .register_listener("action-logger", ActionEventLogger)
            .await
            .map_err(|err| anyhow::anyhow!(err))?;

        let pool = config.vlan_pool()?;
        let inventory = Arc::new(
            MemoryInventory::load(inventory, Some(pool))
                .await
                .context("inventory is inconsistent")?,
        );

        let connector = AnsibleConnector::new(config.ansible_playbook.clone(), config.command_timeout());
        let mock_fabric = MockFabric::new();
        let drivers = Arc::new(DriverRegistry::with_defaults(
            Arc::new(connector),
            mock_fabric.clone(),
        ));
        for record in inventory.to_file().await.switches {
            drivers
                .validate(&record)
                .with_context(|| format!("switch {} has an invalid configuration", record.label))?;
        }

        let mut applier = NetworkApplier::new(
            Arc::new(ActionQueue::new(config.history_limit)),
            inventory.clone(),
            drivers.clone(),
        )
        .with_event_bus(event_bus.clone());
        if let Some(dir) = &config.journal_dir {
            let journal = ActionJournal::open(dir)
                .await
                .with_context(|| format!("cannot open action journal in {}", dir.display()))?;
            applier = applier.with_journal(journal);
        }
        let applier = Arc::new(applier);

        let networking_api = Arc::new(NetworkingApi::new(
            inventory.clone(),
            drivers.clone(),
            applier.clone(),
        ));

        info!("fabric context ready");
        Ok(Arc::new(Self {
            config,
            event_bus,
            inventory,
            drivers,
            mock_fabric,
            applier,
            networking_api,
        }))
    }

    /// Start the single action worker.
    pub fn start_worker(&self) -> WorkerHandle {
        Arc::clone(&self.applier).spawn()
    }
}
