//! Action applier
//!
//! Takes actions off the queue one at a time, drives the nic's switch port
//! through the requested transition and records the outcome. Device errors
//! fail the action and are never retried; the worker moves on to the next
//! action.

use std::sync::Arc;

use fabric_event_bus::EventBus;
use fabric_net_core::{
    ActionId, ActionKind, ActionStatus, Channel, NetworkAttachment, NetworkError, NetworkingAction, Result,
    SystemEvent,
};
use fabric_switch_core::PortTransition;
use fabric_switch_drivers::DriverRegistry;
use log::{debug, error, info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::inventory::Inventory;
use crate::journal::ActionJournal;
use crate::queue::ActionQueue;

/// Port transition realising `kind`.
pub fn transition_for(kind: &ActionKind) -> PortTransition {
    match kind {
        ActionKind::Connect {
            channel: Channel::Native,
            vlan,
            ..
        } => PortTransition::SetNative(*vlan),
        ActionKind::Connect { vlan, .. } => PortTransition::AddTrunk(*vlan),
        ActionKind::Detach {
            channel: Channel::Native,
            vlan,
            ..
        } => PortTransition::RemoveNative(*vlan),
        ActionKind::Detach { vlan, .. } => PortTransition::RemoveTrunk(*vlan),
        ActionKind::RevertPort => PortTransition::Revert,
    }
}

pub struct NetworkApplier {
    queue: Arc<ActionQueue>,
    inventory: Arc<dyn Inventory>,
    drivers: Arc<DriverRegistry>,
    events: EventBus,
    journal: Option<ActionJournal>,
    /// Held while a submission records its pending state; the worker waits
    /// on it before recording anything about that action.
    admission: Mutex<()>,
}

impl NetworkApplier {
    pub fn new(
        queue: Arc<ActionQueue>,
        inventory: Arc<dyn Inventory>,
        drivers: Arc<DriverRegistry>,
    ) -> Self {
        Self {
            queue,
            inventory,
            drivers,
            events: EventBus::new(),
            journal: None,
            admission: Mutex::new(()),
        }
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_journal(mut self, journal: ActionJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn queue(&self) -> &Arc<ActionQueue> {
        &self.queue
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn journal(&self) -> Option<&ActionJournal> {
        self.journal.as_ref()
    }

    /// Put an already validated action on the queue.
    pub async fn submit(&self, action: NetworkingAction) -> Result<ActionId> {
        let mut queued = action.clone();
        queued.status = ActionStatus::Pending;
        queued.error = None;

        let _admission = self.admission.lock().await;
        let id = self.queue.enqueue(action).await?;
        info!("action {} queued for nic {}", id, queued.nic);

        self.record(&queued).await;
        self.events
            .publish(SystemEvent::ActionQueued {
                id,
                nic: queued.nic,
            })
            .await;
        Ok(id)
    }

    /// Cancel a pending action.
    pub async fn cancel(&self, id: ActionId) -> Result<NetworkingAction> {
        let cancelled = self.queue.cancel(id).await?;
        self.record(&cancelled).await;
        self.events.publish(SystemEvent::ActionCancelled { id }).await;
        Ok(cancelled)
    }

    /// Apply the oldest pending action, if any.
    pub async fn apply_next(&self) -> Option<NetworkingAction> {
        let action = self.queue.try_next().await?;
        Some(self.run(action).await)
    }

    /// Apply pending actions until the queue is empty.
    pub async fn drain(&self) -> Vec<NetworkingAction> {
        let mut finished = Vec::new();
        while let Some(action) = self.apply_next().await {
            finished.push(action);
        }
        finished
    }

    /// Run the worker loop on its own task.
    pub fn spawn(self: Arc<Self>) -> WorkerHandle {
        let queue = Arc::clone(&self.queue);
        let handle = tokio::spawn(async move {
            info!("networking action worker started");
            while let Some(action) = self.queue.next().await {
                self.run(action).await;
            }
            info!("networking action worker stopped");
        });
        WorkerHandle { queue, handle }
    }

    async fn run(&self, action: NetworkingAction) -> NetworkingAction {
        let id = action.id;
        info!(
            "applying action {}: {} on nic {}",
            id,
            action.kind.action_type(),
            action.nic
        );
        // the submitter may still be recording this action as pending
        drop(self.admission.lock().await);
        self.record(&action).await;
        self.events.publish(SystemEvent::ActionStarted { id }).await;

        let outcome = self.execute(&action).await.map_err(|err| {
            if err.is_device() {
                error!("action {} failed on the device: {}", id, err);
            } else {
                warn!("action {} rejected at apply time: {}", id, err);
            }
            err.to_string()
        });

        let finished = match self.queue.finish(id, outcome.clone()).await {
            Ok(finished) => finished,
            Err(err) => {
                error!("cannot record outcome of action {}: {}", id, err);
                let mut fallback = action;
                fallback.status = if outcome.is_ok() {
                    ActionStatus::Completed
                } else {
                    ActionStatus::Failed
                };
                fallback.error = outcome.err();
                fallback
            }
        };

        self.record(&finished).await;
        let event = match &finished.error {
            None => SystemEvent::ActionCompleted { id },
            Some(error) => SystemEvent::ActionFailed {
                id,
                error: error.clone(),
            },
        };
        self.events.publish(event).await;
        finished
    }

    async fn execute(&self, action: &NetworkingAction) -> Result<()> {
        let nic = self.inventory.nic(&action.nic).await?;
        let port_ref = nic.port.ok_or_else(|| {
            NetworkError::bad_argument(format!("nic {} is not connected to a switch port", action.nic))
        })?;
        let record = self.inventory.switch(&port_ref.switch).await?;
        let driver = self.drivers.driver(&record)?;

        // earlier actions may have changed the attachments since enqueue
        let attachments = self.inventory.attachments_for_nic(&action.nic).await?;
        let channel = action.kind.channel();
        driver.ensure_legal_operation(&attachments, action.kind.action_type(), channel.as_ref())?;

        let transition = transition_for(&action.kind);
        debug!("{} on {} via {} driver", transition, port_ref, record.switch_type);

        let mut session = driver.session().await?;
        let applied = session.apply(&port_ref.port, &transition).await;
        let closed = session.close().await;
        applied?;
        if let Err(err) = closed {
            warn!("closing session on {} failed: {}", record.label, err);
        }

        self.commit(action).await
    }

    async fn commit(&self, action: &NetworkingAction) -> Result<()> {
        match &action.kind {
            ActionKind::Connect {
                network, channel, ..
            } => {
                self.inventory
                    .commit_attachment(NetworkAttachment {
                        nic: action.nic.clone(),
                        network: network.clone(),
                        channel: *channel,
                    })
                    .await
            }
            ActionKind::Detach { network, .. } => self
                .inventory
                .remove_attachment(&action.nic, network)
                .await
                .map(|_| ()),
            ActionKind::RevertPort => {
                let removed = self.inventory.clear_attachments(&action.nic).await?;
                debug!("revert cleared {} attachments of {}", removed.len(), action.nic);
                Ok(())
            }
        }
    }

    async fn record(&self, action: &NetworkingAction) {
        if let Some(journal) = &self.journal {
            if let Err(err) = journal.record(action).await {
                warn!("cannot journal action {}: {}", action.id, err);
            }
        }
    }
}

/// Handle on a spawned worker.
pub struct WorkerHandle {
    queue: Arc<ActionQueue>,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop accepting actions, let the worker finish what is queued, and
    /// wait for it to exit.
    pub async fn shutdown(self) -> Result<()> {
        self.queue.close().await;
        self.handle.await.map_err(|e| {
            NetworkError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("action worker panicked: {}", e),
            ))
        })
    }
}
