//! Asynchronous event bus carrying networking action lifecycle events from
//! the applier to whoever wants to observe them (loggers, API pollers,
//! external notifiers).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use fabric_shared_types::SystemEvent;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::RwLock;

/// Result alias for event bus operations
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Contract implemented by listeners interested in [`SystemEvent`] notifications.
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, event: &SystemEvent) -> anyhow::Result<()>;
}

/// Shared bus that fans published events out to registered listeners in
/// name order.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<RwLock<BTreeMap<String, Arc<dyn EventListener>>>>,
}

/// Outcome of a single publish call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: Vec<String>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener under a unique name.
    pub async fn register_listener<L>(
        &self,
        name: impl Into<String>,
        listener: L,
    ) -> EventBusResult<()>
    where
        L: EventListener + 'static,
    {
        let name = name.into();
        let mut guard = self.listeners.write().await;
        if guard.contains_key(&name) {
            return Err(EventBusError::ListenerExists(name));
        }

        debug!("registered event listener '{}'", name);
        guard.insert(name, Arc::new(listener));
        Ok(())
    }

    pub async fn unregister_listener(&self, name: &str) -> EventBusResult<()> {
        let mut guard = self.listeners.write().await;
        guard
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EventBusError::ListenerNotFound(name.to_string()))
    }

    /// Deliver `event` to every listener. A failing listener is logged and
    /// reported but never stops delivery to the others, and never fails the
    /// publisher: the action that produced the event has already happened.
    pub async fn publish(&self, event: SystemEvent) -> PublishReport {
        let listeners: Vec<(String, Arc<dyn EventListener>)> = {
            let guard = self.listeners.read().await;
            guard
                .iter()
                .map(|(name, listener)| (name.clone(), Arc::clone(listener)))
                .collect()
        };

        let mut report = PublishReport::default();
        for (name, listener) in listeners {
            match listener.on_event(&event).await {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    warn!(
                        "event listener '{}' failed on action {}: {}",
                        name,
                        event.action_id(),
                        err
                    );
                    report.failed.push(name);
                }
            }
        }

        report
    }
}

/// Listener that writes every lifecycle event to the log.
pub struct ActionEventLogger;

#[async_trait]
impl EventListener for ActionEventLogger {
    async fn on_event(&self, event: &SystemEvent) -> anyhow::Result<()> {
        match event {
            SystemEvent::ActionQueued { id, nic } => info!("action {} queued for nic {}", id, nic),
            SystemEvent::ActionStarted { id } => info!("action {} started", id),
            SystemEvent::ActionCompleted { id } => info!("action {} completed", id),
            SystemEvent::ActionFailed { id, error } => warn!("action {} failed: {}", id, error),
            SystemEvent::ActionCancelled { id } => info!("action {} cancelled", id),
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("listener '{0}' already registered")]
    ListenerExists(String),
    #[error("listener '{0}' not found")]
    ListenerNotFound(String),
}
