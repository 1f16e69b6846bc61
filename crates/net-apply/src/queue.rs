//! Networking action queue
//!
//! One process-wide FIFO of pending actions. Only the applier takes actions
//! out, one at a time, so at most one action is ever `in_progress`.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use fabric_net_core::{
    ActionId, ActionStatus, ActionStatusReport, ApiError, NetworkError, NetworkingAction, NicRef,
    Result, ValidationError,
};
use log::{debug, info, warn};
use tokio::sync::{Mutex, Notify};

/// Failure detail recorded on actions cancelled while still pending
pub const CANCELLED_DETAIL: &str = "cancelled before execution";

#[derive(Default)]
struct QueueState {
    pending: VecDeque<ActionId>,
    actions: HashMap<ActionId, NetworkingAction>,
    /// Terminal actions, oldest first
    finished: VecDeque<ActionId>,
    in_progress: Option<ActionId>,
    closed: bool,
}

impl QueueState {
    fn retire(&mut self, id: ActionId, history_limit: usize) {
        self.finished.push_back(id);
        while self.finished.len() > history_limit {
            if let Some(old) = self.finished.pop_front() {
                self.actions.remove(&old);
            }
        }
    }
}

pub struct ActionQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    history_limit: usize,
}

impl ActionQueue {
    pub fn new(history_limit: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// Append `action` in `pending` state. Rejected when the nic already
    /// has an open action or the queue is shut down.
    pub async fn enqueue(&self, mut action: NetworkingAction) -> Result<ActionId> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(ApiError::Conflict {
                resource: "action queue".to_string(),
                message: "queue is shut down".to_string(),
            }
            .into());
        }

        if let Some(open) = state
            .actions
            .values()
            .find(|a| a.nic == action.nic && !a.status.is_terminal())
        {
            return Err(ValidationError::Blocked {
                message: format!(
                    "nic {} has {} action {} ({})",
                    action.nic,
                    open.status,
                    open.id,
                    open.kind.action_type()
                ),
            }
            .into());
        }

        action.status = ActionStatus::Pending;
        action.error = None;
        let id = action.id;
        state.pending.push_back(id);
        state.actions.insert(id, action);
        debug!("queued action {} ({} pending)", id, state.pending.len());
        drop(state);

        self.notify.notify_one();
        Ok(id)
    }

    /// Wait for the oldest pending action and mark it `in_progress`.
    /// Returns `None` once the queue is shut down and drained.
    pub async fn next(&self) -> Option<NetworkingAction> {
        loop {
            if let Some(action) = self.try_next().await {
                return Some(action);
            }
            if self.state.lock().await.closed {
                return None;
            }
            self.notify.notified().await;
        }
    }

    /// Like [`ActionQueue::next`] but returns `None` immediately when
    /// nothing is pending.
    pub async fn try_next(&self) -> Option<NetworkingAction> {
        let mut state = self.state.lock().await;
        if let Some(current) = state.in_progress {
            warn!("action {} is still in progress, not starting another", current);
            return None;
        }

        let id = state.pending.pop_front()?;
        state.in_progress = Some(id);
        let action = state.actions.get_mut(&id)?;
        action.status = ActionStatus::InProgress;
        action.updated_at = Utc::now();
        Some(action.clone())
    }

    /// Record the outcome of the in-progress action.
    pub async fn finish(&self, id: ActionId, outcome: std::result::Result<(), String>) -> Result<NetworkingAction> {
        let mut state = self.state.lock().await;
        if state.in_progress != Some(id) {
            return Err(ApiError::Conflict {
                resource: format!("action {}", id),
                message: "not in progress".to_string(),
            }
            .into());
        }
        state.in_progress = None;

        let action = state
            .actions
            .get_mut(&id)
            .ok_or_else(|| NetworkError::not_found(format!("action {}", id)))?;
        match outcome {
            Ok(()) => {
                action.status = ActionStatus::Completed;
                action.error = None;
            }
            Err(detail) => {
                action.status = ActionStatus::Failed;
                action.error = Some(detail);
            }
        }
        action.updated_at = Utc::now();
        let finished = action.clone();

        state.retire(id, self.history_limit);
        Ok(finished)
    }

    /// Drop a pending action. It becomes terminal `failed` without any
    /// device having been touched.
    pub async fn cancel(&self, id: ActionId) -> Result<NetworkingAction> {
        let mut state = self.state.lock().await;
        let status = state
            .actions
            .get(&id)
            .map(|a| a.status)
            .ok_or_else(|| NetworkError::not_found(format!("action {}", id)))?;

        if status != ActionStatus::Pending {
            return Err(ApiError::Conflict {
                resource: format!("action {}", id),
                message: format!("cannot cancel an action that is {}", status),
            }
            .into());
        }

        state.pending.retain(|pending| *pending != id);
        let action = state
            .actions
            .get_mut(&id)
            .ok_or_else(|| NetworkError::not_found(format!("action {}", id)))?;
        action.status = ActionStatus::Failed;
        action.error = Some(CANCELLED_DETAIL.to_string());
        action.updated_at = Utc::now();
        let cancelled = action.clone();

        state.retire(id, self.history_limit);
        info!("cancelled action {}", id);
        Ok(cancelled)
    }

    pub async fn status(&self, id: ActionId) -> Result<ActionStatusReport> {
        self.get(id)
            .await
            .map(|a| a.report())
            .ok_or_else(|| NetworkError::not_found(format!("action {}", id)))
    }

    pub async fn get(&self, id: ActionId) -> Option<NetworkingAction> {
        self.state.lock().await.actions.get(&id).cloned()
    }

    /// Whether `nic` has a pending or in-progress action.
    pub async fn has_open_action_for(&self, nic: &NicRef) -> bool {
        self.state
            .lock()
            .await
            .actions
            .values()
            .any(|a| &a.nic == nic && !a.status.is_terminal())
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Stop accepting new actions. Pending ones are still handed out by
    /// [`ActionQueue::next`] until the queue is empty.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
        self.notify.notify_one();
    }
}
