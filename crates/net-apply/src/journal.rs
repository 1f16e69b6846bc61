//! Append-only action journal
//!
//! One JSON object per line for every state change of every action, so the
//! outcome of an action outlives the process that applied it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fabric_net_core::{
    ActionId, ActionKind, ActionStatus, NetworkError, NetworkingAction, NicRef, Result,
};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

const JOURNAL_FILE: &str = "actions.jsonl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub action_id: ActionId,
    pub nic: NicRef,
    #[serde(flatten)]
    pub kind: ActionKind,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&NetworkingAction> for JournalEntry {
    fn from(action: &NetworkingAction) -> Self {
        Self {
            timestamp: action.updated_at,
            action_id: action.id,
            nic: action.nic.clone(),
            kind: action.kind.clone(),
            status: action.status,
            error: action.error.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActionJournal {
    path: PathBuf,
}

impl ActionJournal {
    /// Journal stored in `dir`, created if missing.
    pub async fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).await?;
        Ok(Self {
            path: dir.join(JOURNAL_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn record(&self, action: &NetworkingAction) -> Result<()> {
        let line = format!("{}\n", serde_json::to_string(&JournalEntry::from(action))?);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("journaled action {} as {}", action.id, action.status);
        Ok(())
    }

    /// Every entry, oldest first. A missing journal reads as empty.
    pub async fn entries(&self) -> Result<Vec<JournalEntry>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<JournalEntry>(line).map_err(NetworkError::from))
            .collect()
    }

    /// Most recent entry for `id`.
    pub async fn latest(&self, id: ActionId) -> Result<Option<JournalEntry>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .rev()
            .find(|entry| entry.action_id == id))
    }
}
