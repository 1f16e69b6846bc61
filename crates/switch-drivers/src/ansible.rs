//! Ansible transport
//!
//! Every command batch becomes a one-task playbook run by `ansible-playbook`
//! against a per-session inventory. The JSON stdout callback gives us a
//! machine readable report from which the per-host result is extracted.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fabric_net_core::{DeviceError, NetworkError, Result};
use fabric_switch_core::{CommandRunner, Connector, DeviceTarget};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::timeout;

/// Opens [`AnsibleRunner`]s.
#[derive(Debug, Clone)]
pub struct AnsibleConnector {
    playbook_bin: String,
    command_timeout: Duration,
}

impl AnsibleConnector {
    pub fn new(playbook_bin: impl Into<String>, command_timeout: Duration) -> Self {
        Self {
            playbook_bin: playbook_bin.into(),
            command_timeout,
        }
    }
}

#[async_trait]
impl Connector for AnsibleConnector {
    async fn connect(&self, target: &DeviceTarget) -> Result<Box<dyn CommandRunner>> {
        let runner = AnsibleRunner::prepare(
            target.clone(),
            self.playbook_bin.clone(),
            self.command_timeout,
        )
        .await?;
        Ok(Box::new(runner))
    }
}

#[derive(Serialize)]
struct Inventory {
    all: InventoryGroup,
}

#[derive(Serialize)]
struct InventoryGroup {
    hosts: HashMap<String, InventoryHost>,
}

#[derive(Serialize)]
struct InventoryHost {
    ansible_host: String,
    ansible_user: String,
    ansible_password: String,
    ansible_network_os: String,
    ansible_connection: String,
}

#[derive(Serialize)]
struct Play {
    hosts: String,
    gather_facts: bool,
    tasks: Vec<serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
struct PlaybookReport {
    #[serde(default)]
    plays: Vec<PlayReport>,
}

#[derive(Debug, Deserialize)]
struct PlayReport {
    #[serde(default)]
    tasks: Vec<TaskReport>,
}

#[derive(Debug, Deserialize)]
struct TaskReport {
    #[serde(default)]
    hosts: HashMap<String, HostResult>,
}

#[derive(Debug, Default, Deserialize)]
struct HostResult {
    #[serde(default)]
    failed: bool,
    #[serde(default)]
    unreachable: bool,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    stdout: Vec<String>,
}

/// Runs command batches against one device. The inventory and playbooks
/// live in a private temporary directory that is removed when the runner
/// is dropped.
pub struct AnsibleRunner {
    target: DeviceTarget,
    playbook_bin: String,
    command_timeout: Duration,
    workdir: TempDir,
    inventory: PathBuf,
}

impl AnsibleRunner {
    async fn prepare(
        target: DeviceTarget,
        playbook_bin: String,
        command_timeout: Duration,
    ) -> Result<Self> {
        let workdir = tempfile::Builder::new()
            .prefix("fabric-ansible-")
            .tempdir()?;

        let mut hosts = HashMap::new();
        hosts.insert(
            target.switch.clone(),
            InventoryHost {
                ansible_host: target.hostname.clone(),
                ansible_user: target.username.clone(),
                ansible_password: target.password.clone(),
                ansible_network_os: target.network_os.clone(),
                ansible_connection: "network_cli".to_string(),
            },
        );
        let inventory = Inventory {
            all: InventoryGroup { hosts },
        };

        let inventory_path = workdir.path().join("inventory.yml");
        tokio::fs::write(&inventory_path, to_yaml(&target.switch, &inventory)?).await?;
        debug!("prepared ansible inventory for {:?}", target);

        Ok(Self {
            target,
            playbook_bin,
            command_timeout,
            workdir,
            inventory: inventory_path,
        })
    }

    fn module(&self, suffix: &str) -> String {
        format!("{}_{}", self.target.network_os, suffix)
    }

    fn task(&self, name: &str, module: String, commands: &[String]) -> serde_yaml::Value {
        let mut params = serde_yaml::Mapping::new();
        params.insert(
            serde_yaml::Value::String("commands".to_string()),
            serde_yaml::Value::Sequence(
                commands
                    .iter()
                    .map(|c| serde_yaml::Value::String(c.clone()))
                    .collect(),
            ),
        );

        let mut task = serde_yaml::Mapping::new();
        task.insert(
            serde_yaml::Value::String("name".to_string()),
            serde_yaml::Value::String(name.to_string()),
        );
        task.insert(
            serde_yaml::Value::String(module),
            serde_yaml::Value::Mapping(params),
        );
        serde_yaml::Value::Mapping(task)
    }

    async fn run_playbook(&self, operation: &str, task: serde_yaml::Value) -> Result<Vec<String>> {
        let play = vec![Play {
            hosts: self.target.switch.clone(),
            gather_facts: false,
            tasks: vec![task],
        }];

        let playbook = self.workdir.path().join("playbook.yml");
        tokio::fs::write(&playbook, to_yaml(&self.target.switch, &play)?).await?;

        let mut cmd = Command::new(&self.playbook_bin);
        cmd.arg("-i")
            .arg(&self.inventory)
            .arg(&playbook)
            .current_dir(self.workdir.path())
            .env("ANSIBLE_STDOUT_CALLBACK", "json")
            .env("ANSIBLE_HOST_KEY_CHECKING", "False")
            .env("ANSIBLE_RETRY_FILES_ENABLED", "False")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let start_time = Instant::now();
        debug!("running '{}' on {}", operation, self.target.switch);

        let output = match timeout(self.command_timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!("{} failed to execute: {}", operation, e);
                return Err(self.communication(format!(
                    "cannot run {}: {}",
                    self.playbook_bin, e
                )));
            }
            Err(_) => {
                error!(
                    "{} on {} timed out after {:?}",
                    operation, self.target.switch, self.command_timeout
                );
                return Err(DeviceError::Timeout {
                    switch: self.target.switch.clone(),
                    operation: operation.to_string(),
                    seconds: self.command_timeout.as_secs(),
                }
                .into());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(
            "{} on {} finished in {}ms with {:?}",
            operation,
            self.target.switch,
            start_time.elapsed().as_millis(),
            output.status.code()
        );

        match parse_playbook_output(&self.target.switch, &stdout) {
            Ok(lines) if output.status.success() => Ok(lines),
            Ok(_) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!("{} exited with {:?}: {}", operation, output.status.code(), stderr);
                Err(self.communication(format!(
                    "{} exited with {:?}: {}",
                    self.playbook_bin,
                    output.status.code(),
                    stderr.trim()
                )))
            }
            Err(err) => Err(err),
        }
    }

    fn communication(&self, message: String) -> NetworkError {
        DeviceError::Communication {
            switch: self.target.switch.clone(),
            message,
        }
        .into()
    }
}

#[async_trait]
impl CommandRunner for AnsibleRunner {
    async fn exec(&self, operation: &str, commands: &[String]) -> Result<Vec<String>> {
        let task = self.task(operation, self.module("command"), commands);
        self.run_playbook(operation, task).await
    }

    async fn configure(&self, operation: &str, commands: &[String]) -> Result<()> {
        let task = self.task(operation, self.module("config"), commands);
        self.run_playbook(operation, task).await.map(|_| ())
    }
}

fn to_yaml<T: Serialize>(switch: &str, value: &T) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| {
        DeviceError::Communication {
            switch: switch.to_string(),
            message: format!("cannot render playbook: {}", e),
        }
        .into()
    })
}

/// Extract the per-command output for `host` from the JSON callback report.
/// A failed or unreachable host fails the whole batch.
pub(crate) fn parse_playbook_output(host: &str, raw: &str) -> Result<Vec<String>> {
    let communication = |message: String| -> NetworkError {
        DeviceError::Communication {
            switch: host.to_string(),
            message,
        }
        .into()
    };

    // ansible may print warnings before the report
    let start = raw
        .find('{')
        .ok_or_else(|| communication("no playbook report on stdout".to_string()))?;
    let report: PlaybookReport = serde_json::from_str(&raw[start..])
        .map_err(|e| communication(format!("unreadable playbook report: {}", e)))?;

    let mut lines = Vec::new();
    let mut seen = false;
    for task in report.plays.iter().flat_map(|p| p.tasks.iter()) {
        if let Some(result) = task.hosts.get(host) {
            seen = true;
            if result.unreachable || result.failed {
                let reason = result.msg.clone().unwrap_or_else(|| "task failed".to_string());
                let kind = if result.unreachable { "unreachable" } else { "failed" };
                return Err(communication(format!("{}: {}", kind, reason)));
            }
            lines.extend(result.stdout.iter().cloned());
        }
    }

    if !seen {
        return Err(communication(format!("host {} missing from playbook report", host)));
    }
    Ok(lines)
}
