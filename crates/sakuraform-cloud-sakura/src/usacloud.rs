//! usacloud CLI wrapper
//!
//! Wraps the usacloud CLI commands for Sakura Cloud operations. Every call
//! is one `usacloud --zone <zone> ...` process; usacloud owns authentication,
//! retries and pagination.

use crate::error::{Result, SakuraError};
use sakuraform_cloud::{
    AttachedDisk, ConnectionTarget, DiskConnection, Instance, InstanceStatus, Interface, PlanRef,
    ServerPlan,
};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::process::Command;

/// usacloud CLI wrapper
#[derive(Debug, Clone)]
pub struct Usacloud {
    program: String,
    zone: String,
}

impl Usacloud {
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            program: "usacloud".to_string(),
            zone: zone.into(),
        }
    }

    /// Use another usacloud binary (path or name on PATH)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument list passed to the usacloud process
    pub fn command_args(&self, args: &[&str]) -> Vec<String> {
        let mut full = vec!["--zone".to_string(), self.zone.clone()];
        full.extend(args.iter().map(|a| a.to_string()));
        full
    }

    /// Run a usacloud command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.command_args(args));
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(
            "Running: {} --zone {} {}",
            self.program,
            self.zone,
            args.join(" ")
        );

        let output = cmd.output().await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => SakuraError::UsacloudNotFound(self.program.clone()),
            _ => SakuraError::IoError(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SakuraError::from_stderr(&stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// `<resource> read <id>`
    pub async fn read<T: DeserializeOwned>(&self, resource: &str, id: &str) -> Result<T> {
        let output = self
            .run_command(&[resource, "read", id, "--output-type", "json"])
            .await?;
        parse_one(&output, &format!("{} {}", resource, id))
    }

    /// `<resource> update <id> --parameters <json>`
    pub async fn update<P: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        resource: &str,
        id: &str,
        parameters: &P,
    ) -> Result<T> {
        let parameters = serde_json::to_string(parameters)?;
        let output = self
            .run_command(&[
                resource,
                "update",
                id,
                "--parameters",
                parameters.as_str(),
                "--output-type",
                "json",
                "--yes",
            ])
            .await?;
        parse_one(&output, &format!("{} {}", resource, id))
    }

    /// Fire-and-forget operation such as `server boot <id>`
    pub async fn operate(
        &self,
        resource: &str,
        verb: &str,
        id: &str,
        extra: &[&str],
    ) -> Result<()> {
        let mut args = vec![resource, verb, id];
        args.extend_from_slice(extra);
        args.push("--yes");
        self.run_command(&args).await?;
        Ok(())
    }

    /// Get server by ID
    pub async fn get_server(&self, id: &str) -> Result<ServerInfo> {
        self.read("server", id).await
    }

    /// Create a server from parameters; the server is left powered off
    pub async fn create_server(&self, parameters: &ServerCreateParams) -> Result<ServerInfo> {
        let parameters = serde_json::to_string(parameters)?;
        let output = self
            .run_command(&[
                "server",
                "create",
                "--parameters",
                parameters.as_str(),
                "--output-type",
                "json",
                "--yes",
            ])
            .await?;
        parse_one(&output, "server create")
    }

    /// Change the plan; Sakura Cloud re-creates the server under a new ID
    pub async fn change_server_plan(
        &self,
        id: &str,
        core: u32,
        memory_gb: u32,
    ) -> Result<ServerInfo> {
        let core_str = core.to_string();
        let memory_str = memory_gb.to_string();
        let output = self
            .run_command(&[
                "server",
                "plan-change",
                id,
                "--cpu",
                core_str.as_str(),
                "--memory",
                memory_str.as_str(),
                "--output-type",
                "json",
                "--yes",
            ])
            .await?;
        parse_one(&output, &format!("server {}", id))
    }

    /// Server plans offering exactly `core` / `memory_gb`
    pub async fn find_server_plans(
        &self,
        core: u32,
        memory_gb: u32,
    ) -> Result<Vec<ServerPlanInfo>> {
        let core_str = core.to_string();
        let memory_str = memory_gb.to_string();
        let output = self
            .run_command(&[
                "server-plan",
                "list",
                "--cpu",
                core_str.as_str(),
                "--memory",
                memory_str.as_str(),
                "--output-type",
                "json",
            ])
            .await?;

        if output.trim().is_empty() || output.trim() == "[]" {
            return Ok(Vec::new());
        }

        let plans: Vec<ServerPlanInfo> = serde_json::from_str(&output)?;
        Ok(plans)
    }

    pub async fn get_server_plan(&self, id: &str) -> Result<ServerPlanInfo> {
        self.read("server-plan", id).await
    }

    /// Add an unconnected NIC to a server
    pub async fn create_interface(&self, server_id: &str) -> Result<InterfaceInfo> {
        let output = self
            .run_command(&[
                "interface",
                "create",
                "--server-id",
                server_id,
                "--output-type",
                "json",
                "--yes",
            ])
            .await?;
        parse_one(&output, &format!("interface on server {}", server_id))
    }
}

/// usacloud prints either a single object or a one-element list
pub fn parse_one<T: DeserializeOwned>(output: &str, what: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(output.trim())?;
    let value = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| SakuraError::NotFound(what.to_string()))?,
        other => other,
    };
    Ok(serde_json::from_value(value)?)
}

/// Sakura Cloud IDs come as strings or as bare numbers depending on the command
pub(crate) fn id_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Like [`id_string`], treating null, `""` and `0` as absent
pub(crate) fn opt_id_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Text(s)) if !s.is_empty() && s != "0" => Some(s),
        Some(Id::Number(n)) if n != 0 => Some(n.to_string()),
        _ => None,
    })
}

/// Server information from usacloud
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(rename = "ID", deserialize_with = "id_string")]
    pub id: String,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Description", default)]
    pub description: Option<String>,

    #[serde(rename = "Tags", default)]
    pub tags: Option<Vec<String>>,

    #[serde(rename = "ServerPlanID", default, deserialize_with = "opt_id_string")]
    pub server_plan_id: Option<String>,

    #[serde(rename = "CPU", default)]
    pub cpu: u32,

    #[serde(rename = "MemoryMB", default)]
    pub memory_mb: u32,

    #[serde(rename = "InstanceStatus", default)]
    pub instance_status: Option<String>,

    #[serde(rename = "InstanceBeforeStatus", default)]
    pub instance_before_status: Option<String>,

    #[serde(rename = "Disks", default)]
    pub disks: Option<Vec<DiskInfo>>,

    #[serde(rename = "Interfaces", default)]
    pub interfaces: Option<Vec<InterfaceInfo>>,
}

fn parse_status(status: &str) -> InstanceStatus {
    match status {
        "up" => InstanceStatus::Up,
        "down" => InstanceStatus::Down,
        "cleaning" => InstanceStatus::Cleaning,
        "migrating" => InstanceStatus::Migrating,
        _ => InstanceStatus::Unknown,
    }
}

impl From<ServerInfo> for Instance {
    fn from(info: ServerInfo) -> Self {
        let mut disks = info.disks.unwrap_or_default();
        disks.sort_by_key(|d| d.connection_order.unwrap_or(u32::MAX));

        let plan_id = info
            .server_plan_id
            .unwrap_or_else(|| format!("{}core-{}mb", info.cpu, info.memory_mb));

        Instance {
            id: info.id,
            name: info.name,
            description: info.description.unwrap_or_default(),
            tags: info.tags.unwrap_or_default(),
            plan: ServerPlan {
                id: PlanRef(plan_id),
                core: info.cpu,
                memory_mb: info.memory_mb,
            },
            // a freshly created server reports no status until its first power-on
            status: info
                .instance_status
                .as_deref()
                .map(parse_status)
                .unwrap_or(InstanceStatus::Down),
            before_status: info.instance_before_status.as_deref().map(parse_status),
            disks: disks.into_iter().map(AttachedDisk::from).collect(),
            interfaces: info
                .interfaces
                .unwrap_or_default()
                .into_iter()
                .enumerate()
                .map(|(index, nic)| nic.into_interface(index))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskInfo {
    #[serde(rename = "ID", deserialize_with = "id_string")]
    pub id: String,

    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "SizeMB", default)]
    pub size_mb: Option<u64>,

    #[serde(rename = "Connection", default)]
    pub connection: Option<String>,

    #[serde(rename = "ConnectionOrder", default)]
    pub connection_order: Option<u32>,
}

impl From<DiskInfo> for AttachedDisk {
    fn from(disk: DiskInfo) -> Self {
        AttachedDisk {
            id: disk.id,
            name: disk.name,
            size_mb: disk.size_mb,
            connection: match disk.connection.as_deref() {
                Some("virtio") => Some(DiskConnection::Virtio),
                Some("ide") => Some(DiskConnection::Ide),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceInfo {
    #[serde(rename = "ID", deserialize_with = "id_string")]
    pub id: String,

    #[serde(rename = "MACAddress", default)]
    pub mac_address: Option<String>,

    #[serde(rename = "IPAddress", default)]
    pub ip_address: Option<String>,

    #[serde(rename = "SwitchID", default, deserialize_with = "opt_id_string")]
    pub switch_id: Option<String>,

    /// `shared` for the shared segment, `user` for a customer switch
    #[serde(rename = "SwitchScope", default)]
    pub switch_scope: Option<String>,
}

impl InterfaceInfo {
    pub fn into_interface(self, index: usize) -> Interface {
        let target = match (self.switch_scope.as_deref(), self.switch_id) {
            (Some("shared"), _) => ConnectionTarget::Shared,
            (_, Some(switch_id)) => ConnectionTarget::Switch(switch_id),
            (_, None) => ConnectionTarget::None,
        };
        Interface {
            id: self.id,
            index,
            target,
            mac_address: self.mac_address.unwrap_or_default(),
        }
    }
}

/// Server plan from `server-plan list` / `server-plan read`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerPlanInfo {
    #[serde(rename = "ID", deserialize_with = "id_string")]
    pub id: String,

    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "CPU")]
    pub cpu: u32,

    #[serde(rename = "MemoryMB")]
    pub memory_mb: u32,

    #[serde(rename = "Commitment", default)]
    pub commitment: Option<String>,

    #[serde(rename = "Availability", default)]
    pub availability: Option<String>,
}

impl ServerPlanInfo {
    /// Standard (non-dedicated) plan that can currently be ordered
    pub fn is_orderable(&self) -> bool {
        self.availability.as_deref().is_none_or(|a| a == "available")
            && self.commitment.as_deref().is_none_or(|c| c == "standard")
    }
}

/// `server create --parameters` payload
#[derive(Debug, Clone, Serialize)]
pub struct ServerCreateParams {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Description")]
    pub description: String,

    #[serde(rename = "Tags")]
    pub tags: Vec<String>,

    #[serde(rename = "CPU")]
    pub cpu: u32,

    #[serde(rename = "MemoryMB")]
    pub memory_mb: u32,

    #[serde(rename = "NetworkInterfaces")]
    pub network_interfaces: Vec<serde_json::Value>,

    #[serde(rename = "Disks")]
    pub disks: Vec<serde_json::Value>,

    #[serde(rename = "BootAfterCreate")]
    pub boot_after_create: bool,
}

/// `server update --parameters` payload
#[derive(Debug, Clone, Serialize)]
pub struct ServerUpdateParams<'a> {
    #[serde(rename = "Name")]
    pub name: &'a str,

    #[serde(rename = "Description")]
    pub description: &'a str,

    #[serde(rename = "Tags")]
    pub tags: &'a [String],
}
