//! Strongly typed view of remote instances and of their desired state
//!
//! Conversion from/to loosely typed attribute maps (YAML spec files, CLI JSON
//! output) happens at the edges through serde; the reconciler only sees these
//! structs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Remote resource identifier (Sakura Cloud IDs are 12-digit decimal strings)
pub type ResourceId = String;

/// Power status reported by the remote system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Up,
    Down,
    /// Disk cleanup after a shutdown is still running
    Cleaning,
    /// Host migration in progress
    Migrating,
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    /// Whether this is a stable power state rather than an in-flight one
    pub fn is_settled(self) -> bool {
        matches!(self, InstanceStatus::Up | InstanceStatus::Down)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceStatus::Up => write!(f, "up"),
            InstanceStatus::Down => write!(f, "down"),
            InstanceStatus::Cleaning => write!(f, "cleaning"),
            InstanceStatus::Migrating => write!(f, "migrating"),
            InstanceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Where a NIC is plugged in
///
/// Textual form: `none`, `shared`, `switch:<id>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ConnectionTarget {
    #[default]
    None,
    /// Provider-managed public segment; only valid for the base NIC
    Shared,
    Switch(ResourceId),
}

impl ConnectionTarget {
    pub fn is_connected(&self) -> bool {
        !matches!(self, ConnectionTarget::None)
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionTarget::None => write!(f, "none"),
            ConnectionTarget::Shared => write!(f, "shared"),
            ConnectionTarget::Switch(id) => write!(f, "switch:{}", id),
        }
    }
}

impl FromStr for ConnectionTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "none" => Ok(ConnectionTarget::None),
            "shared" => Ok(ConnectionTarget::Shared),
            other => match other.strip_prefix("switch:") {
                Some(id) if !id.is_empty() => Ok(ConnectionTarget::Switch(id.to_string())),
                _ => Err(format!(
                    "invalid connection target '{}' (expected none, shared or switch:<id>)",
                    other
                )),
            },
        }
    }
}

impl TryFrom<String> for ConnectionTarget {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConnectionTarget> for String {
    fn from(value: ConnectionTarget) -> Self {
        value.to_string()
    }
}

/// Opaque plan identifier resolved from a (core, memory) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanRef(pub String);

impl fmt::Display for PlanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPlan {
    pub id: PlanRef,
    pub core: u32,
    pub memory_mb: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskConnection {
    Virtio,
    Ide,
}

/// A disk as seen from the instance it is attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedDisk {
    pub id: ResourceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size_mb: Option<u64>,
    #[serde(default)]
    pub connection: Option<DiskConnection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub id: ResourceId,
    pub index: usize,
    pub target: ConnectionTarget,
    /// Assigned by the remote system
    #[serde(default)]
    pub mac_address: String,
}

/// Snapshot of a remote compute instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub plan: ServerPlan,
    pub status: InstanceStatus,
    #[serde(default)]
    pub before_status: Option<InstanceStatus>,
    /// Ordered; index 0 is the boot disk
    #[serde(default)]
    pub disks: Vec<AttachedDisk>,
    /// Ordered; index 0 is the base interface
    #[serde(default)]
    pub interfaces: Vec<Interface>,
}

impl Instance {
    pub fn is_up(&self) -> bool {
        self.status == InstanceStatus::Up
    }

    pub fn is_down(&self) -> bool {
        self.status == InstanceStatus::Down
    }

    /// Whether a power transition is still in flight.
    ///
    /// `before_status` keeps naming the previous state after a transition
    /// settles, so only the current status decides.
    pub fn is_transitioning(&self) -> bool {
        !self.status.is_settled()
    }

    /// The in-flight status this instance most recently settled from.
    ///
    /// `None` after an ordinary boot or shutdown, where `before_status` is
    /// just the opposite settled state.
    pub fn settled_from_transition(&self) -> Option<InstanceStatus> {
        self.before_status
            .filter(|before| self.status.is_settled() && !before.is_settled())
    }

    pub fn disk_ids(&self) -> Vec<&str> {
        self.disks.iter().map(|d| d.id.as_str()).collect()
    }

    pub fn connection_targets(&self) -> Vec<ConnectionTarget> {
        self.interfaces.iter().map(|i| i.target.clone()).collect()
    }

    pub fn fields(&self) -> InstanceUpdate {
        InstanceUpdate {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Non-disruptive fields written with a single update call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceUpdate {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// Payload for creating a bare instance (no disks, no NICs, powered off)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceCreate {
    pub fields: InstanceUpdate,
    pub plan: PlanRef,
}

/// Desired state of a server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_core")]
    pub core: u32,
    #[serde(default = "default_memory_mb")]
    pub memory_mb: u32,
    /// Disk IDs in connection order; the first one boots
    #[serde(default)]
    pub disks: Vec<ResourceId>,
    /// `nics[0]` is the base interface
    #[serde(default)]
    pub nics: Vec<ConnectionTarget>,
}

fn default_core() -> u32 {
    1
}

fn default_memory_mb() -> u32 {
    1024
}

impl ServerSpec {
    pub fn new(name: impl Into<String>, core: u32, memory_mb: u32) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            core,
            memory_mb,
            disks: Vec::new(),
            nics: Vec::new(),
        }
    }

    pub fn with_disk(mut self, id: impl Into<String>) -> Self {
        self.disks.push(id.into());
        self
    }

    pub fn with_nic(mut self, target: ConnectionTarget) -> Self {
        self.nics.push(target);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn fields(&self) -> InstanceUpdate {
        InstanceUpdate {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
        }
    }

    /// Basic shape checks that do not need the remote system
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::CloudError::InvalidConfig(
                "server name must not be empty".to_string(),
            ));
        }
        if self.core == 0 || self.memory_mb == 0 {
            return Err(crate::CloudError::InvalidConfig(format!(
                "invalid plan {}core/{}MB",
                self.core, self.memory_mb
            )));
        }
        if let Some(pos) = self
            .nics
            .iter()
            .skip(1)
            .position(|t| *t == ConnectionTarget::Shared)
        {
            return Err(crate::CloudError::InvalidConfig(format!(
                "nic {} cannot use the shared segment; only the base interface can",
                pos + 1
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for disk in &self.disks {
            if !seen.insert(disk) {
                return Err(crate::CloudError::InvalidConfig(format!(
                    "disk {} is listed twice",
                    disk
                )));
            }
        }
        Ok(())
    }
}
