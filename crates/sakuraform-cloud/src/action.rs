//! Record of the remote operations a reconciliation performed

use crate::changes::{ChangeSet, Disruption};
use crate::model::{Instance, PlanRef, ResourceId};
use crate::nic::NicOperation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One executed step, in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ReconcileStep {
    Create { id: ResourceId },
    Shutdown { force: bool },
    WaitDown,
    DisconnectDisk { disk_id: ResourceId },
    ConnectDisk { disk_id: ResourceId },
    Nic { operation: NicOperation },
    ChangePlan { plan: PlanRef, new_id: ResourceId },
    Update,
    Boot,
    WaitUp,
    Delete,
}

impl ReconcileStep {
    /// Steps that interrupt a running workload
    pub fn is_disruptive(&self) -> bool {
        matches!(
            self,
            ReconcileStep::Shutdown { .. }
                | ReconcileStep::Boot
                | ReconcileStep::DisconnectDisk { .. }
                | ReconcileStep::ConnectDisk { .. }
                | ReconcileStep::Nic { .. }
                | ReconcileStep::ChangePlan { .. }
        )
    }
}

impl fmt::Display for ReconcileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileStep::Create { id } => write!(f, "create ({})", id),
            ReconcileStep::Shutdown { force: true } => write!(f, "force shutdown"),
            ReconcileStep::Shutdown { force: false } => write!(f, "shutdown"),
            ReconcileStep::WaitDown => write!(f, "wait for down"),
            ReconcileStep::DisconnectDisk { disk_id } => write!(f, "disconnect disk {}", disk_id),
            ReconcileStep::ConnectDisk { disk_id } => write!(f, "connect disk {}", disk_id),
            ReconcileStep::Nic { operation } => write!(f, "{}", operation),
            ReconcileStep::ChangePlan { plan, new_id } => {
                write!(f, "change plan to {} (id {})", plan, new_id)
            }
            ReconcileStep::Update => write!(f, "update fields"),
            ReconcileStep::Boot => write!(f, "boot"),
            ReconcileStep::WaitUp => write!(f, "wait for up"),
            ReconcileStep::Delete => write!(f, "delete"),
        }
    }
}

/// Executed steps of one reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub started_at: DateTime<Utc>,

    pub steps: Vec<ReconcileStep>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ReconcileReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            steps: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn record(&mut self, step: ReconcileStep) {
        tracing::debug!("step: {}", step);
        self.steps.push(step);
    }

    pub fn disruptive_steps(&self) -> Vec<&ReconcileStep> {
        self.steps.iter().filter(|s| s.is_disruptive()).collect()
    }

    pub fn finish(&mut self) {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        self.duration_ms = elapsed.num_milliseconds().max(0) as u64;
    }
}

impl Default for ReconcileReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Final snapshot plus what it took to get there
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub instance: Instance,
    pub report: ReconcileReport,
}

/// Dry-run result: what `reconcile` would do right now
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilePreview {
    pub changes: ChangeSet,
    pub disruption: Disruption,
    pub nic_operations: Vec<NicOperation>,
}

impl ReconcilePreview {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

impl fmt::Display for ReconcilePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(plan) = &self.changes.plan {
            parts.push(format!(
                "plan {}core/{}MB -> {}core/{}MB",
                plan.from_core, plan.from_memory_mb, plan.to_core, plan.to_memory_mb
            ));
        }
        if self.changes.disks {
            parts.push("disks".to_string());
        }
        if self.changes.nics {
            parts.push(format!("{} nic operation(s)", self.nic_operations.len()));
        }
        if self.changes.fields {
            parts.push("fields".to_string());
        }
        if parts.is_empty() {
            return write!(f, "no changes");
        }
        let restart = match self.disruption {
            Disruption::PowerCycle => ", restart required",
            _ => "",
        };
        write!(f, "{}{}", parts.join(", "), restart)
    }
}
