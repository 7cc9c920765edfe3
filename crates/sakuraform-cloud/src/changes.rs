//! Desired vs. current diff for servers

use crate::model::{Instance, ServerSpec};
use crate::nic;
use crate::power::PowerState;
use serde::{Deserialize, Serialize};

/// Plan (core/memory) difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanChange {
    pub from_core: u32,
    pub from_memory_mb: u32,
    pub to_core: u32,
    pub to_memory_mb: u32,
}

/// What differs between a [`ServerSpec`] and an [`Instance`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub plan: Option<PlanChange>,
    /// Disk list differs, order included
    pub disks: bool,
    pub nics: bool,
    /// Name, description or tags differ
    pub fields: bool,
}

impl ChangeSet {
    pub fn between(desired: &ServerSpec, current: &Instance) -> Self {
        let plan = (desired.core != current.plan.core
            || desired.memory_mb != current.plan.memory_mb)
            .then_some(PlanChange {
                from_core: current.plan.core,
                from_memory_mb: current.plan.memory_mb,
                to_core: desired.core,
                to_memory_mb: desired.memory_mb,
            });

        let disks = desired
            .disks
            .iter()
            .map(String::as_str)
            .ne(current.disks.iter().map(|d| d.id.as_str()));

        let nics = !nic::connections_match(&desired.nics, &current.interfaces);

        let fields = desired.fields() != current.fields();

        Self {
            plan,
            disks,
            nics,
            fields,
        }
    }

    /// Plan, disk and NIC changes can only be applied to a stopped instance
    pub fn needs_restart(&self) -> bool {
        self.plan.is_some() || self.disks || self.nics
    }

    pub fn is_empty(&self) -> bool {
        !self.needs_restart() && !self.fields
    }
}

/// How the reconciler has to treat the instance's power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disruption {
    /// Only non-disruptive field updates
    None,
    /// Disruptive changes, but the instance is already stopped
    WhileStopped,
    /// Shut down, apply, boot again
    PowerCycle,
}

impl Disruption {
    pub fn decide(changes: &ChangeSet, state: PowerState) -> Self {
        match (changes.needs_restart(), state.is_running()) {
            (false, _) => Disruption::None,
            (true, false) => Disruption::WhileStopped,
            (true, true) => Disruption::PowerCycle,
        }
    }
}
