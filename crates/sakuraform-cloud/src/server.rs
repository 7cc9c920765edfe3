//! Server lifecycle reconciliation
//!
//! Converges a compute instance to a [`ServerSpec`]. The steps of
//! [`ServerLifecycleReconciler::reconcile`] always run in this order:
//!
//! 1. read the instance
//! 2. diff it against the desired spec
//! 3. shut it down if a disruptive change is pending and it is running
//! 4. re-attach disks
//! 5. re-wire NICs
//! 6. change plan (may yield a new instance ID)
//! 7. update name/description/tags
//! 8. boot it again if step 3 shut it down
//! 9. read the final state
//!
//! The first failure aborts the run. Nothing is rolled back; a later run
//! re-derives the same diff from whatever state was reached and resumes.

use crate::action::{ReconcileOutcome, ReconcilePreview, ReconcileReport, ReconcileStep};
use crate::changes::{ChangeSet, Disruption};
use crate::client::RemoteResourceClient;
use crate::error::{CloudError, Result};
use crate::model::{AttachedDisk, Instance, InstanceCreate, ResourceId, ServerSpec};
use crate::nic;
use crate::power::PowerState;
use crate::waiter::{self, PollingWaiter};
use std::sync::Arc;
use std::time::Duration;

/// Reconciler timing configuration
#[derive(Debug, Clone, Copy)]
pub struct ReconcilerConfig {
    /// Interval between status reads while waiting for a power transition
    pub poll_interval: Duration,

    /// Budget for each power transition
    pub power_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: waiter::DEFAULT_POLL_INTERVAL,
            power_timeout: waiter::DEFAULT_POWER_TIMEOUT,
        }
    }
}

/// Drives instances through create / reconcile / destroy
pub struct ServerLifecycleReconciler<C: RemoteResourceClient + ?Sized> {
    client: Arc<C>,
    waiter: PollingWaiter<C>,
    power_timeout: Duration,
}

impl<C: RemoteResourceClient + ?Sized> ServerLifecycleReconciler<C> {
    pub fn new(client: Arc<C>, config: ReconcilerConfig) -> Self {
        let waiter = PollingWaiter::new(Arc::clone(&client)).with_interval(config.poll_interval);
        Self {
            client,
            waiter,
            power_timeout: config.power_timeout,
        }
    }

    /// Dry run: what [`Self::reconcile`] would do against the current state
    pub async fn plan(&self, id: &str, desired: &ServerSpec) -> Result<ReconcilePreview> {
        desired.validate()?;
        let current = self.client.read(id).await?;
        let state = observe(&current)?;
        let changes = ChangeSet::between(desired, &current);
        let nic_operations = if changes.nics {
            nic::plan(&desired.nics, &current.interfaces)
        } else {
            Vec::new()
        };
        let disruption = Disruption::decide(&changes, state);

        Ok(ReconcilePreview {
            changes,
            disruption,
            nic_operations,
        })
    }

    /// Converge instance `id` to `desired`
    ///
    /// The returned snapshot carries the instance's ID after the run, which
    /// differs from `id` when a plan change re-created the instance.
    pub async fn reconcile(&self, id: &str, desired: &ServerSpec) -> Result<ReconcileOutcome> {
        desired.validate()?;
        let mut report = ReconcileReport::new();

        let current = self.client.read(id).await?;
        let mut state = observe(&current)?;
        let changes = ChangeSet::between(desired, &current);
        let disruption = Disruption::decide(&changes, state);

        tracing::info!(
            "Reconciling instance {} ({}): plan={} disks={} nics={} fields={} -> {:?}",
            id,
            state,
            changes.plan.is_some(),
            changes.disks,
            changes.nics,
            changes.fields,
            disruption
        );

        let mut id: ResourceId = id.to_string();

        if disruption == Disruption::PowerCycle {
            state = self.power_off(&id, state, false, &mut report).await?;
        }

        if changes.disks {
            self.replace_disks(&id, &current.disks, &desired.disks, &mut report)
                .await?;
        }

        if changes.nics {
            let ops = nic::plan(&desired.nics, &current.interfaces);
            nic::execute(self.client.as_ref(), &id, &current.interfaces, &ops).await?;
            for operation in ops {
                report.record(ReconcileStep::Nic { operation });
            }
        }

        if changes.plan.is_some() {
            id = self.change_plan(&id, desired, &mut report).await?;
        }

        // issued on every run, even when only the plan changed
        self.client.update(&id, &desired.fields()).await?;
        report.record(ReconcileStep::Update);

        if disruption == Disruption::PowerCycle {
            state = self.power_on(&id, state, &mut report).await?;
        }

        let instance = self.client.read(&id).await?;
        report.finish();

        tracing::info!(
            "Instance {} reconciled ({}), {} step(s) in {}ms",
            id,
            state,
            report.steps.len(),
            report.duration_ms
        );

        Ok(ReconcileOutcome { instance, report })
    }

    /// Create an instance for `desired` and boot it
    pub async fn create(&self, desired: &ServerSpec) -> Result<ReconcileOutcome> {
        desired.validate()?;
        let mut report = ReconcileReport::new();

        let plan = self
            .client
            .resolve_plan(desired.core, desired.memory_mb)
            .await?;
        let created = self
            .client
            .create(&InstanceCreate {
                fields: desired.fields(),
                plan,
            })
            .await?;
        let id = created.id.clone();
        tracing::info!("Created instance {} ({})", id, desired.name);
        report.record(ReconcileStep::Create { id: id.clone() });

        let state = PowerState::observe(&created)?;
        let state = if state.is_running() {
            // the remote side booted it on creation; wiring needs it stopped
            self.power_off(&id, state, false, &mut report).await?
        } else {
            state
        };

        self.replace_disks(&id, &created.disks, &desired.disks, &mut report)
            .await?;

        let ops = nic::plan(&desired.nics, &created.interfaces);
        nic::execute(self.client.as_ref(), &id, &created.interfaces, &ops).await?;
        for operation in ops {
            report.record(ReconcileStep::Nic { operation });
        }

        self.power_on(&id, state, &mut report).await?;

        let instance = self.client.read(&id).await?;
        report.finish();
        Ok(ReconcileOutcome { instance, report })
    }

    /// Shut down (if needed) and delete instance `id`
    ///
    /// An instance that is already gone counts as destroyed.
    pub async fn destroy(&self, id: &str, force_shutdown: bool) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::new();

        let current = match self.client.read(id).await {
            Ok(instance) => instance,
            Err(CloudError::NotFound(_)) => {
                tracing::info!("Instance {} already deleted", id);
                report.finish();
                return Ok(report);
            }
            Err(e) => return Err(e),
        };

        let state = observe(&current)?;
        if state.is_running() {
            self.power_off(id, state, force_shutdown, &mut report)
                .await?;
        }

        self.client.delete(id).await?;
        report.record(ReconcileStep::Delete);
        tracing::info!("Deleted instance {}", id);

        report.finish();
        Ok(report)
    }

    /// Hard reset of a running instance
    pub async fn reset(&self, id: &str) -> Result<()> {
        let current = self.client.read(id).await?;
        if !observe(&current)?.is_running() {
            return Err(CloudError::Conflict(format!(
                "instance {} is not running, nothing to reset",
                id
            )));
        }
        tracing::info!("Resetting instance {}", id);
        self.client.reset(id).await
    }

    async fn power_off(
        &self,
        id: &str,
        state: PowerState,
        force: bool,
        report: &mut ReconcileReport,
    ) -> Result<PowerState> {
        let state = state.begin_shutdown()?;
        tracing::info!("Shutting down instance {}", id);
        self.client.shutdown(id, force).await?;
        report.record(ReconcileStep::Shutdown { force });

        self.waiter
            .wait_for_status(id, waiter::is_down, self.power_timeout)
            .await?;
        report.record(ReconcileStep::WaitDown);
        state.finish_shutdown()
    }

    async fn power_on(
        &self,
        id: &str,
        state: PowerState,
        report: &mut ReconcileReport,
    ) -> Result<PowerState> {
        let state = state.begin_boot()?;
        tracing::info!("Booting instance {}", id);
        self.client.boot(id).await?;
        report.record(ReconcileStep::Boot);

        self.waiter
            .wait_for_status(id, waiter::is_up, self.power_timeout)
            .await?;
        report.record(ReconcileStep::WaitUp);
        state.finish_boot()
    }

    /// Detach everything, then attach `desired` in order (first disk boots)
    async fn replace_disks(
        &self,
        id: &str,
        attached: &[AttachedDisk],
        desired: &[ResourceId],
        report: &mut ReconcileReport,
    ) -> Result<()> {
        for disk in attached {
            tracing::info!("Disconnecting disk {} from instance {}", disk.id, id);
            self.client.disconnect_disk(&disk.id).await?;
            report.record(ReconcileStep::DisconnectDisk {
                disk_id: disk.id.clone(),
            });
        }
        for disk_id in desired {
            tracing::info!("Connecting disk {} to instance {}", disk_id, id);
            self.client.connect_disk(disk_id, id).await?;
            report.record(ReconcileStep::ConnectDisk {
                disk_id: disk_id.clone(),
            });
        }
        Ok(())
    }

    async fn change_plan(
        &self,
        id: &str,
        desired: &ServerSpec,
        report: &mut ReconcileReport,
    ) -> Result<ResourceId> {
        // the (core, memory) -> plan mapping is remote and not stable, never cache it
        let plan = self
            .client
            .resolve_plan(desired.core, desired.memory_mb)
            .await?;
        tracing::info!(
            "Changing plan of instance {} to {} ({}core/{}MB)",
            id,
            plan,
            desired.core,
            desired.memory_mb
        );
        let new_id = self.client.change_plan(id, &plan).await?;
        if new_id != id {
            tracing::info!("Instance {} is now {} after plan change", id, new_id);
        }
        report.record(ReconcileStep::ChangePlan {
            plan,
            new_id: new_id.clone(),
        });
        Ok(new_id)
    }
}

/// Power state of a freshly read instance
///
/// A snapshot that only just left `cleaning` or `migrating` is usable, but
/// attachments may still be catching up with it.
fn observe(instance: &Instance) -> Result<PowerState> {
    let state = PowerState::observe(instance)?;
    if let Some(before) = instance.settled_from_transition() {
        tracing::warn!(
            "Instance {} settled to {} from {} just before this read",
            instance.id,
            instance.status,
            before
        );
    }
    Ok(state)
}
