//! Remote resource client trait definition

use crate::error::Result;
use crate::model::{Instance, InstanceCreate, InstanceUpdate, Interface, PlanRef, ResourceId};
use async_trait::async_trait;

/// Operations the reconciliation core needs from the remote system
///
/// Calls are request/response. Side-effect operations (`boot`, `shutdown`,
/// NIC and disk wiring) return as soon as the request is accepted; the
/// instance reaches its new state asynchronously, which is why power
/// transitions go through [`crate::waiter::PollingWaiter`].
///
/// Implementations own retries and pagination. The core sees only final
/// success or failure.
#[async_trait]
pub trait RemoteResourceClient: Send + Sync {
    /// Returns [`crate::CloudError::NotFound`] when the ID is gone
    async fn read(&self, id: &str) -> Result<Instance>;

    /// Create a powered-off instance with no disks and no interfaces
    async fn create(&self, spec: &InstanceCreate) -> Result<Instance>;

    async fn update(&self, id: &str, fields: &InstanceUpdate) -> Result<Instance>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn boot(&self, id: &str) -> Result<()>;

    /// Graceful shutdown (ACPI), or a hard power-off when `force` is set
    async fn shutdown(&self, id: &str, force: bool) -> Result<()>;

    async fn reset(&self, id: &str) -> Result<()>;

    async fn connect_to_switch(&self, nic_id: &str, switch_id: &str) -> Result<()>;

    async fn disconnect_from_switch(&self, nic_id: &str) -> Result<()>;

    async fn connect_to_shared_segment(&self, nic_id: &str) -> Result<()>;

    /// Add an unconnected interface at the end of the instance's NIC list
    async fn create_interface(&self, instance_id: &str) -> Result<Interface>;

    async fn delete_interface(&self, nic_id: &str) -> Result<()>;

    async fn connect_disk(&self, disk_id: &str, instance_id: &str) -> Result<()>;

    async fn disconnect_disk(&self, disk_id: &str) -> Result<()>;

    /// Move the instance to another plan. The remote system may re-create
    /// the instance under a new ID, which is returned.
    async fn change_plan(&self, id: &str, plan: &PlanRef) -> Result<ResourceId>;

    async fn resolve_plan(&self, core: u32, memory_mb: u32) -> Result<PlanRef>;
}
