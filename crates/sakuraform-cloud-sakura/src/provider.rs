//! Sakura Cloud implementation of [`RemoteResourceClient`]

use crate::error::SakuraError;
use crate::usacloud::{ServerCreateParams, ServerInfo, ServerUpdateParams, Usacloud};
use async_trait::async_trait;
use sakuraform_cloud::{
    CloudError, Instance, InstanceCreate, InstanceUpdate, Interface, PlanRef, RemoteResourceClient,
    ResourceId, Result,
};

/// Convert (core, memory_mb) to the GB granularity Sakura Cloud plans use
fn memory_gb(memory_mb: u32) -> Result<u32> {
    if memory_mb == 0 || memory_mb % 1024 != 0 {
        return Err(CloudError::InvalidConfig(format!(
            "memory must be a multiple of 1024MB, got {}MB",
            memory_mb
        )));
    }
    Ok(memory_mb / 1024)
}

/// Sakura Cloud client driving usacloud
pub struct SakuraCloudClient {
    usacloud: Usacloud,
}

impl SakuraCloudClient {
    pub fn new(usacloud: Usacloud) -> Self {
        Self { usacloud }
    }

    pub fn usacloud(&self) -> &Usacloud {
        &self.usacloud
    }

    async fn server(&self, id: &str) -> Result<Instance> {
        let info: ServerInfo = self.usacloud.get_server(id).await?;
        Ok(info.into())
    }

    async fn server_op(&self, verb: &str, id: &str, extra: &[&str]) -> Result<()> {
        tracing::info!("server {} {} {}", verb, id, extra.join(" "));
        self.usacloud.operate("server", verb, id, extra).await?;
        Ok(())
    }

    async fn interface_op(&self, verb: &str, nic_id: &str, extra: &[&str]) -> Result<()> {
        tracing::info!("interface {} {} {}", verb, nic_id, extra.join(" "));
        self.usacloud.operate("interface", verb, nic_id, extra).await?;
        Ok(())
    }

    async fn disk_op(&self, verb: &str, disk_id: &str, extra: &[&str]) -> Result<()> {
        tracing::info!("disk {} {} {}", verb, disk_id, extra.join(" "));
        self.usacloud.operate("disk", verb, disk_id, extra).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteResourceClient for SakuraCloudClient {
    async fn read(&self, id: &str) -> Result<Instance> {
        self.server(id).await
    }

    async fn create(&self, spec: &InstanceCreate) -> Result<Instance> {
        let plan = self.usacloud.get_server_plan(&spec.plan.0).await?;
        let params = ServerCreateParams {
            name: spec.fields.name.clone(),
            description: spec.fields.description.clone(),
            tags: spec.fields.tags.clone(),
            cpu: plan.cpu,
            memory_mb: plan.memory_mb,
            network_interfaces: Vec::new(),
            disks: Vec::new(),
            boot_after_create: false,
        };
        tracing::info!(
            "server create {} ({}core/{}MB)",
            params.name,
            params.cpu,
            params.memory_mb
        );
        let info = self.usacloud.create_server(&params).await?;
        Ok(info.into())
    }

    async fn update(&self, id: &str, fields: &InstanceUpdate) -> Result<Instance> {
        let params = ServerUpdateParams {
            name: &fields.name,
            description: &fields.description,
            tags: &fields.tags,
        };
        tracing::info!("server update {} (name={})", id, fields.name);
        let info: ServerInfo = self.usacloud.update("server", id, &params).await?;
        Ok(info.into())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.server_op("delete", id, &[]).await
    }

    async fn boot(&self, id: &str) -> Result<()> {
        self.server_op("boot", id, &[]).await
    }

    async fn shutdown(&self, id: &str, force: bool) -> Result<()> {
        if force {
            self.server_op("shutdown", id, &["--force"]).await
        } else {
            self.server_op("shutdown", id, &[]).await
        }
    }

    async fn reset(&self, id: &str) -> Result<()> {
        self.server_op("reset", id, &[]).await
    }

    async fn connect_to_switch(&self, nic_id: &str, switch_id: &str) -> Result<()> {
        self.interface_op("connect-to-switch", nic_id, &["--switch-id", switch_id])
            .await
    }

    async fn disconnect_from_switch(&self, nic_id: &str) -> Result<()> {
        self.interface_op("disconnect-from-switch", nic_id, &[]).await
    }

    async fn connect_to_shared_segment(&self, nic_id: &str) -> Result<()> {
        self.interface_op("connect-to-shared-segment", nic_id, &[])
            .await
    }

    async fn create_interface(&self, instance_id: &str) -> Result<Interface> {
        tracing::info!("interface create on server {}", instance_id);
        let nic = self.usacloud.create_interface(instance_id).await?;

        // the new NIC goes last; re-read to learn its index
        let instance = self.server(instance_id).await?;
        let index = instance
            .interfaces
            .iter()
            .position(|i| i.id == nic.id)
            .unwrap_or(instance.interfaces.len());
        Ok(nic.into_interface(index))
    }

    async fn delete_interface(&self, nic_id: &str) -> Result<()> {
        self.interface_op("delete", nic_id, &[]).await
    }

    async fn connect_disk(&self, disk_id: &str, instance_id: &str) -> Result<()> {
        self.disk_op("connect-to-server", disk_id, &["--server-id", instance_id])
            .await
    }

    async fn disconnect_disk(&self, disk_id: &str) -> Result<()> {
        self.disk_op("disconnect-from-server", disk_id, &[]).await
    }

    async fn change_plan(&self, id: &str, plan: &PlanRef) -> Result<ResourceId> {
        let plan = self.usacloud.get_server_plan(&plan.0).await?;
        let memory_gb = memory_gb(plan.memory_mb)?;
        tracing::info!(
            "server plan-change {} ({}core/{}GB)",
            id,
            plan.cpu,
            memory_gb
        );
        let info = self
            .usacloud
            .change_server_plan(id, plan.cpu, memory_gb)
            .await?;
        Ok(info.id)
    }

    async fn resolve_plan(&self, core: u32, memory_mb: u32) -> Result<PlanRef> {
        let plans = self
            .usacloud
            .find_server_plans(core, memory_gb(memory_mb)?)
            .await?;
        plans
            .into_iter()
            .find(|p| p.is_orderable() && p.cpu == core && p.memory_mb == memory_mb)
            .map(|p| PlanRef(p.id))
            .ok_or_else(|| {
                SakuraError::InvalidParameter(format!(
                    "no orderable server plan with {}core/{}MB in zone {}",
                    core,
                    memory_mb,
                    self.usacloud.zone()
                ))
                .into()
            })
    }
}
