#![allow(dead_code)]

use async_trait::async_trait;
use sakuraform_cloud::{
    AttachedDisk, CloudError, ConnectionTarget, Instance, InstanceCreate, InstanceStatus,
    InstanceUpdate, Interface, PlanRef, ReconcilerConfig, RemoteResourceClient, ResourceId,
    Result, ServerPlan,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A remote call as seen by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Read(String),
    Create(String),
    Update(String),
    Delete(String),
    Boot(String),
    Shutdown(String, bool),
    Reset(String),
    ConnectSwitch(String, String),
    Disconnect(String),
    ConnectShared(String),
    CreateInterface(String),
    DeleteInterface(String),
    ConnectDisk(String, String),
    DisconnectDisk(String),
    ChangePlan(String, String),
    ResolvePlan(u32, u32),
}

impl Call {
    pub fn is_read_only(&self) -> bool {
        matches!(self, Call::Read(_) | Call::ResolvePlan(..))
    }
}

struct Pending {
    target: InstanceStatus,
    reads_left: u32,
}

#[derive(Default)]
struct State {
    instances: HashMap<String, Instance>,
    pending: HashMap<String, Pending>,
    calls: Vec<Call>,
    next_id: u64,
    settle_after_reads: u32,
    never_settle: bool,
    recreate_on_plan_change: bool,
}

/// In-memory cloud enforcing the same preconditions as the real API:
/// NIC and disk wiring only on stopped instances, no connect on a connected
/// NIC, no delete of a NIC still plugged into a switch.
pub struct FakeCloud {
    state: Mutex<State>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 113_000_000_100,
                settle_after_reads: 2,
                ..Default::default()
            }),
        }
    }

    pub fn with_instance(self, instance: Instance) -> Self {
        self.state
            .lock()
            .unwrap()
            .instances
            .insert(instance.id.clone(), instance);
        self
    }

    /// Power transitions are requested but never complete
    pub fn never_settle(self) -> Self {
        self.state.lock().unwrap().never_settle = true;
        self
    }

    /// Plan changes move the instance to a fresh ID
    pub fn recreate_on_plan_change(self) -> Self {
        self.state.lock().unwrap().recreate_on_plan_change = true;
        self
    }

    pub fn instance(&self, id: &str) -> Option<Instance> {
        self.state.lock().unwrap().instances.get(id).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls that change remote state
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !c.is_read_only())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

pub fn fast_config() -> ReconcilerConfig {
    ReconcilerConfig {
        poll_interval: Duration::from_millis(1),
        power_timeout: Duration::from_millis(300),
    }
}

pub fn plan_id(core: u32, memory_mb: u32) -> String {
    format!("{}{:03}", memory_mb / 1024, core)
}

/// Build an instance with NIC ids `<id>-nic<index>`
pub fn server(
    id: &str,
    core: u32,
    memory_mb: u32,
    status: InstanceStatus,
    disks: &[&str],
    nics: &[ConnectionTarget],
) -> Instance {
    Instance {
        id: id.to_string(),
        name: "web01".to_string(),
        description: String::new(),
        tags: Vec::new(),
        plan: ServerPlan {
            id: PlanRef(plan_id(core, memory_mb)),
            core,
            memory_mb,
        },
        status,
        before_status: None,
        disks: disks
            .iter()
            .map(|d| AttachedDisk {
                id: d.to_string(),
                name: String::new(),
                size_mb: Some(20 * 1024),
                connection: None,
            })
            .collect(),
        interfaces: nics
            .iter()
            .enumerate()
            .map(|(index, target)| Interface {
                id: format!("{}-nic{}", id, index),
                index,
                target: target.clone(),
                mac_address: format!("9c:a3:ba:30:00:{:02x}", index),
            })
            .collect(),
    }
}

fn not_found(id: &str) -> CloudError {
    CloudError::NotFound(id.to_string())
}

impl State {
    fn instance_mut(&mut self, id: &str) -> Result<&mut Instance> {
        self.instances.get_mut(id).ok_or_else(|| not_found(id))
    }

    fn nic_owner(&self, nic_id: &str) -> Result<(String, usize)> {
        self.instances
            .values()
            .find_map(|i| {
                i.interfaces
                    .iter()
                    .position(|n| n.id == nic_id)
                    .map(|pos| (i.id.clone(), pos))
            })
            .ok_or_else(|| not_found(nic_id))
    }

    fn require_down(&self, id: &str) -> Result<()> {
        match self.instances.get(id) {
            Some(i) if i.status == InstanceStatus::Down => Ok(()),
            Some(i) => Err(CloudError::Conflict(format!(
                "instance {} must be down, is {}",
                id, i.status
            ))),
            None => Err(not_found(id)),
        }
    }

    fn transition(&mut self, id: &str, target: InstanceStatus) {
        let reads_left = self.settle_after_reads;
        self.pending.insert(id.to_string(), Pending { target, reads_left });
    }

    fn fresh_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }
}

#[async_trait]
impl RemoteResourceClient for FakeCloud {
    async fn read(&self, id: &str) -> Result<Instance> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Read(id.to_string()));

        let never_settle = state.never_settle;
        let settled = match state.pending.get_mut(id) {
            Some(p) if !never_settle => {
                p.reads_left = p.reads_left.saturating_sub(1);
                (p.reads_left == 0).then_some(p.target)
            }
            _ => None,
        };
        if let Some(target) = settled {
            state.pending.remove(id);
            let instance = state.instance_mut(id)?;
            instance.before_status = Some(instance.status);
            instance.status = target;
        }

        state.instances.get(id).cloned().ok_or_else(|| not_found(id))
    }

    async fn create(&self, spec: &InstanceCreate) -> Result<Instance> {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id();
        state.calls.push(Call::Create(spec.fields.name.clone()));
        let mut instance = server(&id, 1, 1024, InstanceStatus::Down, &[], &[]);
        instance.name = spec.fields.name.clone();
        instance.description = spec.fields.description.clone();
        instance.tags = spec.fields.tags.clone();
        instance.plan.id = spec.plan.clone();
        let (core, memory_mb) = parse_plan_id(&spec.plan.0);
        instance.plan.core = core;
        instance.plan.memory_mb = memory_mb;
        state.instances.insert(id, instance.clone());
        Ok(instance)
    }

    async fn update(&self, id: &str, fields: &InstanceUpdate) -> Result<Instance> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update(id.to_string()));
        let instance = state.instance_mut(id)?;
        instance.name = fields.name.clone();
        instance.description = fields.description.clone();
        instance.tags = fields.tags.clone();
        Ok(instance.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(id.to_string()));
        state.require_down(id)?;
        state.instances.remove(id);
        Ok(())
    }

    async fn boot(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Boot(id.to_string()));
        state.require_down(id)?;
        state.transition(id, InstanceStatus::Up);
        Ok(())
    }

    async fn shutdown(&self, id: &str, force: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Shutdown(id.to_string(), force));
        match state.instances.get(id) {
            Some(i) if i.status == InstanceStatus::Up => {}
            Some(_) => return Err(CloudError::Conflict(format!("{} is not up", id))),
            None => return Err(not_found(id)),
        }
        state.transition(id, InstanceStatus::Down);
        Ok(())
    }

    async fn reset(&self, id: &str) -> Result<()> {
        self.record(Call::Reset(id.to_string()));
        Ok(())
    }

    async fn connect_to_switch(&self, nic_id: &str, switch_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::ConnectSwitch(nic_id.to_string(), switch_id.to_string()));
        let (owner, pos) = state.nic_owner(nic_id)?;
        state.require_down(&owner)?;
        let nic = &mut state.instance_mut(&owner)?.interfaces[pos];
        if nic.target.is_connected() {
            return Err(CloudError::Conflict(format!("{} already connected", nic_id)));
        }
        nic.target = ConnectionTarget::Switch(switch_id.to_string());
        Ok(())
    }

    async fn disconnect_from_switch(&self, nic_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Disconnect(nic_id.to_string()));
        let (owner, pos) = state.nic_owner(nic_id)?;
        state.require_down(&owner)?;
        state.instance_mut(&owner)?.interfaces[pos].target = ConnectionTarget::None;
        Ok(())
    }

    async fn connect_to_shared_segment(&self, nic_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ConnectShared(nic_id.to_string()));
        let (owner, pos) = state.nic_owner(nic_id)?;
        state.require_down(&owner)?;
        let nic = &mut state.instance_mut(&owner)?.interfaces[pos];
        if nic.target.is_connected() {
            return Err(CloudError::Conflict(format!("{} already connected", nic_id)));
        }
        nic.target = ConnectionTarget::Shared;
        Ok(())
    }

    async fn create_interface(&self, instance_id: &str) -> Result<Interface> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::CreateInterface(instance_id.to_string()));
        state.require_down(instance_id)?;
        let nic_id = state.fresh_id();
        let instance = state.instance_mut(instance_id)?;
        let nic = Interface {
            id: nic_id,
            index: instance.interfaces.len(),
            target: ConnectionTarget::None,
            mac_address: String::new(),
        };
        instance.interfaces.push(nic.clone());
        Ok(nic)
    }

    async fn delete_interface(&self, nic_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteInterface(nic_id.to_string()));
        let (owner, pos) = state.nic_owner(nic_id)?;
        state.require_down(&owner)?;
        let instance = state.instance_mut(&owner)?;
        if matches!(instance.interfaces[pos].target, ConnectionTarget::Switch(_)) {
            return Err(CloudError::Conflict(format!("{} still connected", nic_id)));
        }
        instance.interfaces.remove(pos);
        for (index, nic) in instance.interfaces.iter_mut().enumerate() {
            nic.index = index;
        }
        Ok(())
    }

    async fn connect_disk(&self, disk_id: &str, instance_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::ConnectDisk(disk_id.to_string(), instance_id.to_string()));
        state.require_down(instance_id)?;
        if state
            .instances
            .values()
            .any(|i| i.disks.iter().any(|d| d.id == disk_id))
        {
            return Err(CloudError::Conflict(format!("{} already attached", disk_id)));
        }
        state.instance_mut(instance_id)?.disks.push(AttachedDisk {
            id: disk_id.to_string(),
            name: String::new(),
            size_mb: None,
            connection: None,
        });
        Ok(())
    }

    async fn disconnect_disk(&self, disk_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DisconnectDisk(disk_id.to_string()));
        let owner = state
            .instances
            .values()
            .find(|i| i.disks.iter().any(|d| d.id == disk_id))
            .map(|i| i.id.clone())
            .ok_or_else(|| not_found(disk_id))?;
        state.require_down(&owner)?;
        state
            .instance_mut(&owner)?
            .disks
            .retain(|d| d.id != disk_id);
        Ok(())
    }

    async fn change_plan(&self, id: &str, plan: &PlanRef) -> Result<ResourceId> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::ChangePlan(id.to_string(), plan.0.clone()));
        state.require_down(id)?;
        let (core, memory_mb) = parse_plan_id(&plan.0);
        let mut instance = state.instances.remove(id).ok_or_else(|| not_found(id))?;
        instance.plan = ServerPlan {
            id: plan.clone(),
            core,
            memory_mb,
        };
        if state.recreate_on_plan_change {
            instance.id = state.fresh_id();
        }
        let new_id = instance.id.clone();
        state.instances.insert(new_id.clone(), instance);
        Ok(new_id)
    }

    async fn resolve_plan(&self, core: u32, memory_mb: u32) -> Result<PlanRef> {
        self.record(Call::ResolvePlan(core, memory_mb));
        Ok(PlanRef(plan_id(core, memory_mb)))
    }
}

fn parse_plan_id(id: &str) -> (u32, u32) {
    let (gb, core) = id.split_at(id.len() - 3);
    (
        core.parse().unwrap(),
        gb.parse::<u32>().unwrap() * 1024,
    )
}
