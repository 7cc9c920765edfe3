//! SakuraForm reconciliation core
//!
//! This crate holds the parts of the provider where convergence takes more
//! than a single API call:
//!
//! - **Servers**: power / disk / NIC / plan reconciliation driven by an
//!   explicit power state machine ([`server`], [`nic`], [`power`])
//! - **Shared sub-collections**: element-level add/remove over parents that
//!   only support whole-object replacement ([`collection`], [`lock`])
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              sakuraform (CLI / handlers)        │
//! └───────────────┬─────────────────┬───────────────┘
//!                 │                 │
//! ┌───────────────▼───────┐ ┌───────▼───────────────┐
//! │ ServerLifecycle       │ │ CollectionEditor      │
//! │ Reconciler            │ │  (GSLB, VPC router)   │
//! │  ├─ ChangeSet         │ │  └─ NamedResourceMutex│
//! │  ├─ PowerState        │ └───────┬───────────────┘
//! │  ├─ NIC planner       │         │
//! │  └─ PollingWaiter     │         │
//! └───────────────┬───────┘         │
//!                 │                 │
//! ┌───────────────▼─────────────────▼───────────────┐
//! │      trait RemoteResourceClient / backends      │
//! │      (sakuraform-cloud-sakura: usacloud)        │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod changes;
pub mod client;
pub mod collection;
pub mod error;
pub mod lock;
pub mod model;
pub mod nic;
pub mod power;
pub mod server;
pub mod waiter;

// Re-exports
pub use action::{ReconcileOutcome, ReconcilePreview, ReconcileReport, ReconcileStep};
pub use changes::{ChangeSet, Disruption, PlanChange};
pub use client::RemoteResourceClient;
pub use collection::{CollectionBackend, CollectionEditor, Upsert};
pub use error::{CloudError, Result};
pub use lock::{NamedGuard, NamedResourceMutex};
pub use model::{
    AttachedDisk, ConnectionTarget, DiskConnection, Instance, InstanceCreate, InstanceStatus,
    InstanceUpdate, Interface, PlanRef, ResourceId, ServerPlan, ServerSpec,
};
pub use nic::NicOperation;
pub use power::PowerState;
pub use server::{ReconcilerConfig, ServerLifecycleReconciler};
pub use waiter::PollingWaiter;
