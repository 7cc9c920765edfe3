//! Sakura Cloud backend for SakuraForm
//!
//! This crate connects the provider-agnostic reconciliation core
//! (`sakuraform-cloud`) to Sakura Cloud.
//!
//! # Features
//!
//! - Server lifecycle through [`SakuraCloudClient`] (a `RemoteResourceClient`)
//! - GSLB destination server editing ([`gslb`])
//! - VPC router firewall rule set editing ([`vpc_router`])
//!
//! # Requirements
//!
//! - `usacloud` CLI must be installed and configured
//! - Authentication is managed through usacloud configuration
//!
//! # Example
//!
//! ```ignore
//! use sakuraform_cloud::{ReconcilerConfig, ServerLifecycleReconciler, ServerSpec};
//! use sakuraform_cloud_sakura::{SakuraCloudClient, Usacloud};
//! use std::sync::Arc;
//!
//! let client = Arc::new(SakuraCloudClient::new(Usacloud::new("tk1a")));
//! let reconciler = ServerLifecycleReconciler::new(client, ReconcilerConfig::default());
//!
//! let spec = ServerSpec::new("web01", 2, 4096).with_disk("113000000010");
//! let outcome = reconciler.reconcile("113000000001", &spec).await?;
//! ```

pub mod error;
pub mod gslb;
pub mod provider;
pub mod usacloud;
pub mod vpc_router;

pub use error::{Result, SakuraError};
pub use gslb::{Gslb, GslbApi, GslbServer, GslbServers, MAX_GSLB_SERVERS, gslb_server_editor};
pub use provider::SakuraCloudClient;
pub use usacloud::{ServerInfo, Usacloud};
pub use vpc_router::{
    Direction, FirewallAction, FirewallProtocol, FirewallRule, FirewallRuleSet, FirewallRuleSets,
    RuleSetKey, VpcRouter, VpcRouterApi, firewall_editor,
};
