//! VPC router firewall rule sets
//!
//! A VPC router keeps its firewall as one list per interface, each with a
//! `Send` and a `Receive` side. A [`FirewallRuleSet`] is one side of one
//! interface. Changes only take effect after `apply-changes`, which the
//! [`FirewallRuleSets`] backend issues while the router's lock is still held.

use crate::usacloud::{Usacloud, id_string};
use async_trait::async_trait;
use sakuraform_cloud::{CloudError, CollectionBackend, CollectionEditor, Result, Upsert};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Interfaces 0 (public) to 7 exist on every VPC router plan
pub const MAX_INTERFACE_INDEX: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Send,
    Receive,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Send => write!(f, "send"),
            Direction::Receive => write!(f, "receive"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "send" => Ok(Direction::Send),
            "receive" => Ok(Direction::Receive),
            other => Err(format!(
                "invalid direction '{}' (expected send or receive)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirewallProtocol {
    Tcp,
    Udp,
    Icmp,
    Ip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirewallAction {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    #[serde(rename = "Protocol", alias = "protocol")]
    pub protocol: FirewallProtocol,

    #[serde(rename = "SourceNetwork", alias = "source_network", default)]
    pub source_network: String,

    #[serde(rename = "SourcePort", alias = "source_port", default)]
    pub source_port: String,

    #[serde(rename = "DestinationNetwork", alias = "destination_network", default)]
    pub destination_network: String,

    #[serde(rename = "DestinationPort", alias = "destination_port", default)]
    pub destination_port: String,

    #[serde(rename = "Action", alias = "action")]
    pub action: FirewallAction,

    #[serde(rename = "Logging", alias = "logging", default)]
    pub logging: bool,

    #[serde(rename = "Description", alias = "description", default)]
    pub description: String,
}

impl FirewallRule {
    pub fn allow(&self) -> bool {
        self.action == FirewallAction::Allow
    }

    fn validate(&self) -> Result<()> {
        let has_ports = !self.source_port.is_empty() || !self.destination_port.is_empty();
        if has_ports && !matches!(self.protocol, FirewallProtocol::Tcp | FirewallProtocol::Udp) {
            return Err(CloudError::InvalidConfig(format!(
                "ports are only valid for tcp/udp rules ({:?})",
                self.protocol
            )));
        }
        Ok(())
    }
}

/// Identifies one rule set on a router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleSetKey {
    pub interface_index: usize,
    pub direction: Direction,
}

/// One direction of one interface's firewall; identified by
/// (interface_index, direction)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallRuleSet {
    pub interface_index: usize,
    pub direction: Direction,
    pub rules: Vec<FirewallRule>,
}

impl FirewallRuleSet {
    pub fn key(&self) -> RuleSetKey {
        RuleSetKey {
            interface_index: self.interface_index,
            direction: self.direction,
        }
    }
}

impl PartialEq for FirewallRuleSet {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for FirewallRuleSet {}

/// Firewall of one interface as stored on the router
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceFirewall {
    #[serde(rename = "Index")]
    pub index: usize,

    #[serde(rename = "Send", default)]
    pub send: Vec<FirewallRule>,

    #[serde(rename = "Receive", default)]
    pub receive: Vec<FirewallRule>,
}

impl InterfaceFirewall {
    fn side_mut(&mut self, direction: Direction) -> &mut Vec<FirewallRule> {
        match direction {
            Direction::Send => &mut self.send,
            Direction::Receive => &mut self.receive,
        }
    }

    fn is_empty(&self) -> bool {
        self.send.is_empty() && self.receive.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VpcRouterSettings {
    #[serde(rename = "FirewallEnabled", default)]
    pub firewall_enabled: bool,

    #[serde(rename = "Firewall", default)]
    pub firewall: Vec<InterfaceFirewall>,

    /// Settings this module does not edit, written back untouched
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// VPC router as returned by `vpc-router read`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpcRouter {
    #[serde(rename = "ID", deserialize_with = "id_string")]
    pub id: String,

    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "Settings", default)]
    pub settings: VpcRouterSettings,
}

impl VpcRouter {
    pub fn rules(&self, key: RuleSetKey) -> &[FirewallRule] {
        self.settings
            .firewall
            .iter()
            .find(|f| f.index == key.interface_index)
            .map(|f| match key.direction {
                Direction::Send => f.send.as_slice(),
                Direction::Receive => f.receive.as_slice(),
            })
            .unwrap_or(&[])
    }
}

/// Whole-object access to VPC routers
#[async_trait]
pub trait VpcRouterApi: Send + Sync {
    async fn read_vpc_router(&self, id: &str) -> Result<VpcRouter>;

    async fn write_vpc_router_settings(&self, id: &str, settings: &VpcRouterSettings) -> Result<()>;

    /// Push the stored configuration to the running router
    async fn apply_vpc_router_changes(&self, id: &str) -> Result<()>;
}

#[derive(Serialize)]
struct SettingsUpdate<'a> {
    #[serde(rename = "Settings")]
    settings: &'a VpcRouterSettings,
}

#[async_trait]
impl VpcRouterApi for Usacloud {
    async fn read_vpc_router(&self, id: &str) -> Result<VpcRouter> {
        Ok(self.read("vpc-router", id).await?)
    }

    async fn write_vpc_router_settings(
        &self,
        id: &str,
        settings: &VpcRouterSettings,
    ) -> Result<()> {
        let _: serde_json::Value = self
            .update("vpc-router", id, &SettingsUpdate { settings })
            .await?;
        Ok(())
    }

    async fn apply_vpc_router_changes(&self, id: &str) -> Result<()> {
        tracing::info!("vpc-router apply-changes {}", id);
        Ok(self.operate("vpc-router", "apply-changes", id, &[]).await?)
    }
}

/// [`CollectionBackend`] for the firewall rule sets of a VPC router
pub struct FirewallRuleSets<A> {
    api: A,
}

impl<A: VpcRouterApi> FirewallRuleSets<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }
}

#[async_trait]
impl<A: VpcRouterApi> CollectionBackend for FirewallRuleSets<A> {
    type Parent = VpcRouter;
    type Element = FirewallRuleSet;
    type Key = RuleSetKey;

    fn kind(&self) -> &'static str {
        "vpc-router"
    }

    async fn read(&self, parent_id: &str) -> Result<VpcRouter> {
        self.api.read_vpc_router(parent_id).await
    }

    async fn write(&self, parent_id: &str, parent: &VpcRouter) -> Result<()> {
        self.api
            .write_vpc_router_settings(parent_id, &parent.settings)
            .await
    }

    async fn apply(&self, parent_id: &str) -> Result<()> {
        self.api.apply_vpc_router_changes(parent_id).await
    }

    fn upsert(&self, parent: &mut VpcRouter, element: FirewallRuleSet) -> Result<Upsert> {
        if element.interface_index > MAX_INTERFACE_INDEX {
            return Err(CloudError::InvalidConfig(format!(
                "interface index {} is out of range (0..={})",
                element.interface_index, MAX_INTERFACE_INDEX
            )));
        }
        if element.rules.is_empty() {
            return Err(CloudError::InvalidConfig(format!(
                "rule set {}/{} has no rules; remove it instead",
                element.interface_index, element.direction
            )));
        }
        for rule in &element.rules {
            rule.validate()?;
        }

        let firewall = &mut parent.settings.firewall;
        let pos = match firewall
            .iter()
            .position(|f| f.index == element.interface_index)
        {
            Some(pos) => pos,
            None => {
                firewall.push(InterfaceFirewall {
                    index: element.interface_index,
                    ..Default::default()
                });
                firewall.sort_by_key(|f| f.index);
                firewall
                    .iter()
                    .position(|f| f.index == element.interface_index)
                    .unwrap_or_default()
            }
        };

        let side = firewall[pos].side_mut(element.direction);
        let outcome = if side.is_empty() {
            Upsert::Inserted
        } else {
            Upsert::Updated
        };
        *side = element.rules;
        parent.settings.firewall_enabled = true;
        Ok(outcome)
    }

    fn remove(&self, parent: &mut VpcRouter, key: &RuleSetKey) -> usize {
        let settings = &mut parent.settings;
        let mut removed = 0;
        for firewall in settings
            .firewall
            .iter_mut()
            .filter(|f| f.index == key.interface_index)
        {
            let side = firewall.side_mut(key.direction);
            if !side.is_empty() {
                side.clear();
                removed += 1;
            }
        }
        if removed == 0 {
            return 0;
        }

        settings.firewall.retain(|f| !f.is_empty());
        if settings.firewall.is_empty() {
            settings.firewall_enabled = false;
        }
        removed
    }
}

/// Editor for VPC router firewall rule sets sharing the process-wide locks
pub fn firewall_editor<A: VpcRouterApi>(api: A) -> CollectionEditor<FirewallRuleSets<A>> {
    CollectionEditor::new(FirewallRuleSets::new(api))
}
