//! GSLB destination servers
//!
//! The destination server list only exists inside the GSLB object, so adding
//! or removing one server goes through [`CollectionEditor`] with the
//! [`GslbServers`] backend.

use crate::usacloud::{Usacloud, id_string};
use async_trait::async_trait;
use sakuraform_cloud::{CloudError, CollectionBackend, CollectionEditor, Result, Upsert};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Upper bound on destination servers per GSLB
pub const MAX_GSLB_SERVERS: usize = 12;

/// Weight range accepted by weighted GSLBs
pub const GSLB_WEIGHT_RANGE: std::ops::RangeInclusive<u32> = 1..=10000;

/// One GSLB destination server; identified by its IP address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GslbServer {
    #[serde(rename = "IPAddress")]
    pub ip_address: String,

    #[serde(rename = "Enabled", default = "default_enabled")]
    pub enabled: bool,

    #[serde(rename = "Weight", default = "default_weight")]
    pub weight: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_weight() -> u32 {
    1
}

impl GslbServer {
    pub fn new(ip_address: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            enabled: true,
            weight: 1,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.ip_address.parse::<IpAddr>().is_err() {
            return Err(CloudError::InvalidConfig(format!(
                "invalid GSLB server address '{}'",
                self.ip_address
            )));
        }
        if !GSLB_WEIGHT_RANGE.contains(&self.weight) {
            return Err(CloudError::InvalidConfig(format!(
                "GSLB weight must be within {}..={}, got {}",
                GSLB_WEIGHT_RANGE.start(),
                GSLB_WEIGHT_RANGE.end(),
                self.weight
            )));
        }
        Ok(())
    }
}

impl PartialEq for GslbServer {
    fn eq(&self, other: &Self) -> bool {
        self.ip_address == other.ip_address
    }
}

impl Eq for GslbServer {}

/// GSLB as returned by `gslb read`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gslb {
    #[serde(rename = "ID", deserialize_with = "id_string")]
    pub id: String,

    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "FQDN", default)]
    pub fqdn: Option<String>,

    #[serde(rename = "Weighted", default)]
    pub weighted: bool,

    #[serde(rename = "DestinationServers", default)]
    pub destination_servers: Vec<GslbServer>,
}

impl Gslb {
    pub fn server(&self, ip_address: &str) -> Option<&GslbServer> {
        self.destination_servers
            .iter()
            .find(|s| s.ip_address == ip_address)
    }
}

/// Whole-object access to GSLBs
#[async_trait]
pub trait GslbApi: Send + Sync {
    async fn read_gslb(&self, id: &str) -> Result<Gslb>;

    /// Replace the destination server list
    async fn write_gslb_servers(&self, id: &str, servers: &[GslbServer]) -> Result<()>;
}

#[derive(Serialize)]
struct GslbServersUpdate<'a> {
    #[serde(rename = "DestinationServers")]
    destination_servers: &'a [GslbServer],
}

#[async_trait]
impl GslbApi for Usacloud {
    async fn read_gslb(&self, id: &str) -> Result<Gslb> {
        Ok(self.read("gslb", id).await?)
    }

    async fn write_gslb_servers(&self, id: &str, servers: &[GslbServer]) -> Result<()> {
        let _: serde_json::Value = self
            .update(
                "gslb",
                id,
                &GslbServersUpdate {
                    destination_servers: servers,
                },
            )
            .await?;
        Ok(())
    }
}

/// [`CollectionBackend`] for the destination servers of a GSLB
pub struct GslbServers<A> {
    api: A,
}

impl<A: GslbApi> GslbServers<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }
}

#[async_trait]
impl<A: GslbApi> CollectionBackend for GslbServers<A> {
    type Parent = Gslb;
    type Element = GslbServer;
    type Key = str;

    fn kind(&self) -> &'static str {
        "gslb"
    }

    async fn read(&self, parent_id: &str) -> Result<Gslb> {
        self.api.read_gslb(parent_id).await
    }

    async fn write(&self, parent_id: &str, parent: &Gslb) -> Result<()> {
        self.api
            .write_gslb_servers(parent_id, &parent.destination_servers)
            .await
    }

    fn upsert(&self, parent: &mut Gslb, element: GslbServer) -> Result<Upsert> {
        element.validate()?;

        if let Some(existing) = parent
            .destination_servers
            .iter_mut()
            .find(|s| **s == element)
        {
            existing.enabled = element.enabled;
            existing.weight = element.weight;
            return Ok(Upsert::Updated);
        }

        if parent.destination_servers.len() >= MAX_GSLB_SERVERS {
            return Err(CloudError::InvalidConfig(format!(
                "GSLB {} already has {} servers (max {})",
                parent.id,
                parent.destination_servers.len(),
                MAX_GSLB_SERVERS
            )));
        }
        parent.destination_servers.push(element);
        Ok(Upsert::Inserted)
    }

    fn remove(&self, parent: &mut Gslb, ip_address: &str) -> usize {
        let before = parent.destination_servers.len();
        parent
            .destination_servers
            .retain(|s| s.ip_address != ip_address);
        before - parent.destination_servers.len()
    }
}

/// Editor for GSLB destination servers sharing the process-wide locks
pub fn gslb_server_editor<A: GslbApi>(api: A) -> CollectionEditor<GslbServers<A>> {
    CollectionEditor::new(GslbServers::new(api))
}
