//! Shaping API servers into inventory host variables.

use std::collections::{BTreeMap, HashMap};

use hcloud::ipaddress::first_ipv6_address;
use hcloud::models::{Network, Server};
use hcloud::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ConnectWith;
use crate::error::{InventoryError, Result};

/// Variables that never get the host variable prefix or suffix.
const UNDECORATED_VARS: &[&str] = &["ansible_host"];

/// Private network attachment of an inventory server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryPrivateNetwork {
    /// Network ID.
    pub id: i64,
    /// Network name.
    pub name: String,
    /// Address of the server in the network.
    pub ip: String,
}

/// Host variables of one server, as stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryServer {
    pub id: i64,
    pub name: String,
    pub status: String,

    #[serde(rename = "type")]
    pub type_name: String,
    pub server_type: String,
    pub architecture: String,

    pub datacenter: String,
    pub location: String,

    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_network_mask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ipv4: Option<String>,
    pub private_networks: Vec<InventoryPrivateNetwork>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_os_flavor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ansible_host: Option<String>,
}

impl InventoryServer {
    /// Host variables with `prefix` and `suffix` added to every name except
    /// `ansible_host`.
    ///
    /// # Errors
    /// Returns error if the server cannot be serialized.
    pub fn hostvars(&self, prefix: &str, suffix: Option<&str>) -> Result<Map<String, Value>> {
        let Value::Object(vars) = serde_json::to_value(self)? else {
            return Ok(Map::new());
        };

        let suffix = suffix.unwrap_or_default();
        Ok(vars
            .into_iter()
            .map(|(key, value)| {
                if UNDECORATED_VARS.contains(&key.as_str()) {
                    (key, value)
                } else {
                    (format!("{prefix}{key}{suffix}"), value)
                }
            })
            .collect())
    }
}

/// Address of `server` according to `connect_with`.
///
/// # Errors
/// Returns [`InventoryError::HostAddressUnavailable`] when the server has no
/// such address.
pub fn ansible_host(
    server: &Server,
    connect_with: ConnectWith,
    network: Option<&Network>,
) -> Result<String> {
    let unavailable = |what: &str| {
        InventoryError::HostAddressUnavailable(format!(
            "Server has no {what}, but connect_with={connect_with} was specified"
        ))
    };

    match connect_with {
        ConnectWith::PublicIpv4 => server
            .public_net
            .ipv4
            .as_ref()
            .map(|ipv4| ipv4.ip.clone())
            .ok_or_else(|| unavailable("public ipv4")),
        ConnectWith::PublicIpv6 => {
            let ipv6 = server
                .public_net
                .ipv6
                .as_ref()
                .ok_or_else(|| unavailable("public ipv6"))?;
            Ok(first_ipv6_address(&ipv6.ip)?.to_string())
        }
        ConnectWith::Hostname => Ok(server.name.clone()),
        ConnectWith::Ipv4DnsPtr => server
            .public_net
            .ipv4
            .as_ref()
            .ok_or_else(|| unavailable("public ipv4"))?
            .dns_ptr
            .clone()
            .ok_or_else(|| unavailable("public ipv4 dns ptr")),
        ConnectWith::PrivateIpv4 => {
            let network = network.ok_or_else(|| {
                InventoryError::HostAddressUnavailable(
                    "You can only connect via private IPv4 if you specify a network".to_string(),
                )
            })?;
            server
                .private_net
                .iter()
                .find(|p| p.network == network.id)
                .map(|p| p.ip.clone())
                .ok_or_else(|| unavailable(&format!("private ipv4 in network {}", network.name)))
        }
    }
}

/// Builds [`InventoryServer`]s, resolving private network names once per
/// network.
pub struct ServerShaper<'a> {
    client: &'a Client,
    connect_with: ConnectWith,
    network: Option<&'a Network>,
    network_names: HashMap<i64, String>,
}

impl<'a> ServerShaper<'a> {
    /// Create a shaper. `network` is the network the inventory is limited to.
    #[must_use]
    pub fn new(client: &'a Client, connect_with: ConnectWith, network: Option<&'a Network>) -> Self {
        let mut network_names = HashMap::new();
        if let Some(network) = network {
            network_names.insert(network.id, network.name.clone());
        }
        Self {
            client,
            connect_with,
            network,
            network_names,
        }
    }

    async fn network_name(&mut self, id: i64) -> Result<String> {
        if let Some(name) = self.network_names.get(&id) {
            return Ok(name.clone());
        }
        let network = self.client.networks().get_by_id(id).await?;
        self.network_names.insert(id, network.name.clone());
        Ok(network.name)
    }

    /// Shape one server.
    ///
    /// A missing `connect_with` address is logged and leaves `ansible_host`
    /// unset.
    ///
    /// # Errors
    /// Returns error if a private network cannot be fetched or the public
    /// IPv6 network is malformed.
    pub async fn build(&mut self, server: &Server) -> Result<InventoryServer> {
        let mut private_networks = Vec::with_capacity(server.private_net.len());
        for private_net in &server.private_net {
            private_networks.push(InventoryPrivateNetwork {
                id: private_net.network,
                name: self.network_name(private_net.network).await?,
                ip: private_net.ip.clone(),
            });
        }

        let private_ipv4 = self.network.and_then(|network| {
            server
                .private_net
                .iter()
                .find(|p| p.network == network.id)
                .map(|p| p.ip.clone())
        });

        let ipv6 = server
            .public_net
            .ipv6
            .as_ref()
            .map(|ipv6| first_ipv6_address(&ipv6.ip).map(|ip| ip.to_string()))
            .transpose()?;

        let ansible_host = match ansible_host(server, self.connect_with, self.network) {
            Ok(host) => Some(host),
            Err(e) => {
                debug!(server = %server.name, error = %e, "[hcloud] Cannot set ansible_host");
                None
            }
        };

        Ok(InventoryServer {
            id: server.id,
            name: server.name.clone(),
            status: server.status.clone(),
            type_name: server.server_type.name.clone(),
            server_type: server.server_type.name.clone(),
            architecture: server.server_type.architecture.clone(),
            datacenter: server.datacenter.name.clone(),
            location: server.datacenter.location.name.clone(),
            labels: server.labels.clone(),
            ipv4: server.public_net.ipv4.as_ref().map(|ipv4| ipv4.ip.clone()),
            ipv6,
            ipv6_network: server.public_net.ipv6.as_ref().map(|n| n.network().to_string()),
            ipv6_network_mask: server
                .public_net
                .ipv6
                .as_ref()
                .map(|n| n.network_mask().to_string()),
            private_ipv4,
            private_networks,
            image_id: server.image.as_ref().map(|image| image.id),
            image_name: server
                .image
                .as_ref()
                .and_then(|image| image.display_name().map(str::to_string)),
            image_os_flavor: server.image.as_ref().map(|image| image.os_flavor.clone()),
            ansible_host,
        })
    }
}
