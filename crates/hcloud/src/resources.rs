//! Typed resource clients and the name-or-id lookup.
//!
//! Every resource kind the modules address by name or ID is listed in
//! [`ResourceKind`], so the set of supported lookups is closed and checked at
//! compile time.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::Client;
use crate::error::ClientError;
use crate::models::{Datacenter, Image, Location, Network, Server, ServerType};

/// Resource kinds reachable through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Certificates.
    Certificates,
    /// Datacenters.
    Datacenters,
    /// Firewalls.
    Firewalls,
    /// Floating IPs.
    FloatingIps,
    /// Images.
    Images,
    /// ISOs.
    Isos,
    /// Load Balancers.
    LoadBalancers,
    /// Load Balancer types.
    LoadBalancerTypes,
    /// Locations.
    Locations,
    /// Networks.
    Networks,
    /// Placement groups.
    PlacementGroups,
    /// Primary IPs.
    PrimaryIps,
    /// Servers.
    Servers,
    /// Server types.
    ServerTypes,
    /// SSH keys.
    SshKeys,
    /// Volumes.
    Volumes,
    /// DNS zones.
    Zones,
}

impl ResourceKind {
    /// Collection path, also the key of list responses.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Certificates => "certificates",
            Self::Datacenters => "datacenters",
            Self::Firewalls => "firewalls",
            Self::FloatingIps => "floating_ips",
            Self::Images => "images",
            Self::Isos => "isos",
            Self::LoadBalancers => "load_balancers",
            Self::LoadBalancerTypes => "load_balancer_types",
            Self::Locations => "locations",
            Self::Networks => "networks",
            Self::PlacementGroups => "placement_groups",
            Self::PrimaryIps => "primary_ips",
            Self::Servers => "servers",
            Self::ServerTypes => "server_types",
            Self::SshKeys => "ssh_keys",
            Self::Volumes => "volumes",
            Self::Zones => "zones",
        }
    }

    /// Singular name, also the key of single resource responses.
    #[must_use]
    pub const fn singular(self) -> &'static str {
        match self {
            Self::Certificates => "certificate",
            Self::Datacenters => "datacenter",
            Self::Firewalls => "firewall",
            Self::FloatingIps => "floating_ip",
            Self::Images => "image",
            Self::Isos => "iso",
            Self::LoadBalancers => "load_balancer",
            Self::LoadBalancerTypes => "load_balancer_type",
            Self::Locations => "location",
            Self::Networks => "network",
            Self::PlacementGroups => "placement_group",
            Self::PrimaryIps => "primary_ip",
            Self::Servers => "server",
            Self::ServerTypes => "server_type",
            Self::SshKeys => "ssh_key",
            Self::Volumes => "volume",
            Self::Zones => "zone",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Result of a lookup that may legitimately find nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The resource exists.
    Found(T),
    /// No resource matched.
    NotFound,
}

impl<T> Lookup<T> {
    /// Convert into an [`Option`].
    #[must_use]
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }
}

/// Filters for list requests.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    /// Only resources with this exact name.
    pub name: Option<String>,
    /// Only resources matching this label selector.
    pub label_selector: Option<String>,
    /// Only resources with one of these statuses.
    pub status: Vec<String>,
}

impl ListParams {
    /// Filter by label selector.
    #[must_use]
    pub fn label_selector(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into());
        self
    }

    /// Filter by status.
    #[must_use]
    pub fn status<I, S>(mut self, status: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.status = status.into_iter().map(Into::into).collect();
        self
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(name) = &self.name {
            query.push(("name", name.clone()));
        }
        if let Some(selector) = self.label_selector.as_ref().filter(|s| !s.is_empty()) {
            query.push(("label_selector", selector.clone()));
        }
        for status in &self.status {
            query.push(("status", status.clone()));
        }
        query
    }
}

/// Client for one resource kind.
pub struct ResourceClient<'a, T> {
    client: &'a Client,
    kind: ResourceKind,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> ResourceClient<'_, T> {
    /// Resource kind handled by this client.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Get a resource by ID.
    ///
    /// # Errors
    /// Returns error if the request fails, including `not_found` API errors.
    pub async fn get_by_id(&self, id: i64) -> Result<T, ClientError> {
        let mut response: serde_json::Value = self
            .client
            .get(&format!("{}/{id}", self.kind.path()), &[])
            .await?;
        let item = response
            .get_mut(self.kind.singular())
            .map(serde_json::Value::take)
            .unwrap_or_default();
        Ok(serde_json::from_value(item)?)
    }

    /// Get a resource by name.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<T>, ClientError> {
        let params = ListParams {
            name: Some(name.to_string()),
            ..ListParams::default()
        };
        let mut response: serde_json::Value = self
            .client
            .get(self.kind.path(), &params.query())
            .await?;
        let items = response
            .get_mut(self.kind.path())
            .map(serde_json::Value::take)
            .unwrap_or_default();
        if items.is_null() {
            return Ok(None);
        }
        let items: Vec<T> = serde_json::from_value(items)?;
        Ok(items.into_iter().next())
    }

    /// Get all resources, following pagination.
    ///
    /// # Errors
    /// Returns error if any page request fails.
    pub async fn get_all(&self, params: &ListParams) -> Result<Vec<T>, ClientError> {
        self.client
            .get_all(self.kind.path(), self.kind.path(), &params.query())
            .await
    }

    /// Get a resource by name, and if not found by its ID.
    ///
    /// Parameters that are not numeric never reach the ID endpoint. A
    /// `not_found` API error is reported as [`Lookup::NotFound`].
    ///
    /// # Errors
    /// Returns error for any other API failure.
    pub async fn find_by_name_or_id(&self, param: &str) -> Result<Lookup<T>, ClientError> {
        if let Some(found) = self.get_by_name(param).await? {
            return Ok(Lookup::Found(found));
        }

        let Ok(id) = param.parse::<i64>() else {
            debug!(kind = %self.kind, param, "No resource with this name");
            return Ok(Lookup::NotFound);
        };

        match self.get_by_id(id).await {
            Ok(found) => Ok(Lookup::Found(found)),
            Err(e) if e.is_not_found() => Ok(Lookup::NotFound),
            Err(e) => Err(e),
        }
    }

    /// Get a resource by name, and if not found by its ID.
    ///
    /// # Errors
    /// Returns [`ClientError::ResourceNotFound`] when nothing matched, or the
    /// underlying API error.
    pub async fn get_by_name_or_id(&self, param: &str) -> Result<T, ClientError> {
        match self.find_by_name_or_id(param).await? {
            Lookup::Found(found) => Ok(found),
            Lookup::NotFound => Err(ClientError::ResourceNotFound {
                resource: self.kind.singular(),
                param: param.to_string(),
            }),
        }
    }
}

impl Client {
    /// Client for an arbitrary resource kind, deserializing into `T`.
    #[must_use]
    pub fn resource<T: DeserializeOwned>(&self, kind: ResourceKind) -> ResourceClient<'_, T> {
        ResourceClient {
            client: self,
            kind,
            _marker: PhantomData,
        }
    }

    /// Servers.
    #[must_use]
    pub fn servers(&self) -> ResourceClient<'_, Server> {
        self.resource(ResourceKind::Servers)
    }

    /// Networks.
    #[must_use]
    pub fn networks(&self) -> ResourceClient<'_, Network> {
        self.resource(ResourceKind::Networks)
    }

    /// Locations.
    #[must_use]
    pub fn locations(&self) -> ResourceClient<'_, Location> {
        self.resource(ResourceKind::Locations)
    }

    /// Datacenters.
    #[must_use]
    pub fn datacenters(&self) -> ResourceClient<'_, Datacenter> {
        self.resource(ResourceKind::Datacenters)
    }

    /// Server types.
    #[must_use]
    pub fn server_types(&self) -> ResourceClient<'_, ServerType> {
        self.resource(ResourceKind::ServerTypes)
    }

    /// Images.
    #[must_use]
    pub fn images(&self) -> ResourceClient<'_, Image> {
        self.resource(ResourceKind::Images)
    }
}
