//! Hetzner Cloud API request and response models.
//!
//! Only the fields consumed by the inventory and the shared helpers are
//! modelled. Unknown fields are ignored.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Common types
// ============================================================================

/// Deprecation information of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deprecation {
    /// When the deprecation was announced.
    pub announced: DateTime<Utc>,
    /// After this date the resource can no longer be ordered.
    pub unavailable_after: DateTime<Utc>,
}

impl Deprecation {
    /// Whether the resource can no longer be ordered at `now`.
    #[must_use]
    pub fn is_unavailable(&self, now: DateTime<Utc>) -> bool {
        self.unavailable_after < now
    }
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    /// Machine readable code.
    pub code: String,
    /// Human readable message.
    pub message: String,
    /// Structured details, shape depends on the code.
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// Pagination metadata of list responses.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    /// Current page.
    pub page: u32,
    /// Entries per page.
    pub per_page: u32,
    /// Next page, if any.
    pub next_page: Option<u32>,
    /// Last page, if known.
    pub last_page: Option<u32>,
    /// Total number of entries, if known.
    pub total_entries: Option<u32>,
}

/// Metadata wrapper of list responses.
#[derive(Debug, Default, Deserialize)]
pub struct Meta {
    /// Pagination details.
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

// ============================================================================
// Server types
// ============================================================================

/// A cloud server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    /// Server ID.
    pub id: i64,
    /// Server name.
    pub name: String,
    /// Status: `running`, `initializing`, `starting`, `stopping`, `off`, ...
    pub status: String,
    /// Public network configuration.
    #[serde(default)]
    pub public_net: PublicNet,
    /// Private network attachments.
    #[serde(default)]
    pub private_net: Vec<PrivateNet>,
    /// Server type.
    pub server_type: ServerType,
    /// Datacenter the server runs in.
    pub datacenter: Datacenter,
    /// Image the server was created from, if it still exists.
    #[serde(default)]
    pub image: Option<Image>,
    /// User-defined labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Public network configuration of a server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicNet {
    /// Primary IPv4 address.
    #[serde(default)]
    pub ipv4: Option<Ipv4Address>,
    /// Primary IPv6 network.
    #[serde(default)]
    pub ipv6: Option<Ipv6Network>,
}

/// Public IPv4 address of a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ipv4Address {
    /// IP address.
    pub ip: String,
    /// Reverse DNS pointer.
    #[serde(default)]
    pub dns_ptr: Option<String>,
    /// Whether the address is blocked.
    #[serde(default)]
    pub blocked: bool,
}

/// Public IPv6 network of a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ipv6Network {
    /// Network in CIDR notation, e.g. `2001:db8::/64`.
    pub ip: String,
    /// Reverse DNS pointers for individual addresses.
    #[serde(default)]
    pub dns_ptr: Vec<DnsPtr>,
    /// Whether the network is blocked.
    #[serde(default)]
    pub blocked: bool,
}

impl Ipv6Network {
    /// Network address part of [`Self::ip`].
    #[must_use]
    pub fn network(&self) -> &str {
        self.ip.split_once('/').map_or(self.ip.as_str(), |(network, _)| network)
    }

    /// Prefix length part of [`Self::ip`].
    #[must_use]
    pub fn network_mask(&self) -> &str {
        self.ip.split_once('/').map_or("", |(_, mask)| mask)
    }
}

/// Reverse DNS entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsPtr {
    /// IP address.
    pub ip: String,
    /// Hostname.
    pub dns_ptr: String,
}

/// Private network attachment of a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateNet {
    /// Network ID.
    pub network: i64,
    /// IP address of the server in this network.
    pub ip: String,
    /// Additional alias IPs.
    #[serde(default)]
    pub alias_ips: Vec<String>,
    /// MAC address of the interface.
    #[serde(default)]
    pub mac_address: Option<String>,
}

/// Server type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerType {
    /// Server type ID.
    pub id: i64,
    /// Name, e.g. `cpx22`.
    pub name: String,
    /// CPU architecture, `x86` or `arm`.
    #[serde(default)]
    pub architecture: String,
    /// Deprecation valid for all locations.
    #[serde(default)]
    pub deprecation: Option<Deprecation>,
    /// Per location availability.
    #[serde(default)]
    pub locations: Vec<ServerTypeLocation>,
}

/// Availability of a server type in a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTypeLocation {
    /// Location ID.
    pub id: i64,
    /// Location name, e.g. `fsn1`.
    pub name: String,
    /// Deprecation of the server type in this location.
    #[serde(default)]
    pub deprecation: Option<Deprecation>,
}

/// Datacenter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Datacenter {
    /// Datacenter ID.
    pub id: i64,
    /// Name, e.g. `hel1-dc2`.
    pub name: String,
    /// Location of the datacenter.
    pub location: Location,
}

/// Location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Location ID.
    pub id: i64,
    /// Name, e.g. `hel1`.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// ISO country code.
    #[serde(default)]
    pub country: Option<String>,
    /// City.
    #[serde(default)]
    pub city: Option<String>,
    /// Network zone, e.g. `eu-central`.
    #[serde(default)]
    pub network_zone: Option<String>,
}

/// Image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    /// Image ID.
    pub id: i64,
    /// Unique name, only set for system images.
    #[serde(default)]
    pub name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// OS flavor, e.g. `debian`.
    #[serde(default)]
    pub os_flavor: String,
    /// OS version, e.g. `12`.
    #[serde(default)]
    pub os_version: Option<String>,
}

impl Image {
    /// Image name, falling back to the description for snapshots and backups.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.description.as_deref())
    }
}

// ============================================================================
// Network types
// ============================================================================

/// Private network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    /// Network ID.
    pub id: i64,
    /// Network name.
    pub name: String,
    /// IP range in CIDR notation.
    #[serde(default)]
    pub ip_range: Option<String>,
    /// Attached server IDs.
    #[serde(default)]
    pub servers: Vec<i64>,
    /// User-defined labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

// ============================================================================
// Action types
// ============================================================================

/// Status of an asynchronous action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Action is in progress.
    Running,
    /// Action finished successfully.
    Success,
    /// Action failed.
    Error,
}

/// Asynchronous action returned by mutating requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Action ID.
    pub id: i64,
    /// Command, e.g. `change_server_type`.
    pub command: String,
    /// Current status.
    pub status: ActionStatus,
    /// Progress in percent.
    #[serde(default)]
    pub progress: u8,
    /// Resources affected by the action.
    #[serde(default)]
    pub resources: Vec<ActionResource>,
    /// Error, set when status is `error`.
    #[serde(default)]
    pub error: Option<ActionErrorBody>,
    /// Start time.
    #[serde(default)]
    pub started: Option<DateTime<Utc>>,
    /// Finish time.
    #[serde(default)]
    pub finished: Option<DateTime<Utc>>,
}

/// Resource affected by an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResource {
    /// Resource ID.
    pub id: i64,
    /// Resource type, e.g. `server`.
    #[serde(rename = "type")]
    pub resource_type: String,
}

/// Error of a failed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}
