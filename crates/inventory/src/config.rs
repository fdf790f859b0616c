//! Inventory source configuration.
//!
//! The configuration is a YAML file whose name ends with `hcloud.yml` or
//! `hcloud.yaml`:
//!
//! ```yaml
//! plugin: hetzner.hcloud.hcloud
//! connect_with: private_ipv4
//! network: backend
//! locations: [fsn1, nbg1]
//! keyed_groups:
//!   - key: hcloud_labels
//!     prefix: label
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hcloud::DEFAULT_ENDPOINT;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{InventoryCache, JsonFileCache, MemoryCache};
use crate::error::{InventoryError, Result};

/// Accepted values of the `plugin` key.
pub const PLUGIN_NAMES: &[&str] = &["hcloud", "hetzner.hcloud.hcloud"];

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "HCLOUD_TOKEN";

/// Environment variable holding the API endpoint.
pub const ENDPOINT_ENV: &str = "HCLOUD_ENDPOINT";

/// Which address is used as `ansible_host`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectWith {
    /// Primary public IPv4 address.
    #[default]
    PublicIpv4,
    /// First address of the public IPv6 network.
    PublicIpv6,
    /// Server name.
    Hostname,
    /// Reverse DNS entry of the public IPv4 address.
    Ipv4DnsPtr,
    /// Address in the configured private network.
    PrivateIpv4,
}

impl ConnectWith {
    /// Configuration value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PublicIpv4 => "public_ipv4",
            Self::PublicIpv6 => "public_ipv6",
            Self::Hostname => "hostname",
            Self::Ipv4DnsPtr => "ipv4_dns_ptr",
            Self::PrivateIpv4 => "private_ipv4",
        }
    }
}

impl std::fmt::Display for ConnectWith {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Groups created from the value of a host variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedGroup {
    /// Host variable, dotted paths address nested values.
    pub key: String,
    /// Prefix of the group names.
    #[serde(default)]
    pub prefix: String,
    /// Separator between prefix and value.
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Group the created groups are added to as children.
    #[serde(default)]
    pub parent_group: Option<String>,
    /// Keep the separator when the prefix is empty.
    #[serde(default = "default_true")]
    pub leading_separator: bool,
    /// Value used when the variable is an empty string.
    #[serde(default)]
    pub default_value: Option<String>,
}

/// Inventory source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Plugin name, one of [`PLUGIN_NAMES`].
    pub plugin: String,
    /// API token, may be a template.
    #[serde(default, alias = "token")]
    pub api_token: Option<String>,
    /// API endpoint.
    #[serde(default)]
    pub api_endpoint: Option<String>,
    /// Group all servers are added to.
    #[serde(default = "default_group")]
    pub group: String,
    /// Source of `ansible_host`.
    #[serde(default)]
    pub connect_with: ConnectWith,
    /// Only servers in these locations.
    #[serde(default)]
    pub locations: Vec<String>,
    /// Only servers of these server types.
    #[serde(default)]
    pub types: Vec<String>,
    /// Only servers with these image OS flavors.
    #[serde(default)]
    pub images: Vec<String>,
    /// Only servers matching this label selector.
    #[serde(default)]
    pub label_selector: String,
    /// Only servers attached to this network, name or ID, may be a template.
    #[serde(default)]
    pub network: String,
    /// Only servers with one of these statuses.
    #[serde(default)]
    pub status: Vec<String>,
    /// Prefix of the host variables coming from the API.
    #[serde(default = "default_hostvars_prefix")]
    pub hostvars_prefix: String,
    /// Suffix of the host variables coming from the API.
    #[serde(default)]
    pub hostvars_suffix: Option<String>,
    /// Template for the inventory hostname.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Fail on template errors in `compose`, `groups` and `keyed_groups`.
    #[serde(default)]
    pub strict: bool,
    /// Variables created from templates.
    #[serde(default)]
    pub compose: BTreeMap<String, String>,
    /// Groups whose condition is true for the host.
    #[serde(default)]
    pub groups: BTreeMap<String, String>,
    /// Groups created from host variable values.
    #[serde(default)]
    pub keyed_groups: Vec<KeyedGroup>,
    /// Enable the inventory cache.
    #[serde(default)]
    pub cache: bool,
    /// Directory of the JSON file cache, in memory when unset.
    #[serde(default)]
    pub cache_connection: Option<PathBuf>,
    /// Cache entry lifetime in seconds, 0 never expires.
    #[serde(default = "default_cache_timeout")]
    pub cache_timeout: u64,
    /// Prefix of the cache files.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,
}

fn default_group() -> String {
    "hcloud".to_string()
}

fn default_hostvars_prefix() -> String {
    "hcloud_".to_string()
}

fn default_separator() -> String {
    "_".to_string()
}

fn default_true() -> bool {
    true
}

fn default_cache_timeout() -> u64 {
    3600
}

fn default_cache_prefix() -> String {
    "ansible_inventory_".to_string()
}

/// Whether `path` names an inventory source for this plugin.
#[must_use]
pub fn verify_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with("hcloud.yml") || name.ends_with("hcloud.yaml"))
}

impl InventoryConfig {
    /// Parse a configuration document.
    ///
    /// # Errors
    /// Returns error if the document is not valid YAML or names another plugin.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        if !PLUGIN_NAMES.contains(&config.plugin.as_str()) {
            return Err(InventoryError::Config(format!(
                "plugin must be one of {}, got '{}'",
                PLUGIN_NAMES.join(", "),
                config.plugin
            )));
        }
        Ok(config)
    }

    /// Load a configuration file, falling back to the environment for the
    /// token and endpoint.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_env(|name| std::env::var(name).ok());

        debug!(path = %path.display(), plugin = %config.plugin, "Loaded inventory configuration");
        Ok(config)
    }

    /// Fill the token and endpoint from the environment when unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_token.as_deref().is_none_or(str::is_empty) {
            self.api_token = lookup(TOKEN_ENV).filter(|v| !v.is_empty());
        }
        if self.api_endpoint.as_deref().is_none_or(str::is_empty) {
            self.api_endpoint = lookup(ENDPOINT_ENV).filter(|v| !v.is_empty());
        }
    }

    /// The API endpoint to use.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.api_endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Open the cache backend selected by `cache_connection`.
    #[must_use]
    pub fn cache_backend(&self) -> Box<dyn InventoryCache> {
        match &self.cache_connection {
            Some(dir) => Box::new(JsonFileCache::new(
                dir.clone(),
                self.cache_prefix.clone(),
                self.cache_timeout,
            )),
            None => Box::new(MemoryCache::default()),
        }
    }
}
