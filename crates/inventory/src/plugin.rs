//! The inventory source: fetch, filter, shape, group and cache servers.

use std::path::{Path, PathBuf};

use hcloud::models::Network;
use hcloud::{Client, ClientConfig, ListParams};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::cache::{cache_key, InventoryCache};
use crate::config::{verify_file, InventoryConfig};
use crate::constructed::Constructed;
use crate::error::{InventoryError, Result};
use crate::filter::filter_servers;
use crate::inventory::Inventory;
use crate::server::{InventoryServer, ServerShaper};
use crate::template::{combine_vars, Templar};

/// Fully qualified plugin name, also the first part of cache keys.
pub const PLUGIN_NAME: &str = "hetzner.hcloud.hcloud";

/// Application name sent in the user agent.
const APPLICATION_NAME: &str = "ansible-inventory";

/// A configured inventory source.
pub struct InventoryPlugin {
    config: InventoryConfig,
    source: PathBuf,
    extra_vars: Map<String, Value>,
    templar: Templar,
    conditions: Templar,
}

impl InventoryPlugin {
    /// Create a source from an already loaded configuration. `source` is the
    /// path the configuration was read from and scopes the cache.
    #[must_use]
    pub fn new(config: InventoryConfig, source: impl Into<PathBuf>) -> Self {
        let conditions = Templar::new(config.strict);
        Self {
            config,
            source: source.into(),
            extra_vars: Map::new(),
            templar: Templar::new(true),
            conditions,
        }
    }

    /// Load a source from a configuration file.
    ///
    /// # Errors
    /// Returns error if the file is not an inventory source for this plugin
    /// or cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !verify_file(path) {
            return Err(InventoryError::Config(format!(
                "{} is not a hcloud.yml or hcloud.yaml file",
                path.display()
            )));
        }
        Ok(Self::new(InventoryConfig::load(path)?, path))
    }

    /// Variables available to the token, network and hostname templates.
    #[must_use]
    pub fn with_extra_vars(mut self, extra_vars: Map<String, Value>) -> Self {
        self.extra_vars = extra_vars;
        self
    }

    /// Source configuration.
    #[must_use]
    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    /// Cache key of this source.
    #[must_use]
    pub fn cache_key(&self) -> String {
        cache_key(PLUGIN_NAME, &self.source)
    }

    fn render(&self, template: &str) -> Result<String> {
        self.templar.render(template, &self.extra_vars)
    }

    /// Create the API client and check that the token is accepted.
    async fn client(&self) -> Result<Client> {
        let token = match self.config.api_token.as_deref() {
            Some(token) if !token.is_empty() => self.render(token)?,
            _ => {
                return Err(InventoryError::Config(
                    "api_token is required, set it in the inventory file or HCLOUD_TOKEN".to_string(),
                ))
            }
        };

        let client = Client::new(
            ClientConfig::new(token)
                .endpoint(self.config.endpoint())
                .application(APPLICATION_NAME, env!("CARGO_PKG_VERSION")),
        )?;

        client
            .locations()
            .get_all(&ListParams::default())
            .await
            .map_err(InventoryError::InvalidToken)?;

        Ok(client)
    }

    async fn resolve_network(&self, client: &Client) -> Result<Option<Network>> {
        if self.config.network.is_empty() {
            return Ok(None);
        }
        let param = self.render(&self.config.network)?;
        let network = client.networks().get_by_name_or_id(&param).await?;
        debug!(network = %network.name, id = network.id, "Resolved network filter");
        Ok(Some(network))
    }

    /// Fetch, filter and shape the servers of this source.
    ///
    /// # Errors
    /// Returns error if the network cannot be resolved or a request fails.
    pub async fn fetch_servers(&self, client: &Client) -> Result<Vec<InventoryServer>> {
        let _session = client.cached_session();

        let network = self.resolve_network(client).await?;

        let mut params = ListParams::default().status(self.config.status.iter().cloned());
        if !self.config.label_selector.is_empty() {
            params = params.label_selector(self.config.label_selector.clone());
        }
        let servers = client.servers().get_all(&params).await?;
        let fetched = servers.len();

        let servers = filter_servers(servers, &self.config, network.as_ref());
        debug!(fetched, kept = servers.len(), "Filtered servers");

        let mut shaper = ServerShaper::new(client, self.config.connect_with, network.as_ref());
        let mut shaped = Vec::with_capacity(servers.len());
        for server in &servers {
            shaped.push(shaper.build(server).await?);
        }
        Ok(shaped)
    }

    fn cached_servers(
        &self,
        cache: &dyn InventoryCache,
        use_cache: bool,
    ) -> Result<Option<Vec<InventoryServer>>> {
        if !use_cache || !self.config.cache {
            return Ok(None);
        }
        let servers = cache.get(&self.cache_key())?;
        if servers.is_some() {
            debug!(key = %self.cache_key(), "Using cached inventory");
        }
        Ok(servers)
    }

    fn update_cache(
        &self,
        cache: &mut dyn InventoryCache,
        use_cache: bool,
        servers: &[InventoryServer],
    ) -> Result<()> {
        if !self.config.cache {
            return Ok(());
        }
        let key = self.cache_key();
        // An existing entry means the servers came from it
        if use_cache && cache.contains(&key)? {
            return Ok(());
        }
        cache.set(&key, servers)?;
        Ok(())
    }

    /// Add one shaped server to the inventory.
    fn add_server(&self, inventory: &mut impl Inventory, server: &InventoryServer) -> Result<()> {
        let config = &self.config;
        let hostvars = server.hostvars(&config.hostvars_prefix, config.hostvars_suffix.as_deref())?;

        let hostname = match &config.hostname {
            Some(template) => self
                .templar
                .render(template, &combine_vars(&hostvars, &self.extra_vars))?,
            None => server.name.clone(),
        };
        if hostname.trim().is_empty() {
            return Err(InventoryError::Template {
                template: config.hostname.clone().unwrap_or_default(),
                message: format!("hostname of server {} rendered empty", server.name),
            });
        }

        inventory.add_host(&hostname, Some(&config.group));
        for (key, value) in hostvars {
            inventory.set_variable(&hostname, &key, value);
        }

        let constructed = Constructed::new(&self.templar, &self.conditions, config.strict);
        constructed.set_composite_vars(&config.compose, &hostname, inventory)?;
        constructed.add_host_to_composed_groups(&config.groups, &hostname, inventory)?;
        constructed.add_host_to_keyed_groups(&config.keyed_groups, &hostname, inventory)?;
        Ok(())
    }

    /// Populate `inventory` with the servers of this source.
    ///
    /// With `use_cache` false the cache is neither read nor kept, the fresh
    /// result replaces any cached entry.
    ///
    /// # Errors
    /// Returns [`InventoryError::InvalidToken`] if the API rejects the token,
    /// or any error from fetching, templating or the cache.
    pub async fn parse(
        &self,
        inventory: &mut impl Inventory,
        cache: &mut dyn InventoryCache,
        use_cache: bool,
    ) -> Result<()> {
        let client = self.client().await?;

        let servers = match self.cached_servers(cache, use_cache)? {
            Some(servers) => servers,
            None => self.fetch_servers(&client).await?,
        };

        inventory.add_group(&self.config.group);
        for server in &servers {
            self.add_server(inventory, server)?;
        }

        self.update_cache(cache, use_cache, &servers)?;

        info!(
            group = %self.config.group,
            hosts = servers.len(),
            "Loaded Hetzner Cloud inventory"
        );
        Ok(())
    }
}
