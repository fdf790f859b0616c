//! Client side server filters.

use hcloud::models::{Network, Server};

use crate::config::InventoryConfig;

/// Keep the servers matching the network, location, server type and image
/// filters, in this order. Unset filters keep every server; the input order
/// is preserved.
#[must_use]
pub fn filter_servers(
    mut servers: Vec<Server>,
    config: &InventoryConfig,
    network: Option<&Network>,
) -> Vec<Server> {
    if let Some(network) = network {
        servers.retain(|s| s.private_net.iter().any(|p| p.network == network.id));
    }

    if !config.locations.is_empty() {
        servers.retain(|s| config.locations.contains(&s.datacenter.location.name));
    }

    if !config.types.is_empty() {
        servers.retain(|s| config.types.contains(&s.server_type.name));
    }

    if !config.images.is_empty() {
        servers.retain(|s| {
            s.image
                .as_ref()
                .is_some_and(|image| config.images.contains(&image.os_flavor))
        });
    }

    servers
}
