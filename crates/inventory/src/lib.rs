//! Hetzner Cloud dynamic inventory.
//!
//! Reads servers from the Hetzner Cloud API and turns them into inventory
//! hosts with `hcloud_` prefixed host variables, optional hostname templates,
//! composed variables, conditional and keyed groups, and a result cache.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use hcloud_inventory::{InventoryData, InventoryPlugin};
//!
//! let plugin = InventoryPlugin::from_file(Path::new("prod.hcloud.yml"))?;
//! let mut cache = plugin.config().cache_backend();
//! let mut inventory = InventoryData::new();
//! plugin.parse(&mut inventory, cache.as_mut(), true).await?;
//! println!("{}", inventory.to_list_json());
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod constructed;
mod error;
pub mod filter;
pub mod inventory;
pub mod plugin;
pub mod server;
pub mod template;

pub use cache::{cache_key, InventoryCache, JsonFileCache, MemoryCache};
pub use config::{verify_file, ConnectWith, InventoryConfig, KeyedGroup};
pub use error::{InventoryError, Result};
pub use inventory::{Inventory, InventoryData};
pub use plugin::{InventoryPlugin, PLUGIN_NAME};
pub use server::{InventoryPrivateNetwork, InventoryServer};
