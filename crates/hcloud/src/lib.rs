//! Hetzner Cloud API client and shared helpers.
//!
//! This crate provides the typed API client used by the Hetzner Cloud
//! inventory, together with the small helpers the modules share: SSH key
//! fingerprints, deprecation and experimental warnings, IP address
//! normalization and the template filters.
//!
//! # Example
//!
//! ```rust,ignore
//! use hcloud::{Client, ClientConfig, ListParams};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hcloud::ClientError> {
//!     let client = Client::new(ClientConfig::new("token"))?;
//!
//!     let servers = client
//!         .servers()
//!         .get_all(&ListParams::default().label_selector("env=prod"))
//!         .await?;
//!
//!     let network = client.networks().get_by_name_or_id("backend").await?;
//!     println!("{} servers, network {}", servers.len(), network.id);
//!
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actions;
pub mod backoff;
mod client;
pub mod deprecation;
mod error;
pub mod experimental;
pub mod filters;
pub mod ipaddress;
pub mod models;
pub mod resources;
pub mod ssh;
pub mod warn;

pub use backoff::Backoff;
pub use client::{CachedSession, Client, ClientConfig, DEFAULT_ENDPOINT};
pub use error::ClientError;
pub use resources::{ListParams, Lookup, ResourceClient, ResourceKind};
pub use warn::Warn;
