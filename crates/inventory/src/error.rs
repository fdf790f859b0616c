//! Error types for the dynamic inventory.

use std::path::PathBuf;

use hcloud::ipaddress::IpAddressError;
use hcloud::ClientError;
use thiserror::Error;

/// Inventory result type.
pub type Result<T> = std::result::Result<T, InventoryError>;

/// Errors that can occur while building the inventory.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// The API rejected the token while listing locations.
    #[error("Invalid Hetzner Cloud API Token.")]
    InvalidToken(#[source] ClientError),

    /// The configuration file is not usable.
    #[error("Invalid inventory configuration: {0}")]
    Config(String),

    /// The configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML.
    #[error("Failed to parse inventory configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An API request failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A template could not be rendered.
    #[error("Failed to render template '{template}': {message}")]
    Template {
        /// The template source.
        template: String,
        /// Rendering error.
        message: String,
    },

    /// A keyed group key or compose variable is missing in strict mode.
    #[error("Could not find variable '{0}' for host")]
    MissingVariable(String),

    /// The address selected by `connect_with` is not available.
    #[error("{0}")]
    HostAddressUnavailable(String),

    /// The public IPv6 network of a server is malformed.
    #[error(transparent)]
    IpAddress(#[from] IpAddressError),

    /// Host variables could not be serialized.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The inventory cache failed.
    #[error(transparent)]
    Cache(#[from] anyhow::Error),
}
