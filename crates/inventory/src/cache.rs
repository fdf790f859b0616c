//! Inventory cache backends.
//!
//! The cache stores the shaped servers of one inventory source, keyed by
//! [`cache_key`]. Entries are never overwritten while they are valid, so a
//! cached result does not get its lifetime extended by being read.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::server::InventoryServer;

/// Storage for inventory results.
pub trait InventoryCache {
    /// The servers stored under `key`, if present and not expired.
    ///
    /// # Errors
    /// Returns error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<Vec<InventoryServer>>>;

    /// Whether a valid entry exists for `key`.
    ///
    /// # Errors
    /// Returns error if the backend cannot be read.
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Store servers under `key`.
    ///
    /// # Errors
    /// Returns error if the backend cannot be written.
    fn set(&mut self, key: &str, servers: &[InventoryServer]) -> Result<()>;
}

fn short_sha1(value: &str) -> String {
    let mut digest = hex::encode(Sha1::digest(value.as_bytes()));
    digest.truncate(5);
    digest
}

/// Cache key of an inventory source: the plugin name followed by short
/// hashes of the plugin name and the source path.
#[must_use]
pub fn cache_key(plugin_name: &str, path: &Path) -> String {
    format!(
        "{plugin_name}_{}s_{}",
        short_sha1(plugin_name),
        short_sha1(&path.to_string_lossy())
    )
}

/// Cache living as long as the value.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, Vec<InventoryServer>>,
}

impl InventoryCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<InventoryServer>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, servers: &[InventoryServer]) -> Result<()> {
        self.entries.insert(key.to_string(), servers.to_vec());
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    saved_at: DateTime<Utc>,
    servers: Vec<InventoryServer>,
}

/// One JSON file per key in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    dir: PathBuf,
    prefix: String,
    timeout: u64,
}

impl JsonFileCache {
    /// Create a cache in `dir`. Entries older than `timeout` seconds are
    /// ignored, 0 keeps them forever.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, timeout: u64) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            timeout,
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{key}", self.prefix))
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        if self.timeout == 0 {
            return false;
        }
        i64::try_from(self.timeout)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .is_some_and(|timeout| now - entry.saved_at > timeout)
    }

    fn read(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file {}", path.display()))?;
        match serde_json::from_str(&content) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt cache file");
                Ok(None)
            }
        }
    }
}

impl InventoryCache for JsonFileCache {
    fn get(&self, key: &str) -> Result<Option<Vec<InventoryServer>>> {
        let Some(entry) = self.read(key)? else {
            return Ok(None);
        };
        if self.is_expired(&entry, Utc::now()) {
            debug!(key, saved_at = %entry.saved_at, "Cache entry expired");
            return Ok(None);
        }
        Ok(Some(entry.servers))
    }

    fn set(&mut self, key: &str, servers: &[InventoryServer]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache directory {}", self.dir.display()))?;

        let entry = CacheEntry {
            saved_at: Utc::now(),
            servers: servers.to_vec(),
        };
        let content = serde_json::to_string(&entry).context("Failed to serialize cache entry")?;

        let path = self.path(key);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write cache file {}", path.display()))?;

        debug!(path = %path.display(), count = servers.len(), "Saved inventory cache");
        Ok(())
    }
}
