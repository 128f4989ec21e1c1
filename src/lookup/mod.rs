//! External inventory lookups.
//!
//! Lookups resolve synthesis-time queries against systems tejer does not
//! own ("find the network by name", "find the DNS zone by domain"). The
//! provider is a seam: the CLI ships a static YAML-backed inventory, an
//! embedding provisioning engine can plug in its own. A failed lookup is
//! an error and is never retried or cached here.

use crate::core::error::{LookupError, SynthError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// External inventory query seam.
pub trait LookupProvider {
    fn lookup(&self, catalog: &str, key: &str) -> Result<serde_yaml_ng::Value, LookupError>;
}

/// Inventory with no entries — every lookup fails.
pub struct EmptyInventory;

impl LookupProvider for EmptyInventory {
    fn lookup(&self, catalog: &str, key: &str) -> Result<serde_yaml_ng::Value, LookupError> {
        Err(LookupError {
            catalog: catalog.to_string(),
            key: key.to_string(),
            reason: "no inventory loaded".to_string(),
        })
    }
}

/// Static inventory loaded from a YAML file: catalog → key → value.
///
/// ```yaml
/// networks:
///   prod: vpc-0a1b2c
/// dns-zones:
///   example.com: Z0123456789
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticInventory {
    catalogs: IndexMap<String, IndexMap<String, serde_yaml_ng::Value>>,
}

impl StaticInventory {
    /// Parse an inventory from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SynthError> {
        serde_yaml_ng::from_str(yaml)
            .map_err(|e| SynthError::Parse(format!("inventory parse error: {}", e)))
    }

    /// Load an inventory from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, SynthError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SynthError::Parse(format!("cannot read inventory {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Insert an entry, creating the catalog if needed.
    pub fn insert(&mut self, catalog: &str, key: &str, value: serde_yaml_ng::Value) {
        self.catalogs
            .entry(catalog.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}

impl LookupProvider for StaticInventory {
    fn lookup(&self, catalog: &str, key: &str) -> Result<serde_yaml_ng::Value, LookupError> {
        let entries = self.catalogs.get(catalog).ok_or_else(|| LookupError {
            catalog: catalog.to_string(),
            key: key.to_string(),
            reason: "unknown catalog".to_string(),
        })?;
        entries.get(key).cloned().ok_or_else(|| LookupError {
            catalog: catalog.to_string(),
            key: key.to_string(),
            reason: "key not found".to_string(),
        })
    }
}
