// src/db/models.rs

//! Ledger records
//!
//! The ledger is a flat JSON object keyed by package name:
//!
//! ```json
//! {
//!   "burpsuite": {
//!     "version": "2024.1",
//!     "install_dir": "/opt/vulpkg/burpsuite",
//!     "requires_sudo": true,
//!     "description": "Web security testing"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Install metadata for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub version: String,
    pub install_dir: PathBuf,
    #[serde(default)]
    pub requires_sudo: bool,
    #[serde(default)]
    pub description: String,
}

/// Every installed package, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&LedgerEntry> {
        self.entries.get(name)
    }

    /// Insert or overwrite the entry for `name`
    pub fn put(&mut self, name: impl Into<String>, entry: LedgerEntry) -> Option<LedgerEntry> {
        self.entries.insert(name.into(), entry)
    }

    pub fn remove(&mut self, name: &str) -> Option<LedgerEntry> {
        self.entries.remove(name)
    }

    /// Entries in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LedgerEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
