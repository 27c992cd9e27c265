// src/db/mod.rs

//! Installed-package ledger persistence
//!
//! The ledger is a single JSON document. It is loaded once per run and
//! rewritten as a whole after every committed install or remove:
//! - Loading never fails; unreadable or corrupt state is an empty ledger
//! - Saving writes a sibling temp file and renames it over the ledger, so a
//!   crash leaves either the old or the new document, never a torn one
//!
//! The saved document is `0644` so unprivileged `list`/`info` can read a
//! ledger written by root.
//!
//! There is no locking. Two concurrent invocations against the same ledger
//! path race and the last writer wins.

pub mod models;

pub use models::{Ledger, LedgerEntry};

use crate::error::Result;
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const LEDGER_MODE: u32 = 0o644;

/// Reads and writes the ledger document at a fixed path
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the ledger, treating a missing or corrupt document as empty
    pub fn load(&self) -> Ledger {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No ledger at {}, starting empty", self.path.display());
                return Ledger::new();
            }
            Err(e) => {
                warn!("Cannot read ledger {}: {}; treating as empty", self.path.display(), e);
                return Ledger::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!("Corrupt ledger {}: {}; treating as empty", self.path.display(), e);
                Ledger::new()
            }
        }
    }

    /// Atomically replace the persisted ledger with `ledger`
    pub fn save(&self, ledger: &Ledger) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, ledger)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().set_permissions(fs::Permissions::from_mode(LEDGER_MODE))?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!("Saved ledger with {} package(s) to {}", ledger.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.put(
            "burpsuite",
            LedgerEntry {
                version: "2024.1".to_string(),
                install_dir: PathBuf::from("/opt/vulpkg/burpsuite"),
                requires_sudo: true,
                description: "Web security testing".to_string(),
            },
        );
        ledger.put(
            "ffuf",
            LedgerEntry {
                version: "2.1.0".to_string(),
                install_dir: PathBuf::from("/opt/vulpkg/ffuf"),
                requires_sudo: false,
                description: String::new(),
            },
        );
        ledger
    }

    #[test]
    fn test_load_missing_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(temp_dir.path().join("installed.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_corrupt_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("installed.json");
        fs::write(&path, "{ \"half\": ").unwrap();

        let store = LedgerStore::new(&path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(temp_dir.path().join("state/installed.json"));

        let ledger = sample();
        store.save(&ledger).unwrap();
        assert_eq!(store.load(), ledger);
    }

    #[test]
    fn test_save_overwrites_and_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(temp_dir.path().join("installed.json"));

        store.save(&sample()).unwrap();
        let mut ledger = store.load();
        ledger.remove("ffuf");
        store.save(&ledger).unwrap();

        assert_eq!(store.load().len(), 1);
        let files: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1, "only the ledger itself should remain");
    }

    #[test]
    fn test_saved_ledger_is_world_readable() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("installed.json");
        let store = LedgerStore::new(&path);

        store.save(&sample()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);

        // Still readable after an overwrite
        store.save(&Ledger::new()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }
}
