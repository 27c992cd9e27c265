// src/config.rs

//! Filesystem layout for VulPKG
//!
//! All roots the tool touches live in a [`Config`] that is handed to the
//! [`crate::transaction::PackageManager`] at construction. Nothing reads
//! ambient path constants after that point, so tests can point a manager at
//! an isolated temporary prefix.

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Repository of `.vulpkg` descriptor files
pub const DEFAULT_REPO_DIR: &str = "/var/lib/vulpkg/repo";

/// Installed-package ledger
pub const DEFAULT_LEDGER_PATH: &str = "/var/lib/vulpkg/installed.json";

/// Root under which each package gets its own directory
pub const DEFAULT_INSTALL_ROOT: &str = "/opt/vulpkg";

/// Environment variable that re-roots every path under a prefix
pub const ROOT_ENV: &str = "VULPKG_ROOT";

/// Descriptor file extension used for repository lookups
pub const DESCRIPTOR_EXTENSION: &str = "vulpkg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub repo_dir: PathBuf,
    pub install_root: PathBuf,
    pub ledger_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_dir: PathBuf::from(DEFAULT_REPO_DIR),
            install_root: PathBuf::from(DEFAULT_INSTALL_ROOT),
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
        }
    }
}

impl Config {
    /// Place the default layout under `root` (e.g. a chroot or staging tree)
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let rebase = |p: &str| root.join(p.trim_start_matches('/'));

        Self {
            repo_dir: rebase(DEFAULT_REPO_DIR),
            install_root: rebase(DEFAULT_INSTALL_ROOT),
            ledger_path: rebase(DEFAULT_LEDGER_PATH),
        }
    }

    /// Default layout, re-rooted when `VULPKG_ROOT` is set and non-empty
    pub fn from_env() -> Self {
        match std::env::var_os(ROOT_ENV) {
            Some(root) if !root.is_empty() => {
                debug!("Using {}={}", ROOT_ENV, Path::new(&root).display());
                Self::with_root(root)
            }
            _ => Self::default(),
        }
    }

    /// Working directory owned by `name` for its installed lifetime
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.install_root.join(name)
    }

    /// Repository descriptor path for a bare package name
    pub fn repo_descriptor(&self, name: &str) -> PathBuf {
        self.repo_dir.join(format!("{}.{}", name, DESCRIPTOR_EXTENSION))
    }

    /// Create every directory this layout needs. Idempotent.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.repo_dir)?;
        fs::create_dir_all(&self.install_root)?;
        if let Some(parent) = self.ledger_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
