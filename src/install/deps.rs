// src/install/deps.rs

//! OS-level dependency installation through `apk`

use crate::command::{CommandRunner, shell_quote};
use crate::error::{Error, Result};
use std::fmt;
use tracing::{info, warn};

/// Marker selecting the edge repository for a single entry
pub const EDGE_PREFIX: &str = "edge:";

/// Alpine edge community repository
pub const EDGE_REPOSITORY: &str = "http://dl-cdn.alpinelinux.org/alpine/edge/community";

/// One OS package entry from a descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsPackage {
    Default(String),
    Edge(String),
}

impl OsPackage {
    pub fn parse(entry: &str) -> Result<Self> {
        let (name, edge) = match entry.strip_prefix(EDGE_PREFIX) {
            Some(rest) => (rest.trim(), true),
            None => (entry.trim(), false),
        };

        if name.is_empty() {
            return Err(Error::Validation(format!("empty OS package entry: '{}'", entry)));
        }

        Ok(if edge {
            OsPackage::Edge(name.to_string())
        } else {
            OsPackage::Default(name.to_string())
        })
    }

    pub fn name(&self) -> &str {
        match self {
            OsPackage::Default(name) | OsPackage::Edge(name) => name,
        }
    }

    /// `apk` invocation installing this package
    pub fn install_command(&self) -> String {
        match self {
            OsPackage::Default(name) => format!("apk add {}", shell_quote(name)),
            OsPackage::Edge(name) => format!(
                "apk add --repository={} {}",
                EDGE_REPOSITORY,
                shell_quote(name)
            ),
        }
    }
}

impl fmt::Display for OsPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsPackage::Default(name) => write!(f, "{}", name),
            OsPackage::Edge(name) => write!(f, "{}{}", EDGE_PREFIX, name),
        }
    }
}

/// Install `packages` in order, stopping at the first failure
///
/// Dependencies installed before a failure are left in place.
pub fn install_all(runner: &dyn CommandRunner, packages: &[String], elevate: bool) -> Result<()> {
    if packages.is_empty() {
        return Ok(());
    }

    // Reject bad entries before touching the system
    let parsed = packages
        .iter()
        .map(|p| OsPackage::parse(p))
        .collect::<Result<Vec<_>>>()?;

    info!("Installing OS packages: {}", packages.join(", "));

    for package in &parsed {
        let result = runner.run(&package.install_command(), elevate);
        if !result.success {
            warn!("Failed to install {}: {}", package, result.output.trim());
            return Err(Error::ExternalCommand {
                context: format!("Installing OS package {}", package),
                output: result.output.trim().to_string(),
            });
        }
        info!("Installed {}", package);
    }

    Ok(())
}
