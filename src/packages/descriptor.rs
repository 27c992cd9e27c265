// src/packages/descriptor.rs

//! `.vulpkg` package descriptor

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Fields that must be present (as strings) before anything else is looked at
pub const REQUIRED_FIELDS: &[&str] = &["name", "version"];

/// Declarative description of one package installation
///
/// Unknown keys are ignored so descriptors can carry metadata for other
/// tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub requires_sudo: bool,

    /// OS packages to `apk add`, optionally prefixed with `edge:`
    #[serde(default, alias = "alpine_packages", deserialize_with = "null_as_default")]
    pub os_packages: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub install_script: String,

    /// Target path -> file content; relative paths land in the package directory
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: BTreeMap<String, String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// An explicit `null` means the same as leaving the key out
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl PackageDescriptor {
    /// Parse a descriptor from JSON text
    ///
    /// `source` is only used in error messages.
    pub fn parse(raw: &str, source: &str) -> Result<Self> {
        let parse_error = |reason: String| Error::Parse {
            path: source.to_string(),
            reason,
        };

        let value: Value = serde_json::from_str(raw).map_err(|e| parse_error(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| parse_error("expected a JSON object".to_string()))?;

        for field in REQUIRED_FIELDS {
            match object.get(*field) {
                None | Some(Value::Null) => {
                    return Err(Error::Validation(format!("missing required field: {}", field)));
                }
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(Error::Validation(format!("field '{}' must be a string", field)));
                }
            }
        }

        serde_json::from_value(value).map_err(|e| parse_error(e.to_string()))
    }

    /// Read and parse a descriptor file
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!("Loading package descriptor: {}", path.display());

        let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::DescriptorNotFound(path.display().to_string()),
            _ => Error::Io(e),
        })?;

        Self::parse(&raw, &path.display().to_string())
    }

    /// Description text recorded in the ledger (empty when absent)
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

/// Check that `name` can serve as a ledger key and a single directory
/// component under the install root
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("package name is empty".to_string()));
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\0') {
        return Err(Error::Validation(format!(
            "package name '{}' is not a valid directory name",
            name
        )));
    }
    Ok(())
}
