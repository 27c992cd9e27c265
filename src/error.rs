// src/error.rs

use crate::transaction::TransactionState;
use std::path::PathBuf;
use thiserror::Error;

/// Core error types for VulPKG
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Descriptor is missing a required field or carries an unusable value
    #[error("Invalid package descriptor: {0}")]
    Validation(String),

    /// Descriptor could not be parsed at all
    #[error("Invalid package file {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Neither a descriptor file nor a repository entry matched
    #[error("Package file not found: {0}")]
    DescriptorNotFound(String),

    /// An external command exited non-zero
    #[error("{context} failed: {output}")]
    ExternalCommand { context: String, output: String },

    /// A direct write was denied and elevation is not permitted
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// Operation on a package that is not in the ledger
    #[error("Package not installed: {0}")]
    NotInstalled(String),

    /// User declined to continue
    #[error("Installation of {0} aborted")]
    Aborted(String),

    /// A transaction step failed; names the package and the step
    #[error("{step} failed for {package}: {source}")]
    TransactionFailed {
        package: String,
        step: TransactionState,
        #[source]
        source: Box<Error>,
    },
}

/// Result type alias using VulPKG's Error type
pub type Result<T> = std::result::Result<T, Error>;
