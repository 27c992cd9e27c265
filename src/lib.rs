// src/lib.rs

//! VulPKG Package Manager
//!
//! Package manager for Vulpes OS. Packages are described by JSON `.vulpkg`
//! descriptors and installed by a single transaction per package.
//!
//! # Architecture
//!
//! - Descriptors: name, version, OS dependencies, install script, file manifest
//! - Transactions: validate, install deps, run script, write files, commit
//! - Ledger: one JSON document of installed packages, replaced atomically
//! - Explicit privileges: every external command states whether it needs sudo

pub mod command;
pub mod config;
pub mod db;
mod error;
pub mod install;
pub mod packages;
pub mod transaction;

pub use config::Config;
pub use error::{Error, Result};
pub use transaction::{Confirm, PackageManager, StdinConfirm, TransactionState};
