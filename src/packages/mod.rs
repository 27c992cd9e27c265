// src/packages/mod.rs

//! Package descriptor support for VulPKG
//!
//! A package is described by a JSON `.vulpkg` document naming its version,
//! OS-level dependencies, install script and file manifest.

pub mod descriptor;

pub use descriptor::{PackageDescriptor, validate_name};
