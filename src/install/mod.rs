// src/install/mod.rs

//! Side-effecting install steps
//!
//! Each step is a free function over a [`crate::command::CommandRunner`] so
//! the transaction layer can sequence them and tests can drive them with a
//! recording runner:
//! - `deps`: OS packages through `apk`
//! - `script`: the descriptor's install script
//! - `files`: the descriptor's file manifest

pub mod deps;
pub mod files;
pub mod script;
