// src/transaction.rs

//! Install and remove transactions
//!
//! An install walks a fixed sequence of states:
//!
//! ```text
//! Validating -> CheckingExisting -> PreparingDirectory -> InstallingDeps
//!            -> RunningScript -> WritingFiles -> Committed
//! ```
//!
//! and can drop to `Aborted` from any of them. The ledger is only written in
//! `Committed` (and by a completed remove), so a failed install never leaves a
//! ledger entry behind. Side effects of earlier steps (OS packages, files
//! outside the package directory) are not undone; a package directory created
//! by the failed transaction is discarded.

use crate::command::{CommandRunner, SystemCommandRunner, shell_quote};
use crate::config::{Config, DESCRIPTOR_EXTENSION};
use crate::db::{Ledger, LedgerEntry, LedgerStore};
use crate::error::{Error, Result};
use crate::install::{deps, files, script};
use crate::packages::{PackageDescriptor, validate_name};
use std::fmt;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Position of an install transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Validating,
    CheckingExisting,
    PreparingDirectory,
    InstallingDeps,
    RunningScript,
    WritingFiles,
    Committed,
    Aborted,
}

impl TransactionState {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionState::Validating => "descriptor validation",
            TransactionState::CheckingExisting => "reinstall check",
            TransactionState::PreparingDirectory => "package directory setup",
            TransactionState::InstallingDeps => "OS package installation",
            TransactionState::RunningScript => "installation script",
            TransactionState::WritingFiles => "file creation",
            TransactionState::Committed => "ledger commit",
            TransactionState::Aborted => "aborted transaction",
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Yes/no decision source for the reinstall prompt
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Asks on the terminal; anything but `y`/`yes` is a no
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        print!("{}", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

/// Tracks the current state of one install so failures can name their step
struct Transaction<'a> {
    package: &'a str,
    state: TransactionState,
}

impl<'a> Transaction<'a> {
    fn begin(package: &'a str) -> Self {
        debug!("[{}] {:?}", package, TransactionState::Validating);
        Self {
            package,
            state: TransactionState::Validating,
        }
    }

    fn enter(&mut self, state: TransactionState) {
        debug!("[{}] {:?} -> {:?}", self.package, self.state, state);
        self.state = state;
    }

    /// Move to `Aborted`, wrapping `err` with the step that produced it
    fn abort(&mut self, err: Error) -> Error {
        let step = self.state;
        self.enter(TransactionState::Aborted);
        Error::TransactionFailed {
            package: self.package.to_string(),
            step,
            source: Box::new(err),
        }
    }
}

/// Owns the ledger and sequences install/remove transactions
pub struct PackageManager {
    config: Config,
    store: LedgerStore,
    ledger: Ledger,
    runner: Box<dyn CommandRunner>,
    confirm: Box<dyn Confirm>,
}

impl PackageManager {
    /// Create the configured directories and load the ledger
    pub fn new(
        config: Config,
        runner: Box<dyn CommandRunner>,
        confirm: Box<dyn Confirm>,
    ) -> Result<Self> {
        config.init()?;
        let store = LedgerStore::new(&config.ledger_path);
        let ledger = store.load();
        debug!("Loaded ledger with {} package(s)", ledger.len());

        Ok(Self {
            config,
            store,
            ledger,
            runner,
            confirm,
        })
    }

    /// Manager running real commands and prompting on the terminal
    pub fn open(config: Config) -> Result<Self> {
        Self::new(
            config,
            Box::new(SystemCommandRunner::new()),
            Box::new(StdinConfirm),
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Installed packages in name order
    pub fn installed(&self) -> impl Iterator<Item = (&str, &LedgerEntry)> {
        self.ledger.iter()
    }

    pub fn info(&self, name: &str) -> Result<&LedgerEntry> {
        self.ledger
            .get(name)
            .ok_or_else(|| Error::NotInstalled(name.to_string()))
    }

    /// Map an `install` argument to a descriptor file: an existing path
    /// first, then `<repo_dir>/<name>.vulpkg`
    pub fn resolve_descriptor(&self, target: &str) -> Result<PathBuf> {
        let direct = Path::new(target);
        if direct.is_file() {
            return Ok(direct.to_path_buf());
        }

        if !target.contains('/') {
            let from_repo = self.config.repo_descriptor(target);
            if from_repo.is_file() {
                return Ok(from_repo);
            }
        }

        Err(Error::DescriptorNotFound(target.to_string()))
    }

    /// Descriptors available in the repository directory, in name order
    ///
    /// Files that fail to parse are skipped with a warning.
    pub fn available(&self) -> Result<Vec<PackageDescriptor>> {
        let mut descriptors = Vec::new();

        for dir_entry in fs::read_dir(&self.config.repo_dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DESCRIPTOR_EXTENSION) {
                continue;
            }
            match PackageDescriptor::from_path(&path) {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(descriptors)
    }

    /// Resolve, parse and install `target` (descriptor path or repository
    /// name), returning the installed package name with its entry
    pub fn install_from(&mut self, target: &str) -> Result<(String, LedgerEntry)> {
        let path = self.resolve_descriptor(target)?;
        let descriptor = PackageDescriptor::from_path(&path)?;
        let entry = self.install(&descriptor)?;
        Ok((descriptor.name, entry))
    }

    /// Run a full install transaction for `descriptor`
    pub fn install(&mut self, descriptor: &PackageDescriptor) -> Result<LedgerEntry> {
        let name = descriptor.name.as_str();
        let mut tx = Transaction::begin(name);

        validate(descriptor)?;
        info!("Installing {} v{}", name, descriptor.version);

        tx.enter(TransactionState::CheckingExisting);
        if let Some(existing) = self.ledger.get(name) {
            warn!("{} is already installed (v{})", name, existing.version);
            let prompt = format!(
                "{} is already installed (v{}). Do you want to reinstall? [y/N]: ",
                name, existing.version
            );
            if !self.confirm.confirm(&prompt) {
                tx.enter(TransactionState::Aborted);
                return Err(Error::Aborted(name.to_string()));
            }
            self.remove(name).map_err(|e| tx.abort(e))?;
        }

        tx.enter(TransactionState::PreparingDirectory);
        let install_dir = self.config.package_dir(name);
        let created_dir = !install_dir.exists();
        fs::create_dir_all(&install_dir).map_err(|e| tx.abort(e.into()))?;

        let elevate = descriptor.requires_sudo;
        if elevate && !self.runner.is_privileged() {
            warn!("{} requires sudo privileges; privileged steps will go through sudo", name);
        }

        if let Err(e) = self.run_steps(&mut tx, descriptor, &install_dir, elevate) {
            if created_dir {
                discard_dir(&install_dir);
            }
            return Err(tx.abort(e));
        }

        tx.enter(TransactionState::Committed);
        let entry = LedgerEntry {
            version: descriptor.version.clone(),
            install_dir,
            requires_sudo: descriptor.requires_sudo,
            description: descriptor.description_text().to_string(),
        };
        let mut next = self.ledger.clone();
        next.put(name, entry.clone());
        self.store.save(&next).map_err(|e| tx.abort(e))?;
        self.ledger = next;

        info!("Successfully installed {} v{}", name, entry.version);
        Ok(entry)
    }

    fn run_steps(
        &self,
        tx: &mut Transaction<'_>,
        descriptor: &PackageDescriptor,
        install_dir: &Path,
        elevate: bool,
    ) -> Result<()> {
        let runner = &*self.runner;

        tx.enter(TransactionState::InstallingDeps);
        deps::install_all(runner, &descriptor.os_packages, elevate)?;

        tx.enter(TransactionState::RunningScript);
        script::run(runner, &descriptor.install_script, install_dir, elevate)?;

        tx.enter(TransactionState::WritingFiles);
        files::create_all(runner, &descriptor.files, install_dir, elevate)?;

        Ok(())
    }

    /// Delete the package directory and its ledger entry
    pub fn remove(&mut self, name: &str) -> Result<LedgerEntry> {
        let entry = self
            .ledger
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotInstalled(name.to_string()))?;

        info!("Removing {} v{}", name, entry.version);
        self.remove_install_dir(&entry);

        let mut next = self.ledger.clone();
        next.remove(name);
        self.store.save(&next)?;
        self.ledger = next;

        info!("Successfully removed {}", name);
        Ok(entry)
    }

    /// Best effort: a missing directory is fine, anything else is logged
    fn remove_install_dir(&self, entry: &LedgerEntry) {
        let dir = &entry.install_dir;
        match fs::remove_dir_all(dir) {
            Ok(()) => info!("Removed {}", dir.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} already gone", dir.display());
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied && entry.requires_sudo => {
                let result = self
                    .runner
                    .run(&format!("rm -rf {}", shell_quote(&dir.to_string_lossy())), true);
                if result.success {
                    info!("Removed {} (elevated)", dir.display());
                } else {
                    warn!("Failed to remove {}: {}", dir.display(), result.output.trim());
                }
            }
            Err(e) => warn!("Failed to remove {}: {}", dir.display(), e),
        }
    }
}

/// Checks that need no side effects: a usable name and well-formed OS
/// package entries
fn validate(descriptor: &PackageDescriptor) -> Result<()> {
    validate_name(&descriptor.name)?;
    if descriptor.version.trim().is_empty() {
        return Err(Error::Validation(format!(
            "{}: version is empty",
            descriptor.name
        )));
    }
    for entry in &descriptor.os_packages {
        deps::OsPackage::parse(entry)?;
    }
    Ok(())
}

fn discard_dir(dir: &Path) {
    match fs::remove_dir_all(dir) {
        Ok(()) => debug!("Discarded {}", dir.display()),
        Err(e) => warn!("Failed to discard {}: {}", dir.display(), e),
    }
}
