// src/install/files.rs

//! File materialization from a descriptor's file manifest

use crate::command::{CommandRunner, shell_quote};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Targets with this extension are made executable
pub const SCRIPT_EXTENSION: &str = "sh";

const SCRATCH_PREFIX: &str = "vulpkg_file";

const FILE_MODE: u32 = 0o644;
const SCRIPT_MODE: u32 = 0o755;

fn target_mode(path: &Path) -> u32 {
    if is_script(path) {
        SCRIPT_MODE
    } else {
        FILE_MODE
    }
}

/// Resolve a manifest path against the package working directory
pub fn resolve_target(path: &str, working_dir: &Path) -> PathBuf {
    let target = Path::new(path);
    if target.is_absolute() {
        target.to_path_buf()
    } else {
        working_dir.join(target)
    }
}

fn is_script(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SCRIPT_EXTENSION)
}

/// Write every entry of `files`, stopping at the first one that cannot be
/// written even after the elevated fallback
///
/// Files written before a failure are kept.
pub fn create_all(
    runner: &dyn CommandRunner,
    files: &BTreeMap<String, String>,
    working_dir: &Path,
    elevate: bool,
) -> Result<()> {
    if files.is_empty() {
        return Ok(());
    }

    info!("Creating package files...");

    for (path, content) in files {
        let target = resolve_target(path, working_dir);
        create_one(runner, &target, content, working_dir, elevate)?;
    }

    Ok(())
}

fn create_one(
    runner: &dyn CommandRunner,
    target: &Path,
    content: &str,
    working_dir: &Path,
    elevate: bool,
) -> Result<()> {
    match write_direct(target, content) {
        Ok(()) => {
            info!("Created {}", target.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            if !elevate {
                warn!("Permission denied: {}", target.display());
                return Err(Error::PermissionDenied(target.to_path_buf()));
            }
            debug!("Direct write to {} denied, retrying elevated", target.display());
            write_elevated(runner, target, content, working_dir)?;
            info!("Created {} (elevated)", target.display());
            Ok(())
        }
        Err(e) => Err(Error::Io(e)),
    }
}

fn write_direct(target: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, content)?;
    if is_script(target) {
        fs::set_permissions(target, fs::Permissions::from_mode(SCRIPT_MODE))?;
    }
    Ok(())
}

/// Stage `content` in a scratch file under `working_dir` and copy it into
/// place with elevated commands
///
/// The target always ends up `0644`, or `0755` for scripts. `cp` keeps the
/// mode of an existing target, so the mode is set explicitly afterwards.
fn write_elevated(
    runner: &dyn CommandRunner,
    target: &Path,
    content: &str,
    working_dir: &Path,
) -> Result<()> {
    let quoted_target = shell_quote(&target.to_string_lossy());

    if let Some(parent) = target.parent().filter(|p| !p.exists()) {
        run_elevated(
            runner,
            &format!("mkdir -p {}", shell_quote(&parent.to_string_lossy())),
            target,
        )?;
    }

    let mut scratch = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempfile_in(working_dir)?;
    scratch.write_all(content.as_bytes())?;
    scratch.as_file().set_permissions(fs::Permissions::from_mode(FILE_MODE))?;
    scratch.as_file().sync_all()?;
    let scratch = scratch.into_temp_path();

    let copied = run_elevated(
        runner,
        &format!("cp {} {}", shell_quote(&scratch.to_string_lossy()), quoted_target),
        target,
    );
    if let Err(e) = scratch.close() {
        warn!("Failed to remove scratch file: {}", e);
    }
    copied?;

    run_elevated(
        runner,
        &format!("chmod {:o} {}", target_mode(target), quoted_target),
        target,
    )?;
    Ok(())
}

fn run_elevated(runner: &dyn CommandRunner, command: &str, target: &Path) -> Result<()> {
    let result = runner.run(command, true);
    if result.success {
        Ok(())
    } else {
        Err(Error::ExternalCommand {
            context: format!("Writing {}", target.display()),
            output: result.output.trim().to_string(),
        })
    }
}
