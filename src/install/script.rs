// src/install/script.rs

//! Install script execution

use crate::command::{CommandRunner, shell_quote};
use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Interpreter written into the generated script
pub const INTERPRETER: &str = "#!/bin/sh";

const SCRIPT_PREFIX: &str = "install_script";
const SCRIPT_SUFFIX: &str = ".sh";

/// Run `script` from inside `working_dir`
///
/// The script is written to a temporary executable in `working_dir`, which is
/// removed again whether the script succeeds or not.
pub fn run(
    runner: &dyn CommandRunner,
    script: &str,
    working_dir: &Path,
    elevate: bool,
) -> Result<()> {
    if script.trim().is_empty() {
        return Ok(());
    }

    info!("Running installation script...");

    let mut file = tempfile::Builder::new()
        .prefix(SCRIPT_PREFIX)
        .suffix(SCRIPT_SUFFIX)
        .tempfile_in(working_dir)?;

    writeln!(file, "{}", INTERPRETER)?;
    writeln!(file, "cd {} || exit 1", shell_quote(&working_dir.to_string_lossy()))?;
    file.write_all(script.as_bytes())?;
    if !script.ends_with('\n') {
        writeln!(file)?;
    }
    file.as_file().sync_all()?;

    // Close the write handle before exec, otherwise the kernel reports ETXTBSY.
    // The TempPath still deletes the file when dropped.
    let script_path = file.into_temp_path();
    fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755))?;

    debug!("Wrote install script to {}", script_path.display());
    let result = runner.run(&shell_quote(&script_path.to_string_lossy()), elevate);

    if let Err(e) = script_path.close() {
        warn!("Failed to remove temporary install script: {}", e);
    }

    if !result.success {
        warn!("Installation script failed: {}", result.output.trim());
        return Err(Error::ExternalCommand {
            context: "Installation script".to_string(),
            output: result.output.trim().to_string(),
        });
    }

    info!("Installation script completed");
    Ok(())
}
