// src/command.rs

//! External command execution
//!
//! Every side effect outside the process (apk, install scripts, elevated
//! copies) goes through a [`CommandRunner`]. Elevation is requested per call
//! with an explicit `elevate` flag; the runner decides whether a `sudo`
//! prefix is actually needed.

use std::process::{Command, Stdio};
use tracing::debug;

/// Shell used to interpret command lines
const SHELL: &str = "/bin/sh";

/// Prefix prepended to elevated commands when not already root
const ELEVATE_PREFIX: &str = "sudo";

/// Outcome of one external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// stdout on success, stderr on failure
    pub output: String,
}

impl CommandOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Runs shell command lines. Never fails: callers branch on
/// [`CommandOutput::success`].
pub trait CommandRunner {
    fn run(&self, command: &str, elevate: bool) -> CommandOutput;

    /// Whether the current process already has administrative privileges
    fn is_privileged(&self) -> bool;
}

/// Runner backed by `/bin/sh -c`
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    privileged: bool,
}

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self {
            privileged: is_root(),
        }
    }

    fn command_line(&self, command: &str, elevate: bool) -> String {
        if elevate && !self.privileged {
            format!("{} {}", ELEVATE_PREFIX, command)
        } else {
            command.to_string()
        }
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, command: &str, elevate: bool) -> CommandOutput {
        let line = self.command_line(command, elevate);
        debug!("Running: {}", line);

        // stdin stays attached so install scripts (and sudo) can prompt
        let result = Command::new(SHELL)
            .arg("-c")
            .arg(&line)
            .stdin(Stdio::inherit())
            .output();

        match result {
            Ok(output) if output.status.success() => {
                CommandOutput::ok(String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                debug!("Command exited with {}", output.status);
                CommandOutput::failed(String::from_utf8_lossy(&output.stderr))
            }
            Err(e) => CommandOutput::failed(format!("failed to spawn {}: {}", SHELL, e)),
        }
    }

    fn is_privileged(&self) -> bool {
        self.privileged
    }
}

/// Effective uid check
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

/// Quote `value` for safe interpolation into a POSIX shell command line
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+=:,@".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
