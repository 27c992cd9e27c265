// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io;
use tracing::info;
use vulpkg::{Config, PackageManager};

#[derive(Parser)]
#[command(name = "vulpkg")]
#[command(author, version, about = "VulPKG - Vulpes Package Manager", long_about = None)]
#[command(after_help = "Examples:
  vulpkg install burpsuite          Install package from repository
  vulpkg install package.vulpkg     Install from .vulpkg file
  vulpkg remove burpsuite           Remove installed package
  vulpkg list                       List installed packages
  vulpkg info burpsuite             Show package information")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a package
    Install {
        /// Package name or path to .vulpkg file
        package: String,
    },
    /// Remove a package
    Remove {
        /// Package name to remove
        package: String,
    },
    /// List installed packages
    List,
    /// List packages available in the repository
    Available,
    /// Show package information
    Info {
        /// Package name
        package: String,
    },
    /// Show version information
    Version,
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        shell: Shell,
    },
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let command = match cli.command {
        Some(command) => command,
        None => {
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    // Only commands that touch installed state need the directories and ledger
    let open = || PackageManager::open(Config::from_env());

    match command {
        Commands::Install { package } => {
            info!("Installing package: {}", package);
            let mut manager = open()?;
            let (name, entry) = manager.install_from(&package)?;
            println!("Installed package: {} version {}", name, entry.version);
            println!("  Location: {}", entry.install_dir.display());
        }
        Commands::Remove { package } => {
            info!("Removing package: {}", package);
            let mut manager = open()?;
            let entry = manager.remove(&package)?;
            println!("Removed package: {} version {}", package, entry.version);
        }
        Commands::List => {
            let manager = open()?;
            if manager.ledger().is_empty() {
                println!("No packages installed.");
            } else {
                println!("Installed packages:");
                for (name, entry) in manager.installed() {
                    println!("  {} (v{})", name, entry.version);
                    if !entry.description.is_empty() {
                        println!("    {}", entry.description);
                    }
                    println!("    Location: {}", entry.install_dir.display());
                }
                println!("\nTotal: {} package(s)", manager.ledger().len());
            }
        }
        Commands::Available => {
            let manager = open()?;
            let descriptors = manager.available()?;
            if descriptors.is_empty() {
                println!(
                    "No packages found in {}.",
                    manager.config().repo_dir.display()
                );
            } else {
                println!("Available packages:");
                for descriptor in &descriptors {
                    let marker = if manager.ledger().is_installed(&descriptor.name) {
                        " [installed]"
                    } else {
                        ""
                    };
                    println!("  {} (v{}){}", descriptor.name, descriptor.version, marker);
                    if !descriptor.description_text().is_empty() {
                        println!("    {}", descriptor.description_text());
                    }
                }
                println!("\nTotal: {} package(s)", descriptors.len());
            }
        }
        Commands::Info { package } => {
            let manager = open()?;
            let entry = manager.info(&package)?;
            println!("Package: {}", package);
            println!("  Version: {}", entry.version);
            let description = if entry.description.is_empty() {
                "N/A"
            } else {
                entry.description.as_str()
            };
            println!("  Description: {}", description);
            println!("  Install Directory: {}", entry.install_dir.display());
            println!("  Requires Sudo: {}", entry.requires_sudo);
        }
        Commands::Version => {
            println!("VulPKG v{}", env!("CARGO_PKG_VERSION"));
            println!("Package manager for Vulpes OS");
            println!("{}", env!("CARGO_PKG_REPOSITORY"));
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "vulpkg", &mut io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_install() {
        let cli = Cli::try_parse_from(["vulpkg", "install", "burpsuite"]).unwrap();
        match cli.command {
            Some(Commands::Install { package }) => assert_eq!(package, "burpsuite"),
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_install_requires_package() {
        assert!(Cli::try_parse_from(["vulpkg", "install"]).is_err());
    }

    #[test]
    fn test_parse_completions_shell() {
        let cli = Cli::try_parse_from(["vulpkg", "completions", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Completions { shell: Shell::Bash })
        ));
    }
}
