// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("vulpkg")
        .version(env!("CARGO_PKG_VERSION"))
        .author("VulPKG Contributors")
        .about("VulPKG - Vulpes Package Manager")
        .subcommand_required(false)
        .subcommand(
            Command::new("install")
                .about("Install a package")
                .arg(
                    Arg::new("package")
                        .required(true)
                        .help("Package name or path to .vulpkg file"),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove a package")
                .arg(Arg::new("package").required(true).help("Package name to remove")),
        )
        .subcommand(Command::new("list").about("List installed packages"))
        .subcommand(Command::new("available").about("List packages available in the repository"))
        .subcommand(
            Command::new("info")
                .about("Show package information")
                .arg(Arg::new("package").required(true).help("Package name")),
        )
        .subcommand(Command::new("version").about("Show version information"))
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("vulpkg.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
