//! dirapp: keep IIS applications in step with marker files on disk.
//!
//! # Usage
//!
//! ```text
//! dirapp install --name <name> --site <site> --paths <glob> [--interval <ms>] [--depth <n>] [--start]
//! dirapp uninstall --name <name>
//! dirapp watch --profile <name>
//! dirapp watch --profile-file <file>
//! dirapp watch --site <site> --paths <glob> [--interval <ms>] [--depth <n>]
//! dirapp sites [--json]
//! dirapp profile list|show <name>
//! ```

mod commands;
mod console;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use commands::{
    install::InstallArgs, profile::ProfileCommand, sites::SitesArgs, uninstall::UninstallArgs,
    watch::WatchArgs,
};
use dirapp_core::{Backend, StoreOptions};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "dirapp",
    version,
    about = "Register IIS applications for directories that contain a marker file",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save a watch profile and register it to start at boot.
    Install(InstallArgs),

    /// Remove a watcher's scheduled task and profile.
    Uninstall(UninstallArgs),

    /// Run a watcher in the foreground until ctrl-c.
    Watch(WatchArgs),

    /// List IIS sites with their root directory and pool.
    Sites(SitesArgs),

    /// Inspect saved watch profiles.
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
}

// ---------------------------------------------------------------------------
// Shared arguments
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `Backend` from CLI args.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendArg(pub Backend);

impl FromStr for BackendArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "appcmd" => Ok(Self(Backend::Appcmd)),
            "direct" => Ok(Self(Backend::Direct)),
            other => Err(format!(
                "unknown backend '{other}'; expected: appcmd, direct"
            )),
        }
    }
}

impl fmt::Display for BackendArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<BackendArg> for Backend {
    fn from(b: BackendArg) -> Self {
        b.0
    }
}

/// Where the configuration lives and how it is changed.
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Mutation backend: appcmd | direct. Defaults to appcmd.
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<BackendArg>,

    /// Path to applicationHost.config.
    #[arg(long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Path to appcmd.exe.
    #[arg(long = "appcmd", value_name = "FILE")]
    pub appcmd_path: Option<PathBuf>,
}

impl StoreArgs {
    pub fn store_options(&self) -> StoreOptions {
        let defaults = StoreOptions::default();
        StoreOptions {
            backend: self.backend.map(Backend::from).unwrap_or(defaults.backend),
            config_path: self.config_path.clone().unwrap_or(defaults.config_path),
            appcmd_path: self.appcmd_path.clone().unwrap_or(defaults.appcmd_path),
            ..defaults
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Install(args) => args.run(),
        Commands::Uninstall(args) => args.run(),
        Commands::Watch(args) => args.run(),
        Commands::Sites(args) => args.run(),
        Commands::Profile { command } => commands::profile::run(command),
    }
}
