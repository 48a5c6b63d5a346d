//! `dirapp install`: validate, back up, save the profile, register the task.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use dirapp_core::profile::{self, WatchProfile, DEFAULT_INTERVAL_MS, UNLIMITED_DEPTH};
use dirapp_core::{paths, store, ConfigStore, WritePolicy};
use dirapp_daemon::install_service;
use dirapp_daemon::service::{task_command, task_name};

use crate::console::ConsoleLog;
use crate::StoreArgs;

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Service name; letters and dashes only.
    #[arg(long)]
    pub name: String,

    /// IIS site whose applications are managed.
    #[arg(long)]
    pub site: String,

    /// Glob of marker files, relative to the site root or absolute.
    #[arg(long)]
    pub paths: String,

    /// Polling interval in milliseconds.
    #[arg(long, default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval: u64,

    /// Subdirectory levels to traverse; -1 is unlimited.
    #[arg(long, default_value_t = UNLIMITED_DEPTH, allow_hyphen_values = true)]
    pub depth: i32,

    /// Start the watcher right after registering it.
    #[arg(long)]
    pub start: bool,

    /// Keep going when a direct rewrite of the file fails.
    #[arg(long)]
    pub log_write_failures: bool,

    /// Only save the profile; do not register a scheduled task.
    #[arg(long)]
    pub no_service: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

impl InstallArgs {
    pub fn run(self) -> Result<()> {
        let profile = self.profile();
        profile.validate().context("invalid install arguments")?;

        let options = profile.store_options();
        let mut store = store::open(
            &dirapp_core::StoreOptions {
                backup_before_mutation: false,
                ..options
            },
            Arc::new(ConsoleLog),
        )
        .context("failed to load IIS configuration")?;
        let root = store
            .default_application(&profile.site)
            .with_context(|| format!("site '{}' cannot be watched", profile.site))?;
        store
            .save_backup()
            .context("failed to back up IIS configuration")?;

        let saved = profile::save_profile(&profile).context("failed to save watch profile")?;
        println!("saved profile: {}", saved.display());

        let binary = std::env::current_exe().context("could not locate the dirapp binary")?;
        let command = task_command(&binary, &saved);
        if self.no_service {
            println!(
                "{} run `{command}` to start watching",
                "note:".cyan().bold()
            );
        } else {
            install_service(&profile.name, &binary, &saved, self.start)
                .context("failed to register scheduled task")?;
            println!("registered task: {}", task_name(&profile.name));
            println!("task command: {command}");
        }

        println!(
            "{} {} watches {} under {}",
            "installed".green().bold(),
            profile.name,
            profile.pattern,
            root.physical_path.display()
        );
        Ok(())
    }

    fn profile(&self) -> WatchProfile {
        let store = &self.store;
        WatchProfile {
            name: self.name.trim().to_string(),
            site: self.site.trim().to_string(),
            pattern: paths::strip_quotes(&self.paths).to_string(),
            interval_ms: self.interval,
            depth: self.depth,
            backend: store.backend.map(Into::into).unwrap_or_default(),
            config_path: store.config_path.clone(),
            appcmd_path: store.appcmd_path.clone(),
            write_policy: if self.log_write_failures {
                WritePolicy::LogAndContinue
            } else {
                WritePolicy::Propagate
            },
            created_at: Utc::now(),
        }
    }
}
