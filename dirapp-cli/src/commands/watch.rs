//! `dirapp watch`: foreground watcher, from a saved profile or ad hoc.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use dirapp_core::paths;
use dirapp_core::profile::{self, WatchProfile, DEFAULT_INTERVAL_MS, UNLIMITED_DEPTH};
use dirapp_core::StoreOptions;
use dirapp_daemon::{start_blocking, WatchSpec};

use crate::StoreArgs;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Saved profile to run.
    #[arg(long, conflicts_with_all = ["site", "paths", "profile_file"])]
    pub profile: Option<String>,

    /// Profile file to run, wherever it lives. Used by the scheduled task.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["site", "paths"])]
    pub profile_file: Option<PathBuf>,

    /// IIS site to manage (without --profile).
    #[arg(long, requires = "paths")]
    pub site: Option<String>,

    /// Glob of marker files (without --profile).
    #[arg(long, requires = "site")]
    pub paths: Option<String>,

    /// Polling interval in milliseconds.
    #[arg(long, default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval: u64,

    /// Subdirectory levels to traverse; -1 is unlimited.
    #[arg(long, default_value_t = UNLIMITED_DEPTH, allow_hyphen_values = true)]
    pub depth: i32,

    #[command(flatten)]
    pub store: StoreArgs,
}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        let (spec, options) = self.resolve()?;
        let summary = start_blocking(spec, options).context("watcher exited with error")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("failed to render watch summary")?
        );
        Ok(())
    }

    fn resolve(&self) -> Result<(WatchSpec, StoreOptions)> {
        if let Some(name) = &self.profile {
            let profile = profile::load_profile(name)
                .with_context(|| format!("failed to load profile '{name}'"))?;
            return from_profile(profile);
        }
        if let Some(file) = &self.profile_file {
            let profile = profile::load_profile_file(file)
                .with_context(|| format!("failed to load profile file {}", file.display()))?;
            return from_profile(profile);
        }

        let (Some(site), Some(pattern)) = (&self.site, &self.paths) else {
            bail!("pass --profile <name>, --profile-file <file>, or --site together with --paths");
        };
        if self.interval == 0 {
            bail!("--interval should be greater than 0");
        }
        if self.depth < UNLIMITED_DEPTH {
            bail!("--depth should be greater than or equal to -1");
        }
        let spec = WatchSpec {
            site: site.trim().to_string(),
            pattern: paths::strip_quotes(pattern).to_string(),
            poll_interval_ms: self.interval,
            max_depth: self.depth,
        };
        Ok((spec, self.store.store_options()))
    }
}

fn from_profile(profile: WatchProfile) -> Result<(WatchSpec, StoreOptions)> {
    profile
        .validate()
        .with_context(|| format!("profile '{}' is invalid", profile.name))?;
    Ok((WatchSpec::from(&profile), profile.store_options()))
}
