//! `dirapp uninstall`: drop the scheduled task and the profile.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use dirapp_core::profile;
use dirapp_daemon::uninstall_service;

#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Service name given at install time.
    #[arg(long)]
    pub name: String,

    /// Leave the scheduled task alone; only delete the profile.
    #[arg(long)]
    pub no_service: bool,
}

impl UninstallArgs {
    pub fn run(self) -> Result<()> {
        profile::validate_service_name(&self.name).context("invalid service name")?;

        if !self.no_service {
            uninstall_service(&self.name).context("failed to remove scheduled task")?;
            println!("removed task: {}", dirapp_daemon::service::task_name(&self.name));
        }

        if profile::remove_profile(&self.name).context("failed to remove watch profile")? {
            println!("{} {}", "uninstalled".green().bold(), self.name);
        } else {
            println!("no profile named {}", self.name);
        }
        Ok(())
    }
}
