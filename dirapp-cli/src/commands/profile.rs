//! `dirapp profile list` and `dirapp profile show <name>`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use dirapp_core::profile;

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// List saved watch profiles.
    List,

    /// Print one profile as JSON.
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub name: String,
}

pub fn run(cmd: ProfileCommand) -> Result<()> {
    match cmd {
        ProfileCommand::List => list(),
        ProfileCommand::Show(args) => show(args),
    }
}

fn list() -> Result<()> {
    let profiles = profile::list_profiles().context("failed to read watch profiles")?;

    if profiles.is_empty() {
        println!("No profiles saved.");
        println!("Run: dirapp install --name <name> --site <site> --paths <glob>");
        return Ok(());
    }

    for p in &profiles {
        println!("{} ({})", p.name, p.site);
        println!(
            "  {} every {} ms, depth {}, via {}",
            p.pattern, p.interval_ms, p.depth, p.backend
        );
    }
    Ok(())
}

fn show(args: ShowArgs) -> Result<()> {
    let p = profile::load_profile(&args.name)
        .with_context(|| format!("failed to load profile '{}'", args.name))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&p).context("failed to render profile JSON")?
    );
    Ok(())
}
