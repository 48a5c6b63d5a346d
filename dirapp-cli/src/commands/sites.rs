//! `dirapp sites`: what IIS serves, and where each site's root lives.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use dirapp_core::{store, ConfigStore, Site, StoreOptions};

use crate::console::ConsoleLog;
use crate::StoreArgs;

#[derive(Args, Debug)]
pub struct SitesArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Debug, Serialize)]
struct SiteRow {
    name: String,
    id: Option<String>,
    applications: usize,
    root: Option<String>,
    pool: Option<String>,
    problem: Option<String>,
}

#[derive(Tabled)]
struct SiteTableRow {
    #[tabled(rename = "site")]
    name: String,
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "apps")]
    applications: usize,
    #[tabled(rename = "root directory")]
    root: String,
    #[tabled(rename = "pool")]
    pool: String,
}

impl SitesArgs {
    pub fn run(self) -> Result<()> {
        let options = StoreOptions {
            backup_before_mutation: false,
            ..self.store.store_options()
        };
        let store = store::open(&options, Arc::new(ConsoleLog))
            .with_context(|| format!("failed to load {}", options.config_path.display()))?;

        let rows: Vec<SiteRow> = store
            .sites()
            .into_iter()
            .map(|site| describe(store.as_ref(), site))
            .collect();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to render sites JSON")?
            );
            return Ok(());
        }

        if rows.is_empty() {
            println!("No sites configured in {}.", options.config_path.display());
            return Ok(());
        }
        print_table(&rows);
        Ok(())
    }
}

fn describe(store: &dyn ConfigStore, site: Site) -> SiteRow {
    let name = site.name.to_string();
    let (root, pool, problem) = match store.default_application(&name) {
        Ok(app) => (Some(app.physical_path.display().to_string()), app.pool, None),
        Err(err) => (None, None, Some(err.to_string())),
    };
    SiteRow {
        id: site.id,
        applications: site.applications.len(),
        name,
        root,
        pool,
        problem,
    }
}

fn print_table(rows: &[SiteRow]) {
    let table_rows: Vec<SiteTableRow> = rows
        .iter()
        .map(|row| SiteTableRow {
            name: row.name.clone(),
            id: row.id.clone().unwrap_or_else(|| "-".to_string()),
            applications: row.applications,
            root: match (&row.root, &row.problem) {
                (Some(root), _) => root.clone(),
                (None, Some(problem)) => problem.red().to_string(),
                (None, None) => "-".to_string(),
            },
            pool: row.pool.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");
}
