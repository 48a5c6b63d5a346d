//! The `ConfigStore` contract and the snapshot both backends read from.
//!
//! Queries and the idempotence rules live in provided trait methods, so both
//! backends answer `exists?` the same way. A backend only implements
//! [`ConfigStore::apply`], which is called once it is certain the mutation
//! changes something.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::appcmd::{AppCmdStore, ProcessRunner};
use crate::backup;
use crate::direct::DirectStore;
use crate::document::AppHostDocument;
use crate::error::{malformed, ConfigError};
use crate::log::EventLog;
use crate::paths;
use crate::types::{Backend, Outcome, Site, SiteApplication, WritePolicy};

// ---------------------------------------------------------------------------
// 1. Snapshot
// ---------------------------------------------------------------------------

/// The parsed configuration file plus per-session backup state.
#[derive(Debug, Clone)]
pub struct Snapshot {
    path: PathBuf,
    document: AppHostDocument,
    auto_backup: bool,
    backup: Option<PathBuf>,
}

impl Snapshot {
    /// Read and parse `path`.
    ///
    /// `ConfigUnavailable` if unreadable, `ConfigMalformed` if it is not an
    /// `applicationHost.config` with a sites section.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let xml = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::ConfigUnavailable {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_xml(path, &xml)
    }

    pub fn from_xml(path: &Path, xml: &str) -> Result<Self, ConfigError> {
        let document = AppHostDocument::parse(xml).map_err(|reason| malformed(path, reason))?;
        Ok(Self {
            path: path.to_path_buf(),
            document,
            auto_backup: false,
            backup: None,
        })
    }

    /// Re-read the file, keeping this session's backup state.
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        let fresh = Self::load(&self.path)?;
        self.document = fresh.document;
        Ok(())
    }

    /// Take a backup before the first mutation of this session.
    pub fn with_auto_backup(mut self, enabled: bool) -> Self {
        self.auto_backup = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &AppHostDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut AppHostDocument {
        &mut self.document
    }

    /// Backup written during this session, if any.
    pub fn backup(&self) -> Option<&Path> {
        self.backup.as_deref()
    }

    fn needs_backup(&self) -> bool {
        self.auto_backup && self.backup.is_none()
    }
}

// ---------------------------------------------------------------------------
// 2. Contract
// ---------------------------------------------------------------------------

/// A change the store has already confirmed is not a no-op.
#[derive(Debug, Clone, Copy)]
pub enum Mutation<'a> {
    Add {
        site: &'a str,
        app: &'a SiteApplication,
    },
    Remove {
        site: &'a str,
        path: &'a str,
    },
}

pub trait ConfigStore: Send {
    fn backend(&self) -> Backend;
    fn snapshot(&self) -> &Snapshot;
    fn snapshot_mut(&mut self) -> &mut Snapshot;
    fn log(&self) -> &dyn EventLog;

    /// Perform `mutation` and bring the snapshot in line with it.
    fn apply(&mut self, mutation: Mutation<'_>) -> Result<(), ConfigError>;

    /// Bring the snapshot up to date before a mutation is decided.
    fn refresh(&mut self) -> Result<(), ConfigError> {
        Ok(())
    }

    fn site_names(&self) -> Result<Vec<String>, ConfigError> {
        Ok(self.sites().into_iter().map(|site| site.name.0).collect())
    }

    fn sites(&self) -> Vec<Site> {
        self.snapshot().document().sites()
    }

    /// Exact, case-sensitive lookup.
    fn get_site(&self, name: &str) -> Option<Site> {
        self.snapshot().document().site(name)
    }

    /// Path, pool and physical path of the site's `/` application.
    fn default_application(&self, site: &str) -> Result<SiteApplication, ConfigError> {
        let found = self.get_site(site).ok_or_else(|| ConfigError::SiteNotFound {
            site: site.to_string(),
        })?;
        let app = found
            .application("/")
            .ok_or_else(|| ConfigError::MalformedSite {
                site: site.to_string(),
                reason: "no application at path \"/\"".to_string(),
            })?;
        let root = app
            .root_directory()
            .ok_or_else(|| ConfigError::MalformedSite {
                site: site.to_string(),
                reason: "root application has no virtual directory at \"/\"".to_string(),
            })?;
        Ok(SiteApplication {
            path: app.path.clone(),
            pool: app.pool.clone(),
            physical_path: root.physical_path.clone(),
        })
    }

    fn application_exists(&self, site: &str, path: &str) -> Result<bool, ConfigError> {
        let found = self.get_site(site).ok_or_else(|| ConfigError::SiteNotFound {
            site: site.to_string(),
        })?;
        Ok(found.application(path).is_some())
    }

    /// Register `app` under `site`. An existing path is a logged no-op.
    fn add_application(
        &mut self,
        site: &str,
        app: &SiteApplication,
    ) -> Result<Outcome, ConfigError> {
        self.refresh()?;
        if self.application_exists(site, &app.path)? {
            self.log().warn(&format!(
                "{} application already exists at {site} IIS site.",
                app.path
            ));
            return Ok(Outcome::Unchanged);
        }
        if self.snapshot().needs_backup() {
            self.save_backup()?;
        }
        self.apply(Mutation::Add { site, app })?;
        self.log().info(&format!(
            "{} application has been added to {site} IIS site.",
            app.path
        ));
        Ok(Outcome::Applied)
    }

    /// Deregister `path` from `site`. A missing path is a logged no-op.
    fn remove_application(&mut self, site: &str, path: &str) -> Result<Outcome, ConfigError> {
        self.refresh()?;
        if !self.application_exists(site, path)? {
            self.log().warn(&format!(
                "{path} application is not registered at {site} IIS site; nothing to remove."
            ));
            return Ok(Outcome::Unchanged);
        }
        if self.snapshot().needs_backup() {
            self.save_backup()?;
        }
        self.apply(Mutation::Remove { site, path })?;
        self.log().info(&format!(
            "{path} application has been removed from {site} IIS site."
        ));
        Ok(Outcome::Applied)
    }

    /// Copy the configuration file to the next free `.bak` name.
    fn save_backup(&mut self) -> Result<PathBuf, ConfigError> {
        let target = backup::save_backup(self.snapshot().path())?;
        self.snapshot_mut().backup = Some(target.clone());
        self.log().info(&format!(
            "Config backup has been saved to {}.",
            target.display()
        ));
        Ok(target)
    }
}

// ---------------------------------------------------------------------------
// 3. Construction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub backend: Backend,
    pub config_path: PathBuf,
    pub appcmd_path: PathBuf,
    pub write_policy: WritePolicy,
    /// Back the file up before the first mutation of the session.
    pub backup_before_mutation: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            config_path: paths::default_config_path(),
            appcmd_path: paths::default_appcmd_path(),
            write_policy: WritePolicy::default(),
            backup_before_mutation: true,
        }
    }
}

/// Load the configuration and wrap it in the backend `options` selects.
pub fn open(
    options: &StoreOptions,
    log: Arc<dyn EventLog>,
) -> Result<Box<dyn ConfigStore>, ConfigError> {
    let snapshot =
        Snapshot::load(&options.config_path)?.with_auto_backup(options.backup_before_mutation);
    let store: Box<dyn ConfigStore> = match options.backend {
        Backend::Direct => Box::new(DirectStore::new(snapshot, options.write_policy, log)),
        Backend::Appcmd => Box::new(AppCmdStore::new(
            snapshot,
            options.appcmd_path.clone(),
            Box::new(ProcessRunner),
            log,
        )),
    };
    Ok(store)
}
