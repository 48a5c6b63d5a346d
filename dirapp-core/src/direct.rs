//! Direct-rewrite backend: edit the parsed tree, rewrite the whole file.
//!
//! Needs write access to `applicationHost.config` for the whole process. The
//! file is re-read before every mutation so edits made by IIS Manager, appcmd
//! or another watcher are carried forward. Each write goes to a `.dirapp.tmp`
//! sibling first and is renamed over the target.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{io_err, malformed, ConfigError};
use crate::log::EventLog;
use crate::store::{ConfigStore, Mutation, Snapshot};
use crate::types::{Backend, WritePolicy};

pub struct DirectStore {
    snapshot: Snapshot,
    policy: WritePolicy,
    log: Arc<dyn EventLog>,
}

impl DirectStore {
    pub fn new(snapshot: Snapshot, policy: WritePolicy, log: Arc<dyn EventLog>) -> Self {
        Self {
            snapshot,
            policy,
            log,
        }
    }

    fn persist(&self) -> Result<(), ConfigError> {
        let path = self.snapshot.path();
        let xml = self
            .snapshot
            .document()
            .to_xml()
            .map_err(|reason| malformed(path, reason))?;
        atomic_write(path, xml.as_bytes())
    }
}

impl ConfigStore for DirectStore {
    fn backend(&self) -> Backend {
        Backend::Direct
    }

    fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn snapshot_mut(&mut self) -> &mut Snapshot {
        &mut self.snapshot
    }

    fn log(&self) -> &dyn EventLog {
        self.log.as_ref()
    }

    fn refresh(&mut self) -> Result<(), ConfigError> {
        match (self.snapshot.reload(), self.policy) {
            (Ok(()), _) => Ok(()),
            (Err(err), WritePolicy::Propagate) => Err(err),
            (Err(err), WritePolicy::LogAndContinue) => {
                self.log.error(&format!(
                    "failed to re-read {}; deciding from the last loaded copy: {err}",
                    self.snapshot.path().display()
                ));
                Ok(())
            }
        }
    }

    fn apply(&mut self, mutation: Mutation<'_>) -> Result<(), ConfigError> {
        let document = self.snapshot.document_mut();
        let (site, found) = match mutation {
            Mutation::Add { site, app } => (site, document.insert_application(site, app)),
            Mutation::Remove { site, path } => (site, document.remove_application(site, path)),
        };
        if found.is_none() {
            return Err(ConfigError::SiteNotFound {
                site: site.to_string(),
            });
        }

        match (self.persist(), self.policy) {
            (Ok(()), _) => Ok(()),
            (Err(err), WritePolicy::Propagate) => Err(err),
            (Err(err), WritePolicy::LogAndContinue) => {
                self.log.error(&format!(
                    "failed to write {}; in-memory configuration is ahead of disk: {err}",
                    self.snapshot.path().display()
                ));
                Ok(())
            }
        }
    }
}

fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), ConfigError> {
    let tmp = PathBuf::from(format!("{}.dirapp.tmp", path.display()));
    std::fs::write(&tmp, contents).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}
