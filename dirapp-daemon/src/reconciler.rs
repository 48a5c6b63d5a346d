//! Keeps one site's applications in step with marker files on disk.
//!
//! ```text
//! Created -> Resolving -> Watching -> (Reacting)* -> Stopped
//! ```
//!
//! Duplicate or replayed events are absorbed by the store's idempotent
//! add/remove, so nothing here deduplicates. Add and remove events share one
//! stream but are not checked against the file's current existence: under
//! rapid delete/recreate churn the application set converges only once the
//! polling settles.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use dirapp_core::profile::WatchProfile;
use dirapp_core::{paths, ConfigStore, EventLog, Outcome, SiteApplication};

use crate::error::DaemonError;
use crate::notifier::{FileEvent, Notifier, Subscription, WatchOptions};

/// A store shared between the reconciler and its blocking workers. The mutex
/// serializes every read and write against the configuration.
pub type SharedStore = Arc<Mutex<Box<dyn ConfigStore>>>;

pub fn shared(store: Box<dyn ConfigStore>) -> SharedStore {
    Arc::new(Mutex::new(store))
}

fn lock(store: &SharedStore) -> MutexGuard<'_, Box<dyn ConfigStore>> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcilerState {
    Created,
    Resolving,
    Watching,
    Reacting,
    Stopped,
}

impl fmt::Display for ReconcilerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconcilerState::Created => "created",
            ReconcilerState::Resolving => "resolving",
            ReconcilerState::Watching => "watching",
            ReconcilerState::Reacting => "reacting",
            ReconcilerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// What to watch, for which site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchSpec {
    pub site: String,
    pub pattern: String,
    pub poll_interval_ms: u64,
    /// `-1` is unlimited.
    pub max_depth: i32,
}

impl From<&WatchProfile> for WatchSpec {
    fn from(profile: &WatchProfile) -> Self {
        Self {
            site: profile.site.clone(),
            pattern: profile.pattern.clone(),
            poll_interval_ms: profile.interval_ms,
            max_depth: profile.depth,
        }
    }
}

/// Event counts for one watch session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub ignored: usize,
    pub failed: usize,
}

pub struct Reconciler {
    spec: WatchSpec,
    store: SharedStore,
    log: Arc<dyn EventLog>,
    state: ReconcilerState,
    root: Option<SiteApplication>,
}

impl Reconciler {
    pub fn new(spec: WatchSpec, store: SharedStore, log: Arc<dyn EventLog>) -> Self {
        Self {
            spec,
            store,
            log,
            state: ReconcilerState::Created,
            root: None,
        }
    }

    pub fn spec(&self) -> &WatchSpec {
        &self.spec
    }

    pub fn state(&self) -> ReconcilerState {
        self.state
    }

    /// The site's `/` application, once resolved.
    pub fn root(&self) -> Option<&SiteApplication> {
        self.root.as_ref()
    }

    /// Look up the site's root application. Failure is fatal for the session.
    pub async fn resolve(&mut self) -> Result<SiteApplication, DaemonError> {
        self.expect_state(ReconcilerState::Created, "resolve")?;
        self.state = ReconcilerState::Resolving;
        self.log.info(&format!(
            "Watcher options {}",
            serde_json::to_string(&self.spec).unwrap_or_default()
        ));

        let store = self.store.clone();
        let site = self.spec.site.clone();
        let resolved = tokio::task::spawn_blocking(move || lock(&store).default_application(&site))
            .await
            .map_err(|err| DaemonError::Join(err.to_string()))?;

        match resolved {
            Ok(root) => {
                self.root = Some(root.clone());
                Ok(root)
            }
            Err(err) => {
                self.state = ReconcilerState::Stopped;
                self.log.error(&format!(
                    "cannot resolve site {}: {err}",
                    self.spec.site
                ));
                Err(err.into())
            }
        }
    }

    /// Register the pattern with `notifier`, rooted at the site's physical path.
    pub fn watch<N: Notifier + ?Sized>(
        &mut self,
        notifier: &mut N,
    ) -> Result<Subscription, DaemonError> {
        self.expect_state(ReconcilerState::Resolving, "watch")?;
        let root = self.root.clone().ok_or(DaemonError::InvalidState {
            state: self.state,
            action: "watch",
        })?;

        let options = WatchOptions {
            poll_interval: Duration::from_millis(self.spec.poll_interval_ms),
            max_depth: self.spec.max_depth,
            cwd: root.physical_path.clone(),
        };
        match notifier.watch(&self.spec.pattern, &options) {
            Ok(subscription) => {
                self.state = ReconcilerState::Watching;
                self.log.info(&format!(
                    "Starting watching on {} under {} ({})",
                    self.spec.pattern,
                    root.physical_path.display(),
                    self.spec.site
                ));
                Ok(subscription)
            }
            Err(err) => {
                self.state = ReconcilerState::Stopped;
                self.log.error(&format!("cannot watch {}: {err}", self.spec.pattern));
                Err(err)
            }
        }
    }

    /// Apply one event to the store.
    ///
    /// `Ok(None)` when the event was ignored: it lies outside the site root, or
    /// it is the removal of a marker in the root itself. The site's `/`
    /// application is never deregistered.
    pub async fn handle(&mut self, event: FileEvent) -> Result<Option<Outcome>, DaemonError> {
        let root = match (&self.root, self.state) {
            (Some(root), ReconcilerState::Watching) => root.clone(),
            _ => {
                return Err(DaemonError::InvalidState {
                    state: self.state,
                    action: "handle events",
                })
            }
        };
        let Some(app_path) = paths::application_path(&root.physical_path, event.path()) else {
            self.log.warn(&format!(
                "{} is outside {}; ignored",
                event.path().display(),
                root.physical_path.display()
            ));
            return Ok(None);
        };
        if matches!(event, FileEvent::Removed(_)) && app_path == "/" {
            self.log.warn(&format!(
                "{} is in the root of {} IIS site; the root application is kept",
                event.path().display(),
                self.spec.site
            ));
            return Ok(None);
        }

        self.state = ReconcilerState::Reacting;
        let store = self.store.clone();
        let site = self.spec.site.clone();
        let result = match event {
            FileEvent::Added(file) => {
                let app = SiteApplication {
                    path: app_path,
                    pool: root.pool.clone(),
                    physical_path: paths::application_physical_path(&root.physical_path, &file),
                };
                tokio::task::spawn_blocking(move || lock(&store).add_application(&site, &app))
                    .await
            }
            FileEvent::Removed(_) => {
                tokio::task::spawn_blocking(move || {
                    lock(&store).remove_application(&site, &app_path)
                })
                .await
            }
        };
        self.state = ReconcilerState::Watching;

        let outcome = result.map_err(|err| DaemonError::Join(err.to_string()))??;
        Ok(Some(outcome))
    }

    /// Resolve (if needed), watch, and react until `shutdown` fires or the
    /// notifier goes away. Per-event failures are logged and counted; only
    /// resolve and watch failures end the session early.
    pub async fn run<N: Notifier + ?Sized>(
        &mut self,
        notifier: &mut N,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<ReconcileSummary, DaemonError> {
        if self.state == ReconcilerState::Created {
            self.resolve().await?;
        }
        let mut subscription = self.watch(notifier)?;
        let mut summary = ReconcileSummary::default();

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                event = subscription.next() => {
                    let Some(event) = event else { break };
                    let removal = matches!(event, FileEvent::Removed(_));
                    match self.handle(event.clone()).await {
                        Ok(Some(Outcome::Applied)) if removal => summary.removed += 1,
                        Ok(Some(Outcome::Applied)) => summary.added += 1,
                        Ok(Some(Outcome::Unchanged)) => summary.unchanged += 1,
                        Ok(None) => summary.ignored += 1,
                        Err(err) => {
                            summary.failed += 1;
                            self.log.error(&format!(
                                "failed to reconcile {}: {err}",
                                describe(&event)
                            ));
                        }
                    }
                }
            }
        }

        drop(subscription);
        self.state = ReconcilerState::Stopped;
        self.log.info(&format!(
            "Stopped watching {} ({}): {} added, {} removed, {} unchanged, {} ignored, {} failed",
            self.spec.pattern,
            self.spec.site,
            summary.added,
            summary.removed,
            summary.unchanged,
            summary.ignored,
            summary.failed
        ));
        Ok(summary)
    }

    fn expect_state(
        &self,
        expected: ReconcilerState,
        action: &'static str,
    ) -> Result<(), DaemonError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DaemonError::InvalidState {
                state: self.state,
                action,
            })
        }
    }
}

fn describe(event: &FileEvent) -> String {
    match event {
        FileEvent::Added(path) => format!("add of {}", path.display()),
        FileEvent::Removed(path) => format!("removal of {}", path.display()),
    }
}
