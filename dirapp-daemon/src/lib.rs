//! Watcher runtime: notifier, reconciler and scheduled-task registration.

mod error;
pub mod notifier;
pub mod reconciler;
mod runtime;
pub mod service;

pub use error::DaemonError;
pub use notifier::{EventFilter, FileEvent, Notifier, PollingNotifier, Subscription, WatchOptions};
pub use reconciler::{shared, ReconcileSummary, Reconciler, ReconcilerState, SharedStore, WatchSpec};
pub use runtime::{run, start_blocking, LOG_COMPONENT, LOG_FORMAT_ENV};
pub use service::{install as install_service, uninstall as uninstall_service};
