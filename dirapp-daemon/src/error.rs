use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the watcher runtime, notifier and service management.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("invalid watch pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("configuration error: {0}")]
    Config(#[from] dirapp_core::ConfigError),

    #[error("profile error: {0}")]
    Profile(#[from] dirapp_core::ProfileError),

    #[error("reconciler is {state}; cannot {action}")]
    InvalidState {
        state: crate::reconciler::ReconcilerState,
        action: &'static str,
    },

    #[error("worker task failed: {0}")]
    Join(String),

    #[error("service error: {0}")]
    Service(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
