//! Error types for dirapp-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading, querying or mutating the server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read. Fatal at startup.
    #[error("configuration unavailable at {path}: {source}")]
    ConfigUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not XML, or lacks `configuration/system.applicationHost/sites`.
    #[error("configuration at {path} is malformed: {reason}")]
    ConfigMalformed { path: PathBuf, reason: String },

    #[error("site '{site}' not found")]
    SiteNotFound { site: String },

    /// The site exists but has no `/` application or no `/` virtual directory.
    /// This is a server misconfiguration, not an I/O problem.
    #[error("site '{site}' is misconfigured: {reason}")]
    MalformedSite { site: String, reason: String },

    /// The administration tool exited non-zero or wrote to stderr.
    #[error("`{command}` failed ({status}): stdout: {stdout:?}, stderr: {stderr:?}")]
    ExternalToolFailure {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    /// Writing the configuration file or its backup failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the watch-profile store.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse profile at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    #[error("profile not found at {path}")]
    ProfileNotFound { path: PathBuf },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> ConfigError {
    ConfigError::ConfigMalformed {
        path: path.into(),
        reason: reason.into(),
    }
}
