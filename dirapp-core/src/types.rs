//! Domain types for the site / application / virtual-directory hierarchy.
//!
//! These are normalized, read-only views: every collection is a `Vec`, even
//! when the persisted document holds a single bare element. Mutations go
//! through [`crate::document`], never through these structs.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed IIS site name. Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteName(pub String);

impl fmt::Display for SiteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SiteName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SiteName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl AsRef<str> for SiteName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which [`crate::store::ConfigStore`] implementation performs mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Every mutation is an `appcmd.exe` invocation.
    #[default]
    Appcmd,
    /// Mutations edit the parsed document and rewrite the whole file.
    Direct,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Appcmd => write!(f, "appcmd"),
            Backend::Direct => write!(f, "direct"),
        }
    }
}

/// What the direct-rewrite backend does when persisting the file fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WritePolicy {
    /// Return the I/O error to the caller.
    #[default]
    Propagate,
    /// Log the failure and report the mutation as applied.
    LogAndContinue,
}

/// Result of an idempotent mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The store changed.
    Applied,
    /// The store already had the requested shape; nothing was written.
    Unchanged,
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualDirectory {
    pub path: String,
    pub physical_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    /// Root-relative URL path, always starting with `/`.
    pub path: String,
    /// `None` when the application inherits the site's default pool.
    pub pool: Option<String>,
    pub virtual_directories: Vec<VirtualDirectory>,
}

impl Application {
    /// The virtual directory mounted at `/`, if any.
    pub fn root_directory(&self) -> Option<&VirtualDirectory> {
        self.virtual_directories.iter().find(|vd| vd.path == "/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Site {
    pub name: SiteName,
    pub id: Option<String>,
    pub applications: Vec<Application>,
}

impl Site {
    pub fn application(&self, path: &str) -> Option<&Application> {
        self.applications.iter().find(|app| app.path == path)
    }
}

/// The flattened `(path, pool, physicalPath)` triple used to create
/// applications and to describe a site's root application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteApplication {
    pub path: String,
    pub pool: Option<String>,
    pub physical_path: PathBuf,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
