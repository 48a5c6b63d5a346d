//! Per-service YAML watch profiles.
//!
//! # Storage layout
//!
//! ```text
//! ~/.dirapp/
//!   profiles/
//!     <service_name>.yaml   (mode 0600, one file per installed watcher)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::paths;
use crate::store::StoreOptions;
use crate::types::{Backend, WritePolicy};

pub const DEFAULT_INTERVAL_MS: u64 = 15_000;
pub const UNLIMITED_DEPTH: i32 = -1;

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

fn default_depth() -> i32 {
    UNLIMITED_DEPTH
}

/// Everything one watcher service needs to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchProfile {
    /// Service name; letters and dashes only.
    pub name: String,
    pub site: String,
    /// Glob of marker files, relative to the site's physical root or absolute.
    pub pattern: String,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Subdirectory levels to traverse; `-1` is unlimited.
    #[serde(default = "default_depth")]
    pub depth: i32,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appcmd_path: Option<PathBuf>,
    #[serde(default)]
    pub write_policy: WritePolicy,
    pub created_at: DateTime<Utc>,
}

impl WatchProfile {
    /// Check every field a watcher depends on.
    pub fn validate(&self) -> Result<(), ProfileError> {
        validate_service_name(&self.name)?;
        if self.site.trim().is_empty() {
            return Err(invalid("site", "must not be empty"));
        }
        if self.pattern.trim().is_empty() {
            return Err(invalid("pattern", "must not be empty"));
        }
        if self.interval_ms == 0 {
            return Err(invalid("interval", "should be greater than 0"));
        }
        if self.depth < UNLIMITED_DEPTH {
            return Err(invalid("depth", "should be greater than or equal to -1"));
        }
        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            backend: self.backend,
            config_path: self
                .config_path
                .clone()
                .unwrap_or_else(paths::default_config_path),
            appcmd_path: self
                .appcmd_path
                .clone()
                .unwrap_or_else(paths::default_appcmd_path),
            write_policy: self.write_policy,
            backup_before_mutation: true,
        }
    }
}

/// Service names are letters or dashes only.
pub fn validate_service_name(name: &str) -> Result<(), ProfileError> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
        Ok(())
    } else {
        Err(invalid("name", "must be only letters or dashes"))
    }
}

fn invalid(field: &'static str, reason: &str) -> ProfileError {
    ProfileError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.dirapp/profiles/`
pub fn profiles_dir_at(home: &Path) -> PathBuf {
    home.join(".dirapp").join("profiles")
}

/// `<home>/.dirapp/profiles/<name>.yaml`: pure, no I/O.
pub fn profile_path_at(home: &Path, name: &str) -> PathBuf {
    profiles_dir_at(home).join(format!("{name}.yaml"))
}

// ---------------------------------------------------------------------------
// 2. Load / list
// ---------------------------------------------------------------------------

/// Read a profile from an explicit file, independent of the caller's home.
///
/// The scheduled task runs as SYSTEM, whose home is not the installing user's,
/// so it is pointed at the file install wrote.
pub fn load_profile_file(path: &Path) -> Result<WatchProfile, ProfileError> {
    if !path.exists() {
        return Err(ProfileError::ProfileNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(|e| ProfileError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn load_profile_at(home: &Path, name: &str) -> Result<WatchProfile, ProfileError> {
    load_profile_file(&profile_path_at(home, name))
}

pub fn load_profile(name: &str) -> Result<WatchProfile, ProfileError> {
    load_profile_at(&home()?, name)
}

/// All profiles, sorted by name.
pub fn list_profiles_at(home: &Path) -> Result<Vec<WatchProfile>, ProfileError> {
    let dir = profiles_dir_at(home);
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut entries: Vec<_> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".yaml"))
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut profiles = Vec::with_capacity(entries.len());
    for entry in entries {
        let contents = std::fs::read_to_string(entry.path())?;
        let profile = serde_yaml::from_str(&contents).map_err(|e| ProfileError::Parse {
            path: entry.path(),
            source: e,
        })?;
        profiles.push(profile);
    }
    Ok(profiles)
}

pub fn list_profiles() -> Result<Vec<WatchProfile>, ProfileError> {
    list_profiles_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic) / remove
// ---------------------------------------------------------------------------

/// Validate and atomically write `profile`: `.yaml.tmp` → `chmod 0600` → `rename`.
pub fn save_profile_at(home: &Path, profile: &WatchProfile) -> Result<PathBuf, ProfileError> {
    profile.validate()?;
    let dir = profiles_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    let path = profile_path_at(home, &profile.name);
    let tmp_path = path.with_file_name(format!("{}.yaml.tmp", profile.name));

    let yaml = serde_yaml::to_string(profile)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(path)
}

pub fn save_profile(profile: &WatchProfile) -> Result<PathBuf, ProfileError> {
    save_profile_at(&home()?, profile)
}

/// Delete a profile. Returns `false` if there was nothing to delete.
pub fn remove_profile_at(home: &Path, name: &str) -> Result<bool, ProfileError> {
    let path = profile_path_at(home, name);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

pub fn remove_profile(name: &str) -> Result<bool, ProfileError> {
    remove_profile_at(&home()?, name)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ProfileError> {
    dirs::home_dir().ok_or(ProfileError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ProfileError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ProfileError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ProfileError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ProfileError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn profile(name: &str) -> WatchProfile {
        WatchProfile {
            name: name.to_string(),
            site: "Default Web Site".into(),
            pattern: "**/web.config".into(),
            interval_ms: DEFAULT_INTERVAL_MS,
            depth: UNLIMITED_DEPTH,
            backend: Backend::Appcmd,
            config_path: None,
            appcmd_path: None,
            write_policy: WritePolicy::Propagate,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[case("web-apps", true)]
    #[case("WebApps", true)]
    #[case("", false)]
    #[case("web apps", false)]
    #[case("web_apps", false)]
    #[case("apps2", false)]
    fn service_name_rules(#[case] name: &str, #[case] ok: bool) {
        assert_eq!(validate_service_name(name).is_ok(), ok);
    }

    #[test]
    fn validate_rejects_bad_interval_and_depth() {
        let mut p = profile("watch");
        p.interval_ms = 0;
        assert!(matches!(p.validate(), Err(ProfileError::Invalid { field: "interval", .. })));
        let mut p = profile("watch");
        p.depth = -2;
        assert!(matches!(p.validate(), Err(ProfileError::Invalid { field: "depth", .. })));
    }

    #[test]
    fn save_load_and_list() {
        let home = TempDir::new().expect("tempdir");
        save_profile_at(home.path(), &profile("beta")).expect("save");
        save_profile_at(home.path(), &profile("alpha")).expect("save");

        let loaded = load_profile_at(home.path(), "alpha").expect("load");
        assert_eq!(loaded.site, "Default Web Site");

        let names: Vec<String> = list_profiles_at(home.path())
            .expect("list")
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert!(!profile_path_at(home.path(), "alpha")
            .with_file_name("alpha.yaml.tmp")
            .exists());
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let home = TempDir::new().expect("tempdir");
        let dir = profiles_dir_at(home.path());
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(
            dir.join("min.yaml"),
            "name: min\nsite: s\npattern: '*/web.config'\ncreated_at: 2024-01-01T00:00:00Z\n",
        )
        .expect("write");

        let p = load_profile_at(home.path(), "min").expect("load");
        assert_eq!(p.interval_ms, DEFAULT_INTERVAL_MS);
        assert_eq!(p.depth, UNLIMITED_DEPTH);
        assert_eq!(p.backend, Backend::Appcmd);
        assert_eq!(p.store_options().config_path, paths::default_config_path());
    }

    #[test]
    fn remove_reports_whether_anything_was_deleted() {
        let home = TempDir::new().expect("tempdir");
        save_profile_at(home.path(), &profile("gone")).expect("save");
        assert!(remove_profile_at(home.path(), "gone").expect("remove"));
        assert!(!remove_profile_at(home.path(), "gone").expect("remove again"));
        assert!(matches!(
            load_profile_at(home.path(), "gone"),
            Err(ProfileError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn saved_file_loads_without_a_home() {
        let home = TempDir::new().expect("tempdir");
        let saved = save_profile_at(home.path(), &profile("boot")).expect("save");

        let loaded = load_profile_file(&saved).expect("load");
        assert_eq!(loaded.name, "boot");
        assert!(matches!(
            load_profile_file(&home.path().join("missing.yaml")),
            Err(ProfileError::ProfileNotFound { .. })
        ));
    }
}
