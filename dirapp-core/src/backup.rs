//! Numbered backups of the configuration file.
//!
//! The first free name in `<file>.bak`, `<file>.0.bak`, `<file>.1.bak`, … is
//! used. Backups are never pruned.

use std::path::{Path, PathBuf};

use crate::error::{io_err, ConfigError};

/// First backup name for `config` that does not exist yet. Pure apart from
/// the existence checks.
pub fn next_backup_path(config: &Path) -> PathBuf {
    let base = config
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let first = config.with_file_name(format!("{base}.bak"));
    if !first.exists() {
        return first;
    }
    (0u32..)
        .map(|index| config.with_file_name(format!("{base}.{index}.bak")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

/// Copy `config` byte-for-byte to [`next_backup_path`] and return the new path.
pub fn save_backup(config: &Path) -> Result<PathBuf, ConfigError> {
    let target = next_backup_path(config);
    std::fs::copy(config, &target).map_err(|e| io_err(&target, e))?;
    Ok(target)
}
