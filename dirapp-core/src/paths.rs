//! Path helpers shared by the stores and the watcher.
//!
//! Translation works on strings with `/` as the only separator so that
//! Windows-style inputs behave the same on every host.

use std::path::{Path, PathBuf};

pub const IIS_DIR: &str = r"C:\Windows\System32\inetsrv";
pub const APPCMD_EXE: &str = "appcmd.exe";
pub const APPHOST_CONFIG: &str = "applicationHost.config";

/// `C:\Windows\System32\inetsrv\appcmd.exe`
pub fn default_appcmd_path() -> PathBuf {
    PathBuf::from(format!(r"{IIS_DIR}\{APPCMD_EXE}"))
}

/// `C:\Windows\System32\inetsrv\Config\applicationHost.config`
pub fn default_config_path() -> PathBuf {
    PathBuf::from(format!(r"{IIS_DIR}\Config\{APPHOST_CONFIG}"))
}

/// Replace every `\` with `/`.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// `true` for `/x`, `C:/x` and `C:\x` style paths.
pub fn is_rooted(path: &str) -> bool {
    let path = normalize_separators(path);
    let bytes = path.as_bytes();
    path.starts_with('/')
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

/// Directory holding `file`, separators normalized. Empty for a bare file name.
pub fn containing_dir(file: &str) -> String {
    let file = normalize_separators(file);
    match file.rfind('/') {
        Some(idx) => file[..idx].to_string(),
        None => String::new(),
    }
}

/// Root-relative application path for a changed marker file.
///
/// `file` may be absolute or relative to `root`. Returns `None` when an
/// absolute `file` is not at or below `root`.
///
/// ```
/// use std::path::Path;
/// use dirapp_core::paths::application_path;
///
/// let root = Path::new("C:/sites/app");
/// assert_eq!(application_path(root, Path::new("C:/sites/app/sub/dir/web.config")).as_deref(), Some("/sub/dir"));
/// assert_eq!(application_path(root, Path::new("C:/sites/app/web.config")).as_deref(), Some("/"));
/// ```
pub fn application_path(root: &Path, file: &Path) -> Option<String> {
    let file = file.to_string_lossy();
    let dir = containing_dir(&file);

    let relative = if is_rooted(&file) {
        let root = normalize_separators(&root.to_string_lossy());
        let root = root.trim_end_matches('/');
        if same_path(&dir, root) {
            String::new()
        } else {
            let prefix_len = root.len();
            let head = dir.get(..prefix_len)?;
            let tail = dir.get(prefix_len..)?;
            if !same_path(head, root) || !tail.starts_with('/') {
                return None;
            }
            tail.to_string()
        }
    } else {
        dir
    };

    let relative = relative.trim_matches('/');
    Some(format!("/{relative}"))
}

/// Physical path of the application created for a changed marker file.
pub fn application_physical_path(root: &Path, file: &Path) -> PathBuf {
    if is_rooted(&file.to_string_lossy()) {
        file.parent().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf())
    } else {
        match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => root.join(parent),
            _ => root.to_path_buf(),
        }
    }
}

/// Strip one layer of surrounding single or double quotes and whitespace.
pub fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .or_else(|| value.strip_prefix('\''))
        .unwrap_or(value);
    value
        .strip_suffix('"')
        .or_else(|| value.strip_suffix('\''))
        .unwrap_or(value)
}

// Drive letters and the rest of a Windows path compare case-insensitively there.
#[cfg(windows)]
fn same_path(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(not(windows))]
fn same_path(a: &str, b: &str) -> bool {
    a == b
}
