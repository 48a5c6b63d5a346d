//! Registers a watcher as a Windows scheduled task that starts at boot.
//!
//! One task per profile, named `dirapp\<name>`, running
//! `<binary> watch --profile-file <file>` as SYSTEM with highest privileges so
//! it can write `applicationHost.config`. The profile is named by absolute
//! file because SYSTEM's home is not the installing user's.

use std::path::Path;
use std::process::Command;

use crate::error::{io_err, DaemonError};

pub const TASK_FOLDER: &str = "dirapp";
const SCHTASKS: &str = "schtasks";

/// `dirapp\<name>`
pub fn task_name(name: &str) -> String {
    format!(r"{TASK_FOLDER}\{name}")
}

/// Command line the task runs.
pub fn task_command(binary: &Path, profile_file: &Path) -> String {
    format!(
        "\"{}\" watch --profile-file \"{}\"",
        binary.display(),
        profile_file.display()
    )
}

/// `schtasks` arguments that create (or replace) the task.
pub fn create_args(name: &str, binary: &Path, profile_file: &Path) -> Vec<String> {
    vec![
        "/Create".to_string(),
        "/TN".to_string(),
        task_name(name),
        "/TR".to_string(),
        task_command(binary, profile_file),
        "/SC".to_string(),
        "ONSTART".to_string(),
        "/RU".to_string(),
        "SYSTEM".to_string(),
        "/RL".to_string(),
        "HIGHEST".to_string(),
        "/F".to_string(),
    ]
}

pub fn run_args(name: &str) -> Vec<String> {
    vec!["/Run".to_string(), "/TN".to_string(), task_name(name)]
}

pub fn end_args(name: &str) -> Vec<String> {
    vec!["/End".to_string(), "/TN".to_string(), task_name(name)]
}

pub fn delete_args(name: &str) -> Vec<String> {
    vec![
        "/Delete".to_string(),
        "/TN".to_string(),
        task_name(name),
        "/F".to_string(),
    ]
}

/// Create the task, replacing any previous one, and optionally start it now.
pub fn install(
    name: &str,
    binary: &Path,
    profile_file: &Path,
    start: bool,
) -> Result<(), DaemonError> {
    ensure_windows()?;
    run_schtasks(&create_args(name, binary, profile_file), false)?;
    if start {
        run_schtasks(&run_args(name), false)?;
    }
    Ok(())
}

/// Stop the task if it is running and delete it.
pub fn uninstall(name: &str) -> Result<(), DaemonError> {
    ensure_windows()?;
    run_schtasks(&end_args(name), true)?;
    run_schtasks(&delete_args(name), false)
}

#[cfg(windows)]
fn ensure_windows() -> Result<(), DaemonError> {
    Ok(())
}

#[cfg(not(windows))]
fn ensure_windows() -> Result<(), DaemonError> {
    Err(DaemonError::Service(
        "scheduled task management is only supported on Windows".to_string(),
    ))
}

fn run_schtasks(args: &[String], ignore_failure: bool) -> Result<(), DaemonError> {
    let output = Command::new(SCHTASKS)
        .args(args)
        .output()
        .map_err(|e| io_err(SCHTASKS, e))?;

    if output.status.success() || ignore_failure {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Err(DaemonError::Service(format!(
        "schtasks {} failed (status {}): {} {}",
        args.first().map(String::as_str).unwrap_or_default(),
        output.status,
        stdout,
        stderr
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_args_run_watch_at_startup_as_system() {
        let args = create_args(
            "web-apps",
            Path::new(r"C:\tools\dirapp.exe"),
            Path::new(r"C:\Users\ops\.dirapp\profiles\web-apps.yaml"),
        );
        assert_eq!(args[0], "/Create");
        assert_eq!(args[2], r"dirapp\web-apps");
        assert_eq!(
            args[4],
            r#""C:\tools\dirapp.exe" watch --profile-file "C:\Users\ops\.dirapp\profiles\web-apps.yaml""#
        );
        let joined = args.join(" ");
        assert!(joined.contains("/SC ONSTART"));
        assert!(joined.contains("/RU SYSTEM"));
        assert!(joined.ends_with("/F"));
    }

    #[test]
    fn delete_is_forced() {
        assert_eq!(delete_args("a"), vec!["/Delete", "/TN", r"dirapp\a", "/F"]);
        assert_eq!(end_args("a"), vec!["/End", "/TN", r"dirapp\a"]);
    }

    #[cfg(not(windows))]
    #[test]
    fn install_is_refused_off_windows() {
        let err = install(
            "a",
            Path::new("/usr/bin/dirapp"),
            Path::new("/root/.dirapp/profiles/a.yaml"),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, DaemonError::Service(_)));
    }
}
