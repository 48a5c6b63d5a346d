//! Command-driven backend: every mutation is an `appcmd.exe` invocation.
//!
//! Used when the live server must not have its configuration file edited by
//! hand. Reads are served from the snapshot taken at startup, and the snapshot
//! is updated in memory after each successful command so later idempotence
//! checks see the change.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::error::{io_err, ConfigError};
use crate::log::EventLog;
use crate::store::{ConfigStore, Mutation, Snapshot};
use crate::types::{Backend, SiteApplication};

/// Captured result of one external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Rendered exit status, e.g. `exit status: 1`.
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

/// Seam between the store and process spawning.
pub trait CommandRunner: Send {
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<CommandOutput>;
}

/// Runs the program with `std::process::Command` and waits for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// Argument builders
// ---------------------------------------------------------------------------

/// `list site /text:name`
pub fn list_sites_args() -> Vec<String> {
    vec!["list".into(), "site".into(), "/text:name".into()]
}

/// `add app /site.name:<site> /path:<path> /physicalPath:<dir>`
pub fn add_app_args(site: &str, app: &SiteApplication) -> Vec<String> {
    vec![
        "add".into(),
        "app".into(),
        format!("/site.name:{site}"),
        format!("/path:{}", app.path),
        format!("/physicalPath:{}", app.physical_path.display()),
    ]
}

/// `set app <site><path> /applicationPool:<pool>`
pub fn set_pool_args(site: &str, path: &str, pool: &str) -> Vec<String> {
    vec![
        "set".into(),
        "app".into(),
        app_identifier(site, path),
        format!("/applicationPool:{pool}"),
    ]
}

/// `delete app <site><path>`
pub fn delete_app_args(site: &str, path: &str) -> Vec<String> {
    vec!["delete".into(), "app".into(), app_identifier(site, path)]
}

/// appcmd names an application by its site name followed by its path.
pub fn app_identifier(site: &str, path: &str) -> String {
    format!("{site}{path}")
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct AppCmdStore {
    snapshot: Snapshot,
    appcmd: PathBuf,
    runner: Box<dyn CommandRunner>,
    log: Arc<dyn EventLog>,
}

impl AppCmdStore {
    pub fn new(
        snapshot: Snapshot,
        appcmd: PathBuf,
        runner: Box<dyn CommandRunner>,
        log: Arc<dyn EventLog>,
    ) -> Self {
        Self {
            snapshot,
            appcmd,
            runner,
            log,
        }
    }

    /// Run appcmd and return its stdout split into lines.
    ///
    /// A non-zero exit or anything on stderr is `ExternalToolFailure`.
    fn exec(&self, args: Vec<String>) -> Result<Vec<String>, ConfigError> {
        let command = format!("{} {}", self.appcmd.display(), args.join(" "));
        let output = self
            .runner
            .run(&self.appcmd, &args)
            .map_err(|e| io_err(&self.appcmd, e))?;

        if !output.success || !output.stderr.trim().is_empty() {
            self.log.error(&format!(
                "`{command}` failed ({}): {}",
                output.status,
                output.stderr.trim()
            ));
            return Err(ConfigError::ExternalToolFailure {
                command,
                status: output.status,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(output.stdout.lines().map(str::to_owned).collect())
    }
}

impl ConfigStore for AppCmdStore {
    fn backend(&self) -> Backend {
        Backend::Appcmd
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

    fn site_names(&self) -> Result<Vec<String>, ConfigError> {
        Ok(self
            .exec(list_sites_args())?
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    fn apply(&mut self, mutation: Mutation<'_>) -> Result<(), ConfigError> {
        match mutation {
            Mutation::Add { site, app } => {
                self.exec(add_app_args(site, app))?;
                // The application exists from here on, even if the pool
                // assignment below fails.
                self.snapshot.document_mut().insert_application(site, app);
                if let Some(pool) = &app.pool {
                    self.exec(set_pool_args(site, &app.path, pool))?;
                }
            }
            Mutation::Remove { site, path } => {
                self.exec(delete_app_args(site, path))?;
                self.snapshot.document_mut().remove_application(site, path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn add_args_match_appcmd_syntax() {
        let app = SiteApplication {
            path: "/shop/api".into(),
            pool: Some("ShopPool".into()),
            physical_path: PathBuf::from(r"C:\sites\shop\api"),
        };
        assert_eq!(
            add_app_args("Shop", &app),
            vec![
                "add",
                "app",
                "/site.name:Shop",
                "/path:/shop/api",
                r"/physicalPath:C:\sites\shop\api"
            ]
        );
        assert_eq!(
            set_pool_args("Shop", "/shop/api", "ShopPool"),
            vec!["set", "app", "Shop/shop/api", "/applicationPool:ShopPool"]
        );
        assert_eq!(delete_app_args("Shop", "/x"), vec!["delete", "app", "Shop/x"]);
        assert_eq!(list_sites_args(), vec!["list", "site", "/text:name"]);
    }
}
