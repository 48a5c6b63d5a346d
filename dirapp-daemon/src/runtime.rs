use std::sync::Arc;

use tokio::sync::broadcast;

use dirapp_core::store::{self, StoreOptions};
use dirapp_core::{EventLog, TracingLog};

use crate::error::{io_err, DaemonError};
use crate::notifier::PollingNotifier;
use crate::reconciler::{shared, ReconcileSummary, Reconciler, WatchSpec};

/// Component tag carried by every store log entry.
pub const LOG_COMPONENT: &str = "application-host-config";

/// Set to `json` for one JSON object per log line.
pub const LOG_FORMAT_ENV: &str = "DIRAPP_LOG_FORMAT";

/// Start the watcher runtime and block the current thread until it exits.
pub fn start_blocking(
    spec: WatchSpec,
    options: StoreOptions,
) -> Result<ReconcileSummary, DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(spec, options))
}

/// Open the store, then reconcile until ctrl-c or the watch ends.
pub async fn run(spec: WatchSpec, options: StoreOptions) -> Result<ReconcileSummary, DaemonError> {
    let log: Arc<dyn EventLog> = Arc::new(TracingLog::new(LOG_COMPONENT));

    let opened = {
        let log = log.clone();
        tokio::task::spawn_blocking(move || store::open(&options, log)).await
    };
    let store = match opened {
        Ok(result) => result?,
        Err(err) => return Err(DaemonError::Join(format!("store open task: {err}"))),
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(4);

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let store = shared(store);
        tokio::spawn(async move {
            let mut reconciler = Reconciler::new(spec, store, log);
            let mut notifier = PollingNotifier;
            let result = reconciler.run(&mut notifier, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, stopping watcher");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Service(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (watcher_result, signal_result) = tokio::join!(watcher_handle, signal_handle);
    let summary = handle_join("watcher", watcher_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(summary)
}

fn handle_join<T>(
    task: &str,
    result: Result<Result<T, DaemonError>, tokio::task::JoinError>,
) -> Result<T, DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join(format!("{task} task: {err}"))),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let _ = if json {
        fmt().json().with_env_filter(filter).with_target(false).try_init()
    } else {
        fmt().with_env_filter(filter).with_target(false).try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_configuration_fails_before_watching() {
        let dir = TempDir::new().expect("tempdir");
        let options = StoreOptions {
            backend: dirapp_core::Backend::Direct,
            config_path: dir.path().join("applicationHost.config"),
            ..StoreOptions::default()
        };
        let spec = WatchSpec {
            site: "Default Web Site".into(),
            pattern: "**/web.config".into(),
            poll_interval_ms: 50,
            max_depth: -1,
        };
        let err = run(spec, options).await.unwrap_err();
        assert!(
            matches!(
                err,
                DaemonError::Config(dirapp_core::ConfigError::ConfigUnavailable { .. })
            ),
            "got: {err}"
        );
    }

    #[test]
    fn handle_join_passes_inner_result_through() {
        let ok: Result<Result<u8, DaemonError>, tokio::task::JoinError> = Ok(Ok(7));
        assert_eq!(handle_join("t", ok).expect("ok"), 7);
    }
}
