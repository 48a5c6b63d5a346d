//! Filesystem notifier: polling watch of a glob pattern under one directory.
//!
//! The reconciler only sees [`FileEvent`]s through a [`Subscription`]; the
//! [`Notifier`] trait is the seam where tests inject events by hand.

use std::path::{Path, PathBuf};
use std::time::Duration;

use glob::{MatchOptions, Pattern};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::mpsc;

use dirapp_core::paths::{is_rooted, normalize_separators};

use crate::error::DaemonError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Added(PathBuf),
    Removed(PathBuf),
}

impl FileEvent {
    pub fn path(&self) -> &Path {
        match self {
            FileEvent::Added(path) | FileEvent::Removed(path) => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchOptions {
    pub poll_interval: Duration,
    /// Subdirectory levels below `cwd` to report; negative is unlimited.
    pub max_depth: i32,
    /// Directory the pattern is resolved against and the watch is rooted at.
    pub cwd: PathBuf,
}

/// A live watch. Dropping it releases the underlying watcher.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<FileEvent>,
    _guard: Option<Box<dyn Send>>,
}

impl Subscription {
    /// `guard` is kept alive for as long as the subscription is.
    pub fn new(events: mpsc::UnboundedReceiver<FileEvent>, guard: Option<Box<dyn Send>>) -> Self {
        Self {
            events,
            _guard: guard,
        }
    }

    /// Next event, or `None` once the notifier has gone away.
    pub async fn next(&mut self) -> Option<FileEvent> {
        self.events.recv().await
    }
}

pub trait Notifier {
    fn watch(&mut self, pattern: &str, options: &WatchOptions) -> Result<Subscription, DaemonError>;
}

// ---------------------------------------------------------------------------
// Event filter
// ---------------------------------------------------------------------------

/// Decides which raw notify events become [`FileEvent`]s.
#[derive(Debug, Clone)]
pub struct EventFilter {
    pattern: Pattern,
    root: String,
    max_depth: i32,
}

impl EventFilter {
    /// Relative patterns are resolved against `options.cwd`.
    pub fn new(pattern: &str, options: &WatchOptions) -> Result<Self, DaemonError> {
        let root = normalize_separators(&options.cwd.to_string_lossy())
            .trim_end_matches('/')
            .to_string();
        let pattern = normalize_separators(pattern);
        let full = if is_rooted(&pattern) {
            pattern
        } else {
            format!(
                "{}/{}",
                Pattern::escape(&root),
                pattern.trim_start_matches("./")
            )
        };
        let compiled = Pattern::new(&full).map_err(|source| DaemonError::Pattern {
            pattern: full.clone(),
            source,
        })?;
        Ok(Self {
            pattern: compiled,
            root,
            max_depth: options.max_depth,
        })
    }

    pub fn matches(&self, path: &Path) -> bool {
        let path = normalize_separators(&path.to_string_lossy());
        let options = MatchOptions {
            case_sensitive: !cfg!(windows),
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.pattern.matches_with(&path, options) && self.within_depth(&path)
    }

    fn within_depth(&self, path: &str) -> bool {
        if self.max_depth < 0 {
            return true;
        }
        match path
            .strip_prefix(self.root.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
        {
            Some(relative) => relative.matches('/').count() <= self.max_depth as usize,
            // Outside the root: depth is not defined, let the pattern decide.
            None => true,
        }
    }

    pub fn translate(&self, event: &Event) -> Vec<FileEvent> {
        let added = match event.kind {
            EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => true,
            EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => false,
            _ => return Vec::new(),
        };
        event
            .paths
            .iter()
            .filter(|path| self.matches(path))
            .filter(|path| !added || !path.is_dir())
            .map(|path| {
                if added {
                    FileEvent::Added(path.clone())
                } else {
                    FileEvent::Removed(path.clone())
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Polling notifier
// ---------------------------------------------------------------------------

/// `notify::PollWatcher` over `cwd`, recursive, filtered by [`EventFilter`].
///
/// Files already present when the watch starts are not reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollingNotifier;

impl Notifier for PollingNotifier {
    fn watch(&mut self, pattern: &str, options: &WatchOptions) -> Result<Subscription, DaemonError> {
        let filter = EventFilter::new(pattern, options)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let config = Config::default().with_poll_interval(options.poll_interval);
        let mut watcher = PollWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for file_event in filter.translate(&event) {
                        let _ = tx.send(file_event);
                    }
                }
                Err(err) => tracing::warn!(error = %err, "watcher event error"),
            },
            config,
        )?;
        watcher.watch(&options.cwd, RecursiveMode::Recursive)?;
        tracing::debug!(cwd = %options.cwd.display(), pattern, "polling watch registered");

        Ok(Subscription::new(rx, Some(Box::new(watcher))))
    }
}
