//! Injected event log.
//!
//! Components receive an `Arc<dyn EventLog>` at construction instead of
//! reaching for a process-wide logger. [`TracingLog`] is what the watcher
//! service uses; [`MemoryLog`] keeps entries in memory for assertions.

use std::sync::Mutex;

use serde::Serialize;

pub trait EventLog: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to `tracing`, tagging every entry with the emitting component.
#[derive(Debug, Clone, Copy)]
pub struct TracingLog {
    component: &'static str,
}

impl TracingLog {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }
}

impl EventLog for TracingLog {
    fn info(&self, message: &str) {
        tracing::info!(component = self.component, "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(component = self.component, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(component = self.component, "{message}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Entries at `level` whose message contains `needle`.
    pub fn matching(&self, level: Level, needle: &str) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level && e.message.contains(needle))
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(LogEntry {
                level,
                message: message.to_string(),
            });
    }
}

impl EventLog for MemoryLog {
    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_log_records_levels_in_order() {
        let log = MemoryLog::new();
        log.info("one");
        log.warn("two");
        log.error("three");
        let levels: Vec<Level> = log.entries().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![Level::Info, Level::Warn, Level::Error]);
        assert_eq!(log.matching(Level::Warn, "tw").len(), 1);
    }
}
