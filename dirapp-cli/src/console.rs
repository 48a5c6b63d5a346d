use colored::Colorize;

use dirapp_core::EventLog;

/// Prints store events for interactive commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleLog;

impl EventLog for ConsoleLog {
    fn info(&self, message: &str) {
        println!("{message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("{} {message}", "warning:".yellow().bold());
    }

    fn error(&self, message: &str) {
        eprintln!("{} {message}", "error:".red().bold());
    }
}
