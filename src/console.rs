//! Console output sink
//!
//! The relay does not print on its own. Everything meant for the person in
//! front of the shell (relayed lines on the server, received lines and
//! notices on the client) goes through a [`Console`] supplied by the caller.
//! Diagnostics go to `tracing` instead.

use std::io::Write;
use std::sync::Mutex;

/// Line-oriented display sink
pub trait Console: Send + Sync + 'static {
    /// Display one line of regular output
    fn display(&self, line: &str);

    /// Display one line describing an error
    fn display_error(&self, line: &str);
}

/// Console writing to the process's stdout and stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl Console for StdConsole {
    fn display(&self, line: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
        let _ = stdout.flush();
    }

    fn display_error(&self, line: &str) {
        let _ = writeln!(std::io::stderr().lock(), "{}", line);
    }
}

/// Console that keeps every line in memory
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl MemoryConsole {
    /// Create an empty console
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines displayed so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Error lines displayed so far
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl Console for MemoryConsole {
    fn display(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_owned());
        }
    }

    fn display_error(&self, line: &str) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(line.to_owned());
        }
    }
}
