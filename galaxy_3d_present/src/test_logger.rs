/// Capturing logger shared by unit tests
///
/// Installed through `Engine::set_logger`, so tests using it must be
/// `#[serial]`. Other tests may log concurrently: assert on the presence of
/// specific entries, never on exact counts.

use std::sync::{Arc, Mutex};

use crate::galaxy3d::log::{LogEntry, LogSeverity, Logger};
use crate::galaxy3d::Engine;

pub struct CapturedLogs {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

struct CapturingLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CapturingLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

impl CapturedLogs {
    /// Install a fresh capturing logger as the global logger
    pub fn install() -> Self {
        let entries = Arc::new(Mutex::new(Vec::new()));
        Engine::set_logger(CapturingLogger { entries: Arc::clone(&entries) });
        Self { entries }
    }

    /// Whether an entry of `severity` contains every fragment in `fragments`
    pub fn contains(&self, severity: LogSeverity, fragments: &[&str]) -> bool {
        self.entries.lock().unwrap().iter().any(|entry| {
            entry.severity == severity
                && fragments.iter().all(|fragment| entry.message.contains(fragment))
        })
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl Drop for CapturedLogs {
    fn drop(&mut self) {
        Engine::reset_logger();
    }
}
