//! Unit tests for the global logger registry
//!
//! The logger is process-wide: every test here is #[serial].

use crate::galaxy3d::log::{LogEntry, LogSeverity, Logger};
use crate::galaxy3d::Engine;
use serial_test::serial;
use std::sync::{Arc, Mutex};

struct CountingLogger {
    count: Arc<Mutex<usize>>,
}

impl Logger for CountingLogger {
    fn log(&self, _entry: &LogEntry) {
        *self.count.lock().unwrap() += 1;
    }
}

#[test]
#[serial]
fn test_set_logger_receives_entries() {
    let count = Arc::new(Mutex::new(0));
    Engine::set_logger(CountingLogger { count: Arc::clone(&count) });

    Engine::log(LogSeverity::Info, "galaxy3d::present", "first".to_string());
    Engine::log(LogSeverity::Warn, "galaxy3d::present", "second".to_string());

    assert!(*count.lock().unwrap() >= 2);
    Engine::reset_logger();
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let count = Arc::new(Mutex::new(0));
    Engine::set_logger(CountingLogger { count: Arc::clone(&count) });
    Engine::reset_logger();

    // The registry dropped its handle to the custom logger
    assert_eq!(Arc::strong_count(&count), 1);
}

#[test]
#[serial]
fn test_log_detailed_carries_location() {
    let entries = Arc::new(Mutex::new(Vec::new()));

    struct Capture(Arc<Mutex<Vec<LogEntry>>>);
    impl Logger for Capture {
        fn log(&self, entry: &LogEntry) {
            self.0.lock().unwrap().push(entry.clone());
        }
    }

    Engine::set_logger(Capture(Arc::clone(&entries)));
    Engine::log_detailed(
        LogSeverity::Error,
        "galaxy3d::present",
        "Cannot create swapchain".to_string(),
        "chain.rs",
        12,
    );
    Engine::log(LogSeverity::Info, "galaxy3d::present", "plain".to_string());
    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    let detailed = entries
        .iter()
        .find(|e| e.message == "Cannot create swapchain")
        .unwrap();
    assert_eq!(detailed.severity, LogSeverity::Error);
    assert_eq!(detailed.file, Some("chain.rs"));
    assert_eq!(detailed.line, Some(12));

    let plain = entries.iter().find(|e| e.message == "plain").unwrap();
    assert!(plain.file.is_none());
    assert!(plain.line.is_none());
}
