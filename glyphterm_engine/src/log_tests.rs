//! Unit tests for the logging module

use crate::log::{LogEntry, LogSeverity, Logger};
use std::sync::{Arc, Mutex};

struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[test]
fn test_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_custom_logger_receives_entries() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    let logger = CaptureLogger { entries: Arc::clone(&entries) };

    // Log through the trait directly; the global logger is shared across
    // tests, so installing it there would race with other test output.
    logger.log(&LogEntry {
        severity: LogSeverity::Warn,
        timestamp: std::time::SystemTime::now(),
        source: "glyphterm::test".to_string(),
        message: "swapchain suboptimal".to_string(),
        file: None,
        line: None,
    });

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Warn);
    assert_eq!(captured[0].message, "swapchain suboptimal");
}
