//! # Process-wide log sink with a single pluggable destination.
//!
//! The runtime reports through one global sink: Warning on task execution
//! errors, Info on periodic summaries and worker exit, Error on spawn
//! failures. [`register_sink`] replaces the destination at runtime; without a
//! registered sink every [`log`] call drops silently.
//!
//! Serialisation of concurrent `log` calls is the destination's duty. The
//! built-in [`ConsoleSink`] relies on the stdout lock.

use std::sync::{Arc, RwLock};

/// Severity of a log message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Returns a short stable label.
    pub fn as_label(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

/// # Destination for log messages.
///
/// Implementations must serialise concurrent calls; worker threads log
/// directly from their loops. No buffering, no formatting beyond string
/// pass-through.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

static SINK: RwLock<Option<Arc<dyn LogSink>>> = RwLock::new(None);

/// Replaces the current process-wide sink.
pub fn register_sink(sink: Arc<dyn LogSink>) {
    if let Ok(mut slot) = SINK.write() {
        *slot = Some(sink);
    }
}

/// Removes the current sink. Subsequent [`log`] calls drop silently.
pub fn clear_sink() {
    if let Ok(mut slot) = SINK.write() {
        *slot = None;
    }
}

/// Forwards `message` to the registered sink, if any.
pub fn log(level: LogLevel, message: &str) {
    if let Ok(slot) = SINK.read() {
        if let Some(sink) = slot.as_ref() {
            sink.log(level, message);
        }
    }
}

/// Base sink that writes `[level] message` lines to stdout.
///
/// Useful for demos and debugging.
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn log(&self, level: LogLevel, message: &str) {
        println!("[{}] {}", level.as_label(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Capture(Mutex<Vec<(LogLevel, String)>>);

    impl LogSink for Capture {
        fn log(&self, level: LogLevel, message: &str) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push((level, message.to_string()));
            }
        }
    }

    // Single test: the sink is process-global, parallel tests would interleave.
    #[test]
    fn register_forward_replace_clear() {
        let capture = Arc::new(Capture(Mutex::new(Vec::new())));
        register_sink(capture.clone());
        log(LogLevel::Info, "hello");
        log(LogLevel::Warning, "careful");

        {
            let lines = capture.0.lock().expect("capture lock");
            assert_eq!(lines.len(), 2);
            assert_eq!(lines[0], (LogLevel::Info, "hello".to_string()));
            assert_eq!(lines[1].0, LogLevel::Warning);
        }

        let replacement = Arc::new(Capture(Mutex::new(Vec::new())));
        register_sink(replacement.clone());
        log(LogLevel::Error, "elsewhere");
        assert_eq!(capture.0.lock().expect("capture lock").len(), 2);
        assert_eq!(replacement.0.lock().expect("capture lock").len(), 1);

        clear_sink();
        log(LogLevel::Error, "dropped");
        assert_eq!(replacement.0.lock().expect("capture lock").len(), 1);
    }

    #[test]
    fn levels_order_and_labels() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert_eq!(LogLevel::Info.as_label(), "info");
    }
}
