//! Diagnostic reporting for contained failures
//!
//! Everything caught inside the per-entity logging path ends up here as a
//! message. Reporting is best-effort and must never fail; the worst outcome
//! of a broken sink is a silently missed diagnostic, never a broken flush.

use std::cell::RefCell;
use std::rc::Rc;

/// Best-effort sink for contained error reports
pub trait DiagnosticSink {
    /// Report one error message; must not panic or propagate failures
    fn report_error(&self, message: &str);
}

/// Sink that discards all reports
#[derive(Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report_error(&self, _message: &str) {}
}

/// Sink that writes reports to stderr
#[derive(Debug, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report_error(&self, message: &str) {
        eprintln!("entity-audit: {}", message);
    }
}

/// Sink that collects reports in memory, for inspection in tests and hosts
/// that forward diagnostics elsewhere
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Rc<RefCell<Vec<String>>>,
}

impl MemorySink {
    /// Create an empty collecting sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the collected messages
    pub fn messages(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.messages)
    }
}

impl DiagnosticSink for MemorySink {
    fn report_error(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        let messages = sink.messages();

        sink.report_error("first");
        sink.report_error("second");

        assert_eq!(*messages.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_null_sink_discards() {
        // Must simply not panic
        NullSink.report_error("ignored");
    }
}
