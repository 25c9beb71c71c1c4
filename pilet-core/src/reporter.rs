//! Progress reporting capability handed to every pipeline step.

use std::sync::Mutex;

/// Sink for user-facing progress, diagnostics, and the completion signal.
pub trait Reporter {
    /// A new pipeline phase starts.
    fn progress(&self, message: &str);
    /// Detail that only matters at verbose log levels.
    fn debug(&self, message: &str);
    /// Something the user should look at, but not fatal.
    fn warn(&self, message: &str);
    /// The run finished successfully. Emitted exactly once.
    fn done(&self, message: &str);
}

/// Forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn progress(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn done(&self, message: &str) {
        tracing::info!("✓ {message}");
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn progress(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn done(&self, _message: &str) {}
}

/// One recorded reporter event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Progress(String),
    Debug(String),
    Warn(String),
    Done(String),
}

/// Keeps events in memory, in order.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    fn push(&self, event: ReportEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Reporter for MemoryReporter {
    fn progress(&self, message: &str) {
        self.push(ReportEvent::Progress(message.to_owned()));
    }

    fn debug(&self, message: &str) {
        self.push(ReportEvent::Debug(message.to_owned()));
    }

    fn warn(&self, message: &str) {
        self.push(ReportEvent::Warn(message.to_owned()));
    }

    fn done(&self, message: &str) {
        self.push(ReportEvent::Done(message.to_owned()));
    }
}
