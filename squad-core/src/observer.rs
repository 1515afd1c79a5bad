//! Structured diagnostics for load/save passes
//!
//! The codec never installs a global logger. Every pass reports what it sees
//! (detected format, section layout, skipped records, truncated fields) to an
//! [`Observer`] supplied by the caller. [`TracingObserver`] forwards events to
//! `tracing`, which is what the free functions use by default.

use std::fmt;
use std::sync::Mutex;

/// Severity of a codec event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// A single diagnostic emitted during a codec pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub severity: Severity,
    /// Index into the section table, when the event concerns one section
    pub section: Option<usize>,
    /// Absolute byte offset in the file
    pub offset: Option<u64>,
    pub message: String,
}

impl Event {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            section: None,
            offset: None,
            message: message.into(),
        }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(Severity::Debug, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn in_section(mut self, index: usize) -> Self {
        self.section = Some(index);
        self
    }

    pub fn at(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(section) = self.section {
            write!(f, "[section {}] ", section)?;
        }
        if let Some(offset) = self.offset {
            write!(f, "[0x{:08x}] ", offset)?;
        }
        f.write_str(&self.message)
    }
}

/// Receives codec events
pub trait Observer {
    fn on_event(&self, event: &Event);
}

/// Forwards events to the `tracing` macros
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &Event) {
        let section = event.section;
        let offset = event.offset;
        let message = &event.message;
        match event.severity {
            Severity::Debug => tracing::debug!(?section, ?offset, "{}", message),
            Severity::Info => tracing::info!(?section, ?offset, "{}", message),
            Severity::Warning => tracing::warn!(?section, ?offset, "{}", message),
            Severity::Error => tracing::error!(?section, ?offset, "{}", message),
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn on_event(&self, _event: &Event) {}
}

/// Buffers events so a host can show them after the pass finishes
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<Event>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far
    pub fn events(&self) -> Vec<Event> {
        self.lock().clone()
    }

    /// Events at or above `severity`
    pub fn at_least(&self, severity: Severity) -> Vec<Event> {
        self.lock()
            .iter()
            .filter(|e| e.severity >= severity)
            .cloned()
            .collect()
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        // A poisoned buffer still holds valid events.
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Observer for CollectingObserver {
    fn on_event(&self, event: &Event) {
        self.lock().push(event.clone());
    }
}
