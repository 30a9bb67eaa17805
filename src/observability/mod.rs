//! Observability for obsmeta
//!
//! Structured JSON logging of typed lifecycle events.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on validation or caching results
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! ```ignore
//! use obsmeta::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::ValidationStart, &[("dataset", "pbmc3k")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Severity an event is logged at.
pub fn event_severity(event: Event) -> Severity {
    if event.is_error() {
        Severity::Error
    } else if event.is_warning() {
        Severity::Warn
    } else if event.is_trace() {
        Severity::Trace
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event_severity(event), event.as_str(), fields);
}
