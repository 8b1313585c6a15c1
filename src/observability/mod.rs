//! Observability for paramig
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on resolution
//! 3. No background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use paramig::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::ObjectLoadComplete, &[("class", "New")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log an event at its default severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its default severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
