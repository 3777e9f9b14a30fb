//! Core infrastructure for the stability patterns.
//!
//! Provides the event hook machinery patterns use to let callers observe
//! gate decisions and recorded outcomes without the pattern itself doing
//! any reporting.

pub mod events;

pub use events::{BoxedEventListener, EventListener, EventListeners, FnListener, StabilityEvent};
