use stability_core::StabilityEvent;
use std::time::{Duration, Instant};

/// Events emitted by the breaker.
#[derive(Debug, Clone)]
pub enum BreakerEvent {
    /// The gate let a call through to the protected operation.
    CallPermitted {
        pattern_name: String,
        timestamp: Instant,
        consecutive_failures: u32,
    },
    /// The gate rejected a call without invoking the protected operation.
    CallRejected {
        pattern_name: String,
        timestamp: Instant,
        consecutive_failures: u32,
        retry_after: Option<Duration>,
    },
    /// The protected operation succeeded and the failure streak was cleared.
    SuccessRecorded {
        pattern_name: String,
        timestamp: Instant,
    },
    /// The protected operation failed; `consecutive_failures` is the new streak length.
    FailureRecorded {
        pattern_name: String,
        timestamp: Instant,
        consecutive_failures: u32,
    },
}

impl StabilityEvent for BreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BreakerEvent::CallPermitted { .. } => "call_permitted",
            BreakerEvent::CallRejected { .. } => "call_rejected",
            BreakerEvent::SuccessRecorded { .. } => "success_recorded",
            BreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            BreakerEvent::CallPermitted { timestamp, .. }
            | BreakerEvent::CallRejected { timestamp, .. }
            | BreakerEvent::SuccessRecorded { timestamp, .. }
            | BreakerEvent::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            BreakerEvent::CallPermitted { pattern_name, .. }
            | BreakerEvent::CallRejected { pattern_name, .. }
            | BreakerEvent::SuccessRecorded { pattern_name, .. }
            | BreakerEvent::FailureRecorded { pattern_name, .. } => pattern_name,
        }
    }
}
