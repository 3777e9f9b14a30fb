use std::time::Duration;
use thiserror::Error;

/// The breaker declined to call the protected operation because its
/// cooldown window has not elapsed.
///
/// The breaker converts this into the operation's own error type through
/// `From`, so the wrapped service keeps the raw operation's signature. With
/// `tower::BoxError` as the error type the gated case is recovered by
/// downcasting:
///
/// ```rust
/// use stability_breaker::ServiceUnreachable;
/// use tower::BoxError;
///
/// fn is_gated(err: &BoxError) -> bool {
///     err.downcast_ref::<ServiceUnreachable>().is_some()
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("service unreachable")]
pub struct ServiceUnreachable {
    name: String,
    retry_after: Option<Duration>,
}

impl ServiceUnreachable {
    pub(crate) fn new(name: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            retry_after,
        }
    }

    /// Name of the breaker that rejected the call.
    pub fn breaker_name(&self) -> &str {
        &self.name
    }

    /// Time left until the next probe is allowed.
    ///
    /// `None` when the cooldown is too long to represent, in which case only
    /// a later successful call can reopen the gate.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}
