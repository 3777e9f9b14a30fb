//! Threshold-and-timer circuit breaker for Tower services.
//!
//! A [`Breaker`] wraps a fallible operation and counts consecutive failures.
//! While the streak stays at or below the configured threshold every call
//! goes through. Once the streak passes the threshold, calls are rejected with
//! [`ServiceUnreachable`] until a cooldown window has elapsed since the most
//! recent attempt. The window starts at one base cooldown (1 second by
//! default) and doubles with every further failure. The first call after the
//! window is let through as a probe; a success clears the streak, a failure
//! extends it and doubles the window again.
//!
//! There is no explicit open/half-open/closed state. The gate is derived on
//! every call from the failure streak, the time of the last attempt and the
//! current time.
//!
//! ## Usage
//!
//! ```rust
//! use stability_breaker::{Breaker, ServiceUnreachable};
//! use tower::{BoxError, Service, ServiceExt, service_fn};
//!
//! # async fn example() -> Result<(), BoxError> {
//! let operation = service_fn(|_ctx: ()| async { Ok::<_, BoxError>("success".to_string()) });
//!
//! // Tolerate five consecutive failures before gating.
//! let mut breaker = Breaker::new(operation, 5);
//!
//! match breaker.ready().await?.call(()).await {
//!     Ok(value) => println!("result = [{value}]"),
//!     Err(err) if err.is::<ServiceUnreachable>() => println!("gated"),
//!     Err(err) => println!("error = [{err}]"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! The breaker does not wrap errors. Its `Error` type is the inner service's
//! error type, which must be constructible from [`ServiceUnreachable`]. A
//! downstream failure is returned exactly as the operation produced it.
//! `tower::BoxError` satisfies the bound, as does any application error enum
//! with a `From<ServiceUnreachable>` impl:
//!
//! ```rust
//! use stability_breaker::{Breaker, ServiceUnreachable};
//! use tower::service_fn;
//!
//! #[derive(Debug)]
//! enum FetchError {
//!     Upstream(String),
//!     Unreachable(ServiceUnreachable),
//! }
//!
//! impl From<ServiceUnreachable> for FetchError {
//!     fn from(err: ServiceUnreachable) -> Self {
//!         FetchError::Unreachable(err)
//!     }
//! }
//!
//! let breaker = Breaker::new(
//!     service_fn(|id: u32| async move {
//!         Err::<String, _>(FetchError::Upstream(format!("no {id}")))
//!     }),
//!     0,
//! );
//! ```
//!
//! ## Concurrency
//!
//! Clones of a breaker share one failure history. The history lock is held
//! only to check the gate and to record an outcome, never while the
//! operation runs. Concurrent callers can therefore all pass the gate before
//! any of their failures is recorded.
//!
//! ## Cancellation
//!
//! The request is forwarded to the operation unchanged, so any cancellation
//! context it carries reaches the operation. Dropping the response future
//! drops the operation's future; an attempt cancelled this way records no
//! outcome.
//!
//! ## Feature Flags
//!
//! - `tracing`: debug/trace logs for gate decisions and recorded outcomes

use futures::future::BoxFuture;
use state::FailureHistory;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tower::Service;
#[cfg(feature = "tracing")]
use tracing::{debug, trace};

pub use config::{BreakerConfig, BreakerConfigBuilder};
pub use error::ServiceUnreachable;
pub use events::BreakerEvent;
pub use layer::BreakerLayer;
pub use state::Admission;

mod config;
mod error;
mod events;
mod layer;
mod state;

/// Point-in-time view of a breaker's failure history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    /// Current failure streak.
    pub consecutive_failures: u32,
    /// When the most recent attempt completed, or construction time if none has.
    pub last_attempt: Instant,
    /// Configured failure threshold.
    pub failure_threshold: u32,
    /// What the gate would decide for a call arriving now.
    pub admission: Admission,
}

impl BreakerSnapshot {
    /// Returns true if a call arriving now would be rejected.
    pub fn is_gated(&self) -> bool {
        self.admission.is_rejected()
    }

    /// Time left in the current cooldown window, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self.admission {
            Admission::Rejected { retry_after } => retry_after,
            Admission::Permitted => None,
        }
    }
}

/// A Tower Service that gates calls to an inner service on its recent failures.
///
/// See the [crate documentation](crate) for the gating rule.
pub struct Breaker<S> {
    inner: S,
    history: Arc<Mutex<FailureHistory>>,
    config: Arc<BreakerConfig>,
}

impl<S> Breaker<S> {
    /// Wraps `operation`, tolerating `failure_threshold` consecutive failures
    /// before gating. Other settings take their defaults.
    pub fn new(operation: S, failure_threshold: u32) -> Self {
        let config = BreakerConfig::builder()
            .failure_threshold(failure_threshold)
            .into_config();
        Self::with_config(operation, Arc::new(config))
    }

    pub(crate) fn with_config(inner: S, config: Arc<BreakerConfig>) -> Self {
        Self {
            inner,
            history: Arc::new(Mutex::new(FailureHistory::new(Instant::now()))),
            config,
        }
    }

    /// Returns the breaker's configuration.
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Returns a consistent snapshot of the failure history.
    pub async fn snapshot(&self) -> BreakerSnapshot {
        let history = self.history.lock().await;
        BreakerSnapshot {
            consecutive_failures: history.consecutive_failures(),
            last_attempt: history.last_attempt(),
            failure_threshold: self.config.failure_threshold,
            admission: history.check(&self.config, Instant::now()),
        }
    }

    /// Returns the current failure streak.
    pub async fn consecutive_failures(&self) -> u32 {
        self.history.lock().await.consecutive_failures()
    }
}

impl<S> Clone for Breaker<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            history: Arc::clone(&self.history),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S> std::fmt::Debug for Breaker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Breaker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, Req> Service<Req> for Breaker<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: From<ServiceUnreachable> + Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let config = Arc::clone(&self.config);
        let history = Arc::clone(&self.history);
        // Keep the instance that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (admission, streak) = {
                let history = history.lock().await;
                (
                    history.check(&config, Instant::now()),
                    history.consecutive_failures(),
                )
            };

            if let Admission::Rejected { retry_after } = admission {
                #[cfg(feature = "tracing")]
                trace!(
                    breaker = %config.name,
                    consecutive_failures = streak,
                    ?retry_after,
                    "breaker rejected call during cooldown"
                );

                if !config.event_listeners.is_empty() {
                    config.event_listeners.emit(&BreakerEvent::CallRejected {
                        pattern_name: config.name.clone(),
                        timestamp: std::time::Instant::now(),
                        consecutive_failures: streak,
                        retry_after,
                    });
                }

                return Err(ServiceUnreachable::new(config.name.clone(), retry_after).into());
            }

            #[cfg(feature = "tracing")]
            trace!(breaker = %config.name, consecutive_failures = streak, "breaker permitted call");

            if !config.event_listeners.is_empty() {
                config.event_listeners.emit(&BreakerEvent::CallPermitted {
                    pattern_name: config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    consecutive_failures: streak,
                });
            }

            let result = inner.call(req).await;

            let streak = {
                let mut history = history.lock().await;
                history.record(result.is_err(), Instant::now());
                history.consecutive_failures()
            };

            let notify = !config.event_listeners.is_empty();
            if result.is_err() {
                #[cfg(feature = "tracing")]
                debug!(
                    breaker = %config.name,
                    consecutive_failures = streak,
                    "protected call failed"
                );

                if notify {
                    config.event_listeners.emit(&BreakerEvent::FailureRecorded {
                        pattern_name: config.name.clone(),
                        timestamp: std::time::Instant::now(),
                        consecutive_failures: streak,
                    });
                }
            } else {
                #[cfg(feature = "tracing")]
                trace!(breaker = %config.name, "protected call succeeded");

                if notify {
                    config.event_listeners.emit(&BreakerEvent::SuccessRecorded {
                        pattern_name: config.name.clone(),
                        timestamp: std::time::Instant::now(),
                    });
                }
            }

            result
        })
    }
}
