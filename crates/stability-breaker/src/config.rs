use crate::events::BreakerEvent;
use stability_core::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for the breaker.
pub struct BreakerConfig {
    pub(crate) failure_threshold: u32,
    pub(crate) base_cooldown: Duration,
    pub(crate) max_cooldown: Option<Duration>,
    pub(crate) event_listeners: EventListeners<BreakerEvent>,
    pub(crate) name: String,
}

impl BreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BreakerConfigBuilder {
        BreakerConfigBuilder::new()
    }

    /// Consecutive failures tolerated before the gate engages.
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Cooldown after the first failure past the threshold.
    pub fn base_cooldown(&self) -> Duration {
        self.base_cooldown
    }

    /// Upper bound on the cooldown window, if any.
    pub fn max_cooldown(&self) -> Option<Duration> {
        self.max_cooldown
    }

    /// Name used in errors, events and logs.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        BreakerConfigBuilder::new().into_config()
    }
}

impl std::fmt::Debug for BreakerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakerConfig")
            .field("name", &self.name)
            .field("failure_threshold", &self.failure_threshold)
            .field("base_cooldown", &self.base_cooldown)
            .field("max_cooldown", &self.max_cooldown)
            .field("event_listeners", &self.event_listeners)
            .finish()
    }
}

/// Builder for configuring and constructing a breaker.
pub struct BreakerConfigBuilder {
    failure_threshold: u32,
    base_cooldown: Duration,
    max_cooldown: Option<Duration>,
    event_listeners: EventListeners<BreakerEvent>,
    name: String,
}

impl BreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            base_cooldown: Duration::from_secs(1),
            max_cooldown: None,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets how many consecutive failures are tolerated before calls are gated.
    ///
    /// A streak at or below this count never gates. Zero gates right after
    /// the first failure.
    ///
    /// Default: 5
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the cooldown after the first failure past the threshold.
    ///
    /// Each further failure doubles the window, measured from the most
    /// recent attempt.
    ///
    /// Default: 1 second
    pub fn base_cooldown(mut self, duration: Duration) -> Self {
        self.base_cooldown = duration;
        self
    }

    /// Caps the cooldown window.
    ///
    /// Without a cap the window grows without bound; once the end of the
    /// window lies past what `Instant` can represent, the breaker rejects
    /// until a call succeeds, which can then never happen.
    ///
    /// Default: None (unbounded)
    pub fn max_cooldown(mut self, duration: Duration) -> Self {
        self.max_cooldown = Some(duration);
        self
    }

    /// Give this breaker a human-readable name.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback for calls the gate lets through.
    ///
    /// # Callback Signature
    /// `Fn(u32)` - called with the failure streak observed at the gate check.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BreakerEvent| {
                if let BreakerEvent::CallPermitted {
                    consecutive_failures,
                    ..
                } = event
                {
                    f(*consecutive_failures);
                }
            }));
        self
    }

    /// Registers a callback for calls rejected during a cooldown window.
    ///
    /// # Callback Signature
    /// `Fn(Option<Duration>)` - called with the time left until the next
    /// probe, `None` if the window is unbounded.
    ///
    /// # Example
    /// ```rust
    /// use stability_breaker::BreakerConfig;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let rejections = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&rejections);
    ///
    /// let layer = BreakerConfig::builder()
    ///     .on_call_rejected(move |retry_after| {
    ///         counter.fetch_add(1, Ordering::SeqCst);
    ///         println!("rejected, retry in {:?}", retry_after);
    ///     })
    ///     .build();
    /// ```
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<Duration>) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BreakerEvent| {
                if let BreakerEvent::CallRejected { retry_after, .. } = event {
                    f(*retry_after);
                }
            }));
        self
    }

    /// Registers a callback for successful calls.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BreakerEvent| {
                if matches!(event, BreakerEvent::SuccessRecorded { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback for failed calls.
    ///
    /// # Callback Signature
    /// `Fn(u32)` - called with the failure streak including this failure.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BreakerEvent| {
                if let BreakerEvent::FailureRecorded {
                    consecutive_failures,
                    ..
                } = event
                {
                    f(*consecutive_failures);
                }
            }));
        self
    }

    pub(crate) fn into_config(self) -> BreakerConfig {
        if let Some(max) = self.max_cooldown {
            if max < self.base_cooldown {
                panic!("max_cooldown must not be shorter than base_cooldown");
            }
        }

        BreakerConfig {
            failure_threshold: self.failure_threshold,
            base_cooldown: self.base_cooldown,
            max_cooldown: self.max_cooldown,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds the configuration and returns a [`BreakerLayer`](crate::BreakerLayer).
    ///
    /// # Panics
    ///
    /// Panics if `max_cooldown` is shorter than `base_cooldown`.
    pub fn build(self) -> crate::BreakerLayer {
        crate::BreakerLayer::new(self.into_config())
    }
}

impl Default for BreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
