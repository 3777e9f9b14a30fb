use crate::config::BreakerConfig;
use crate::Breaker;
use std::sync::Arc;
use tower::Layer;

/// A Tower Layer that guards an inner service with a [`Breaker`].
///
/// Every service produced by one layer gets its own failure history; clone
/// the resulting [`Breaker`] to share one history between callers.
///
/// ```rust
/// use stability_breaker::BreakerLayer;
/// use std::time::Duration;
/// use tower::{BoxError, ServiceBuilder, service_fn};
///
/// let layer = BreakerLayer::builder()
///     .failure_threshold(3)
///     .base_cooldown(Duration::from_millis(500))
///     .name("inventory")
///     .build();
///
/// let service = ServiceBuilder::new()
///     .layer(layer)
///     .service(service_fn(|sku: u64| async move { Ok::<_, BoxError>(sku.to_string()) }));
/// ```
#[derive(Clone, Debug)]
pub struct BreakerLayer {
    config: Arc<BreakerConfig>,
}

impl BreakerLayer {
    pub(crate) fn new(config: impl Into<Arc<BreakerConfig>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    /// Creates a new builder for configuring a breaker layer.
    pub fn builder() -> crate::BreakerConfigBuilder {
        crate::BreakerConfigBuilder::new()
    }

    /// Returns the shared configuration.
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }
}

impl<S> Layer<S> for BreakerLayer {
    type Service = Breaker<S>;

    fn layer(&self, service: S) -> Self::Service {
        Breaker::with_config(service, Arc::clone(&self.config))
    }
}
