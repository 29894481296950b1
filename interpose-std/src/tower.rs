//! Tower integration.
//!
//! Adapters between [`Processor`] and `tower::Service<Event>`:
//!
//! - [`ProcessorService`] exposes a processor (typically an
//!   [`InterceptedProcessor`](crate::chain::InterceptedProcessor)) as a service
//! - [`ServiceProcessor`] wraps a service so it can be intercepted
//!
//! ```rust,ignore
//! let chain = InterceptedProcessor::builder(location, ServiceProcessor::new(svc)).build(&registry);
//! let service = ProcessorService::new(chain);
//! ```

use futures::future::BoxFuture;
use interpose_core::{BoxError, Event, Processor};
use std::{
    future::poll_fn,
    sync::Arc,
    task::{Context, Poll},
};
use ::tower::Service;

// ============================================================================
// Processor → Service Adapter
// ============================================================================

/// Wraps a [`Processor`] as a tower `Service<Event>`.
pub struct ProcessorService<P> {
    processor: Arc<P>,
}

impl<P> ProcessorService<P> {
    /// Create a new service wrapping the given processor.
    pub fn new(processor: P) -> Self {
        Self::from_arc(Arc::new(processor))
    }

    /// Wrap a processor that is already shared.
    pub fn from_arc(processor: Arc<P>) -> Self {
        Self { processor }
    }

    /// Get a reference to the inner processor.
    pub fn inner(&self) -> &P {
        &self.processor
    }
}

impl<P> Clone for ProcessorService<P> {
    fn clone(&self) -> Self {
        Self {
            processor: Arc::clone(&self.processor),
        }
    }
}

impl<P: Processor> Service<Event> for ProcessorService<P> {
    type Response = Event;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Event, BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Processors are always ready
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Event) -> Self::Future {
        let processor = Arc::clone(&self.processor);
        Box::pin(async move { processor.process(request).await })
    }
}

// ============================================================================
// Service → Processor Adapter
// ============================================================================

/// Wraps a tower `Service<Event>` as a [`Processor`].
///
/// The service is cloned per call and driven to readiness before use.
#[derive(Clone)]
pub struct ServiceProcessor<S> {
    service: S,
}

impl<S> ServiceProcessor<S> {
    /// Create a new processor wrapping the given service.
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Get a reference to the inner service.
    pub fn inner(&self) -> &S {
        &self.service
    }
}

impl<S> Processor for ServiceProcessor<S>
where
    S: Service<Event, Response = Event> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
{
    async fn process(&self, event: Event) -> Result<Event, BoxError> {
        let mut service = self.service.clone();
        poll_fn(|cx| service.poll_ready(cx)).await.map_err(Into::<BoxError>::into)?;
        service.call(event).await.map_err(Into::into)
    }
}
