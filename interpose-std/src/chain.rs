//! The chain adapter wrapping one processor in its interceptor layers.
//!
//! For interceptors `I1..In` (outermost first) and processor `P`, one
//! invocation runs
//!
//! ```text
//! resolve parameters
//! I1.before, I1.around -> proceed
//!     I2.before, I2.around -> proceed
//!         ...
//!             P
//!         ...
//!     I2.after
//! I1.after
//! dispose parameters
//! ```
//!
//! A layer that skips or fails stops the descent: nothing nested runs, but
//! every layer already entered still gets its `after`, innermost first.

use crate::registry::InterceptorRegistry;
use futures::{FutureExt, future::BoxFuture};
use interpose_core::{
    BoxError, Capabilities, ComponentLocation, Continuation, DynProcessor, Event, InterceptionAction,
    InterceptionEvent, Interceptor, NoopSink, Notification, NotificationSink, PanicError, Parameters,
    ParametersResolver, Phase, ProcessingError, Processor, RESOLVED_PARAMETERS_KEY, ResolutionContext,
    ResolvedParameters,
};
use std::{
    future::Future,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

struct Layer {
    interceptor: Arc<dyn Interceptor>,
    capabilities: Capabilities,
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`InterceptedProcessor`].
pub struct ChainBuilder {
    location: ComponentLocation,
    processor: Arc<dyn DynProcessor>,
    resolver: Option<Arc<dyn ParametersResolver>>,
    sink: Arc<dyn NotificationSink>,
    catch_panics: bool,
}

impl ChainBuilder {
    /// Resolve and dispose the processor's parameters around each invocation.
    pub fn resolver(mut self, resolver: impl ParametersResolver) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Shared variant of [`resolver`](Self::resolver).
    pub fn shared_resolver(mut self, resolver: Arc<dyn ParametersResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Receive start and completion notifications.
    pub fn notification_sink(mut self, sink: impl NotificationSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Shared variant of [`notification_sink`](Self::notification_sink).
    pub fn shared_notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Convert panics in interceptors and the processor into failures.
    /// Enabled by default.
    pub fn catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }

    /// Build the chain with the interceptors `registry` applies here.
    pub fn build(self, registry: &InterceptorRegistry) -> InterceptedProcessor {
        let layers: Vec<Layer> = registry
            .interceptors_for(&self.location)
            .into_iter()
            .map(|interceptor| Layer {
                capabilities: interceptor.capabilities(),
                interceptor,
            })
            .collect();

        #[cfg(feature = "tracing")]
        {
            let names: Vec<&str> = layers.iter().map(|layer| layer.interceptor.name()).collect();
            tracing::debug!(location = %self.location, interceptors = ?names, "interception chain built");
        }

        InterceptedProcessor {
            location: self.location,
            processor: self.processor,
            resolver: self.resolver,
            layers,
            sink: self.sink,
            catch_panics: self.catch_panics,
        }
    }

    /// Build the chain without interceptors.
    pub fn build_bare(self) -> InterceptedProcessor {
        self.build(&InterceptorRegistry::empty())
    }
}

// ============================================================================
// Chain
// ============================================================================

/// A processor wrapped in its interceptor layers.
///
/// The set and order of layers is fixed when the chain is built. The chain
/// is immutable and can be invoked concurrently.
pub struct InterceptedProcessor {
    location: ComponentLocation,
    processor: Arc<dyn DynProcessor>,
    resolver: Option<Arc<dyn ParametersResolver>>,
    layers: Vec<Layer>,
    sink: Arc<dyn NotificationSink>,
    catch_panics: bool,
}

impl InterceptedProcessor {
    /// Start building a chain for `processor` at `location`.
    pub fn builder(location: ComponentLocation, processor: impl Processor) -> ChainBuilder {
        ChainBuilder {
            location,
            processor: Arc::new(processor),
            resolver: None,
            sink: Arc::new(NoopSink),
            catch_panics: true,
        }
    }

    /// The location of the wrapped processor.
    pub fn location(&self) -> &ComponentLocation {
        &self.location
    }

    /// Number of interceptor layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Names of the interceptors, outermost first.
    pub fn interceptor_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|layer| layer.interceptor.name())
    }

    /// Run one event through every layer and the processor.
    ///
    /// The returned event, and the event attached to a returned failure, never
    /// carry internal parameters added by the chain.
    pub async fn invoke(&self, event: Event) -> Result<Event, ProcessingError> {
        let correlation_id = event.correlation_id().to_owned();
        self.sink.notify(&Notification::InvocationStarted {
            location: &self.location,
            correlation_id: &correlation_id,
        });

        let outcome = match &self.resolver {
            Some(resolver) => self.invoke_resolved(resolver.as_ref(), event).await,
            None => self.run(0, &Parameters::empty(), event).await,
        };
        let outcome = outcome
            .map(|event| event.without_internal_parameter(RESOLVED_PARAMETERS_KEY))
            .map_err(|failure| failure.map_event(|event| event.without_internal_parameter(RESOLVED_PARAMETERS_KEY)));

        self.sink.notify(&Notification::InvocationCompleted {
            location: &self.location,
            correlation_id: &correlation_id,
            error_type: outcome.as_ref().err().map(ProcessingError::error_type),
        });
        outcome
    }

    async fn invoke_resolved(&self, resolver: &dyn ParametersResolver, event: Event) -> Result<Event, ProcessingError> {
        let ResolvedParameters { parameters, context } = match resolver.resolve_parameters(&event) {
            Ok(resolved) => resolved,
            Err(cause) => {
                let failure = ProcessingError::parameter_resolution(self.location.clone(), cause);
                return Err(failure.with_event(event));
            }
        };
        let _disposal = Disposal {
            resolver,
            context: Some(context),
        };

        let event = event.with_internal_parameter(RESOLVED_PARAMETERS_KEY, Arc::new(parameters.clone()));
        self.run(0, &parameters, event).await
    }

    fn run<'a>(
        &'a self,
        index: usize,
        parameters: &'a Parameters,
        event: Event,
    ) -> BoxFuture<'a, Result<Event, ProcessingError>> {
        match self.layers.get(index) {
            Some(layer) => self.run_layer(layer, index, parameters, event).boxed(),
            None => self.run_processor(event).boxed(),
        }
    }

    async fn run_layer<'a>(
        &'a self,
        layer: &'a Layer,
        index: usize,
        parameters: &'a Parameters,
        event: Event,
    ) -> Result<Event, ProcessingError> {
        let event = InterceptionEvent::new(event);

        let outcome = match self.call_before(layer, parameters, &event) {
            Err(failure) => Err(failure),
            Ok(()) if layer.capabilities.contains(Capabilities::AROUND) => {
                self.call_around(layer, index, parameters, &event).await
            }
            Ok(()) => match self.run(index + 1, parameters, event.resolve()).await {
                Ok(result) => {
                    event.replace(result);
                    Ok(event.clone())
                }
                Err(failure) => Err(failure),
            },
        };

        // A nested failure carries the event as the nested stages left it.
        let (event, mut failure) = match outcome {
            Ok(returned) => (returned, None),
            Err(failure) => {
                if let Some(nested) = failure.event() {
                    event.replace(nested.without_error());
                }
                (event, Some(failure))
            }
        };

        if layer.capabilities.contains(Capabilities::AFTER) {
            let thrown = failure.as_ref();
            let result = self.guard(|| layer.interceptor.after(&self.location, &event, thrown));
            if let Err(cause) = result {
                failure = Some(self.classify(Phase::After, cause));
            }
        }

        match failure {
            Some(failure) => Err(failure.with_event(event.resolve())),
            None => Ok(event.resolve()),
        }
    }

    fn call_before(
        &self,
        layer: &Layer,
        parameters: &Parameters,
        event: &InterceptionEvent,
    ) -> Result<(), ProcessingError> {
        if !layer.capabilities.contains(Capabilities::BEFORE) {
            return Ok(());
        }
        self.guard(|| layer.interceptor.before(&self.location, parameters, event))
            .map_err(|cause| self.classify(Phase::Before, cause))
    }

    async fn call_around<'a>(
        &'a self,
        layer: &'a Layer,
        index: usize,
        parameters: &'a Parameters,
        event: &InterceptionEvent,
    ) -> Result<InterceptionEvent, ProcessingError> {
        let next: Continuation<'a> = Box::new(move |event: Event| self.run(index + 1, parameters, event));
        let action = InterceptionAction::new(&self.location, event.clone(), next);
        let interceptor = &layer.interceptor;
        let location = &self.location;
        let handle = event.clone();

        self.guard_async(async move { interceptor.around(location, parameters, handle, action).await })
            .await
            .map_err(|cause| self.classify(Phase::Around, cause))
    }

    async fn run_processor(&self, event: Event) -> Result<Event, ProcessingError> {
        let input = InterceptionEvent::new(event.clone());
        let processor = &self.processor;
        match self.guard_async(async move { processor.process_dyn(event).await }).await {
            Ok(result) => Ok(input.replace(result).resolve()),
            Err(cause) => {
                let failure = ProcessingError::from_boxed(cause, |cause| {
                    ProcessingError::unknown_processing(self.location.clone(), cause)
                });
                // A nested chain reports the event as it stood when it failed.
                if let Some(nested) = failure.event() {
                    input.replace(nested.without_error());
                }
                Err(failure.with_event(input.resolve()))
            }
        }
    }

    fn classify(&self, phase: Phase, cause: BoxError) -> ProcessingError {
        let failure = ProcessingError::from_boxed(cause, |cause| {
            ProcessingError::interception(self.location.clone(), phase, cause)
        });
        #[cfg(feature = "tracing")]
        {
            tracing::debug!(
                location = %self.location,
                %phase,
                kind = %failure.kind(),
                origin = %failure.location(),
                "interception failure"
            );
        }
        failure
    }

    fn guard<T>(&self, f: impl FnOnce() -> Result<T, BoxError>) -> Result<T, BoxError> {
        if !self.catch_panics {
            return f();
        }
        panic::catch_unwind(AssertUnwindSafe(f))
            .unwrap_or_else(|payload| Err(PanicError::from_payload(payload).into()))
    }

    async fn guard_async<T>(&self, future: impl Future<Output = Result<T, BoxError>>) -> Result<T, BoxError> {
        if !self.catch_panics {
            return future.await;
        }
        AssertUnwindSafe(future)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(PanicError::from_payload(payload).into()))
    }
}

impl Processor for InterceptedProcessor {
    async fn process(&self, event: Event) -> Result<Event, BoxError> {
        self.invoke(event).await.map_err(BoxError::from)
    }
}

impl std::fmt::Debug for InterceptedProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptedProcessor")
            .field("location", &self.location)
            .field("interceptors", &self.interceptor_names().collect::<Vec<_>>())
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

// ============================================================================
// Parameter Disposal
// ============================================================================

/// Disposes resolved parameters when dropped, so disposal also happens when
/// the invocation future is dropped mid-flight.
struct Disposal<'a> {
    resolver: &'a dyn ParametersResolver,
    context: Option<ResolutionContext>,
}

impl Drop for Disposal<'_> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            #[cfg(feature = "tracing")]
            {
                tracing::trace!("disposing resolved parameters");
            }
            self.resolver.dispose_resolved_parameters(context);
        }
    }
}
