//! The continuation handed to [`Interceptor::around`](crate::Interceptor::around).
//!
//! An [`InterceptionAction`] is consumed by whichever terminal operation the
//! interceptor chooses, so choosing twice does not compile:
//!
//! ```compile_fail,E0382
//! use futures::future::BoxFuture;
//! use interpose_core::{BoxError, InterceptionAction, InterceptionEvent};
//!
//! fn proceed_then_skip<'a>(
//!     action: InterceptionAction<'a>,
//! ) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>> {
//!     let _ = action.proceed();
//!     action.skip()
//! }
//! ```
//!
//! ```compile_fail,E0382
//! use futures::future::BoxFuture;
//! use interpose_core::{BoxError, InterceptionAction, InterceptionEvent};
//!
//! fn proceed_then_fail<'a>(
//!     action: InterceptionAction<'a>,
//! ) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>> {
//!     let _ = action.proceed();
//!     action.fail("too late")
//! }
//! ```

use crate::error::{BoxError, ErrorType, Phase, ProcessingError};
use crate::event::Event;
use crate::interception::InterceptionEvent;
use crate::location::ComponentLocation;
use futures::future::{self, BoxFuture, FutureExt};
use std::fmt;

/// Runs everything nested inside a layer: inner layers, then the processor.
pub type Continuation<'a> =
    Box<dyn FnOnce(Event) -> BoxFuture<'a, Result<Event, ProcessingError>> + Send + 'a>;

/// One-shot decision of an `around` call.
pub struct InterceptionAction<'a> {
    location: &'a ComponentLocation,
    event: InterceptionEvent,
    next: Continuation<'a>,
}

impl<'a> InterceptionAction<'a> {
    /// Create an action over `event` that runs `next` on proceed.
    pub fn new(location: &'a ComponentLocation, event: InterceptionEvent, next: Continuation<'a>) -> Self {
        Self { location, event, next }
    }

    /// The location of the intercepted processor.
    pub fn location(&self) -> &ComponentLocation {
        self.location
    }

    /// The event this action writes to.
    pub fn event(&self) -> &InterceptionEvent {
        &self.event
    }

    /// Run the nested stage.
    ///
    /// The nested stage sees the event as it is when `proceed` is called. Its
    /// result is written into the event when it completes, so a mutation made
    /// after awaiting `proceed` wins over the processor's output, while one
    /// made before completion is overwritten by it.
    ///
    /// A nested failure is returned as a boxed [`ProcessingError`]; returning
    /// it unchanged keeps its original classification.
    pub fn proceed(self) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>> {
        let Self { event, next, .. } = self;
        let nested = next(event.resolve());
        async move {
            match nested.await {
                Ok(result) => {
                    event.replace(result);
                    Ok(event)
                }
                Err(failure) => Err(Box::new(failure) as BoxError),
            }
        }
        .boxed()
    }

    /// Short-circuit: the nested stage never runs and the current event
    /// becomes this layer's result.
    pub fn skip(self) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>> {
        future::ready(Ok(self.event)).boxed()
    }

    /// Veto with a cause. The failure keeps exactly this cause.
    pub fn fail(self, cause: impl Into<BoxError>) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>> {
        let failure = ProcessingError::interception(self.location.clone(), Phase::Around, cause.into());
        self.reject(failure)
    }

    /// Veto with an error type, for routing by error handlers.
    pub fn fail_with_type(self, error_type: ErrorType) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>> {
        let failure = ProcessingError::structured(self.location.clone(), error_type, None);
        self.reject(failure)
    }

    /// Veto with an error type and the cause behind it.
    pub fn fail_with(
        self,
        error_type: ErrorType,
        cause: impl Into<BoxError>,
    ) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>> {
        let failure = ProcessingError::structured(self.location.clone(), error_type, Some(cause.into()));
        self.reject(failure)
    }

    fn reject(self, failure: ProcessingError) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>> {
        let failure = failure.with_event(self.event.resolve());
        future::ready(Err(Box::new(failure) as BoxError)).boxed()
    }
}

impl fmt::Debug for InterceptionAction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptionAction")
            .field("location", self.location)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}
