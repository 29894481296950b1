//! Interceptors assembled from closures.

use futures::future::BoxFuture;
use interpose_core::{
    BoxError, Capabilities, ComponentLocation, InterceptionAction, InterceptionEvent, Interceptor, Parameters,
    ProcessingError,
};

type BeforeFn = Box<dyn Fn(&ComponentLocation, &Parameters, &InterceptionEvent) -> Result<(), BoxError> + Send + Sync>;

type AroundFn = Box<
    dyn for<'a> Fn(
            &'a ComponentLocation,
            &'a Parameters,
            InterceptionEvent,
            InterceptionAction<'a>,
        ) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>>
        + Send
        + Sync,
>;

type AfterFn =
    Box<dyn Fn(&ComponentLocation, &InterceptionEvent, Option<&ProcessingError>) -> Result<(), BoxError> + Send + Sync>;

/// An interceptor whose phases are closures.
///
/// Only the phases that were given are declared in
/// [`capabilities`](Interceptor::capabilities), so an interceptor without an
/// `around` closure takes the chain's fast path.
///
/// ```rust,ignore
/// let audit = FnInterceptor::named("audit")
///     .before(|location, _, event| {
///         event.set_session_property("entered", location.to_string());
///         Ok(())
///     })
///     .around(|_, _, _, action| action.proceed());
/// ```
pub struct FnInterceptor {
    name: String,
    before: Option<BeforeFn>,
    around: Option<AroundFn>,
    after: Option<AfterFn>,
}

impl FnInterceptor {
    /// Create an interceptor without phases.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            before: None,
            around: None,
            after: None,
        }
    }

    /// Set the `before` phase.
    pub fn before<F>(mut self, f: F) -> Self
    where
        F: Fn(&ComponentLocation, &Parameters, &InterceptionEvent) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.before = Some(Box::new(f));
        self
    }

    /// Set the `around` phase.
    pub fn around<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(
                &'a ComponentLocation,
                &'a Parameters,
                InterceptionEvent,
                InterceptionAction<'a>,
            ) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>>
            + Send
            + Sync
            + 'static,
    {
        self.around = Some(Box::new(f));
        self
    }

    /// Set the `after` phase.
    pub fn after<F>(mut self, f: F) -> Self
    where
        F: Fn(&ComponentLocation, &InterceptionEvent, Option<&ProcessingError>) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.after = Some(Box::new(f));
        self
    }
}

impl Interceptor for FnInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        let mut capabilities = Capabilities::empty();
        capabilities.set(Capabilities::BEFORE, self.before.is_some());
        capabilities.set(Capabilities::AROUND, self.around.is_some());
        capabilities.set(Capabilities::AFTER, self.after.is_some());
        capabilities
    }

    fn before(
        &self,
        location: &ComponentLocation,
        parameters: &Parameters,
        event: &InterceptionEvent,
    ) -> Result<(), BoxError> {
        match &self.before {
            Some(before) => before(location, parameters, event),
            None => Ok(()),
        }
    }

    fn around<'a>(
        &'a self,
        location: &'a ComponentLocation,
        parameters: &'a Parameters,
        event: InterceptionEvent,
        action: InterceptionAction<'a>,
    ) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>> {
        match &self.around {
            Some(around) => around(location, parameters, event, action),
            None => action.proceed(),
        }
    }

    fn after(
        &self,
        location: &ComponentLocation,
        event: &InterceptionEvent,
        thrown: Option<&ProcessingError>,
    ) -> Result<(), BoxError> {
        match &self.after {
            Some(after) => after(location, event, thrown),
            None => Ok(()),
        }
    }
}
