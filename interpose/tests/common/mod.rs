#![allow(dead_code)]

use futures::{
    FutureExt,
    future::{self, BoxFuture},
};
use interpose::{
    BoxError, Capabilities, ComponentLocation, ErrorType, Event, InterceptedProcessor, InterceptionAction,
    InterceptionEvent, Interceptor, Parameters, ProcessingError, RegistryBuilder, shared,
    testing::{Journal, RecordingProcessor},
};
use serde_json::Value;
use std::{
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

// ============================================================================
// Fixtures
// ============================================================================

pub fn location() -> ComponentLocation {
    ComponentLocation::new("flow", "0", "test:processor")
}

pub fn expect_ok(result: Result<Event, ProcessingError>) -> Event {
    match result {
        Ok(event) => event,
        Err(failure) => panic!("unexpected failure: {failure}"),
    }
}

pub fn expect_err(result: Result<Event, ProcessingError>) -> ProcessingError {
    match result {
        Ok(event) => panic!("expected a failure, got {event:?}"),
        Err(failure) => failure,
    }
}

pub fn payload(event: &Event) -> Value {
    event.message().payload().clone()
}

/// Build a chain over `processor` from interceptors, outermost first.
pub fn chain_of(processor: RecordingProcessor, interceptors: &[Scripted]) -> InterceptedProcessor {
    let registry = interceptors
        .iter()
        .cloned()
        .fold(RegistryBuilder::new(), |builder, interceptor| builder.register(shared(interceptor)))
        .freeze();
    InterceptedProcessor::builder(location(), processor).build(&registry)
}

// ============================================================================
// Test Error
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestError(pub String);

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "test error: {}", self.0)
    }
}

impl std::error::Error for TestError {}

fn test_error(message: String) -> BoxError {
    Box::new(TestError(message))
}

// ============================================================================
// Scripted Interceptor
// ============================================================================

/// What a [`Scripted`] interceptor does in `around`.
#[derive(Debug, Clone)]
pub enum Around {
    Proceed,
    Skip,
    Fail(String),
    FailWithType(ErrorType),
    SetPayloadThenSkip(Value),
    SetPayloadAfterProceed(Value),
    SetPayloadWhileProceeding(Value),
    ErrorAfterProceed(String),
    ErrorAfterSkip(String),
    /// Return an error without touching the action.
    Throw(String),
    /// Return the event without touching the action.
    Ignore,
    /// Sleep, proceed, then yield before completing.
    Deferred(Duration),
}

/// An interceptor driven by a script, journaling `NAME.phase` entries the
/// same way `RecordingInterceptor` does and keeping what it observed.
#[derive(Clone)]
pub struct Scripted {
    name: String,
    journal: Journal,
    capabilities: Capabilities,
    before_payload: Option<Value>,
    before_error: Option<String>,
    around: Around,
    after_error: Option<String>,
    observed: Arc<Mutex<Vec<(String, Value)>>>,
    thrown: Arc<Mutex<Vec<Option<ProcessingError>>>>,
}

impl Scripted {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_owned(),
            journal: journal.clone(),
            capabilities: Capabilities::all(),
            before_payload: None,
            before_error: None,
            around: Around::Proceed,
            after_error: None,
            observed: Arc::default(),
            thrown: Arc::default(),
        }
    }

    pub fn around(mut self, around: Around) -> Self {
        self.around = around;
        self
    }

    pub fn before_sets(mut self, payload: impl Into<Value>) -> Self {
        self.before_payload = Some(payload.into());
        self
    }

    pub fn before_throws(mut self, message: &str) -> Self {
        self.before_error = Some(message.to_owned());
        self
    }

    pub fn after_throws(mut self, message: &str) -> Self {
        self.after_error = Some(message.to_owned());
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// `(phase, payload)` pairs seen by this interceptor, in order.
    pub fn observed(&self) -> Vec<(String, Value)> {
        self.observed.lock().unwrap().clone()
    }

    /// Payload seen in the given phase.
    pub fn payload_in(&self, phase: &str) -> Option<Value> {
        self.observed()
            .into_iter()
            .find(|(seen, _)| seen == phase)
            .map(|(_, payload)| payload)
    }

    /// Failures passed to `after`, one entry per call.
    pub fn thrown(&self) -> Vec<Option<ProcessingError>> {
        self.thrown.lock().unwrap().clone()
    }

    fn observe(&self, phase: &str, event: &InterceptionEvent) {
        self.journal.record(format!("{}.{phase}", self.name));
        self.observed.lock().unwrap().push((phase.to_owned(), event.payload()));
    }
}

impl Interceptor for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn before(&self, _: &ComponentLocation, _: &Parameters, event: &InterceptionEvent) -> Result<(), BoxError> {
        self.observe("before", event);
        if let Some(message) = &self.before_error {
            return Err(test_error(message.clone()));
        }
        if let Some(payload) = &self.before_payload {
            event.set_message(payload.clone());
        }
        Ok(())
    }

    fn around<'a>(
        &'a self,
        _: &'a ComponentLocation,
        _: &'a Parameters,
        event: InterceptionEvent,
        action: InterceptionAction<'a>,
    ) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>> {
        self.observe("around", &event);
        match self.around.clone() {
            Around::Proceed => action.proceed(),
            Around::Skip => action.skip(),
            Around::Fail(message) => action.fail(TestError(message)),
            Around::FailWithType(error_type) => action.fail_with_type(error_type),
            Around::SetPayloadThenSkip(payload) => {
                event.set_message(payload);
                action.skip()
            }
            Around::SetPayloadAfterProceed(payload) => async move {
                let event = action.proceed().await?;
                event.set_message(payload);
                Ok::<_, BoxError>(event)
            }
            .boxed(),
            Around::SetPayloadWhileProceeding(payload) => {
                let pending = action.proceed();
                event.set_message(payload);
                pending
            }
            Around::ErrorAfterProceed(message) => async move {
                action.proceed().await?;
                Err::<InterceptionEvent, BoxError>(test_error(message))
            }
            .boxed(),
            Around::ErrorAfterSkip(message) => async move {
                action.skip().await?;
                Err::<InterceptionEvent, BoxError>(test_error(message))
            }
            .boxed(),
            Around::Throw(message) => future::ready(Err(test_error(message))).boxed(),
            Around::Ignore => future::ready(Ok(event)).boxed(),
            Around::Deferred(delay) => async move {
                tokio::time::sleep(delay).await;
                let event = action.proceed().await?;
                tokio::task::yield_now().await;
                Ok::<_, BoxError>(event)
            }
            .boxed(),
        }
    }

    fn after(
        &self,
        _: &ComponentLocation,
        event: &InterceptionEvent,
        thrown: Option<&ProcessingError>,
    ) -> Result<(), BoxError> {
        let phase = if thrown.is_some() { "after!" } else { "after" };
        self.observe(phase, event);
        self.thrown.lock().unwrap().push(thrown.cloned());
        match &self.after_error {
            Some(message) => Err(test_error(message.clone())),
            None => Ok(()),
        }
    }
}
