//! Testing utilities for Interpose.
//!
//! This module provides recording doubles to make testing interceptors and
//! chains easier.
//!
//! # Features
//!
//! - [`Journal`]: An ordered, shared call log
//! - [`RecordingInterceptor`]: An interceptor that journals each phase
//! - [`RecordingProcessor`]: A processor that journals, counts, and can fail
//! - [`CountingResolver`]: A parameter resolver counting resolve and dispose
//! - [`RecordingSink`]: A notification sink that keeps what it receives

use futures::future::BoxFuture;
use interpose_core::{
    BoxError, Capabilities, ComponentLocation, Event, InterceptionAction, InterceptionEvent, Interceptor,
    Notification, NotificationSink, ParameterValue, Parameters, ParametersResolver, ProcessingError, Processor,
    ResolutionContext, ResolvedParameters,
};
use serde_json::Value;
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

// ============================================================================
// Journal
// ============================================================================

/// An ordered call log shared between test doubles.
///
/// # Example
///
/// ```rust,ignore
/// let journal = Journal::new();
/// let outer = RecordingInterceptor::new("I1", journal.clone());
///
/// chain.invoke(event).await?;
/// assert_eq!(journal.entries(), ["I1.before", "I1.around", "P", "I1.after"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).push(entry.into());
    }

    /// Get a copy of all entries.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of entries equal to `entry`.
    pub fn count(&self, entry: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|recorded| *recorded == entry)
            .count()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

// ============================================================================
// Recording Interceptor
// ============================================================================

/// An interceptor that journals `NAME.before`, `NAME.around` and
/// `NAME.after` (or `NAME.after!` when a failure is propagating), and always
/// proceeds.
#[derive(Debug, Clone)]
pub struct RecordingInterceptor {
    name: String,
    journal: Journal,
    capabilities: Capabilities,
}

impl RecordingInterceptor {
    /// Create an interceptor declaring every capability.
    pub fn new(name: impl Into<String>, journal: Journal) -> Self {
        Self {
            name: name.into(),
            journal,
            capabilities: Capabilities::all(),
        }
    }

    /// Declare only the given capabilities.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl Interceptor for RecordingInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn before(&self, _: &ComponentLocation, _: &Parameters, _: &InterceptionEvent) -> Result<(), BoxError> {
        self.journal.record(format!("{}.before", self.name));
        Ok(())
    }

    fn around<'a>(
        &'a self,
        _: &'a ComponentLocation,
        _: &'a Parameters,
        _: InterceptionEvent,
        action: InterceptionAction<'a>,
    ) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>> {
        self.journal.record(format!("{}.around", self.name));
        action.proceed()
    }

    fn after(
        &self,
        _: &ComponentLocation,
        _: &InterceptionEvent,
        thrown: Option<&ProcessingError>,
    ) -> Result<(), BoxError> {
        let suffix = if thrown.is_some() { "!" } else { "" };
        self.journal.record(format!("{}.after{suffix}", self.name));
        Ok(())
    }
}

// ============================================================================
// Recording Processor
// ============================================================================

/// A processor that journals `P`, counts calls and keeps the events it saw.
///
/// By default it returns its input; it can instead replace the payload or
/// fail with a message.
#[derive(Clone)]
pub struct RecordingProcessor {
    journal: Journal,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<Event>>>,
    output: Option<Value>,
    failure: Option<String>,
}

impl RecordingProcessor {
    /// Create a pass-through processor.
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
            output: None,
            failure: None,
        }
    }

    /// Replace the payload with `payload`.
    pub fn returning(mut self, payload: impl Into<Value>) -> Self {
        self.output = Some(payload.into());
        self
    }

    /// Fail every call with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Number of calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Events received, in order.
    pub fn seen(&self) -> Vec<Event> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Processor for RecordingProcessor {
    async fn process(&self, event: Event) -> Result<Event, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.journal.record("P");
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
        if let Some(message) = &self.failure {
            return Err(message.clone().into());
        }
        Ok(match &self.output {
            Some(payload) => event.with_message(payload.clone()),
            None => event,
        })
    }
}

// ============================================================================
// Counting Resolver
// ============================================================================

/// Token stored in the [`ResolutionContext`] created by [`CountingResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionToken(pub usize);

/// A resolver exposing the payload as parameter `param`, and optionally a
/// parameter `broken` whose resolution fails.
///
/// Counts resolutions and disposals and records which tokens were disposed.
#[derive(Clone, Default)]
pub struct CountingResolver {
    resolved: Arc<AtomicUsize>,
    disposed: Arc<Mutex<Vec<ResolutionToken>>>,
    with_broken: bool,
    fail_resolution: bool,
}

impl CountingResolver {
    /// Create a resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also expose a `broken` parameter whose value fails to resolve.
    pub fn with_broken_parameter(mut self) -> Self {
        self.with_broken = true;
        self
    }

    /// Fail resolution as a whole.
    pub fn failing(mut self) -> Self {
        self.fail_resolution = true;
        self
    }

    /// Number of `resolve_parameters` calls.
    pub fn resolutions(&self) -> usize {
        self.resolved.load(Ordering::SeqCst)
    }

    /// Tokens passed back to `dispose_resolved_parameters`, in order.
    pub fn disposed(&self) -> Vec<ResolutionToken> {
        self.disposed.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ParametersResolver for CountingResolver {
    fn resolve_parameters(&self, event: &Event) -> Result<ResolvedParameters, BoxError> {
        let token = ResolutionToken(self.resolved.fetch_add(1, Ordering::SeqCst));
        if self.fail_resolution {
            return Err("parameter resolution failed".into());
        }
        let mut values = vec![ParameterValue::resolved(
            "param",
            "#[payload]",
            event.message().payload().clone(),
        )];
        if self.with_broken {
            values.push(ParameterValue::failed("broken", "#[broken]", "expected failure".into()));
        }
        Ok(ResolvedParameters {
            parameters: values.into_iter().collect(),
            context: ResolutionContext::new(token),
        })
    }

    fn dispose_resolved_parameters(&self, context: ResolutionContext) {
        if let Some(token) = context.into_inner::<ResolutionToken>() {
            self.disposed.lock().unwrap_or_else(PoisonError::into_inner).push(token);
        }
    }
}

// ============================================================================
// Recording Sink
// ============================================================================

/// A notification sink keeping `started <id>` / `completed <id> [error type]`
/// lines.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    journal: Journal,
}

impl RecordingSink {
    /// Create a sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines recorded so far.
    pub fn lines(&self) -> Vec<String> {
        self.journal.entries()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: &Notification<'_>) {
        let line = match notification {
            Notification::InvocationStarted { correlation_id, .. } => format!("started {correlation_id}"),
            Notification::InvocationCompleted {
                correlation_id,
                error_type: Some(error_type),
                ..
            } => format!("completed {correlation_id} {error_type}"),
            Notification::InvocationCompleted { correlation_id, .. } => format!("completed {correlation_id}"),
        };
        self.journal.record(line);
    }
}
