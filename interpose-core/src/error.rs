//! Error types for Interpose.
//!
//! This module provides the failure taxonomy of an intercepted invocation:
//!
//! - [`ProcessingError`] - The single error type leaving a chain
//! - [`FailureKind`] - Which party failed and in which [`Phase`]
//! - [`ErrorType`] - Routing key used by error handlers
//! - [`PanicError`] / [`InterceptionVeto`] - Causes synthesised by the pipeline

use crate::event::{Event, EventError};
use crate::location::ComponentLocation;
use std::{any::Any, borrow::Cow, error::Error, fmt, sync::Arc};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// A reference-counted error, cheap to clone and share between layers.
pub type SharedError = Arc<dyn Error + Send + Sync + 'static>;

// ============================================================================
// Error Type
// ============================================================================

/// A namespaced error identifier, e.g. `CORE:UNKNOWN`.
///
/// Error handlers route on this value rather than on the concrete cause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorType {
    namespace: Cow<'static, str>,
    identifier: Cow<'static, str>,
}

impl ErrorType {
    /// Assigned to causes the pipeline cannot classify any further.
    pub const UNKNOWN: ErrorType = ErrorType::from_static("CORE", "UNKNOWN");

    /// Create an error type from owned or borrowed parts.
    pub fn new(namespace: impl Into<Cow<'static, str>>, identifier: impl Into<Cow<'static, str>>) -> Self {
        Self {
            namespace: namespace.into(),
            identifier: identifier.into(),
        }
    }

    /// Create an error type in a `const` context.
    pub const fn from_static(namespace: &'static str, identifier: &'static str) -> Self {
        Self {
            namespace: Cow::Borrowed(namespace),
            identifier: Cow::Borrowed(identifier),
        }
    }

    /// Parse `NAMESPACE:IDENTIFIER`. A missing namespace defaults to `CORE`.
    pub fn parse(value: &str) -> Self {
        match value.split_once(':') {
            Some((namespace, identifier)) => Self::new(namespace.to_owned(), identifier.to_owned()),
            None => Self::new("CORE", value.to_owned()),
        }
    }

    /// The namespace part.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The identifier part.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.identifier)
    }
}

// ============================================================================
// Processing Error
// ============================================================================

/// The interceptor phase in which a failure was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// `before` returned an error or panicked.
    Before,
    /// `around` returned an error, panicked, or called `fail`.
    Around,
    /// `after` returned an error or panicked.
    After,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Before => "before",
            Phase::Around => "around",
            Phase::After => "after",
        })
    }
}

/// Classification of a [`ProcessingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// An interceptor failed, or vetoed the invocation with a raw cause.
    Interception(Phase),
    /// An interceptor vetoed the invocation with an explicit [`ErrorType`].
    Structured,
    /// The wrapped processor failed.
    UnknownProcessing,
    /// Parameters could not be resolved before the first layer ran.
    ParameterResolution,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Interception(phase) => write!(f, "interception failed in `{phase}`"),
            FailureKind::Structured => f.write_str("invocation vetoed by interceptor"),
            FailureKind::UnknownProcessing => f.write_str("processor failed"),
            FailureKind::ParameterResolution => f.write_str("parameter resolution failed"),
        }
    }
}

/// The error produced by an intercepted invocation.
///
/// The cause is reachable with one unwrap through [`Error::source`] or
/// [`ProcessingError::cause`]. Once classified, a `ProcessingError` travels
/// through outer layers unchanged, so [`location`](Self::location) names the
/// deepest component that observed the failure.
#[derive(Debug, Clone)]
pub struct ProcessingError {
    kind: FailureKind,
    location: ComponentLocation,
    error_type: ErrorType,
    cause: SharedError,
    event: Option<Event>,
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {} ({})", self.kind, self.location, self.error_type)
    }
}

// The cause is exposed unwrapped so callers can downcast it directly.
impl Error for ProcessingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

impl ProcessingError {
    /// Failure raised by an interceptor in the given phase.
    pub fn interception(location: ComponentLocation, phase: Phase, cause: BoxError) -> Self {
        Self::new(FailureKind::Interception(phase), location, ErrorType::UNKNOWN, cause.into())
    }

    /// Veto with an explicit error type.
    ///
    /// Without a cause, an [`InterceptionVeto`] naming the error type is used.
    pub fn structured(location: ComponentLocation, error_type: ErrorType, cause: Option<BoxError>) -> Self {
        let cause: SharedError = match cause {
            Some(cause) => cause.into(),
            None => Arc::new(InterceptionVeto {
                error_type: error_type.clone(),
            }),
        };
        Self::new(FailureKind::Structured, location, error_type, cause)
    }

    /// Failure raised by the wrapped processor.
    pub fn unknown_processing(location: ComponentLocation, cause: BoxError) -> Self {
        Self::new(FailureKind::UnknownProcessing, location, ErrorType::UNKNOWN, cause.into())
    }

    /// Failure raised while resolving parameters.
    pub fn parameter_resolution(location: ComponentLocation, cause: BoxError) -> Self {
        Self::new(FailureKind::ParameterResolution, location, ErrorType::UNKNOWN, cause.into())
    }

    fn new(kind: FailureKind, location: ComponentLocation, error_type: ErrorType, cause: SharedError) -> Self {
        Self {
            kind,
            location,
            error_type,
            cause,
            event: None,
        }
    }

    /// Recover a `ProcessingError` carried inside a [`BoxError`], or classify
    /// the error with `classify` when it is anything else.
    pub fn from_boxed(error: BoxError, classify: impl FnOnce(BoxError) -> Self) -> Self {
        match error.downcast::<ProcessingError>() {
            Ok(error) => *error,
            Err(other) => classify(other),
        }
    }

    /// Attach the event as it stood when the failure left a layer.
    ///
    /// The event's error field is set from this failure.
    pub fn with_event(mut self, event: Event) -> Self {
        let error = EventError::new(self.error_type.clone(), self.cause.to_string());
        self.event = Some(event.with_error(error));
        self
    }

    /// Apply `f` to the attached event, if any.
    pub fn map_event(mut self, f: impl FnOnce(Event) -> Event) -> Self {
        self.event = self.event.map(f);
        self
    }

    /// The classification.
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// The component where the failure was classified.
    pub fn location(&self) -> &ComponentLocation {
        &self.location
    }

    /// The error type handlers route on.
    pub fn error_type(&self) -> &ErrorType {
        &self.error_type
    }

    /// The immediate cause.
    pub fn cause(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// The shared handle to the immediate cause.
    pub fn shared_cause(&self) -> &SharedError {
        &self.cause
    }

    /// The last error in the source chain, starting at the cause.
    pub fn root_cause(&self) -> &(dyn Error + 'static) {
        let mut current: &(dyn Error + 'static) = self.cause.as_ref();
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    /// The first error of type `T` in the source chain, starting at the cause.
    pub fn find_cause<T: Error + 'static>(&self) -> Option<&T> {
        let mut current: Option<&(dyn Error + 'static)> = Some(self.cause.as_ref());
        while let Some(error) = current {
            if let Some(found) = error.downcast_ref::<T>() {
                return Some(found);
            }
            current = error.source();
        }
        None
    }

    /// The event at the time of failure, with its error field set.
    pub fn event(&self) -> Option<&Event> {
        self.event.as_ref()
    }

    /// Whether the wrapped processor itself failed.
    pub fn is_processor_failure(&self) -> bool {
        self.kind == FailureKind::UnknownProcessing
    }

    /// Whether an interceptor failed or vetoed the invocation.
    pub fn is_interception_failure(&self) -> bool {
        matches!(self.kind, FailureKind::Interception(_) | FailureKind::Structured)
    }
}

// ============================================================================
// Synthesised Causes
// ============================================================================

/// Cause recorded when an interceptor vetoes with an error type only.
#[derive(Debug, Clone, Error)]
#[error("invocation failed by interceptor with error type {error_type}")]
pub struct InterceptionVeto {
    /// The error type passed to the veto.
    pub error_type: ErrorType,
}

/// A panic captured inside an interceptor or processor.
#[derive(Debug, Clone, Error)]
#[error("panicked: {message}")]
pub struct PanicError {
    message: String,
}

impl PanicError {
    /// Build from a panic payload as returned by `catch_unwind`.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (*message).to_owned(),
                Err(_) => "<non-string panic payload>".to_owned(),
            },
        };
        Self { message }
    }

    /// The panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
