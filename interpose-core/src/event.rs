//! The unit of work flowing through processors.

use crate::error::ErrorType;
use crate::message::{Message, Session};
use std::{any::Any, collections::HashMap, fmt, sync::Arc};

/// A value stored in an event's internal parameters.
pub type InternalParameter = Arc<dyn Any + Send + Sync>;

/// Error information attached to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventError {
    error_type: ErrorType,
    description: String,
}

impl EventError {
    /// Create error information.
    pub fn new(error_type: ErrorType, description: impl Into<String>) -> Self {
        Self {
            error_type,
            description: description.into(),
        }
    }

    /// The error type.
    pub fn error_type(&self) -> &ErrorType {
        &self.error_type
    }

    /// A human-readable description of the cause.
    pub fn description(&self) -> &str {
        &self.description
    }
}

#[derive(Clone)]
struct EventInner {
    correlation_id: Arc<str>,
    message: Message,
    session: Session,
    error: Option<EventError>,
    internal_parameters: HashMap<String, InternalParameter>,
}

/// An immutable event.
///
/// Cloning is cheap. Every `with_*` method returns a new event and leaves the
/// receiver untouched; the correlation id is fixed at construction.
#[derive(Clone)]
pub struct Event {
    inner: Arc<EventInner>,
}

impl Event {
    /// Create an event with a generated correlation id and a fresh session.
    pub fn new(message: impl Into<Message>) -> Self {
        Self::builder().message(message).build()
    }

    /// Start building an event.
    pub fn builder() -> EventBuilder {
        EventBuilder::default()
    }

    /// The correlation id.
    pub fn correlation_id(&self) -> &str {
        &self.inner.correlation_id
    }

    /// The message.
    pub fn message(&self) -> &Message {
        &self.inner.message
    }

    /// The session.
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// The error, if the event represents a failure.
    pub fn error(&self) -> Option<&EventError> {
        self.inner.error.as_ref()
    }

    /// Look up an internal parameter.
    pub fn internal_parameter(&self, key: &str) -> Option<&InternalParameter> {
        self.inner.internal_parameters.get(key)
    }

    /// Look up an internal parameter of a known type.
    pub fn internal_parameter_as<T: Any>(&self, key: &str) -> Option<&T> {
        self.internal_parameter(key)?.downcast_ref::<T>()
    }

    /// Keys of all internal parameters.
    pub fn internal_parameter_keys(&self) -> impl Iterator<Item = &str> {
        self.inner.internal_parameters.keys().map(String::as_str)
    }

    /// Whether any internal parameter is set.
    pub fn has_internal_parameters(&self) -> bool {
        !self.inner.internal_parameters.is_empty()
    }

    /// Copy of this event with another message.
    pub fn with_message(&self, message: impl Into<Message>) -> Event {
        self.derive(|inner| inner.message = message.into())
    }

    /// Copy of this event with another session.
    pub fn with_session(&self, session: Session) -> Event {
        self.derive(|inner| inner.session = session)
    }

    /// Copy of this event with its session modified by `f`.
    pub fn with_session_mut(&self, f: impl FnOnce(&mut Session)) -> Event {
        self.derive(|inner| f(&mut inner.session))
    }

    /// Copy of this event carrying the given error.
    pub fn with_error(&self, error: EventError) -> Event {
        self.derive(|inner| inner.error = Some(error))
    }

    /// Copy of this event without an error.
    pub fn without_error(&self) -> Event {
        if self.inner.error.is_none() {
            return self.clone();
        }
        self.derive(|inner| inner.error = None)
    }

    /// `other` under this event's correlation id.
    pub(crate) fn continued_by(&self, other: Event) -> Event {
        if self.inner.correlation_id == other.inner.correlation_id {
            return other;
        }
        let correlation_id = Arc::clone(&self.inner.correlation_id);
        other.derive(|inner| inner.correlation_id = correlation_id)
    }

    /// Copy of this event with an internal parameter set.
    pub fn with_internal_parameter(&self, key: impl Into<String>, value: InternalParameter) -> Event {
        self.derive(|inner| {
            inner.internal_parameters.insert(key.into(), value);
        })
    }

    /// Copy of this event without the given internal parameter.
    ///
    /// Returns a clone sharing the same storage when the key is absent.
    pub fn without_internal_parameter(&self, key: &str) -> Event {
        if !self.inner.internal_parameters.contains_key(key) {
            return self.clone();
        }
        self.derive(|inner| {
            inner.internal_parameters.remove(key);
        })
    }

    /// Whether two handles share the same storage.
    pub fn ptr_eq(&self, other: &Event) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn derive(&self, f: impl FnOnce(&mut EventInner)) -> Event {
        let mut next = self.clone();
        f(Arc::make_mut(&mut next.inner));
        next
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("correlation_id", &self.inner.correlation_id)
            .field("message", &self.inner.message)
            .field("session", &self.inner.session.id())
            .field("error", &self.inner.error)
            .field(
                "internal_parameters",
                &self.inner.internal_parameters.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`Event`].
#[derive(Debug, Default)]
pub struct EventBuilder {
    correlation_id: Option<String>,
    legacy_correlation_id: Option<String>,
    message: Message,
    session: Option<Session>,
}

impl EventBuilder {
    /// Use an explicit correlation id.
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Correlation id inherited from an older producer.
    ///
    /// Only used when no explicit id is given.
    pub fn legacy_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.legacy_correlation_id = Some(id.into());
        self
    }

    /// Set the message.
    pub fn message(mut self, message: impl Into<Message>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the session.
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Build the event, generating a correlation id if none was given.
    pub fn build(self) -> Event {
        let correlation_id = self
            .correlation_id
            .or(self.legacy_correlation_id)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Event {
            inner: Arc::new(EventInner {
                correlation_id: correlation_id.into(),
                message: self.message,
                session: self.session.unwrap_or_default(),
                error: None,
                internal_parameters: HashMap::new(),
            }),
        }
    }
}
