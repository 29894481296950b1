//! The mutable event view handed to interceptors.

use crate::event::{Event, EventError};
use crate::message::{Message, Session};
use serde_json::Value;
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// A shared, mutable view over the event of one layer.
///
/// Clones observe the same state: a mutation made through the copy passed to
/// `around` is visible to `after`, even when `around` fails. Writes are
/// applied in the order they happen; [`resolve`](Self::resolve) materialises
/// the current state as an immutable [`Event`].
#[derive(Clone)]
pub struct InterceptionEvent {
    state: Arc<Mutex<Event>>,
}

impl InterceptionEvent {
    /// Wrap an event.
    pub fn new(event: Event) -> Self {
        Self {
            state: Arc::new(Mutex::new(event)),
        }
    }

    fn state(&self) -> MutexGuard<'_, Event> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&Event) -> Event) -> &Self {
        let mut state = self.state();
        *state = f(&state);
        self
    }

    /// The correlation id. Interceptors cannot change it.
    pub fn correlation_id(&self) -> String {
        self.state().correlation_id().to_owned()
    }

    /// The current message.
    pub fn message(&self) -> Message {
        self.state().message().clone()
    }

    /// The current payload.
    pub fn payload(&self) -> Value {
        self.state().message().payload().clone()
    }

    /// The current session.
    pub fn session(&self) -> Session {
        self.state().session().clone()
    }

    /// The current error, if any.
    pub fn error(&self) -> Option<EventError> {
        self.state().error().cloned()
    }

    /// Replace the message.
    pub fn set_message(&self, message: impl Into<Message>) -> &Self {
        let message = message.into();
        self.update(|event| event.with_message(message))
    }

    /// Replace the session.
    pub fn set_session(&self, session: Session) -> &Self {
        self.update(|event| event.with_session(session))
    }

    /// Set one session property.
    pub fn set_session_property(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        let (key, value) = (key.into(), value.into());
        self.update(|event| {
            event.with_session_mut(|session| {
                session.set(key, value);
            })
        })
    }

    /// Remove one session property.
    pub fn remove_session_property(&self, key: &str) -> &Self {
        self.update(|event| {
            event.with_session_mut(|session| {
                session.remove(key);
            })
        })
    }

    /// Replace the whole state with a nested stage's result.
    ///
    /// The correlation id stays the one this view started with, whatever
    /// `event` carries.
    pub fn replace(&self, event: Event) -> &Self {
        self.update(|current| current.continued_by(event))
    }

    /// The current state as an immutable event.
    pub fn resolve(&self) -> Event {
        self.state().clone()
    }
}

impl fmt::Debug for InterceptionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InterceptionEvent").field(&*self.state()).finish()
    }
}

impl From<Event> for InterceptionEvent {
    fn from(event: Event) -> Self {
        Self::new(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clones_share_writes() {
        let event = InterceptionEvent::new(Event::new("a"));
        let other = event.clone();
        other.set_message("b").set_session_property("k", 1);
        assert_eq!(event.payload(), json!("b"));
        assert_eq!(event.session().get("k"), Some(&json!(1)));
    }

    #[test]
    fn resolve_snapshots_state() {
        let event = InterceptionEvent::new(Event::new("a"));
        let snapshot = event.resolve();
        event.set_message("b");
        assert_eq!(snapshot.message().payload(), &json!("a"));
        assert_eq!(event.resolve().correlation_id(), snapshot.correlation_id());
    }

    #[test]
    fn replace_keeps_the_correlation_id() {
        let event = InterceptionEvent::new(Event::builder().correlation_id("corr-1").message("a").build());
        event.replace(Event::new("z"));
        assert_eq!(event.correlation_id(), "corr-1");
        assert_eq!(event.payload(), json!("z"));
    }

    #[test]
    fn session_can_be_swapped() {
        let event = InterceptionEvent::new(Event::new("a"));
        event.set_session(Session::with_id("replacement"));
        assert_eq!(event.session().id(), "replacement");
        event.set_session_property("x", true).remove_session_property("x");
        assert!(event.session().is_empty());
    }
}
