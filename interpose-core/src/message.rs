//! Message and session values carried by an [`Event`](crate::Event).

use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};

/// The payload of an event, plus free-form attributes.
///
/// Payloads are dynamically typed JSON values so that interceptors written
/// for one processor can inspect events produced by any other.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    payload: Value,
    attributes: Value,
}

impl Message {
    /// Create a message with the given payload and no attributes.
    pub fn of(payload: impl Into<Value>) -> Self {
        Self {
            payload: payload.into(),
            attributes: Value::Null,
        }
    }

    /// Return a copy carrying the given attributes.
    pub fn with_attributes(mut self, attributes: impl Into<Value>) -> Self {
        self.attributes = attributes.into();
        self
    }

    /// The payload.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The attributes.
    pub fn attributes(&self) -> &Value {
        &self.attributes
    }
}

impl From<Value> for Message {
    fn from(payload: Value) -> Self {
        Self::of(payload)
    }
}

impl From<&str> for Message {
    fn from(payload: &str) -> Self {
        Self::of(payload)
    }
}

impl From<String> for Message {
    fn from(payload: String) -> Self {
        Self::of(payload)
    }
}

/// A property bag shared by the events of one conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: Arc<str>,
    properties: BTreeMap<String, Value>,
}

impl Session {
    /// Create an empty session with a generated id.
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    /// Create an empty session with the given id.
    pub fn with_id(id: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            properties: BTreeMap::new(),
        }
    }

    /// The session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Look up a property.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Set a property, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(key.into(), value.into())
    }

    /// Remove a property.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.properties.remove(key)
    }

    /// Iterate over properties in key order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the session holds no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
