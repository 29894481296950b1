//! Component identity.

use std::{fmt, sync::Arc};

/// The kind of a processor, e.g. `test:processor`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentIdentifier {
    namespace: Arc<str>,
    name: Arc<str>,
}

impl ComponentIdentifier {
    /// Create an identifier from its parts.
    pub fn new(namespace: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse `namespace:name`. A missing namespace defaults to `core`.
    pub fn parse(value: &str) -> Self {
        match value.split_once(':') {
            Some((namespace, name)) => Self::new(namespace, name),
            None => Self::new("core", value),
        }
    }

    /// The namespace part.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The name part.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ComponentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

impl From<&str> for ComponentIdentifier {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Where a processor sits: its container, the path inside it, and its kind.
///
/// Locations are only compared, hashed and displayed; interceptors receive a
/// reference and factories use them to decide applicability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentLocation {
    container: Arc<str>,
    path: Arc<str>,
    identifier: ComponentIdentifier,
}

impl ComponentLocation {
    /// Create a location, e.g. `ComponentLocation::new("flow", "0", "test:processor")`.
    pub fn new(
        container: impl Into<Arc<str>>,
        path: impl Into<Arc<str>>,
        identifier: impl Into<ComponentIdentifier>,
    ) -> Self {
        Self {
            container: container.into(),
            path: path.into(),
            identifier: identifier.into(),
        }
    }

    /// Name of the enclosing container (e.g. the flow).
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Path of the processor inside its container.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `container/path`.
    pub fn qualified_path(&self) -> String {
        format!("{}/{}", self.container, self.path)
    }

    /// The kind of processor at this location.
    pub fn identifier(&self) -> &ComponentIdentifier {
        &self.identifier
    }
}

impl fmt::Display for ComponentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} @ {}", self.container, self.path, self.identifier)
    }
}
