//! Interceptor registration.
//!
//! Factories are collected in a [`RegistryBuilder`] and frozen into an
//! immutable [`InterceptorRegistry`] before any chain is built. The
//! [`InterceptorManager`] offers the same lifecycle behind a shared handle
//! and rejects registrations that arrive after the freeze.

use crate::factory::InterceptorFactory;
use interpose_core::{ComponentLocation, Interceptor};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Errors raised by misconfigured registries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The registry was already frozen.
    #[error("interceptor registry is frozen; cannot {0}")]
    Frozen(&'static str),

    /// A group was listed twice in the group order.
    #[error("group `{0}` appears more than once in the group order")]
    DuplicateGroup(String),
}

#[derive(Clone)]
struct Entry {
    factory: Arc<dyn InterceptorFactory>,
}

impl Entry {
    fn group(&self) -> Option<&str> {
        self.factory.group()
    }
}

// ============================================================================
// Frozen Registry
// ============================================================================

/// An immutable, ordered snapshot of interceptor factories.
///
/// The first factory forms the outermost layer. Cloning is cheap.
#[derive(Clone, Default)]
pub struct InterceptorRegistry {
    entries: Arc<[Entry]>,
}

impl InterceptorRegistry {
    /// A registry without factories.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of registered factories.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no factory is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Factories in layer order, outermost first.
    pub fn factories(&self) -> impl Iterator<Item = &Arc<dyn InterceptorFactory>> {
        self.entries.iter().map(|entry| &entry.factory)
    }

    /// Interceptors applicable to `location`, outermost first.
    ///
    /// Each applicable factory is asked to create its interceptor once.
    pub fn interceptors_for(&self, location: &ComponentLocation) -> Vec<Arc<dyn Interceptor>> {
        self.factories()
            .filter(|factory| factory.should_intercept(location))
            .map(|factory| factory.create())
            .collect()
    }
}

impl std::fmt::Debug for InterceptorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorRegistry")
            .field("groups", &self.entries.iter().map(Entry::group).collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder collecting factories in registration order.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<Entry>,
    group_order: Vec<String>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a factory. Registering the same factory twice adds two layers.
    pub fn register(mut self, factory: impl InterceptorFactory) -> Self {
        self.push(Arc::new(factory));
        self
    }

    /// Append a factory that is already shared.
    pub fn register_arc(mut self, factory: Arc<dyn InterceptorFactory>) -> Self {
        self.push(factory);
        self
    }

    fn push(&mut self, factory: Arc<dyn InterceptorFactory>) {
        self.entries.push(Entry { factory });
    }

    /// Order factories by group when frozen.
    ///
    /// Factories of the listed groups come first, in the listed order; all
    /// other factories follow. Registration order is kept within each
    /// partition. A later call replaces an earlier one.
    pub fn group_order<I, S>(mut self, groups: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_order = validate_group_order(groups)?;
        Ok(self)
    }

    /// Freeze into an immutable registry.
    pub fn freeze(self) -> InterceptorRegistry {
        let entries = order_by_group(self.entries, &self.group_order);
        #[cfg(feature = "tracing")]
        {
            tracing::debug!(factories = entries.len(), groups = ?self.group_order, "interceptor registry frozen");
        }
        InterceptorRegistry {
            entries: entries.into(),
        }
    }
}

fn validate_group_order<I, S>(groups: I) -> Result<Vec<String>, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut order: Vec<String> = Vec::new();
    for group in groups {
        let group = group.into();
        if order.contains(&group) {
            return Err(ConfigError::DuplicateGroup(group));
        }
        order.push(group);
    }
    Ok(order)
}

fn order_by_group(entries: Vec<Entry>, group_order: &[String]) -> Vec<Entry> {
    if group_order.is_empty() {
        return entries;
    }
    let rank = |entry: &Entry| {
        entry
            .group()
            .and_then(|group| group_order.iter().position(|listed| listed == group))
            .unwrap_or(group_order.len())
    };
    let mut ranked: Vec<(usize, Entry)> = entries.into_iter().map(|entry| (rank(&entry), entry)).collect();
    // Stable sort keeps registration order within a rank.
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, entry)| entry).collect()
}

// ============================================================================
// Manager
// ============================================================================

enum ManagerState {
    Configuring(RegistryBuilder),
    Frozen(InterceptorRegistry),
}

/// Thread-safe registration point with an explicit freeze.
///
/// Register factories and set the group order during startup, then call
/// [`freeze`](Self::freeze) before building chains. Later configuration calls
/// fail with [`ConfigError::Frozen`].
pub struct InterceptorManager {
    state: Mutex<ManagerState>,
}

impl Default for InterceptorManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InterceptorManager {
    /// Create a manager accepting registrations.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManagerState::Configuring(RegistryBuilder::new())),
        }
    }

    fn configure(&self, operation: &'static str, f: impl FnOnce(&mut RegistryBuilder)) -> Result<(), ConfigError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *state {
            ManagerState::Configuring(builder) => {
                f(builder);
                Ok(())
            }
            ManagerState::Frozen(_) => Err(ConfigError::Frozen(operation)),
        }
    }

    /// Append a factory.
    pub fn register(&self, factory: impl InterceptorFactory) -> Result<(), ConfigError> {
        self.configure("register a factory", |builder| builder.push(Arc::new(factory)))
    }

    /// Set the group order, see [`RegistryBuilder::group_order`].
    pub fn set_group_order<I, S>(&self, groups: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let order = validate_group_order(groups)?;
        self.configure("change the group order", |builder| builder.group_order = order)
    }

    /// Freeze and return the registry. Idempotent.
    pub fn freeze(&self) -> InterceptorRegistry {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let registry = match &mut *state {
            ManagerState::Frozen(registry) => return registry.clone(),
            ManagerState::Configuring(builder) => std::mem::take(builder).freeze(),
        };
        *state = ManagerState::Frozen(registry.clone());
        registry
    }

    /// The frozen registry, if [`freeze`](Self::freeze) was called.
    pub fn registry(&self) -> Option<InterceptorRegistry> {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            ManagerState::Frozen(registry) => Some(registry.clone()),
            ManagerState::Configuring(_) => None,
        }
    }

    /// Whether [`freeze`](Self::freeze) was called.
    pub fn is_frozen(&self) -> bool {
        self.registry().is_some()
    }
}

// ============================================================================
// Link-time Registration
// ============================================================================

/// A factory submitted with [`inventory::submit!`].
///
/// ```rust,ignore
/// inventory::submit! {
///     interpose_std::registry::FactoryRegistration::new(|| Arc::new(|| AuditInterceptor))
/// }
/// ```
#[cfg(feature = "inventory")]
pub struct FactoryRegistration {
    make: fn() -> Arc<dyn InterceptorFactory>,
}

#[cfg(feature = "inventory")]
impl FactoryRegistration {
    /// Create a registration from a constructor function.
    pub const fn new(make: fn() -> Arc<dyn InterceptorFactory>) -> Self {
        Self { make }
    }
}

#[cfg(feature = "inventory")]
inventory::collect!(FactoryRegistration);

#[cfg(feature = "inventory")]
impl RegistryBuilder {
    /// Append every factory submitted with [`inventory::submit!`].
    ///
    /// Link order is unspecified; use [`group_order`](Self::group_order) when
    /// the relative order of collected factories matters.
    pub fn register_collected(mut self) -> Self {
        for registration in inventory::iter::<FactoryRegistration> {
            self.push((registration.make)());
        }
        self
    }
}
