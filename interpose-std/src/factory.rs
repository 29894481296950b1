//! Interceptor factories.

use interpose_core::{ComponentLocation, Interceptor};
use std::sync::Arc;

/// Produces the interceptor of one layer for each processor it applies to.
///
/// [`should_intercept`](Self::should_intercept) is asked once per processor
/// location when a chain is built; [`create`](Self::create) is called once
/// per chain. Plain closures returning an interceptor are factories.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `InterceptorFactory`",
    label = "missing `InterceptorFactory` implementation",
    note = "Closures `Fn() -> impl Interceptor` are factories; see also `shared`."
)]
pub trait InterceptorFactory: Send + Sync + 'static {
    /// Whether this factory's interceptor wraps the processor at `location`.
    fn should_intercept(&self, location: &ComponentLocation) -> bool {
        let _ = location;
        true
    }

    /// Create the interceptor.
    fn create(&self) -> Arc<dyn Interceptor>;

    /// Ordering group, see [`RegistryBuilder::group_order`](crate::registry::RegistryBuilder::group_order).
    fn group(&self) -> Option<&str> {
        None
    }
}

impl<F, I> InterceptorFactory for F
where
    F: Fn() -> I + Send + Sync + 'static,
    I: Interceptor,
{
    fn create(&self) -> Arc<dyn Interceptor> {
        Arc::new(self())
    }
}

// ============================================================================
// Shared Factory
// ============================================================================

/// A factory handing out one shared interceptor instance.
pub struct SharedFactory {
    interceptor: Arc<dyn Interceptor>,
}

/// Wrap a single interceptor instance as a factory.
pub fn shared(interceptor: impl Interceptor) -> SharedFactory {
    SharedFactory {
        interceptor: Arc::new(interceptor),
    }
}

impl SharedFactory {
    /// Wrap an interceptor that is already shared.
    pub fn from_arc(interceptor: Arc<dyn Interceptor>) -> Self {
        Self { interceptor }
    }
}

impl InterceptorFactory for SharedFactory {
    fn create(&self) -> Arc<dyn Interceptor> {
        Arc::clone(&self.interceptor)
    }
}

// ============================================================================
// Filtering and Grouping
// ============================================================================

/// A factory restricted to the locations accepted by a predicate.
pub struct OnlyFor<F, P> {
    inner: F,
    predicate: P,
}

impl<F, P> InterceptorFactory for OnlyFor<F, P>
where
    F: InterceptorFactory,
    P: Fn(&ComponentLocation) -> bool + Send + Sync + 'static,
{
    fn should_intercept(&self, location: &ComponentLocation) -> bool {
        (self.predicate)(location) && self.inner.should_intercept(location)
    }

    fn create(&self) -> Arc<dyn Interceptor> {
        self.inner.create()
    }

    fn group(&self) -> Option<&str> {
        self.inner.group()
    }
}

/// A factory assigned to an ordering group.
pub struct InGroup<F> {
    inner: F,
    group: String,
}

impl<F: InterceptorFactory> InterceptorFactory for InGroup<F> {
    fn should_intercept(&self, location: &ComponentLocation) -> bool {
        self.inner.should_intercept(location)
    }

    fn create(&self) -> Arc<dyn Interceptor> {
        self.inner.create()
    }

    fn group(&self) -> Option<&str> {
        Some(&self.group)
    }
}

/// Combinators for factories.
pub trait FactoryExt: InterceptorFactory + Sized {
    /// Restrict to locations accepted by `predicate`.
    fn only_for<P>(self, predicate: P) -> OnlyFor<Self, P>
    where
        P: Fn(&ComponentLocation) -> bool + Send + Sync + 'static,
    {
        OnlyFor {
            inner: self,
            predicate,
        }
    }

    /// Assign to an ordering group.
    fn in_group(self, group: impl Into<String>) -> InGroup<Self> {
        InGroup {
            inner: self,
            group: group.into(),
        }
    }
}

impl<F: InterceptorFactory> FactoryExt for F {}
