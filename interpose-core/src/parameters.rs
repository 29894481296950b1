//! Processor parameters as seen by interceptors.
//!
//! A processor's parameters are resolved once per invocation, before the
//! outermost layer runs. Resolution of an individual value may fail; the
//! failure is kept inside the [`ParameterValue`] and only surfaces when the
//! value is read, so a broken parameter never prevents interception.

use crate::error::{BoxError, SharedError};
use crate::event::Event;
use serde_json::Value;
use std::{any::Any, collections::BTreeMap, fmt, sync::Arc};
use thiserror::Error;

/// Internal parameter under which the chain hands resolved [`Parameters`] to
/// the wrapped processor. Never visible on events leaving the chain.
pub const RESOLVED_PARAMETERS_KEY: &str = "interpose.resolved-parameters";

/// Error returned when reading a parameter whose resolution failed.
#[derive(Debug, Clone, Error)]
#[error("parameter `{name}` could not be resolved from `{provided_value}`")]
pub struct ParameterError {
    name: Arc<str>,
    provided_value: Arc<str>,
    #[source]
    cause: SharedError,
}

impl ParameterError {
    /// The parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolution failure.
    pub fn cause(&self) -> &SharedError {
        &self.cause
    }
}

/// One named parameter of a processor.
#[derive(Clone)]
pub struct ParameterValue {
    name: Arc<str>,
    provided_value: Arc<str>,
    resolved: Result<Value, SharedError>,
}

impl ParameterValue {
    /// A parameter whose value resolved successfully.
    pub fn resolved(name: impl Into<Arc<str>>, provided_value: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            provided_value: provided_value.into(),
            resolved: Ok(value.into()),
        }
    }

    /// A parameter whose resolution failed.
    pub fn failed(name: impl Into<Arc<str>>, provided_value: impl Into<Arc<str>>, cause: BoxError) -> Self {
        Self {
            name: name.into(),
            provided_value: provided_value.into(),
            resolved: Err(cause.into()),
        }
    }

    /// The parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw configured value, e.g. an expression.
    pub fn provided_value(&self) -> &str {
        &self.provided_value
    }

    /// The resolved value, or the error raised while resolving it.
    pub fn resolve_value(&self) -> Result<&Value, ParameterError> {
        self.resolved.as_ref().map_err(|cause| ParameterError {
            name: self.name.clone(),
            provided_value: self.provided_value.clone(),
            cause: cause.clone(),
        })
    }
}

impl fmt::Debug for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ParameterValue");
        debug.field("name", &self.name).field("provided_value", &self.provided_value);
        match &self.resolved {
            Ok(value) => debug.field("value", value),
            Err(cause) => debug.field("error", &cause.to_string()),
        };
        debug.finish()
    }
}

/// Read-only view of a processor's parameters, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    values: Arc<BTreeMap<Arc<str>, ParameterValue>>,
}

impl Parameters {
    /// No parameters.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a parameter.
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    /// Iterate in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterValue> {
        self.values.values()
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<ParameterValue> for Parameters {
    fn from_iter<I: IntoIterator<Item = ParameterValue>>(iter: I) -> Self {
        let values = iter
            .into_iter()
            .map(|value| (value.name.clone(), value))
            .collect();
        Self {
            values: Arc::new(values),
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Opaque state produced by [`ParametersResolver::resolve_parameters`] and
/// handed back to [`ParametersResolver::dispose_resolved_parameters`].
#[derive(Default)]
pub struct ResolutionContext(Option<Box<dyn Any + Send>>);

impl ResolutionContext {
    /// Wrap resolver state.
    pub fn new<T: Any + Send>(state: T) -> Self {
        Self(Some(Box::new(state)))
    }

    /// A context carrying no state.
    pub fn empty() -> Self {
        Self(None)
    }

    /// Take the state back out, if it has type `T`.
    pub fn into_inner<T: Any>(self) -> Option<T> {
        self.0?.downcast::<T>().ok().map(|state| *state)
    }

    /// Borrow the state, if it has type `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_ref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for ResolutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResolutionContext")
            .field(&self.0.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Resolved parameters together with the context needed to release them.
#[derive(Debug, Default)]
pub struct ResolvedParameters {
    /// Values exposed to interceptors and the processor.
    pub parameters: Parameters,
    /// Passed to the matching dispose call.
    pub context: ResolutionContext,
}

/// Implemented by processors whose parameters hold resources.
///
/// The chain calls `resolve_parameters` exactly once per invocation and
/// `dispose_resolved_parameters` exactly once with the returned context after
/// the outermost layer finished, whatever the outcome. Taking the context by
/// value makes a second dispose impossible.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot resolve processor parameters",
    label = "missing `ParametersResolver` implementation",
    note = "Implement `resolve_parameters` and `dispose_resolved_parameters`."
)]
pub trait ParametersResolver: Send + Sync + 'static {
    /// Resolve the processor's parameters for `event`.
    fn resolve_parameters(&self, event: &Event) -> Result<ResolvedParameters, BoxError>;

    /// Release whatever `resolve_parameters` acquired.
    fn dispose_resolved_parameters(&self, context: ResolutionContext);
}
