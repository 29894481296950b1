//! # Interceptor
//!
//! An interceptor wraps every invocation of the processors it applies to.
//! Each applicable interceptor forms one *layer*; layers nest in registration
//! order, and for a single layer the calls happen strictly as
//!
//! ```text
//! before -> around (-> proceed -> inner layers -> processor) -> after
//! ```
//!
//! - [`before`](Interceptor::before) inspects or mutates the event.
//! - [`around`](Interceptor::around) decides: proceed, skip, or fail.
//! - [`after`](Interceptor::after) observes the final event and any failure.
//!
//! # Capabilities
//!
//! [`Interceptor::capabilities`] declares which of the three calls are
//! implemented. The chain reads it once when it is built. A layer without
//! [`Capabilities::AROUND`] runs the nested stage directly, without
//! allocating an [`InterceptionAction`].

use crate::action::InterceptionAction;
use crate::error::{BoxError, ProcessingError};
use crate::interception::InterceptionEvent;
use crate::location::ComponentLocation;
use crate::parameters::Parameters;
use bitflags::bitflags;
use futures::future::BoxFuture;
use std::sync::Arc;

bitflags! {
    /// The interceptor calls a layer has to make.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// `before` is implemented.
        const BEFORE = 1 << 0;
        /// `around` is implemented.
        const AROUND = 1 << 1;
        /// `after` is implemented.
        const AFTER = 1 << 2;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Cross-cutting logic around processor invocations.
///
/// Implementations are shared across concurrent invocations of the same
/// processor and must synchronise any state they own.
///
/// Every method has a pass-through default; override the ones you need and
/// narrow [`capabilities`](Self::capabilities) accordingly.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `Interceptor`",
    label = "missing `Interceptor` implementation",
    note = "Interceptors must be `Send + Sync + 'static`; every method has a default."
)]
pub trait Interceptor: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Calls this interceptor implements.
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    /// Called before anything nested runs.
    ///
    /// Returning an error skips this layer's `around` and everything nested;
    /// `after` still runs with the error.
    fn before(
        &self,
        location: &ComponentLocation,
        parameters: &Parameters,
        event: &InterceptionEvent,
    ) -> Result<(), BoxError> {
        let _ = (location, parameters, event);
        Ok(())
    }

    /// Wraps the nested stage.
    ///
    /// The returned future must complete by consuming `action` with exactly
    /// one of `proceed`, `skip` or `fail`. Returning an event without touching
    /// the action behaves like `skip`.
    fn around<'a>(
        &'a self,
        location: &'a ComponentLocation,
        parameters: &'a Parameters,
        event: InterceptionEvent,
        action: InterceptionAction<'a>,
    ) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>> {
        let _ = (location, parameters, event);
        action.proceed()
    }

    /// Called once this layer's outcome is known.
    ///
    /// `thrown` is the failure propagating out of this layer, if any. An
    /// error returned here replaces it.
    fn after(
        &self,
        location: &ComponentLocation,
        event: &InterceptionEvent,
        thrown: Option<&ProcessingError>,
    ) -> Result<(), BoxError> {
        let _ = (location, event, thrown);
        Ok(())
    }
}

impl<I: Interceptor + ?Sized> Interceptor for Arc<I> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn before(
        &self,
        location: &ComponentLocation,
        parameters: &Parameters,
        event: &InterceptionEvent,
    ) -> Result<(), BoxError> {
        (**self).before(location, parameters, event)
    }

    fn around<'a>(
        &'a self,
        location: &'a ComponentLocation,
        parameters: &'a Parameters,
        event: InterceptionEvent,
        action: InterceptionAction<'a>,
    ) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>> {
        (**self).around(location, parameters, event, action)
    }

    fn after(
        &self,
        location: &ComponentLocation,
        event: &InterceptionEvent,
        thrown: Option<&ProcessingError>,
    ) -> Result<(), BoxError> {
        (**self).after(location, event, thrown)
    }
}
