//! Logging interceptor for invocation observation.

use interpose_core::{
    BoxError, Capabilities, ComponentLocation, InterceptionEvent, Interceptor, Parameters, ProcessingError,
};

/// An interceptor that logs entry and exit of every invocation.
///
/// Declares only `before` and `after`, so it never allocates an action.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor;

impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &str {
        "logging"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::BEFORE | Capabilities::AFTER
    }

    fn before(
        &self,
        location: &ComponentLocation,
        parameters: &Parameters,
        event: &InterceptionEvent,
    ) -> Result<(), BoxError> {
        #[cfg(feature = "tracing")]
        {
            tracing::info!(
                %location,
                correlation_id = %event.correlation_id(),
                parameters = parameters.len(),
                "processor invocation started"
            );
        }
        #[cfg(not(feature = "tracing"))]
        {
            let _ = (location, parameters, event); // Suppress unused warning
        }
        Ok(())
    }

    fn after(
        &self,
        location: &ComponentLocation,
        event: &InterceptionEvent,
        thrown: Option<&ProcessingError>,
    ) -> Result<(), BoxError> {
        #[cfg(feature = "tracing")]
        {
            match thrown {
                Some(error) => tracing::warn!(
                    %location,
                    correlation_id = %event.correlation_id(),
                    error_type = %error.error_type(),
                    %error,
                    "processor invocation failed"
                ),
                None => tracing::info!(
                    %location,
                    correlation_id = %event.correlation_id(),
                    "processor invocation completed"
                ),
            }
        }
        #[cfg(not(feature = "tracing"))]
        {
            let _ = (location, event, thrown); // Suppress unused warning
        }
        Ok(())
    }
}
