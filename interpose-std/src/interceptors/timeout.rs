//! Timeout interceptor for time-limited invocations.

use futures::future::BoxFuture;
use interpose_core::{
    BoxError, Capabilities, ComponentLocation, InterceptionAction, InterceptionEvent, Interceptor, Parameters,
};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Cause recorded when the nested stage exceeds its time limit.
#[derive(Debug, Clone, Copy, Error)]
#[error("invocation timed out after {0:?}")]
pub struct TimeoutError(pub Duration);

/// An interceptor failing invocations whose nested stage runs too long.
///
/// On expiry the nested stage is dropped. Layers inside this one are
/// abandoned and their `after` never runs, so the rule that every entered
/// layer sees `after` exactly once holds only for this layer and the layers
/// outside it. Those still observe the [`TimeoutError`] failure. Register
/// interceptors that must always complete their `after` outside this one.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutInterceptor {
    duration: Duration,
}

impl TimeoutInterceptor {
    /// Create a timeout interceptor.
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Interceptor for TimeoutInterceptor {
    fn name(&self) -> &str {
        "timeout"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::AROUND
    }

    fn around<'a>(
        &'a self,
        _location: &'a ComponentLocation,
        _parameters: &'a Parameters,
        _event: InterceptionEvent,
        action: InterceptionAction<'a>,
    ) -> BoxFuture<'a, Result<InterceptionEvent, BoxError>> {
        Box::pin(async move {
            match timeout(self.duration, action.proceed()).await {
                Ok(result) => result,
                Err(_) => Err(Box::new(TimeoutError(self.duration)) as BoxError),
            }
        })
    }
}
