//! # Processor
//!
//! The unit of work the pipeline wraps: an asynchronous transformation from
//! one [`Event`] to the next.
//!
//! # Static vs Dynamic Dispatch
//!
//! [`Processor`] uses native `async fn` for static dispatch. Chains store
//! processors as [`DynProcessor`] trait objects; every `Processor` is a
//! `DynProcessor` through a blanket implementation.

use crate::error::BoxError;
use crate::event::Event;
use futures::future::BoxFuture;
use std::future::Future;

/// Asynchronous event transformation.
///
/// Closures `Fn(Event) -> impl Future<Output = Result<Event, BoxError>>` are
/// processors too.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Processor`",
    label = "missing `Processor` implementation",
    note = "Processors turn an `Event` into `Result<Event, BoxError>` asynchronously."
)]
pub trait Processor: Send + Sync + 'static {
    /// Process one event.
    fn process(&self, event: Event) -> impl Future<Output = Result<Event, BoxError>> + Send;
}

/// Object-safe version of [`Processor`].
pub trait DynProcessor: Send + Sync + 'static {
    /// Process one event (dynamic dispatch version).
    fn process_dyn(&self, event: Event) -> BoxFuture<'_, Result<Event, BoxError>>;
}

impl<P: Processor> DynProcessor for P {
    fn process_dyn(&self, event: Event) -> BoxFuture<'_, Result<Event, BoxError>> {
        Box::pin(self.process(event))
    }
}

impl<F, Fut> Processor for F
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Event, BoxError>> + Send,
{
    fn process(&self, event: Event) -> impl Future<Output = Result<Event, BoxError>> + Send {
        (self)(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Upper;

    impl Processor for Upper {
        async fn process(&self, event: Event) -> Result<Event, BoxError> {
            let payload = event.message().payload().as_str().unwrap_or_default().to_uppercase();
            Ok(event.with_message(payload))
        }
    }

    #[tokio::test]
    async fn structs_and_closures_are_processors() {
        let boxed: Vec<Box<dyn DynProcessor>> = vec![
            Box::new(Upper),
            Box::new(|event: Event| async move { Ok::<_, BoxError>(event.with_message("closure")) }),
        ];

        let mut payloads = Vec::new();
        for processor in &boxed {
            let event = processor.process_dyn(Event::new("abc")).await.ok();
            payloads.push(event.map(|event| event.message().payload().clone()));
        }
        assert_eq!(payloads, [Some(json!("ABC")), Some(json!("closure"))]);
    }
}
