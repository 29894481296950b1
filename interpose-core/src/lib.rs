//! # interpose-core
//!
//! Core contracts for the Interpose processor interception pipeline.
//!
//! This crate has minimal dependencies and is meant to be imported by code
//! that writes interceptors or processors without needing the chain machinery
//! in `interpose-std`.
//!
//! # Model
//!
//! - [`Event`] - Immutable unit of work: message, session, correlation id
//! - [`Processor`] - Asynchronous `Event -> Event` transformation
//! - [`Interceptor`] - `before` / `around` / `after` logic wrapping a processor
//! - [`InterceptionEvent`] - Shared mutable view of the event inside a layer
//! - [`InterceptionAction`] - One-shot `proceed` / `skip` / `fail` decision
//! - [`ParametersResolver`] - Resolves and disposes processor parameters
//! - [`NotificationSink`] - Observes invocation start and completion
//!
//! # Error Types
//!
//! - [`ProcessingError`] - Classified failure leaving a chain
//! - [`ErrorType`] - Routing key carried by every failure
//! - [`PanicError`] - Panic captured inside user code

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod action;
mod error;
mod event;
mod interception;
mod interceptor;
mod location;
mod message;
mod notification;
mod parameters;
mod processor;

// Re-exports
pub use action::{Continuation, InterceptionAction};
pub use error::{
    BoxError, ErrorType, FailureKind, InterceptionVeto, PanicError, Phase, ProcessingError,
    SharedError,
};
pub use event::{Event, EventBuilder, EventError, InternalParameter};
pub use interception::InterceptionEvent;
pub use interceptor::{Capabilities, Interceptor};
pub use location::{ComponentIdentifier, ComponentLocation};
pub use message::{Message, Session};
pub use notification::{NoopSink, Notification, NotificationSink};
pub use parameters::{
    ParameterError, ParameterValue, Parameters, ParametersResolver, RESOLVED_PARAMETERS_KEY,
    ResolutionContext, ResolvedParameters,
};
pub use processor::{DynProcessor, Processor};
