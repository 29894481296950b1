//! # interpose - Processor Interception Pipeline
//!
//! `interpose` wraps message processors in an ordered stack of interceptors.
//! Each interceptor may observe and mutate the event before the processor
//! runs, decide whether the processor runs at all, and observe the outcome.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use interpose::prelude::*;
//!
//! struct Audit;
//! impl Interceptor for Audit {
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities::BEFORE
//!     }
//!
//!     fn before(&self, location: &ComponentLocation, _: &Parameters, event: &InterceptionEvent) -> Result<(), BoxError> {
//!         event.set_session_property("audited-by", location.to_string());
//!         Ok(())
//!     }
//! }
//!
//! let registry = RegistryBuilder::new().register(|| Audit).freeze();
//! let chain = InterceptedProcessor::builder(location, my_processor).build(&registry);
//! let result = chain.invoke(Event::new("payload")).await?;
//! ```
//!
//! ## Crates
//!
//! - `interpose-core`: contracts ([`Event`], [`Interceptor`], [`Processor`], errors)
//! - `interpose-std`: registry, chain adapter, standard interceptors, testing doubles

#![deny(clippy::pub_use, clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use interpose_core::{
    // Interception
    Capabilities,
    // Location
    ComponentIdentifier,
    ComponentLocation,
    Continuation,
    // Processor
    DynProcessor,
    // Errors
    BoxError,
    ErrorType,
    // Event model
    Event,
    EventBuilder,
    EventError,
    FailureKind,
    InterceptionAction,
    InterceptionEvent,
    InterceptionVeto,
    Interceptor,
    InternalParameter,
    Message,
    // Notifications
    NoopSink,
    Notification,
    NotificationSink,
    PanicError,
    // Parameters
    ParameterError,
    ParameterValue,
    Parameters,
    ParametersResolver,
    Phase,
    ProcessingError,
    Processor,
    RESOLVED_PARAMETERS_KEY,
    ResolutionContext,
    ResolvedParameters,
    Session,
    SharedError,
};

// Registration and chains
pub use interpose_std::{
    chain::{ChainBuilder, InterceptedProcessor},
    factory::{FactoryExt, InGroup, InterceptorFactory, OnlyFor, SharedFactory, shared},
    registry::{ConfigError, InterceptorManager, InterceptorRegistry, RegistryBuilder},
};

// Standard interceptors
pub use interpose_std::interceptors::{closure::FnInterceptor, logging::LoggingInterceptor};
#[cfg(feature = "timeout")]
pub use interpose_std::interceptors::timeout::{TimeoutError, TimeoutInterceptor};

#[cfg(feature = "inventory")]
pub use interpose_std::registry::FactoryRegistration;
#[cfg(feature = "inventory")]
pub use interpose_std::inventory;

/// Tower integration.
#[cfg(feature = "tower")]
pub mod tower {
    pub use interpose_std::tower::{ProcessorService, ServiceProcessor};
}

/// Testing doubles.
pub mod testing {
    pub use interpose_std::testing::{
        CountingResolver, Journal, RecordingInterceptor, RecordingProcessor, RecordingSink, ResolutionToken,
    };
}

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        BoxError, Capabilities, ComponentLocation, ErrorType, Event, FactoryExt, InterceptedProcessor,
        InterceptionAction, InterceptionEvent, Interceptor, InterceptorRegistry, Message, Parameters,
        ProcessingError, Processor, RegistryBuilder, Session,
    };
}
