//! # interpose-std
//!
//! Standard implementations for the Interpose processor interception pipeline.
//!
//! This crate provides:
//! - **Factories**: [`InterceptorFactory`](factory::InterceptorFactory), [`shared`](factory::shared), location filters and groups
//! - **Registration**: [`RegistryBuilder`](registry::RegistryBuilder), [`InterceptorRegistry`](registry::InterceptorRegistry), [`InterceptorManager`](registry::InterceptorManager)
//! - **Chain adapter**: [`InterceptedProcessor`](chain::InterceptedProcessor)
//! - **Standard interceptors**: closure-based, logging, timeout
//! - **Tower adapters** (feature `tower`)
//! - **Testing doubles**: [`testing`]

#![deny(clippy::pub_use, clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core contracts
pub use interpose_core;

// Modules
pub mod chain;
pub mod factory;
pub mod interceptors;
pub mod registry;
pub mod testing;
#[cfg(feature = "tower")]
pub mod tower;

#[cfg(feature = "inventory")]
pub use inventory;
