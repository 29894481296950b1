//! Standard interceptors.

pub mod closure;
pub mod logging;
#[cfg(feature = "timeout")]
pub mod timeout;
