//! Invocation notifications.

use crate::error::ErrorType;
use crate::location::ComponentLocation;

/// A lifecycle notification emitted by a chain.
#[derive(Debug, Clone, Copy)]
pub enum Notification<'a> {
    /// An invocation entered the outermost layer.
    InvocationStarted {
        /// The intercepted processor.
        location: &'a ComponentLocation,
        /// Correlation id of the incoming event.
        correlation_id: &'a str,
    },
    /// An invocation left the outermost layer.
    InvocationCompleted {
        /// The intercepted processor.
        location: &'a ComponentLocation,
        /// Correlation id of the incoming event.
        correlation_id: &'a str,
        /// Error type of the failure, if the invocation failed.
        error_type: Option<&'a ErrorType>,
    },
}

/// Receives chain notifications.
///
/// Called synchronously on the invoking task; implementations should return
/// quickly.
pub trait NotificationSink: Send + Sync + 'static {
    /// Handle one notification.
    fn notify(&self, notification: &Notification<'_>);
}

/// A sink that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn notify(&self, _notification: &Notification<'_>) {}
}
