//! Error types used by the error handler and its listeners.
//!
//! This module defines two main error enums:
//!
//! - [`HandlerError`]: errors raised by the dispatcher itself (named attach, notification).
//! - [`ListenerError`]: errors raised by individual listeners (construction or update).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging.

use thiserror::Error;

/// # Errors produced by the error handler.
///
/// Local listener failures only surface here when the dispatcher is configured
/// to stop swallowing them (see [`DispatcherPolicy::catch_listener_failures`](crate::DispatcherPolicy)).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The listener factory has no listener registered under this name.
    #[error("unknown listener {name:?}")]
    UnknownListener {
        /// The name as requested by the caller.
        name: String,
    },

    /// A dynamic call did not match the `attach<Name>` / `detach<Name>` convention.
    #[error("unsupported operation {method:?}")]
    UnsupportedOperation {
        /// The method name as requested by the caller.
        method: String,
    },

    /// A known listener rejected its construction arguments.
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// An observer failed while being notified and the round was aborted.
    #[error("exception while notifying observer {listener:?}")]
    Notification {
        /// Name of the failing observer.
        listener: &'static str,
        /// The failure raised by the observer.
        #[source]
        source: ListenerError,
    },
}

impl HandlerError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use errvisor::HandlerError;
    ///
    /// let err = HandlerError::UnknownListener { name: "Nope".into() };
    /// assert_eq!(err.as_label(), "handler_unknown_listener");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::UnknownListener { .. } => "handler_unknown_listener",
            HandlerError::UnsupportedOperation { .. } => "handler_unsupported_operation",
            HandlerError::Listener(_) => "handler_listener",
            HandlerError::Notification { .. } => "handler_notification",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HandlerError::UnknownListener { name } => format!("unknown listener: {name}"),
            HandlerError::UnsupportedOperation { method } => {
                format!("unknown method: {method}")
            }
            HandlerError::Listener(err) => err.as_message(),
            HandlerError::Notification { listener, source } => {
                format!("listener {listener} failed: {}", source.as_message())
            }
        }
    }
}

/// # Errors produced by listeners.
///
/// Raised either while constructing a listener from the factory
/// ([`ListenerError::InvalidArgument`]) or while delivering an update.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    /// A constructor argument was missing or rejected.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
    },

    /// The listener could not handle the update.
    #[error("update failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// The listener panicked while handling the update.
    #[error("listener panicked: {info}")]
    Panicked {
        /// Panic payload, when it was a string.
        info: String,
    },

    /// An outbound backend (mail transport, ...) refused the message.
    #[error("delivery failed: {error}")]
    Delivery {
        /// The underlying error message.
        error: String,
    },
}

impl ListenerError {
    /// Shorthand for [`ListenerError::InvalidArgument`].
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        ListenerError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ListenerError::Failed`].
    pub fn failed(error: impl Into<String>) -> Self {
        ListenerError::Failed {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use errvisor::ListenerError;
    ///
    /// let err = ListenerError::failed("boom");
    /// assert_eq!(err.as_label(), "listener_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ListenerError::InvalidArgument { .. } => "listener_invalid_argument",
            ListenerError::Failed { .. } => "listener_failed",
            ListenerError::Panicked { .. } => "listener_panicked",
            ListenerError::Delivery { .. } => "listener_delivery",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ListenerError::InvalidArgument { reason } => format!("invalid argument: {reason}"),
            ListenerError::Failed { error } => format!("error: {error}"),
            ListenerError::Panicked { info } => format!("panic: {info}"),
            ListenerError::Delivery { error } => format!("delivery: {error}"),
        }
    }
}
