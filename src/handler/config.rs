//! # Dispatcher policy.
//!
//! Provides [`DispatcherPolicy`], the four switches that shape how the
//! [`ErrorHandler`](crate::ErrorHandler) reacts to a captured error.
//!
//! Policy is used in two ways:
//! 1. **Handler creation**: `ErrorHandler::builder().with_policy(policy)`
//! 2. **At runtime**: the `set_*` accessors on the handler flip individual switches

/// Behavior switches of the dispatcher.
///
/// ## Field semantics
/// - `fall_back_to_host`: after notifying, let the host run its default handling too
/// - `rethrow_on_fatal`: re-raise fatal faults to the host after dispatch
/// - `clear_after_send`: drop the captured error after each observer and after the round
/// - `catch_listener_failures`: swallow observer failures instead of aborting the round
///
/// ## Notes
/// All fields are public; the handler exposes the same switches through accessors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatcherPolicy {
    /// Whether the host's own handling also runs for a recoverable error.
    ///
    /// - `false`: the handler reports the event as handled
    /// - `true`: [`HostDirective::FallBack`](crate::HostDirective) is returned to the host
    pub fall_back_to_host: bool,

    /// Whether an `Error`-class fatal fault is re-raised after dispatch.
    ///
    /// Non-`Error` faults are always re-raised, regardless of this switch.
    pub rethrow_on_fatal: bool,

    /// Whether the captured error is cleared once observers have seen it.
    ///
    /// When on, the error is absent after every observer's turn, so only the first
    /// observer of a round sees it (single-shot delivery).
    pub clear_after_send: bool,

    /// Whether an observer failure is contained within `notify()`.
    ///
    /// - `true`: the failure is logged and the round continues
    /// - `false`: the failure is wrapped in
    ///   [`HandlerError::Notification`](crate::HandlerError) and the round stops
    pub catch_listener_failures: bool,
}

impl Default for DispatcherPolicy {
    /// Default policy:
    ///
    /// - `fall_back_to_host = false`
    /// - `rethrow_on_fatal = true`
    /// - `clear_after_send = true`
    /// - `catch_listener_failures = true`
    fn default() -> Self {
        Self {
            fall_back_to_host: false,
            rethrow_on_fatal: true,
            clear_after_send: true,
            catch_listener_failures: true,
        }
    }
}
