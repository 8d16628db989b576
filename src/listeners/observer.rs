//! # Observer: user-facing error listeners
//!
//! The [`Observer`] trait is the main **extension point** for end users.
//! Every captured error flows through the [`ErrorHandler`] into its observers.
//!
//! Implementing your own observer allows you to plug in:
//! - alerting (mail, chat, pager);
//! - structured logging;
//! - test recorders.
//!
//! # High-level architecture:
//! ```text
//! Error flow:
//!   report_error!() / panic ──► host hooks ──► ErrorHandler::on_host_error()
//!                                                 └─► notify() ─► Observer::update(&ErrorHandler)
//!
//!              ┌───────────────────────┼───────────────────────┐
//!              ▼                       ▼                       ▼
//!         LogListener            MailListener            CustomObserver
//!          (tracing)               (SMTP)                 (user logic)
//! ```
//!
//! Observers *pull* the error: they receive the subject and read
//! [`ErrorHandler::current`] or [`ErrorHandler::render`] themselves.
//!
//! # Example: custom observer
//! ```
//! use std::sync::{Arc, Mutex};
//! use errvisor::{ErrorHandler, ListenerError, Observer};
//!
//! #[derive(Default)]
//! struct LastMessage(Mutex<Option<String>>);
//!
//! impl Observer for LastMessage {
//!     fn update(&self, subject: &ErrorHandler) -> Result<(), ListenerError> {
//!         *self.0.lock().unwrap() = subject.render();
//!         Ok(())
//!     }
//! }
//!
//! let last = Arc::new(LastMessage::default());
//! let mut handler = ErrorHandler::new();
//! handler.attach_one(last.clone());
//! handler.capture(2, "Foo!", "test.src", 10);
//! assert_eq!(handler.notify().unwrap(), 1);
//! assert_eq!(
//!     last.0.lock().unwrap().as_deref(),
//!     Some("Error 2: Foo!, in file test.src at line 10"),
//! );
//! ```

use std::sync::Arc;

use crate::error::ListenerError;
use crate::handler::ErrorHandler;

/// Shared handle to an observer.
///
/// The handler compares handles by identity: two handles are the same observer
/// only if they point to the same allocation.
pub type ObserverRef = Arc<dyn Observer>;

/// # Trait for receiving captured errors from the handler.
///
/// Called synchronously from [`ErrorHandler::notify`], one observer at a time.
///
/// ### Implementation requirements
/// - Return `Err` rather than panicking; panics are caught but cost a backtrace print.
/// - Do not block for long: a slow observer delays the faulting call site.
/// - Do not lock the handler's [`SharedHandler`](crate::SharedHandler) from `update`:
///   the notifying thread already holds it and the lock panics. Change the set
///   through [`ErrorHandler::attach_later`] / [`ErrorHandler::detach_later`]; the
///   changes take effect when the round ends.
pub trait Observer: Send + Sync + 'static {
    /// Handles one notification round.
    fn update(&self, subject: &ErrorHandler) -> Result<(), ListenerError>;

    /// Returns the observer name used in logs and in
    /// [`HandlerError::Notification`](crate::HandlerError).
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
