//! # errvisor
//!
//! **errvisor** is a process-wide error interception point for Rust.
//!
//! It captures runtime faults (reported errors and panics) and redistributes them to
//! a dynamically managed set of observers. Each observer is free to log, alert, or
//! otherwise react; a misbehaving observer never keeps its peers from being notified.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   report_error!(code, ..)        panic!(..)           report_fatal(fault)
//!            │                        │                         │
//!            ▼                        ▼                         ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  host (process-wide hooks)                                        │
//! │  - error callback stack (top = most recently started handler)     │
//! │  - fatal hook (Rust panic hook, chains to the previous one)       │
//! │  - per-thread suppression guard                                   │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ErrorHandler (subject)                                           │
//! │  - ErrorCapture (last error: code, message, origin, line)         │
//! │  - ObserverSet (identity-keyed, attachment order)                 │
//! │  - DispatcherPolicy (fallback / rethrow / clear / catch)          │
//! │  - ListenerFactory (name → constructor)                           │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   LogListener        MailListener       CustomObserver
//!   (tracing)          (SMTP)             (user logic)
//! ```
//!
//! ### Lifecycle
//! ```text
//! Uninitialized ──get_instance()──► Constructed (stopped) ──start()──► Started
//!       ▲                                  ▲                              │
//!       │                                  └────────────stop()────────────┘
//!       └───────────────reset_instance() (stops a started instance)───────┘
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Observer API**  | React to captured errors.                                     | [`Observer`], [`ObserverRef`]               |
//! | **Dispatch**      | Capture, notify, per-observer failure isolation.              | [`ErrorHandler`], [`DispatcherPolicy`]      |
//! | **Listeners**     | Attach/detach by symbolic name.                               | [`ListenerFactory`], [`ListenerArg`]        |
//! | **Host hooks**    | Install into the process (error callback, panic hook).        | [`SharedHandler`], [`host`]                 |
//! | **Errors**        | Typed errors for the dispatcher and listeners.                | [`HandlerError`], [`ListenerError`]         |
//!
//! ## Optional features
//! - `mail` (default): exports [`SmtpAdapter`] and registers the `mail` listener.
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use errvisor::{codes, report_error, ErrorHandler, ListenerError, Observer};
//!
//! #[derive(Default)]
//! struct Inbox(Mutex<Vec<String>>);
//!
//! impl Observer for Inbox {
//!     fn update(&self, subject: &ErrorHandler) -> Result<(), ListenerError> {
//!         if let Some(text) = subject.render() {
//!             self.0.lock().unwrap().push(text);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let inbox = Arc::new(Inbox::default());
//! let handler = errvisor::get_instance(true);
//! handler.lock().attach_one(inbox.clone());
//! handler.lock().attach_named("log", &["warn".into()]).unwrap();
//!
//! report_error!(codes::USER_WARNING, "Foo!").unwrap();
//! assert!(inbox.0.lock().unwrap()[0].starts_with("Error 512: Foo!, in file "));
//!
//! errvisor::reset_instance(false);
//! ```

pub mod codes;
pub mod host;

mod error;
mod handler;
mod listeners;

// ---- Public re-exports ----

pub use error::{HandlerError, ListenerError};
pub use handler::registry::{get_instance, instance, reset_instance};
pub use handler::{
    DispatcherPolicy, ErrorCapture, ErrorHandler, ErrorHandlerBuilder, ErrorRecord, HandlerGuard, ObserverSet,
    SharedHandler,
};
pub use host::{FatalDisposition, Fault, FaultClass, HostDirective};
pub use listeners::{
    Constructor, DEFAULT_SUBJECT_PREFIX, ListenerArg, ListenerFactory, LogLevel, LogListener, MailAdapter,
    MailListener, Observer, ObserverRef, Recipient, str_arg,
};

// Optional: SMTP delivery for the mail listener.
// Enabled by default; disable with `default-features = false`.
#[cfg(feature = "mail")]
pub use listeners::{DEFAULT_SENDER, SmtpAdapter};
