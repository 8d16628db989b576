//! # Error listeners.
//!
//! This module provides the [`Observer`] trait, the [`ListenerFactory`] resolving
//! symbolic listener names, and the built-in listeners.
//!
//! ## Listener types
//! - **Passive listeners** - react to the captured error (logging, alerting)
//! - **Recorders** - user observers recording what they saw (tests, health checks)
//!
//! ## Attaching by name
//! ```
//! use errvisor::ErrorHandler;
//!
//! let mut handler = ErrorHandler::new();
//! handler.attach_named("log", &["warn".into()]).unwrap();
//! handler.call("attachLog", &[]).unwrap();
//! assert_eq!(handler.len(), 2);
//! ```

mod factory;
mod log;
mod mail;
mod observer;

pub use factory::{Constructor, ListenerArg, ListenerFactory, str_arg};
pub use log::{LogLevel, LogListener};
pub use mail::{DEFAULT_SUBJECT_PREFIX, MailAdapter, MailListener, Recipient};
pub use observer::{Observer, ObserverRef};

#[cfg(feature = "mail")]
pub use mail::{DEFAULT_SENDER, SmtpAdapter};
