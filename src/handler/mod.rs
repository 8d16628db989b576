//! Error handler core: capture, dispatch and lifecycle.
//!
//! The public API from this module is [`ErrorHandler`] (the subject),
//! [`SharedHandler`] (the handle installed into the host) and the process-wide
//! instance functions.
//!
//! Internal modules:
//! - [`capture`]: the last captured error and its rendering;
//! - [`config`]: dispatcher policy switches;
//! - [`dispatcher`]: attach/detach, notification round, host callbacks;
//! - [`observers`]: identity-keyed observer set;
//! - [`builder`]: handler assembly;
//! - [`shared`]: mutex handle and start/stop;
//! - [`registry`]: process-wide instance.

mod builder;
mod capture;
mod config;
mod dispatcher;
mod observers;
pub(crate) mod registry;
mod shared;

pub use builder::ErrorHandlerBuilder;
pub use capture::{ErrorCapture, ErrorRecord};
pub use config::DispatcherPolicy;
pub use dispatcher::ErrorHandler;
pub use observers::ObserverSet;
pub use shared::{HandlerGuard, SharedHandler};

pub(crate) use dispatcher::panic_message;
pub(crate) use shared::lock_unpoisoned;
