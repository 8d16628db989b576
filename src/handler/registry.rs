//! # Process-wide handler instance.
//!
//! Holds at most one [`SharedHandler`] for the whole process:
//! - [`get_instance`] creates it lazily on first access;
//! - [`reset_instance`] discards it (stopping it first when installed) and can
//!   immediately create a pristine replacement;
//! - [`instance`] peeks without creating.
//!
//! ## Rules
//! - Callers that prefer explicit ownership can ignore this module and pass a
//!   [`SharedHandler`] around themselves.
//! - Resetting while a notification round is running on another thread is not supported.

use std::sync::Mutex;

use tracing::debug;

use super::dispatcher::ErrorHandler;
use super::shared::{SharedHandler, lock_unpoisoned};

static INSTANCE: Mutex<Option<SharedHandler>> = Mutex::new(None);

/// Returns the process-wide handler, creating it on first call.
///
/// `and_start` only matters for the call that creates the instance.
pub fn get_instance(and_start: bool) -> SharedHandler {
    let mut slot = lock_unpoisoned(&INSTANCE);
    if let Some(existing) = slot.as_ref() {
        return existing.clone();
    }

    let handler = SharedHandler::new(ErrorHandler::new());
    *slot = Some(handler.clone());
    drop(slot);
    debug!(start = and_start, "process-wide error handler created");

    if and_start {
        handler.start();
    }
    handler
}

/// Returns the process-wide handler if one exists.
pub fn instance() -> Option<SharedHandler> {
    lock_unpoisoned(&INSTANCE).clone()
}

/// Discards the process-wide handler.
///
/// A started instance is stopped first, so its hooks do not outlive it.
/// With `and_recreate`, a fresh instance (default policy, no observers, no
/// current error) is created and returned.
pub fn reset_instance(and_recreate: bool) -> Option<SharedHandler> {
    let previous = lock_unpoisoned(&INSTANCE).take();
    if let Some(old) = previous.filter(SharedHandler::is_started) {
        old.stop();
        debug!("process-wide error handler stopped on reset");
    }

    and_recreate.then(|| get_instance(false))
}
