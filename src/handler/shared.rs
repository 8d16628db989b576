//! # SharedHandler: an [`ErrorHandler`] the host hooks can reach.
//!
//! Host callbacks fire on whichever thread faulted, so the handler they dispatch
//! into lives behind a mutex. [`SharedHandler::start`] installs it as the active
//! host handler, [`SharedHandler::stop`] restores the previous one.
//!
//! ## Lifecycle
//! ```text
//! SharedHandler::new() ──► Constructed (stopped) ──start()──► Started
//!                                    ▲                           │
//!                                    └───────────stop()──────────┘
//! ```
//!
//! ## Locking
//! Every [`HandlerGuard`] records, per thread, which handler it holds. Host hooks
//! use that record to tell re-entry (the faulting thread already holds the
//! handler: fall back to the host) from contention (another thread holds it:
//! wait for it).

use std::cell::RefCell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::dispatcher::ErrorHandler;
use crate::host;

thread_local! {
    /// Handlers locked by the current thread, by address.
    static HELD: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Cloneable, lockable handle to an [`ErrorHandler`].
#[derive(Clone)]
pub struct SharedHandler {
    inner: Arc<Mutex<ErrorHandler>>,
}

impl SharedHandler {
    /// Wraps `handler`. The handler is not started.
    pub fn new(handler: ErrorHandler) -> Self {
        Self {
            inner: Arc::new(Mutex::new(handler)),
        }
    }

    /// Locks the handler, waiting for other threads. A poisoned lock is
    /// recovered; the handler holds no invariant a panicking observer can break.
    ///
    /// # Panics
    /// If the current thread already holds this handler, e.g. an observer locking
    /// it from inside [`Observer::update`](crate::Observer::update). Observers change
    /// the set through [`ErrorHandler::attach_later`] / [`ErrorHandler::detach_later`]
    /// instead. Inside a notification round the panic is caught like any other
    /// observer panic.
    pub fn lock(&self) -> HandlerGuard<'_> {
        if self.is_held_here() {
            panic!("error handler locked twice by the same thread; use attach_later/detach_later from observers");
        }
        let guard = lock_unpoisoned(&self.inner);
        HELD.with(|held| held.borrow_mut().push(self.key()));
        HandlerGuard {
            guard,
            key: self.key(),
            _thread: PhantomData,
        }
    }

    /// True if the current thread holds this handler's lock.
    pub(crate) fn is_held_here(&self) -> bool {
        let key = self.key();
        HELD.with(|held| held.borrow().contains(&key))
    }

    fn key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// Installs this handler as the host's error callback and fatal hook.
    ///
    /// Starting an already started handler makes it the active one again.
    pub fn start(&self) -> &Self {
        host::install(self);
        self
    }

    /// Uninstalls this handler, restoring whatever was active before it.
    pub fn stop(&self) -> &Self {
        host::uninstall(self);
        self
    }

    /// True while this handler is installed in the host.
    pub fn is_started(&self) -> bool {
        host::is_installed(self)
    }

    /// True if both handles refer to the same handler.
    pub fn ptr_eq(&self, other: &SharedHandler) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for SharedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_lock() {
            Ok(handler) => f.debug_tuple("SharedHandler").field(&*handler).finish(),
            Err(_) => f.write_str("SharedHandler(<locked>)"),
        }
    }
}

/// Exclusive access to a [`SharedHandler`]'s handler.
///
/// Dropping the guard applies observer changes queued with
/// [`ErrorHandler::attach_later`] and releases the lock.
pub struct HandlerGuard<'a> {
    guard: MutexGuard<'a, ErrorHandler>,
    key: usize,
    _thread: PhantomData<*const ()>,
}

impl Deref for HandlerGuard<'_> {
    type Target = ErrorHandler;

    fn deref(&self) -> &ErrorHandler {
        &self.guard
    }
}

impl DerefMut for HandlerGuard<'_> {
    fn deref_mut(&mut self) -> &mut ErrorHandler {
        &mut self.guard
    }
}

impl Drop for HandlerGuard<'_> {
    fn drop(&mut self) {
        self.guard.apply_deferred();
        let key = self.key;
        // The thread-local may already be gone during thread teardown.
        let _ = HELD.try_with(|held| {
            let mut held = held.borrow_mut();
            if let Some(pos) = held.iter().rposition(|k| *k == key) {
                held.remove(pos);
            }
        });
    }
}

impl std::fmt::Debug for HandlerGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HandlerGuard").field(&*self.guard).finish()
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::ListenerError;
    use crate::listeners::{Observer, ObserverRef};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Observer for Counter {
        fn update(&self, _subject: &ErrorHandler) -> Result<(), ListenerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_guard_tracks_holding_thread() {
        let shared = SharedHandler::new(ErrorHandler::new());
        assert!(!shared.is_held_here());
        {
            let _guard = shared.lock();
            assert!(shared.is_held_here());
        }
        assert!(!shared.is_held_here());
    }

    #[test]
    fn test_relock_on_same_thread_panics() {
        let shared = SharedHandler::new(ErrorHandler::new());
        let _guard = shared.lock();
        let relock = panic::catch_unwind(AssertUnwindSafe(|| {
            let _again = shared.lock();
        }));
        assert!(relock.is_err());
        assert!(shared.is_held_here());
    }

    #[test]
    fn test_queued_changes_applied_on_release() {
        let counter = Arc::new(Counter::default());
        let shared = SharedHandler::new(ErrorHandler::new());
        {
            let guard = shared.lock();
            guard.attach_later(Arc::clone(&counter) as ObserverRef);
            assert_eq!(guard.len(), 0);
        }
        assert_eq!(shared.lock().len(), 1);
    }
}
