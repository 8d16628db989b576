//! # ErrorHandler: the subject observers subscribe to.
//!
//! Owns the [`ObserverSet`], the [`ErrorCapture`], the [`DispatcherPolicy`] and the
//! [`ListenerFactory`] used by the named attach calls.
//!
//! ## Notification round
//! ```text
//! notify()
//!   apply queued attach_later / detach_later requests
//!   snapshot = observers (attach/detach during the round has no effect on it)
//!   for each observer in snapshot:
//!     ├─► update(&handler)            (panics are caught)
//!     │     ├─ Ok  ─► delivered += 1
//!     │     └─ Err ─► catch_listener_failures ? log, continue : abort with Notification
//!     └─► turn guard dropped ─► clear_after_send ? clear capture
//!   clear_after_send ? clear capture
//!   apply requests queued by observers during the round
//!   return delivered
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use super::builder::ErrorHandlerBuilder;
use super::capture::{ErrorCapture, ErrorRecord};
use super::config::DispatcherPolicy;
use super::observers::ObserverSet;
use super::shared::lock_unpoisoned;
use crate::error::{HandlerError, ListenerError};
use crate::host::{self, FatalDisposition, Fault, FaultClass, HostDirective};
use crate::listeners::{ListenerArg, ListenerFactory, Observer, ObserverRef};

/// Observer attached through [`ErrorHandler::attach_named`].
struct NamedEntry {
    name: String,
    args: Vec<ListenerArg>,
    observer: ObserverRef,
}

/// Observer change requested through a shared reference.
enum Deferred {
    Attach(ObserverRef),
    Detach(ObserverRef),
}

/// Direction of a dynamic `attach<Name>` / `detach<Name>` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Attach,
    Detach,
}

/// Error subject: captures faults and fans them out to observers.
pub struct ErrorHandler {
    observers: ObserverSet,
    capture: ErrorCapture,
    policy: DispatcherPolicy,
    factory: ListenerFactory,
    named: Vec<NamedEntry>,
    deferred: Mutex<Vec<Deferred>>,
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorHandler {
    /// Creates a handler with the default policy, the built-in listeners and no observers.
    #[must_use]
    pub fn new() -> Self {
        ErrorHandlerBuilder::new().build()
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder() -> ErrorHandlerBuilder {
        ErrorHandlerBuilder::new()
    }

    pub(crate) fn from_parts(policy: DispatcherPolicy, factory: ListenerFactory, observers: ObserverSet) -> Self {
        Self {
            observers,
            capture: ErrorCapture::new(),
            policy,
            factory,
            named: Vec::new(),
            deferred: Mutex::new(Vec::new()),
        }
    }

    // ---- Capture ----

    /// Stores a new error, overwriting the previous one. Does not notify.
    pub fn capture(&mut self, code: i32, message: impl Into<String>, origin: impl Into<String>, line: u32) {
        self.capture.capture(code, message, origin, line);
    }

    /// Current error, `None` when there is none.
    pub fn current(&self) -> Option<&ErrorRecord> {
        self.capture.current()
    }

    /// Current error as `Error {code}: {message}, in file {origin} at line {line}`.
    pub fn render(&self) -> Option<String> {
        self.capture.render()
    }

    /// Drops the current error.
    pub fn clear_error(&mut self) {
        self.capture.clear();
    }

    // ---- Observers ----

    /// Attaches every observer; already attached handles are skipped.
    pub fn attach<I>(&mut self, observers: I) -> &mut Self
    where
        I: IntoIterator<Item = ObserverRef>,
    {
        for observer in observers {
            self.attach_one(observer);
        }
        self
    }

    /// Attaches one observer; no-op if the same handle is already attached.
    pub fn attach_one(&mut self, observer: ObserverRef) -> &mut Self {
        let name = observer.name();
        if self.observers.insert(observer) {
            debug!(listener = name, "observer attached");
        }
        self
    }

    /// Detaches every observer; absent handles are skipped.
    pub fn detach<I>(&mut self, observers: I) -> &mut Self
    where
        I: IntoIterator<Item = ObserverRef>,
    {
        for observer in observers {
            self.detach_one(&observer);
        }
        self
    }

    /// Detaches one observer; no-op if it is not attached.
    pub fn detach_one(&mut self, observer: &ObserverRef) -> &mut Self {
        if self.observers.remove(observer) {
            debug!(listener = observer.name(), "observer detached");
        }
        self
    }

    /// Queues `observer` for attachment when the running notification round ends.
    ///
    /// This is how an observer changes the set from inside
    /// [`Observer::update`], where it only has `&ErrorHandler`. The round in
    /// progress still notifies exactly its snapshot. Requests made outside a
    /// round are applied before the next one starts, or when the
    /// [`HandlerGuard`](super::HandlerGuard) holding the handler is released.
    pub fn attach_later(&self, observer: ObserverRef) {
        lock_unpoisoned(&self.deferred).push(Deferred::Attach(observer));
    }

    /// Queues `observer` for detachment; see [`ErrorHandler::attach_later`].
    pub fn detach_later(&self, observer: ObserverRef) {
        lock_unpoisoned(&self.deferred).push(Deferred::Detach(observer));
    }

    pub(crate) fn apply_deferred(&mut self) {
        let queued = std::mem::take(self.deferred.get_mut().unwrap_or_else(PoisonError::into_inner));
        for change in queued {
            match change {
                Deferred::Attach(observer) => self.attach_one(observer),
                Deferred::Detach(observer) => self.detach_one(&observer),
            };
        }
    }

    /// True if the same handle is attached.
    pub fn contains(&self, observer: &ObserverRef) -> bool {
        self.observers.contains(observer)
    }

    /// Builds the listener registered as `name` and attaches it.
    ///
    /// Every call constructs a new listener, so attaching the same name twice
    /// attaches two observers.
    ///
    /// # Errors
    /// - [`HandlerError::UnknownListener`] if the factory does not know `name`;
    /// - [`HandlerError::Listener`] if the listener rejected `args`.
    pub fn attach_named(&mut self, name: &str, args: &[ListenerArg]) -> Result<&mut Self, HandlerError> {
        let observer = self.resolve(name, args)?;
        self.prune_named();
        self.named.push(NamedEntry {
            name: ListenerFactory::normalize(name),
            args: args.to_vec(),
            observer: ObserverRef::clone(&observer),
        });
        Ok(self.attach_one(observer))
    }

    /// Detaches the listener most recently attached with the same `name` and `args`.
    ///
    /// The name and arguments are still resolved first, so an unknown name or
    /// rejected arguments fail exactly like [`ErrorHandler::attach_named`].
    pub fn detach_named(&mut self, name: &str, args: &[ListenerArg]) -> Result<&mut Self, HandlerError> {
        self.resolve(name, args)?;
        self.prune_named();

        let key = ListenerFactory::normalize(name);
        if let Some(pos) = self.named.iter().rposition(|e| e.name == key && e.args == args) {
            let entry = self.named.remove(pos);
            self.detach_one(&entry.observer);
        }
        Ok(self)
    }

    /// Dispatches a string-keyed call: `attach<Name>` or `detach<Name>`.
    ///
    /// ```
    /// use errvisor::{ErrorHandler, HandlerError};
    ///
    /// let mut handler = ErrorHandler::new();
    /// handler.call("attachLog", &[]).unwrap();
    /// assert_eq!(handler.len(), 1);
    ///
    /// let err = handler.call("explode", &[]).err().unwrap();
    /// assert!(matches!(err, HandlerError::UnsupportedOperation { .. }));
    /// ```
    pub fn call(&mut self, method: &str, args: &[ListenerArg]) -> Result<&mut Self, HandlerError> {
        match split_call(method) {
            Some((Direction::Attach, listener)) => self.attach_named(listener, args),
            Some((Direction::Detach, listener)) => self.detach_named(listener, args),
            None => Err(HandlerError::UnsupportedOperation {
                method: method.to_string(),
            }),
        }
    }

    fn resolve(&self, name: &str, args: &[ListenerArg]) -> Result<ObserverRef, HandlerError> {
        self.factory
            .create(name, args)?
            .ok_or_else(|| HandlerError::UnknownListener { name: name.to_string() })
    }

    /// Forgets named entries whose observer was detached by handle.
    fn prune_named(&mut self) {
        self.named.retain(|e| self.observers.contains(&e.observer));
    }

    /// Number of attached observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// True if no observer is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Iterates over attached observers in attachment order.
    pub fn iter(&self) -> impl Iterator<Item = &ObserverRef> + '_ {
        self.observers.iter()
    }

    /// Attached observers.
    pub fn observers(&self) -> &ObserverSet {
        &self.observers
    }

    /// Factory used by the named attach calls.
    pub fn factory(&self) -> &ListenerFactory {
        &self.factory
    }

    /// Mutable factory, to register application listeners.
    pub fn factory_mut(&mut self) -> &mut ListenerFactory {
        &mut self.factory
    }

    // ---- Dispatch ----

    /// Notifies every attached observer; returns how many updated successfully.
    ///
    /// # Errors
    /// [`HandlerError::Notification`] when an observer fails and
    /// `catch_listener_failures` is off. Later observers are not notified.
    pub fn notify(&mut self) -> Result<usize, HandlerError> {
        self.apply_deferred();
        let outcome = self.run_round();
        self.apply_deferred();
        outcome
    }

    fn run_round(&mut self) -> Result<usize, HandlerError> {
        let round = self.observers.snapshot();
        let mut delivered = 0;

        for observer in &round {
            let outcome = {
                let turn = ClearAfterTurn { handler: &mut *self };
                deliver(&**observer, &*turn.handler)
            };

            match outcome {
                Ok(()) => delivered += 1,
                Err(err) if self.policy.catch_listener_failures => {
                    warn!(listener = observer.name(), error = %err, "listener failed while notified");
                }
                Err(err) => {
                    return Err(HandlerError::Notification {
                        listener: observer.name(),
                        source: err,
                    });
                }
            }
        }

        if self.policy.clear_after_send {
            self.capture.clear();
        }
        Ok(delivered)
    }

    /// Host error callback: capture, notify, tell the host whether to fall back.
    ///
    /// Returns [`HostDirective::Handled`] without doing anything while reporting is
    /// suppressed on this thread (see [`host::suppress`]).
    pub fn on_host_error(
        &mut self,
        code: i32,
        message: impl Into<String>,
        origin: impl Into<String>,
        line: u32,
    ) -> Result<HostDirective, HandlerError> {
        if host::is_suppressed() {
            return Ok(HostDirective::Handled);
        }

        self.capture(code, message, origin, line);
        self.notify()?;

        if self.policy.fall_back_to_host {
            Ok(HostDirective::FallBack)
        } else {
            Ok(HostDirective::Handled)
        }
    }

    /// Host fatal callback.
    ///
    /// `Error`-class faults are dispatched like [`ErrorHandler::on_host_error`] and then
    /// re-raised only if `rethrow_on_fatal` is on. Other faults are re-raised untouched.
    /// The fault is borrowed, so the caller still owns it when dispatch fails.
    pub fn on_host_fatal(&mut self, fault: &Fault) -> Result<FatalDisposition, HandlerError> {
        if fault.class != FaultClass::Error {
            return Ok(FatalDisposition::Rethrow(fault.clone()));
        }

        self.on_host_error(fault.code, fault.message.as_str(), fault.origin.as_str(), fault.line)?;

        if self.policy.rethrow_on_fatal {
            Ok(FatalDisposition::Rethrow(fault.clone()))
        } else {
            Ok(FatalDisposition::Handled)
        }
    }

    // ---- Policy ----

    /// Current policy.
    pub fn policy(&self) -> &DispatcherPolicy {
        &self.policy
    }

    /// Replaces the whole policy.
    pub fn set_policy(&mut self, policy: DispatcherPolicy) -> &mut Self {
        self.policy = policy;
        self
    }

    /// See [`DispatcherPolicy::fall_back_to_host`].
    pub fn fall_back_to_host(&self) -> bool {
        self.policy.fall_back_to_host
    }

    /// See [`DispatcherPolicy::fall_back_to_host`].
    pub fn set_fall_back_to_host(&mut self, on: bool) -> &mut Self {
        self.policy.fall_back_to_host = on;
        self
    }

    /// See [`DispatcherPolicy::rethrow_on_fatal`].
    pub fn rethrow_on_fatal(&self) -> bool {
        self.policy.rethrow_on_fatal
    }

    /// See [`DispatcherPolicy::rethrow_on_fatal`].
    pub fn set_rethrow_on_fatal(&mut self, on: bool) -> &mut Self {
        self.policy.rethrow_on_fatal = on;
        self
    }

    /// See [`DispatcherPolicy::clear_after_send`].
    pub fn clear_after_send(&self) -> bool {
        self.policy.clear_after_send
    }

    /// See [`DispatcherPolicy::clear_after_send`].
    pub fn set_clear_after_send(&mut self, on: bool) -> &mut Self {
        self.policy.clear_after_send = on;
        self
    }

    /// See [`DispatcherPolicy::catch_listener_failures`].
    pub fn catch_listener_failures(&self) -> bool {
        self.policy.catch_listener_failures
    }

    /// See [`DispatcherPolicy::catch_listener_failures`].
    pub fn set_catch_listener_failures(&mut self, on: bool) -> &mut Self {
        self.policy.catch_listener_failures = on;
        self
    }
}

impl std::fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("observers", &self.observers)
            .field("current", &self.capture.current())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<'a> IntoIterator for &'a ErrorHandler {
    type Item = &'a ObserverRef;
    type IntoIter = std::slice::Iter<'a, ObserverRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.observers.iter()
    }
}

/// Clears the capture when one observer's turn ends, on every exit path.
struct ClearAfterTurn<'a> {
    handler: &'a mut ErrorHandler,
}

impl Drop for ClearAfterTurn<'_> {
    fn drop(&mut self) {
        if self.handler.policy.clear_after_send {
            self.handler.capture.clear();
        }
    }
}

fn deliver(observer: &dyn Observer, subject: &ErrorHandler) -> Result<(), ListenerError> {
    match panic::catch_unwind(AssertUnwindSafe(|| observer.update(subject))) {
        Ok(result) => result,
        Err(payload) => Err(ListenerError::Panicked {
            info: panic_message(&*payload),
        }),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn split_call(method: &str) -> Option<(Direction, &str)> {
    let (direction, listener) = if let Some(rest) = method.strip_prefix("attach") {
        (Direction::Attach, rest)
    } else if let Some(rest) = method.strip_prefix("detach") {
        (Direction::Detach, rest)
    } else {
        return None;
    };

    let valid = !listener.is_empty() && listener.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some((direction, listener))
}
