//! # Host fault-reporting hooks.
//!
//! The "host" is the process the handler is installed into. It offers three hooks:
//!
//! - **Error callback stack**: [`report`] (and [`report_error!`](crate::report_error))
//!   hands a recoverable error to the most recently started handler. When no handler
//!   is active, or the handler asks for it, the host's default handling runs: the error
//!   is written through `tracing`.
//! - **Fatal hook**: backed by the Rust panic hook. A started handler receives every
//!   panic as an `Error`-class [`Fault`]; [`report_fatal`] feeds other faults in.
//!   Re-raising a panic means running the panic hook that was active before the handler
//!   started (by default: the panic message on stderr). Unwinding continues either way.
//! - **Suppression**: [`suppress`] silences reporting on the current thread for the
//!   lifetime of the returned guard.
//!
//! ## Architecture
//! ```text
//! report(code, msg, file, line)                     panic!() / report_fatal(fault)
//!        │                                                  │
//!        ▼                                                  ▼
//!  ERROR_HOOKS (stack, top is active)               FATAL_HOOK (owner + previous hook)
//!        │ lock (or fall back on re-entry)                  │ lock (or previous hook on re-entry)
//!        ▼                                                  ▼
//!  ErrorHandler::on_host_error() ──► notify()       ErrorHandler::on_host_fatal()
//!        │                                                  │
//!        └─ FallBack ─► default handling (tracing)          └─ Rethrow ─► previous panic hook
//! ```
//!
//! ## Rules
//! - Host access to a handler is serialized through its lock: a report made while
//!   another thread holds the handler waits for it.
//! - A report made by the thread already holding the handler (e.g. an observer
//!   reporting from inside `update`) skips it and the default handling runs instead.
//! - Observers must not panic while a panic is being dispatched: a panic inside the
//!   panic hook aborts the process.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use crate::codes;
use crate::error::HandlerError;
use crate::handler::{SharedHandler, lock_unpoisoned, panic_message};

/// What the host should do after the handler saw a recoverable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostDirective {
    /// The handler dealt with it; the host stays silent.
    Handled,
    /// The host runs its own default handling as well.
    FallBack,
}

/// Class of a fatal fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// Unrecoverable error (panics); captured and dispatched.
    Error,
    /// Any other fault; passed straight back to the host.
    Exception,
}

/// A fatal fault reported to the fatal hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Fault class.
    pub class: FaultClass,
    /// Severity / kind code.
    pub code: i32,
    /// Fault message.
    pub message: String,
    /// File the fault was raised in.
    pub origin: String,
    /// Line in `origin`, `0` when unknown.
    pub line: u32,
}

impl Fault {
    /// An `Error`-class fault.
    pub fn error(code: i32, message: impl Into<String>, origin: impl Into<String>, line: u32) -> Self {
        Self {
            class: FaultClass::Error,
            code,
            message: message.into(),
            origin: origin.into(),
            line,
        }
    }

    /// An `Exception`-class fault.
    pub fn exception(code: i32, message: impl Into<String>, origin: impl Into<String>, line: u32) -> Self {
        Self {
            class: FaultClass::Exception,
            ..Self::error(code, message, origin, line)
        }
    }

    /// Builds an `Error`-class fault from a panic.
    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let (origin, line) = info
            .location()
            .map(|l| (l.file().to_string(), l.line()))
            .unwrap_or_else(|| ("<unknown>".to_string(), 0));
        Self::error(codes::ERROR, panic_message(info.payload()), origin, line)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.message, self.origin, self.line)
    }
}

impl std::error::Error for Fault {}

/// Outcome of a fatal fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalDisposition {
    /// The fault goes back to the host's normal propagation path.
    Rethrow(Fault),
    /// The handler consumed the fault.
    Handled,
}

type PanicHook = dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static;

struct FatalHook {
    owner: SharedHandler,
    previous: Arc<PanicHook>,
}

static ERROR_HOOKS: Mutex<Vec<SharedHandler>> = Mutex::new(Vec::new());
static FATAL_HOOK: Mutex<Option<FatalHook>> = Mutex::new(None);

thread_local! {
    static SUPPRESSED: Cell<usize> = const { Cell::new(0) };
}

/// Reports a recoverable error to the active handler.
///
/// Runs the default handling when no handler is active, when the current thread
/// already holds the active handler, or when it answers [`HostDirective::FallBack`]. Nothing at all happens
/// while reporting is suppressed on this thread.
///
/// # Errors
/// Propagates [`HandlerError::Notification`] when the handler does not catch
/// listener failures.
pub fn report(
    code: i32,
    message: impl Into<String>,
    origin: impl Into<String>,
    line: u32,
) -> Result<HostDirective, HandlerError> {
    if is_suppressed() {
        return Ok(HostDirective::Handled);
    }
    let (message, origin) = (message.into(), origin.into());

    let active = lock_unpoisoned(&ERROR_HOOKS).last().cloned();
    let directive = match &active {
        Some(handler) if handler.is_held_here() => HostDirective::FallBack,
        Some(handler) => handler
            .lock()
            .on_host_error(code, message.as_str(), origin.as_str(), line)?,
        None => HostDirective::FallBack,
    };

    if directive == HostDirective::FallBack {
        default_error_handling(code, &message, &origin, line);
    }
    Ok(directive)
}

/// Reports a fatal fault to the installed fatal hook.
///
/// Returns `Err(fault)` when the fault must continue to the host's normal
/// propagation path: no handler is installed, the current thread already holds
/// it, or it asked for a rethrow.
pub fn report_fatal(fault: Fault) -> Result<(), Fault> {
    let owner = lock_unpoisoned(&FATAL_HOOK).as_ref().map(|hook| hook.owner.clone());
    let Some(owner) = owner else {
        return Err(fault);
    };
    dispatch_fatal(&owner, fault)
}

/// Suppresses reporting on the current thread until the guard is dropped.
///
/// Guards nest.
///
/// ```
/// use errvisor::host;
///
/// {
///     let _quiet = host::suppress();
///     assert!(host::is_suppressed());
/// }
/// assert!(!host::is_suppressed());
/// ```
pub fn suppress() -> SuppressGuard {
    SUPPRESSED.with(|depth| depth.set(depth.get() + 1));
    SuppressGuard { _thread: PhantomData }
}

/// True while a [`SuppressGuard`] is alive on the current thread.
pub fn is_suppressed() -> bool {
    SUPPRESSED.with(|depth| depth.get() > 0)
}

/// Guard returned by [`suppress`]. Not `Send`: suppression is per thread.
#[must_use = "reporting is only suppressed while the guard is alive"]
pub struct SuppressGuard {
    _thread: PhantomData<*const ()>,
}

impl Drop for SuppressGuard {
    fn drop(&mut self) {
        SUPPRESSED.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Reports an error with the caller's file and line.
///
/// ```
/// use errvisor::{codes, report_error, HostDirective};
///
/// // No handler started: the host's default handling runs.
/// let directive = report_error!(codes::USER_WARNING, "disk {}% full", 91).unwrap();
/// assert_eq!(directive, HostDirective::FallBack);
/// ```
#[macro_export]
macro_rules! report_error {
    ($code:expr, $($arg:tt)+) => {
        $crate::host::report($code, ::std::format!($($arg)+), ::std::file!(), ::std::line!())
    };
}

pub(crate) fn install(handler: &SharedHandler) {
    {
        let mut hooks = lock_unpoisoned(&ERROR_HOOKS);
        hooks.retain(|h| !h.ptr_eq(handler));
        hooks.push(handler.clone());
    }

    let mut slot = lock_unpoisoned(&FATAL_HOOK);
    match slot.as_mut() {
        Some(hook) => hook.owner = handler.clone(),
        None => {
            let previous: Arc<PanicHook> = Arc::from(panic::take_hook());
            panic::set_hook(Box::new(on_panic));
            *slot = Some(FatalHook {
                owner: handler.clone(),
                previous,
            });
        }
    }
    info!("error handler started");
}

pub(crate) fn uninstall(handler: &SharedHandler) {
    {
        let mut hooks = lock_unpoisoned(&ERROR_HOOKS);
        if let Some(pos) = hooks.iter().rposition(|h| h.ptr_eq(handler)) {
            hooks.remove(pos);
        }
    }

    let mut slot = lock_unpoisoned(&FATAL_HOOK);
    if slot.as_ref().is_some_and(|hook| hook.owner.ptr_eq(handler)) {
        if let Some(hook) = slot.take() {
            let previous = hook.previous;
            panic::set_hook(Box::new(move |info| previous(info)));
        }
    }
    info!("error handler stopped");
}

pub(crate) fn is_installed(handler: &SharedHandler) -> bool {
    lock_unpoisoned(&ERROR_HOOKS).iter().any(|h| h.ptr_eq(handler))
}

fn on_panic(info: &PanicHookInfo<'_>) {
    let hook = lock_unpoisoned(&FATAL_HOOK)
        .as_ref()
        .map(|hook| (hook.owner.clone(), Arc::clone(&hook.previous)));
    let Some((owner, previous)) = hook else {
        return;
    };

    if is_suppressed() || dispatch_fatal(&owner, Fault::from_panic(info)).is_err() {
        previous(info);
    }
}

fn dispatch_fatal(owner: &SharedHandler, fault: Fault) -> Result<(), Fault> {
    if owner.is_held_here() {
        return Err(fault);
    }

    let outcome = owner.lock().on_host_fatal(&fault);
    match outcome {
        Ok(FatalDisposition::Handled) => Ok(()),
        Ok(FatalDisposition::Rethrow(rethrown)) => Err(rethrown),
        Err(err) => {
            error!(error = %err, "error handler failed while dispatching a fatal fault");
            Err(fault)
        }
    }
}

fn default_error_handling(code: i32, message: &str, origin: &str, line: u32) {
    let kind = codes::name(code);
    if codes::is_fatal_code(code) {
        error!(code, kind, origin, line, "{message}");
    } else if code & (codes::WARNING | codes::USER_WARNING) != 0 {
        warn!(code, kind, origin, line, "{message}");
    } else {
        info!(code, kind, origin, line, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppress_nests() {
        assert!(!is_suppressed());
        let outer = suppress();
        {
            let _inner = suppress();
            assert!(is_suppressed());
        }
        assert!(is_suppressed());
        drop(outer);
        assert!(!is_suppressed());
    }

    #[test]
    fn test_exception_fault_keeps_fields() {
        let fault = Fault::exception(7, "nope", "x.rs", 2);
        assert_eq!(fault.class, FaultClass::Exception);
        assert_eq!(fault.to_string(), "nope at x.rs:2");
    }

    #[test]
    fn test_report_fatal_without_hook_rethrows() {
        let fault = Fault::error(codes::ERROR, "boom", "a.rs", 1);
        assert_eq!(report_fatal(fault.clone()), Err(fault));
    }
}
