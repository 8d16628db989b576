#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use errvisor::{ErrorHandler, ListenerError, Observer, ObserverRef};

/// Host hooks and the process-wide instance are global: one test at a time.
static SERIAL: Mutex<()> = Mutex::new(());

pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Observer recording the rendered error it saw; optionally failing.
#[derive(Default)]
pub struct Mock {
    fail: bool,
    calls: AtomicUsize,
    messages: Mutex<Vec<Option<String>>>,
}

impl Mock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn message(&self) -> Option<String> {
        self.messages.lock().unwrap().last().cloned().flatten()
    }
}

impl Observer for Mock {
    fn update(&self, subject: &ErrorHandler) -> Result<(), ListenerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().unwrap().push(subject.render());
        if self.fail {
            return Err(ListenerError::failed("mock asked to fail"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

pub fn handle(mock: &Arc<Mock>) -> ObserverRef {
    Arc::clone(mock) as ObserverRef
}
