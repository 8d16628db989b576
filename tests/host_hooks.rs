mod common;

use std::panic;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use common::{Mock, handle, serial};
use errvisor::{
    ErrorHandler, Fault, HandlerError, HostDirective, ListenerError, Observer, ObserverRef, SharedHandler, codes,
    host, report_error,
};

/// Locks its own handler from inside `update`.
struct Relock(SharedHandler);

impl Observer for Relock {
    fn update(&self, _subject: &ErrorHandler) -> Result<(), ListenerError> {
        self.0.lock().clear_error();
        Ok(())
    }
}

/// Detaches `target` from inside `update`.
struct Unsubscribe(ObserverRef);

impl Observer for Unsubscribe {
    fn update(&self, subject: &ErrorHandler) -> Result<(), ListenerError> {
        subject.detach_later(ObserverRef::clone(&self.0));
        Ok(())
    }
}

fn crash() {
    panic!("kaboom");
}

fn generate_error() -> Result<HostDirective, HandlerError> {
    report_error!(codes::USER_WARNING, "Foo!")
}

#[test]
fn test_error_gets_caught() {
    let _serial = serial();
    let handler = ErrorHandler::builder().build_shared();
    handler.lock().set_clear_after_send(false);

    handler.start();
    let directive = generate_error().unwrap();
    handler.stop();

    assert_eq!(directive, HostDirective::Handled);
    let rendered = handler.lock().render().unwrap();
    assert!(rendered.contains("Foo!"), "{rendered}");
    assert!(rendered.starts_with("Error 512: Foo!, in file tests/host_hooks.rs at line "));
}

#[test]
fn test_subject_notifies_observers() {
    let _serial = serial();
    let mock = Mock::new();
    let handler = ErrorHandler::builder().with_observers(vec![handle(&mock)]).build_shared();

    handler.start();
    generate_error().unwrap();
    handler.stop();

    assert!(mock.message().unwrap().contains("Foo!"));
    assert!(handler.lock().current().is_none());
}

#[test]
fn test_fall_back_to_host() {
    let _serial = serial();
    let handler = ErrorHandler::builder().build_shared();
    handler.lock().set_fall_back_to_host(true);

    handler.start();
    let directive = generate_error().unwrap();
    handler.stop();

    assert_eq!(directive, HostDirective::FallBack);
}

#[test]
fn test_listener_failure_surfaces_through_host() {
    let _serial = serial();
    let handler = ErrorHandler::builder().with_observers(vec![handle(&Mock::failing())]).build_shared();
    handler.lock().set_catch_listener_failures(false);

    handler.start();
    let result = generate_error();
    handler.stop();

    assert!(matches!(
        result,
        Err(HandlerError::Notification { source: ListenerError::Failed { .. }, .. })
    ));
}

#[test]
fn test_stopped_handler_sees_nothing() {
    let _serial = serial();
    let mock = Mock::new();
    let handler = ErrorHandler::builder().with_observers(vec![handle(&mock)]).build_shared();

    handler.start();
    assert!(handler.is_started());
    handler.stop();
    assert!(!handler.is_started());

    assert_eq!(generate_error().unwrap(), HostDirective::FallBack);
    assert_eq!(mock.calls(), 0);
}

#[test]
fn test_suppressed_report_is_ignored() {
    let _serial = serial();
    let mock = Mock::new();
    let handler = ErrorHandler::builder().with_observers(vec![handle(&mock)]).build_shared();

    handler.start();
    let directive = {
        let _quiet = host::suppress();
        generate_error().unwrap()
    };
    handler.stop();

    assert_eq!(directive, HostDirective::Handled);
    assert_eq!(mock.calls(), 0);
}

#[test]
fn test_stop_restores_previous_handler() {
    let _serial = serial();
    let (first, second) = (Mock::new(), Mock::new());
    let outer = ErrorHandler::builder().with_observers(vec![handle(&first)]).build_shared();
    let inner = ErrorHandler::builder().with_observers(vec![handle(&second)]).build_shared();

    outer.start();
    inner.start();
    generate_error().unwrap();
    assert_eq!((first.calls(), second.calls()), (0, 1));

    inner.stop();
    generate_error().unwrap();
    assert_eq!((first.calls(), second.calls()), (1, 1));
    outer.stop();
}

#[test]
fn test_start_twice_registers_once() {
    let _serial = serial();
    let handler = ErrorHandler::builder().build_shared();

    handler.start();
    handler.start();
    handler.stop();

    assert!(!handler.is_started());
}

#[test]
fn test_panic_is_dispatched() {
    let _serial = serial();
    let mock = Mock::new();
    let handler = ErrorHandler::builder().with_observers(vec![handle(&mock)]).build_shared();
    handler.lock().set_rethrow_on_fatal(false);

    handler.start();
    let result = panic::catch_unwind(crash);
    handler.stop();

    assert!(result.is_err());
    let seen = mock.message().unwrap();
    assert!(seen.starts_with("Error 1: kaboom, in file tests/host_hooks.rs"), "{seen}");
}

#[test]
fn test_report_fatal() {
    let _serial = serial();
    let mock = Mock::new();
    let handler = ErrorHandler::builder().with_observers(vec![handle(&mock)]).build_shared();

    let fault = Fault::error(codes::ERROR, "boom", "main.rs", 3);
    assert_eq!(host::report_fatal(fault.clone()), Err(fault.clone()));
    assert_eq!(mock.calls(), 0);

    handler.start();
    assert_eq!(host::report_fatal(fault.clone()), Err(fault.clone()));
    assert_eq!(mock.calls(), 1);

    handler.lock().set_rethrow_on_fatal(false);
    assert_eq!(host::report_fatal(fault), Ok(()));

    let other = Fault::exception(0, "not ours", "lib.rs", 1);
    assert_eq!(host::report_fatal(other.clone()), Err(other));
    handler.stop();

    assert_eq!(mock.calls(), 2);
}

#[test]
fn test_reentrant_report_falls_back() {
    let _serial = serial();
    let mock = Mock::new();
    let handler = ErrorHandler::builder().with_observers(vec![handle(&mock)]).build_shared();

    handler.start();
    let directive = {
        let _held = handler.lock();
        generate_error().unwrap()
    };
    handler.stop();

    assert_eq!(directive, HostDirective::FallBack);
    assert_eq!(mock.calls(), 0);
}

#[test]
fn test_report_waits_for_other_thread() {
    let _serial = serial();
    let mock = Mock::new();
    let handler = ErrorHandler::builder().with_observers(vec![handle(&mock)]).build_shared();
    handler.start();

    let (locked_tx, locked_rx) = mpsc::channel();
    let holder = {
        let handler = handler.clone();
        thread::spawn(move || {
            let mut guard = handler.lock();
            guard.set_clear_after_send(false);
            locked_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(100));
        })
    };
    locked_rx.recv().unwrap();

    let directive = generate_error().unwrap();
    holder.join().unwrap();
    handler.stop();

    assert_eq!(directive, HostDirective::Handled);
    assert_eq!(mock.calls(), 1);
    assert!(handler.lock().render().unwrap().contains("Foo!"));
}

#[test]
fn test_panic_on_other_thread_waits_for_lock() {
    let _serial = serial();
    let mock = Mock::new();
    let handler = ErrorHandler::builder().with_observers(vec![handle(&mock)]).build_shared();
    handler.lock().set_rethrow_on_fatal(false);
    handler.start();

    let (locked_tx, locked_rx) = mpsc::channel();
    let holder = {
        let handler = handler.clone();
        thread::spawn(move || {
            let _guard = handler.lock();
            locked_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(100));
        })
    };
    locked_rx.recv().unwrap();

    let result = panic::catch_unwind(crash);
    holder.join().unwrap();
    handler.stop();

    assert!(result.is_err());
    assert_eq!(mock.calls(), 1);
}

#[test]
fn test_observer_relocking_handler_fails_instead_of_hanging() {
    let _serial = serial();
    let handler = ErrorHandler::builder().build_shared();
    {
        let mut guard = handler.lock();
        guard.set_catch_listener_failures(false);
        guard.attach_one(Arc::new(Relock(handler.clone())));
    }

    handler.start();
    let result = generate_error();
    handler.stop();

    assert!(matches!(
        result,
        Err(HandlerError::Notification { source: ListenerError::Panicked { .. }, .. })
    ));

    // Relock holds a handle to its own handler.
    let attached: Vec<ObserverRef> = handler.lock().iter().cloned().collect();
    handler.lock().detach(attached);
}

#[test]
fn test_observer_detaches_peer_after_round() {
    let _serial = serial();
    let mock = Mock::new();
    let handler = ErrorHandler::builder()
        .with_observers(vec![Arc::new(Unsubscribe(handle(&mock))) as ObserverRef, handle(&mock)])
        .build_shared();

    handler.start();
    generate_error().unwrap();
    assert_eq!(mock.calls(), 1);
    assert_eq!(handler.lock().len(), 1);

    generate_error().unwrap();
    handler.stop();
    assert_eq!(mock.calls(), 1);
}
