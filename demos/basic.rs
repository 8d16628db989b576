//! Starts the process-wide handler, attaches a custom observer and the built-in
//! log listener, then reports a warning and panics once.
//!
//! Run with: `RUST_LOG=debug cargo run --example basic`

use std::sync::Arc;

use errvisor::{ErrorHandler, ListenerError, Observer, codes, report_error};
use tracing_subscriber::EnvFilter;

struct Stdout;

impl Observer for Stdout {
    fn update(&self, subject: &ErrorHandler) -> Result<(), ListenerError> {
        if let Some(text) = subject.render() {
            println!("[observer] {text}");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}

fn worker() {
    panic!("worker crashed");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let handler = errvisor::get_instance(true);
    {
        let mut h = handler.lock();
        // Every observer sees the error in this demo.
        h.set_clear_after_send(false);
        h.attach_one(Arc::new(Stdout));
        h.call("attachLog", &["warn".into()])?;
    }

    report_error!(codes::USER_WARNING, "disk {}% full", 91)?;

    let _ = std::panic::catch_unwind(worker);

    handler.stop();
    errvisor::reset_instance(false);
    Ok(())
}
