//! # LogListener: captured errors to `tracing`
//!
//! A minimal listener that writes the current error through `tracing`.
//! The crate never installs a subscriber; the binary decides where events go.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! ERROR errvisor::listeners::log: Error 2: Foo!, in file test.src at line 10 code=2 origin="test.src" line=10
//! ```

use std::str::FromStr;

use tracing::{debug, error, info, warn};

use super::factory::{ListenerArg, str_arg};
use super::observer::Observer;
use crate::error::ListenerError;
use crate::handler::ErrorHandler;

/// Level the listener logs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// `tracing::Level::ERROR`
    #[default]
    Error,
    /// `tracing::Level::WARN`
    Warn,
    /// `tracing::Level::INFO`
    Info,
    /// `tracing::Level::DEBUG`
    Debug,
}

impl FromStr for LogLevel {
    type Err = ListenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(ListenerError::invalid_argument(format!("unknown log level {other:?}"))),
        }
    }
}

/// Error writer listener.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener {
    level: LogLevel,
}

impl LogListener {
    /// Construct a new [`LogListener`] logging at `ERROR`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a listener logging at `level`.
    #[must_use]
    pub fn with_level(level: LogLevel) -> Self {
        Self { level }
    }

    /// Factory form: `[level?]`.
    pub fn from_args(args: &[ListenerArg]) -> Result<Self, ListenerError> {
        let level = match str_arg(args, 0, "level")? {
            Some(level) => level.parse()?,
            None => LogLevel::default(),
        };
        Ok(Self::with_level(level))
    }

    /// Configured level.
    pub fn level(&self) -> LogLevel {
        self.level
    }
}

impl Observer for LogListener {
    fn update(&self, subject: &ErrorHandler) -> Result<(), ListenerError> {
        let Some(record) = subject.current() else {
            return Ok(());
        };
        let (code, origin, line) = (record.code, record.origin.as_str(), record.line);
        match self.level {
            LogLevel::Error => error!(code, origin, line, "{record}"),
            LogLevel::Warn => warn!(code, origin, line, "{record}"),
            LogLevel::Info => info!(code, origin, line, "{record}"),
            LogLevel::Debug => debug!(code, origin, line, "{record}"),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
