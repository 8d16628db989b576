//! # Last captured error.
//!
//! [`ErrorCapture`] holds at most one [`ErrorRecord`]. Either all four fields are
//! present or there is no current error; partial records cannot be represented.

use std::fmt;

/// One captured fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Severity / kind of the fault (see [`crate::codes`]).
    pub code: i32,
    /// Fault message.
    pub message: String,
    /// File-like identifier of where the fault was raised.
    pub origin: String,
    /// Line in `origin`, `0` when unknown.
    pub line: u32,
}

impl ErrorRecord {
    /// Creates a new record.
    pub fn new(code: i32, message: impl Into<String>, origin: impl Into<String>, line: u32) -> Self {
        Self {
            code,
            message: message.into(),
            origin: origin.into(),
            line,
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error {}: {}, in file {} at line {}",
            self.code, self.message, self.origin, self.line
        )
    }
}

/// Slot for the most recently captured error.
#[derive(Debug, Default, Clone)]
pub struct ErrorCapture {
    record: Option<ErrorRecord>,
}

impl ErrorCapture {
    /// Creates an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new record, overwriting any previous one.
    pub fn capture(&mut self, code: i32, message: impl Into<String>, origin: impl Into<String>, line: u32) {
        self.record = Some(ErrorRecord::new(code, message, origin, line));
    }

    /// Current record, `None` when there is no current error.
    pub fn current(&self) -> Option<&ErrorRecord> {
        self.record.as_ref()
    }

    /// Renders the current record as `Error {code}: {message}, in file {origin} at line {line}`.
    pub fn render(&self) -> Option<String> {
        self.record.as_ref().map(ToString::to_string)
    }

    /// Resets to "no current error".
    pub fn clear(&mut self) {
        self.record = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_format() {
        let mut cap = ErrorCapture::new();
        cap.capture(2, "Foo!", "test.src", 10);
        assert_eq!(
            cap.render().as_deref(),
            Some("Error 2: Foo!, in file test.src at line 10")
        );
    }

    #[test]
    fn test_empty_is_absent() {
        let cap = ErrorCapture::new();
        assert!(cap.current().is_none());
        assert!(cap.render().is_none());
    }

    #[test]
    fn test_capture_overwrites() {
        let mut cap = ErrorCapture::new();
        cap.capture(2, "first", "a.rs", 1);
        cap.capture(8, "second", "b.rs", 0);
        let rec = cap.current().expect("record");
        assert_eq!(rec, &ErrorRecord::new(8, "second", "b.rs", 0));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut cap = ErrorCapture::new();
        cap.capture(2, "Foo!", "test.src", 10);
        cap.clear();
        cap.clear();
        assert!(cap.current().is_none());
    }
}
