//! Host error codes.
//!
//! Severity codes carried by [`ErrorRecord::code`](crate::ErrorRecord). The values are
//! bit flags so a host can build masks from them; the handler itself treats the code as
//! an opaque integer.

/// Unrecoverable runtime error. Panics reach the fatal hook with this code.
pub const ERROR: i32 = 1;
/// Recoverable runtime warning.
pub const WARNING: i32 = 2;
/// Runtime notice.
pub const NOTICE: i32 = 8;
/// Unrecoverable error raised by user code.
pub const USER_ERROR: i32 = 256;
/// Warning raised by user code.
pub const USER_WARNING: i32 = 512;
/// Notice raised by user code.
pub const USER_NOTICE: i32 = 1024;

/// Returns `true` for codes describing an unrecoverable error.
///
/// ```
/// use errvisor::codes;
///
/// assert!(codes::is_fatal_code(codes::USER_ERROR));
/// assert!(!codes::is_fatal_code(codes::WARNING));
/// ```
pub fn is_fatal_code(code: i32) -> bool {
    code & (ERROR | USER_ERROR) != 0
}

/// Short name for a known code, `"unknown"` otherwise.
pub fn name(code: i32) -> &'static str {
    match code {
        ERROR => "error",
        WARNING => "warning",
        NOTICE => "notice",
        USER_ERROR => "user_error",
        USER_WARNING => "user_warning",
        USER_NOTICE => "user_notice",
        _ => "unknown",
    }
}
