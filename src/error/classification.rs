/// Error classification for chunk-level retry decisions
///
/// Only storage I/O is classified; everything above the chunk level is
/// either a target-local outcome or aborts the job.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Classification of errors for retry selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Temporary condition that may clear on retry
    /// Examples: interrupted syscall, would-block, timeout, short write
    Transient,

    /// Cannot recover, abort the pass
    /// Examples: device gone, permission denied, no space
    Fatal,
}

impl ErrorClass {
    /// Get human-readable description of error class
    pub fn description(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "Temporary error that may resolve on retry",
            ErrorClass::Fatal => "Unrecoverable error requiring abort",
        }
    }

    /// Check if this error class allows retries
    pub fn allows_retry(&self) -> bool {
        matches!(self, ErrorClass::Transient)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Transient => write!(f, "Transient"),
            ErrorClass::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Classify a storage error by its kind.
pub fn classify_io(error: &io::Error) -> ErrorClass {
    match error.kind() {
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
            ErrorClass::Transient
        }
        _ => ErrorClass::Fatal,
    }
}
