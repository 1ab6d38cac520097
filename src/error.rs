//! Error types for the Hyperscan binding
//!
//! Engine status codes are normalised into [`Status`] before anything else
//! looks at them. Requests that are malformed on our side of the boundary
//! get their own variants and never reach the engine.

use std::fmt;
use std::os::raw::c_int;

use thiserror::Error;

use crate::ffi;

/// Result type alias for binding operations
pub type Result<T> = std::result::Result<T, Error>;

/// Closed set of engine status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Invalid,
    OutOfMemory,
    ScanTerminated,
    CompilerError,
    DatabaseVersionMismatch,
    DatabasePlatformMismatch,
    DatabaseModeMismatch,
    BadAlignment,
    BadAlloc,
    ScratchInUse,
    UnsupportedArchitecture,
    InsufficientSpace,
    Unknown,
}

// `hs_error_t` values. The generated bindings type the non-negative codes
// as unsigned, so everything is normalised to `c_int` here.
const SUCCESS: c_int = ffi::HS_SUCCESS as c_int;
const INVALID: c_int = ffi::HS_INVALID as c_int;
const NOMEM: c_int = ffi::HS_NOMEM as c_int;
const SCAN_TERMINATED: c_int = ffi::HS_SCAN_TERMINATED as c_int;
const COMPILER_ERROR: c_int = ffi::HS_COMPILER_ERROR as c_int;
const DB_VERSION_ERROR: c_int = ffi::HS_DB_VERSION_ERROR as c_int;
const DB_PLATFORM_ERROR: c_int = ffi::HS_DB_PLATFORM_ERROR as c_int;
const DB_MODE_ERROR: c_int = ffi::HS_DB_MODE_ERROR as c_int;
const BAD_ALIGN: c_int = ffi::HS_BAD_ALIGN as c_int;
const BAD_ALLOC: c_int = ffi::HS_BAD_ALLOC as c_int;
const SCRATCH_IN_USE: c_int = ffi::HS_SCRATCH_IN_USE as c_int;
const ARCH_ERROR: c_int = ffi::HS_ARCH_ERROR as c_int;
const INSUFFICIENT_SPACE: c_int = ffi::HS_INSUFFICIENT_SPACE as c_int;

impl Status {
    /// Map a raw `hs_error_t`. `HS_UNKNOWN_ERROR` and any code the engine
    /// may add later land on `Unknown`.
    pub fn from_code(code: c_int) -> Self {
        match code {
            SUCCESS => Status::Success,
            INVALID => Status::Invalid,
            NOMEM => Status::OutOfMemory,
            SCAN_TERMINATED => Status::ScanTerminated,
            COMPILER_ERROR => Status::CompilerError,
            DB_VERSION_ERROR => Status::DatabaseVersionMismatch,
            DB_PLATFORM_ERROR => Status::DatabasePlatformMismatch,
            DB_MODE_ERROR => Status::DatabaseModeMismatch,
            BAD_ALIGN => Status::BadAlignment,
            BAD_ALLOC => Status::BadAlloc,
            SCRATCH_IN_USE => Status::ScratchInUse,
            ARCH_ERROR => Status::UnsupportedArchitecture,
            INSUFFICIENT_SPACE => Status::InsufficientSpace,
            _ => Status::Unknown,
        }
    }

    /// The engine's own name for the status, as exposed to Python.
    pub fn name(self) -> &'static str {
        match self {
            Status::Success => "HS_SUCCESS",
            Status::Invalid => "HS_INVALID",
            Status::OutOfMemory => "HS_NOMEM",
            Status::ScanTerminated => "HS_SCAN_TERMINATED",
            Status::CompilerError => "HS_COMPILER_ERROR",
            Status::DatabaseVersionMismatch => "HS_DB_VERSION_ERROR",
            Status::DatabasePlatformMismatch => "HS_DB_PLATFORM_ERROR",
            Status::DatabaseModeMismatch => "HS_DB_MODE_ERROR",
            Status::BadAlignment => "HS_BAD_ALIGN",
            Status::BadAlloc => "HS_BAD_ALLOC",
            Status::ScratchInUse => "HS_SCRATCH_IN_USE",
            Status::UnsupportedArchitecture => "HS_ARCH_ERROR",
            Status::InsufficientSpace => "HS_INSUFFICIENT_SPACE",
            Status::Unknown => "HS_UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Diagnostic produced by the engine's compiler.
///
/// `expression` is the index of the offending pattern in a multi-pattern
/// request, or -1 when the failure is not tied to one pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub message: String,
    pub expression: i32,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.expression < 0 {
            write!(f, "{}", self.message)
        } else {
            write!(f, "expression #{}: {}", self.expression, self.message)
        }
    }
}

/// Main error type for binding operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Non-success status returned by the engine
    #[error("hyperscan error: {0}")]
    Native(Status),

    /// Pattern rejected by the engine's compiler
    #[error("compile error: {0}")]
    Compile(CompileError),

    #[error("expected equal numbers of expressions, flags and ids, got {expressions}, {flags} and {ids}")]
    LengthMismatch {
        expressions: usize,
        flags: usize,
        ids: usize,
    },

    #[error("unknown flag name: {0}")]
    UnknownFlag(String),

    #[error("unknown mode name: {0}")]
    UnknownMode(String),

    /// The engine reads patterns as C strings, so an embedded NUL would
    /// silently truncate the expression.
    #[error("expression #{index} contains an interior NUL byte")]
    InteriorNul { index: usize },

    #[error("buffer of {0} bytes exceeds the engine's 32-bit length limit")]
    BufferTooLarge(usize),
}

impl Error {
    /// True for errors raised locally before any engine call.
    pub fn is_malformed_request(&self) -> bool {
        !matches!(self, Error::Native(_) | Error::Compile(_))
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Error::Native(status)
    }
}

/// Convert a raw engine status into a `Result`.
pub(crate) fn check(code: c_int) -> Result<()> {
    match Status::from_code(code) {
        Status::Success => Ok(()),
        status => Err(Error::Native(status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_known() {
        assert_eq!(Status::from_code(0), Status::Success);
        assert_eq!(Status::from_code(-3), Status::ScanTerminated);
        assert_eq!(Status::from_code(-4), Status::CompilerError);
        assert_eq!(Status::from_code(-10), Status::ScratchInUse);
        assert_eq!(Status::from_code(-11), Status::UnsupportedArchitecture);
        assert_eq!(Status::from_code(-13), Status::Unknown);
    }

    #[test]
    fn test_from_code_is_total() {
        for code in [-14, -100, 1, 42, i32::MIN, i32::MAX] {
            assert_eq!(Status::from_code(code), Status::Unknown);
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(Status::Invalid.name(), "HS_INVALID");
        assert_eq!(Status::OutOfMemory.to_string(), "HS_NOMEM");
        assert_eq!(Status::DatabaseModeMismatch.name(), "HS_DB_MODE_ERROR");
    }

    #[test]
    fn test_check() {
        assert_eq!(check(SUCCESS), Ok(()));
        assert_eq!(check(NOMEM), Err(Error::Native(Status::OutOfMemory)));
        assert_eq!(check(-77), Err(Error::Native(Status::Unknown)));
    }

    #[test]
    fn test_malformed_request_classification() {
        assert!(Error::UnknownFlag("HS_FLAG_NOPE".into()).is_malformed_request());
        assert!(Error::LengthMismatch { expressions: 1, flags: 2, ids: 1 }.is_malformed_request());
        assert!(!Error::Native(Status::Invalid).is_malformed_request());
        let compile = CompileError { message: "bad".into(), expression: 0 };
        assert!(!Error::Compile(compile).is_malformed_request());
    }

    #[test]
    fn test_compile_error_display() {
        let global = CompileError { message: "out of memory".into(), expression: -1 };
        assert_eq!(global.to_string(), "out of memory");
        let indexed = CompileError { message: "Unmatched parentheses".into(), expression: 2 };
        assert_eq!(indexed.to_string(), "expression #2: Unmatched parentheses");
    }
}
