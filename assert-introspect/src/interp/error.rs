//! Runtime errors for the interpreter

use std::fmt;

/// Runtime error during interpretation
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Read of a variable with no storage in the current frame
    UndefinedVariable,
    /// Call of a function with neither a body nor a runtime implementation
    UndefinedFunction,
    /// Value of the wrong shape for the operation
    TypeError,
    /// Integer division or remainder by zero
    DivisionByZero,
    /// Read or write through a null or out-of-range pointer
    InvalidPointer,
    /// Argument count mismatch
    ArityMismatch,
    /// Stack overflow (deep recursion)
    StackOverflow,
    /// Malformed printf-style format
    FormatError,
    /// Control flow: `abort()` was called
    Aborted,
    /// Control flow: `exit(status)` was called
    Exited(i32),
}

impl RuntimeError {
    pub fn undefined_variable(name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::UndefinedVariable,
            message: format!("undefined variable: {name}"),
        }
    }

    pub fn undefined_function(name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::UndefinedFunction,
            message: format!("undefined function: {name}"),
        }
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::TypeError,
            message: format!("type error: expected {expected}, got {got}"),
        }
    }

    pub fn division_by_zero() -> Self {
        RuntimeError {
            kind: ErrorKind::DivisionByZero,
            message: "division by zero".to_string(),
        }
    }

    pub fn invalid_pointer(action: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::InvalidPointer,
            message: format!("invalid pointer: cannot {action}"),
        }
    }

    pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> Self {
        RuntimeError {
            kind: ErrorKind::ArityMismatch,
            message: format!("function {name} expects {expected} argument(s), got {got}"),
        }
    }

    pub fn stack_overflow() -> Self {
        RuntimeError {
            kind: ErrorKind::StackOverflow,
            message: "stack overflow: too deep recursion".to_string(),
        }
    }

    pub fn format_error(msg: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::FormatError,
            message: format!("format error: {msg}"),
        }
    }

    pub fn aborted() -> Self {
        RuntimeError {
            kind: ErrorKind::Aborted,
            message: "aborted".to_string(),
        }
    }

    pub fn exited(status: i32) -> Self {
        RuntimeError {
            kind: ErrorKind::Exited(status),
            message: format!("exited with status {status}"),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime error: {}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_function() {
        let err = RuntimeError::undefined_function("bar");
        assert_eq!(err.kind, ErrorKind::UndefinedFunction);
        assert!(err.message.contains("bar"));
    }

    #[test]
    fn test_type_error() {
        let err = RuntimeError::type_error("pointer", "int");
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert!(err.message.contains("pointer"));
        assert!(err.message.contains("int"));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = RuntimeError::arity_mismatch("foo", 3, 2);
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
        assert!(err.message.contains("foo"));
        assert!(err.message.contains('3'));
    }

    #[test]
    fn test_exit_status_in_kind() {
        let err = RuntimeError::exited(3);
        assert_eq!(err.kind, ErrorKind::Exited(3));
        assert_ne!(err.kind, ErrorKind::Exited(4));
        assert_eq!(err.to_string(), "Runtime error: exited with status 3");
    }
}
