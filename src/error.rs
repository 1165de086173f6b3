//! # Error Handling for the Smile VM and Parser
//!
//! Two independent error families exist:
//!
//! 1. [`RuntimeError`] — thrown during bytecode execution. A flat enum
//! with hand-written `Display`/`Error` impls, no `thiserror`.
//! 2. [`Diagnostic`] — accumulated during parsing. Unlike a `RuntimeError`,
//! diagnostics don't unwind anything; they're collected into a `Vec` and
//! returned alongside a (possibly partial) parse tree.
//!
//! [`ErrorKind`] is the compact, `repr(u8)` category tag that crosses the
//! bytecode boundary (a `Raise` instruction's operand) and is promoted to
//! a full [`RuntimeError`] with [`ErrorKind::into_runtime`].

use std::fmt;

/// Compact enum of error categories used in bytecode `Raise`/`Throw`
/// instructions and in native argument-check failures.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Generic user-raised error.
    Generic = 0,
    /// Syntax error (usually caught at parse time, but may surface dynamically
    /// from `eval`-like constructs).
    Syntax = 1,
    /// Type mismatch (wrong operand kind, bad property access, etc).
    Type = 2,
    /// Undefined identifier or property reference.
    UndefinedIdent = 3,
    /// General value error (bad range, invalid argument, etc).
    Value = 4,
    /// Native-method argument-count or argument-type check failed.
    NativeMethod = 5,
    /// Attempt to mutate an object whose security bits forbid it.
    Security = 6,
}

impl ErrorKind {
    /// Convert this `ErrorKind` into a fully descriptive [`RuntimeError`],
    /// embedding the provided message.
    pub fn into_runtime(self, msg: String) -> RuntimeError {
        match self {
            ErrorKind::Generic => RuntimeError::Raised(msg),
            ErrorKind::Syntax => RuntimeError::SyntaxError(msg),
            ErrorKind::Type => RuntimeError::TypeError(msg),
            ErrorKind::UndefinedIdent => RuntimeError::UndefinedIdentError(msg),
            ErrorKind::Value => RuntimeError::ValueError(msg),
            ErrorKind::NativeMethod => RuntimeError::NativeMethodError(msg),
            ErrorKind::Security => RuntimeError::SecurityError(msg),
        }
    }
}

impl TryFrom<u8> for ErrorKind {
    type Error = ();

    fn try_from(v: u8) -> Result<Self, ()> {
        use ErrorKind::*;
        Ok(match v {
            0 => Generic,
            1 => Syntax,
            2 => Type,
            3 => UndefinedIdent,
            4 => Value,
            5 => NativeMethod,
            6 => Security,
            _ => return Err(()),
        })
    }
}

/// Errors that can occur during Smile bytecode execution.
///
/// Every runtime-visible `throw` ultimately carries a `UserObject` with at
/// least `kind` and `message` properties; `RuntimeError` is the
/// host-side representation used while the exception is in flight through
/// Rust's own `Result` plumbing, before `vm::runtime_error_to_value`
/// converts it into the thrown `UserObject` surfaced by
/// `EvalResult::Exception`.
#[derive(Debug, PartialEq)]
pub enum RuntimeError {
    /// An `assert` intrinsic failed.
    AssertionError,
    /// Attempted to write to an object with `WRITABLE` cleared.
    SecurityError(String),
    /// Indexing operation failed (list/string/byte-array index out of
    /// bounds).
    IndexError(String),
    /// Property lookup failed on a `UserObject` (and its prototype chain).
    PropertyError(String),
    /// Invalid or unexpected syntax encountered outside of parsing (e.g. a
    /// syntax-rule template evaluated at parse time referencing a form
    /// outside the evaluable-at-parse-time subset).
    SyntaxError(String),
    /// Operation was applied to an inappropriate `Kind`.
    TypeError(String),
    /// Undefined identifier or property was referenced.
    UndefinedIdentError(String),
    /// General value error (bad argument, bad range).
    ValueError(String),
    /// Division, modulo, or remainder by zero under the "loud" (`!`) suffix.
    ZeroDivisionError,
    /// A native method's argument-count or argument-type check failed.
    NativeMethodError(String),
    /// A value raised by user code via `Throw`.
    Raised(String),
    /// Internal VM invariant violation — a bug, never reachable from valid
    /// bytecode.
    VmInvariant(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::AssertionError => write!(f, "AssertionError: assertion failed"),
            RuntimeError::SecurityError(msg) => write!(f, "SecurityError: {}", msg),
            RuntimeError::IndexError(msg) => write!(f, "IndexError: {}", msg),
            RuntimeError::PropertyError(msg) => write!(f, "PropertyError: {}", msg),
            RuntimeError::SyntaxError(msg) => write!(f, "SyntaxError: {}", msg),
            RuntimeError::TypeError(msg) => write!(f, "TypeError: {}", msg),
            RuntimeError::UndefinedIdentError(msg) => write!(f, "UndefinedIdentError: {}", msg),
            RuntimeError::ValueError(msg) => write!(f, "ValueError: {}", msg),
            RuntimeError::ZeroDivisionError => {
                write!(f, "ZeroDivisionError: division or modulo by zero")
            }
            RuntimeError::NativeMethodError(msg) => write!(f, "NativeMethodError: {}", msg),
            RuntimeError::Raised(msg) => write!(f, "RuntimeError: {}", msg),
            RuntimeError::VmInvariant(msg) => write!(f, "VmInvariant: {}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Severity of a parse [`Diagnostic`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        write!(f, "{}", s)
    }
}

/// A source position, `1`-based line and column, carried by every
/// [`Diagnostic`] and by every parsed list node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single parser diagnostic: `(severity, position, message)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub position: Position,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, position: Position, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            position,
            message: message.into,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.position, self.severity, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_round_trips_through_u8() {
        for raw in 0u8..=6 {
            let kind = ErrorKind::try_from(raw).unwrap();
            assert_eq!(kind as u8, raw);
        }
        assert!(ErrorKind::try_from(200u8).is_err());
    }

    #[test]
    fn error_kind_promotes_with_message() {
        let err = ErrorKind::Type.into_runtime("bad arg".to_string());
        assert_eq!(err.to_string(), "TypeError: bad arg");
    }

    #[test]
    fn diagnostic_formats_with_position() {
        let d = Diagnostic::new(Severity::Error, Position::new(3, 7), "unexpected token");
        assert_eq!(d.to_string(), "3:7: error: unexpected token");
    }
}



