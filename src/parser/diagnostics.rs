//! Parser-specific diagnostic accumulation. [`crate::error::Diagnostic`]/[`crate::error::Severity`]
//! already hold the `(severity, position, message)` shape; this module adds
//! just the list-with-fatal-tracking the parser needs.

use crate::error::{Diagnostic, Position, Severity};

#[derive(Default)]
pub struct DiagnosticList {
    pub items: Vec<Diagnostic>,
    fatal: bool,
}

impl DiagnosticList {
    pub fn new() -> DiagnosticList {
        DiagnosticList::default()
    }

    pub fn push(&mut self, severity: Severity, position: Position, message: impl Into<String>) {
        if severity == Severity::Fatal {
            self.fatal = true;
        }
        self.items.push(Diagnostic::new(severity, position, message));
    }

    pub fn error(&mut self, position: Position, message: impl Into<String>) {
        self.push(Severity::Error, position, message);
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity >= Severity::Error)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}



