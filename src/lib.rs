//! # Smile language core
//!
//! Tagged-value object system, bytecode virtual machine, and
//! user-extensible parser for the Smile language. This crate
//! is the "language core" only: the bootstrap precompiler, REPL/driver,
//! and bundled GC/decimal libraries the reference implementation ships
//! alongside it are out of scope and are not reproduced here.
//!
//! Organized as a `mod`-per-concern library with a thin `main.rs` CLI
//! wrapper around it.

pub mod bytecode;
pub mod closure;
pub mod compiler;
pub mod error;
pub mod parser;
pub mod string;
pub mod symbol;
pub mod syntax;
pub mod unicode;
pub mod value;
pub mod vm;

use std::rc::Rc;

use bytecode::ByteCodeSegment;
use closure::Closure;
use error::{Diagnostic, RuntimeError};
use value::Value;
use vm::EvalResult;

/// Build a fresh global [`Closure`] with the standard library namespaces
/// installed.
pub fn new_global_closure(closure_info: Rc<closure::ClosureInfo>) -> Rc<Closure> {
    let closure = Closure::new_global(closure_info);
    vm::builtins::install_globals(&closure);
    closure
}

/// Parse and compile `source` into a runnable unit plus any parse
/// diagnostics. Compilation only proceeds if parsing produced no `error`/`fatal`
/// diagnostic.
pub fn compile_source(
    source: &str,
    filename: &str,
) -> Result<(compiler::CompiledUnit, Vec<Diagnostic>), RuntimeError> {
    let output = parser::parse(source, filename);
    let has_fatal = output
        .diagnostics
        .iter()
        .any(|d| matches!(d.severity, error::Severity::Error | error::Severity::Fatal));
    if has_fatal {
        return Err(RuntimeError::VmInvariant(format!(
            "{} parse error(s) in {}",
            output
                .diagnostics
                .iter()
                .filter(|d| matches!(d.severity, error::Severity::Error | error::Severity::Fatal))
                .count(),
            filename
        )));
    }
    let unit = compiler::compile(&output.tree, filename)?;
    Ok((unit, output.diagnostics))
}

/// `Eval_Run(tables, function)`: execute a compiled unit from the
/// start against a fresh global closure with builtins installed.
pub fn eval_run(unit: &compiler::CompiledUnit) -> EvalResult {
    let closure = new_global_closure(unit.closure_info.clone());
    vm::eval_run(unit.segment.clone(), closure)
}

/// `Eval_Continue`: resume execution of `segment`/`closure`
/// from a previously returned `EvalResult::Break(pc)`.
pub fn eval_continue(segment: Rc<ByteCodeSegment>, closure: Rc<Closure>, pc: usize) -> EvalResult {
    vm::eval_continue(segment, closure, pc)
}

/// Parse, compile, and run `source` in one call — the common embedding
/// path exercised by the CLI and the end-to-end tests.
pub fn run_source(source: &str, filename: &str) -> Result<EvalResult, RuntimeError> {
    let (unit, _diagnostics) = compile_source(source, filename)?;
    Ok(eval_run(&unit))
}

/// Render a diagnostic the way the CLI and REPL report parse errors.
pub fn format_diagnostic(filename: &str, d: &Diagnostic) -> String {
    format!("{}:{}", filename, d)
}

/// Render a Smile runtime exception the way an uncaught throw is reported
/// at the outermost frame.
pub fn format_uncaught_exception(exc: &Value) -> String {
    let kind = exc
        .get_property(symbol::intern("kind"))
        .map(|v| v.to_string())
        .unwrap_or_else(|_| "error".to_string());
    let message = exc
        .get_property(symbol::intern("message"))
        .map(|v| v.to_string())
        .unwrap_or_default();
    format!("{}: {}", kind, message)
}



