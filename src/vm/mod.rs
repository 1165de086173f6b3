//! # Bytecode Interpreter
//!
//! Mirrors the shape of the reference `vm.rs` + `vm/` module family — a
//! fetch-decode-execute loop over a flat instruction stream, split into an
//! `ops_*` module per opcode family — generalized to Smile's
//! closure-based call model and three-valued [`EvalResult`]
//! contract.
//!
//! Unlike the reference single global `stack`/`env`/`ret_stack` triad
//! (global mutable VM state, `vm.rs`), each call allocates its own
//! [`Closure`] and this module drives nested calls through ordinary Rust
//! recursion: a `Call`/`Met` opcode calls [`call_function`], which in turn
//! calls [`run_segment`] on the callee's bytecode. This replaces the
//! reference's explicit `env_stack`/`ret_stack` bookkeeping with the Rust
//! call stack itself, and replaces the source's `setjmp`/`longjmp` escape
//! with [`Unwind`] values propagated via `?`.

pub mod builtins;
mod ops_arith;
mod ops_control;
mod ops_numeric;
mod ops_stack;
mod ops_struct;

#[cfg(test)]
mod tests;

use std::rc::Rc;

use crate::bytecode::{ByteCodeSegment, Opcode};
use crate::closure::Closure;
use crate::error::RuntimeError;
use crate::symbol::Symbol;
use crate::value::{Function, NativeFunction, UserFunction, Value};

/// The three-valued result of running a compiled unit.
#[derive(Debug, PartialEq)]
pub enum EvalResult {
    Value(Value),
    Exception(Value),
    Break(usize),
}

/// Internal control-transfer signal threaded through [`run_segment`] via
/// `Result::Err`. `Error` is an internal VM fault (invariant violation,
/// native-argument check failure); `Thrown` is a Smile-level exception
/// object in flight; `Break` surfaces a `Brk` opcode up to the embedding
/// API.
#[derive(Debug)]
pub enum Unwind {
    Error(RuntimeError),
    Thrown(Value),
    Break(usize),
}

impl From<RuntimeError> for Unwind {
    fn from(e: RuntimeError) -> Self {
        Unwind::Error(e)
    }
}

type VmResult<T> = Result<T, Unwind>;

/// Convert an internal [`RuntimeError`] into the `UserObject`-shaped value
/// every thrown exception carries: at least
/// `kind: Symbol` and `message: String`.
pub fn runtime_error_to_value(err: &RuntimeError) -> Value {
    use std::cell::RefCell;
    let mut obj = crate::value::UserObject::new();
    let kind_name = match err {
        RuntimeError::AssertionError => "assertion-error",
        RuntimeError::SecurityError(_) => "security-error",
        RuntimeError::IndexError(_) => "index-error",
        RuntimeError::PropertyError(_) => "property-error",
        RuntimeError::SyntaxError(_) => "syntax-error",
        RuntimeError::TypeError(_) => "type-error",
        RuntimeError::UndefinedIdentError(_) => "undefined-ident-error",
        RuntimeError::ValueError(_) => "value-error",
        RuntimeError::ZeroDivisionError => "zero-division-error",
        RuntimeError::NativeMethodError(_) => "native-method-error",
        RuntimeError::Raised(_) => "error",
        RuntimeError::VmInvariant(_) => "vm-invariant",
    };
    obj.define(crate::symbol::intern("kind"), Value::Symbol(crate::symbol::intern(kind_name)));
    obj.define(crate::symbol::intern("message"), Value::from_str(&err.to_string()));
    Value::UserObject(Rc::new(RefCell::new(obj)))
}

/// Run a compiled function from its entry point.
pub fn eval_run(segment: Rc<ByteCodeSegment>, closure: Rc<Closure>) -> EvalResult {
    match run_segment(&segment, &closure, 0) {
        Ok(v) => EvalResult::Value(v),
        Err(Unwind::Break(pc)) => EvalResult::Break(pc),
        Err(Unwind::Thrown(v)) => EvalResult::Exception(v),
        Err(Unwind::Error(e)) => {
            if matches!(e, RuntimeError::VmInvariant(_)) {
                tracing::debug!(error = %e, "vm invariant violation during eval_run");
            }
            EvalResult::Exception(runtime_error_to_value(&e))
        }
    }
}

/// Resume execution after a `Brk`.
pub fn eval_continue(segment: Rc<ByteCodeSegment>, closure: Rc<Closure>, pc: usize) -> EvalResult {
    match run_segment(&segment, &closure, pc) {
        Ok(v) => EvalResult::Value(v),
        Err(Unwind::Break(pc)) => EvalResult::Break(pc),
        Err(Unwind::Thrown(v)) => EvalResult::Exception(v),
        Err(Unwind::Error(e)) => EvalResult::Exception(runtime_error_to_value(&e)),
    }
}

/// An installed exception handler within one frame.
struct Handler {
    target_pc: usize,
    stack_depth: usize,
}

/// Execute `segment` starting at `pc` against `closure` until it returns,
/// breaks, or an unhandled exception propagates out.
pub fn run_segment(segment: &Rc<ByteCodeSegment>, closure: &Rc<Closure>, mut pc: usize) -> VmResult<Value> {
    let mut handlers: Vec<Handler> = Vec::new();

    loop {
        if pc >= segment.len() {
            return Ok(Value::Null);
        }
        let outcome = step(segment, closure, pc);
        match outcome {
            Ok(ops_stack::Next::Advance) => pc += 1,
            Ok(ops_stack::Next::Jump(target)) => pc = target,
            Ok(ops_stack::Next::Return(v)) => return Ok(v),
            Ok(ops_stack::Next::Break) => return Err(Unwind::Break(pc)),
            Ok(ops_stack::Next::PushHandler(target)) => {
                handlers.push(Handler {
                    target_pc: target,
                    stack_depth: closure.stack_top.get(),
                });
                pc += 1;
            }
            Ok(ops_stack::Next::PopHandler) => {
                handlers.pop();
                pc += 1;
            }
            Err(unwind) => {
                let carried = match unwind {
                    Unwind::Break(bpc) => return Err(Unwind::Break(bpc)),
                    Unwind::Thrown(v) => v,
                    Unwind::Error(e) => runtime_error_to_value(&e),
                };
                match handlers.pop() {
                    Some(handler) => {
                        closure.stack_top.set(handler.stack_depth);
                        closure.push(carried).map_err(Unwind::Error)?;
                        pc = handler.target_pc;
                    }
                    None => return Err(Unwind::Thrown(carried)),
                }
            }
        }
    }
}

/// Execute exactly one instruction, returning how the driving loop in
/// [`run_segment`] should proceed.
fn step(segment: &Rc<ByteCodeSegment>, closure: &Rc<Closure>, pc: usize) -> VmResult<ops_stack::Next> {
    let instr = segment.at(pc).map_err(Unwind::Error)?;
    match &instr.op {
        // ---- stack / constants / variables / properties -------------------
        Opcode::Nop
        | Opcode::Dup(_)
        | Opcode::Pop(_)
        | Opcode::Rep(_)
        | Opcode::LdNull
        | Opcode::LdBool(_)
        | Opcode::LdStr(_)
        | Opcode::LdSym(_)
        | Opcode::LdObj(_)
        | Opcode::Ld8(_)
        | Opcode::Ld16(_)
        | Opcode::Ld32(_)
        | Opcode::Ld64(_)
        | Opcode::Ld128(_)
        | Opcode::LdLoc(_)
        | Opcode::StLoc(_)
        | Opcode::StpLoc(_)
        | Opcode::LdArg(_)
        | Opcode::StArg(_)
        | Opcode::StpArg(_)
        | Opcode::LdX(_)
        | Opcode::StX(_)
        | Opcode::StpX(_) => ops_stack::execute(&instr.op, segment, closure),

        Opcode::LdProp(_) | Opcode::StProp(_) | Opcode::StpProp(_) => {
            ops_struct::execute_property(&instr.op, closure)
        }

        Opcode::SuperEq | Opcode::SuperNe | Opcode::Bool | Opcode::Not | Opcode::Is => {
            ops_struct::execute_equality(&instr.op, closure)
        }

        Opcode::Add
        | Opcode::Sub
        | Opcode::Mul
        | Opcode::DivQuiet
        | Opcode::DivLoud
        | Opcode::ModOp
        | Opcode::RemOp
        | Opcode::Neg
        | Opcode::BAnd
        | Opcode::BOr
        | Opcode::BXor
        | Opcode::BNotOp
        | Opcode::Shl
        | Opcode::Shr
        | Opcode::Lt
        | Opcode::Le
        | Opcode::Gt
        | Opcode::Ge => ops_arith::execute(&instr.op, closure).map_err(|e| e.into()),

        Opcode::Call(argc) => ops_control::execute_call(*argc, closure),
        Opcode::Met(sym, argc) => ops_control::execute_method_call(*sym, *argc, closure),

        Opcode::Jmp(rel) => Ok(ops_stack::Next::Jump(relative_target(pc, *rel))),
        Opcode::Bt(rel) => ops_control::execute_branch(closure, true, relative_target(pc, *rel), pc),
        Opcode::Bf(rel) => ops_control::execute_branch(closure, false, relative_target(pc, *rel), pc),
        Opcode::Ret => {
            let v = closure.pop().map_err(Unwind::Error)?;
            Ok(ops_stack::Next::Return(v))
        }
        Opcode::Label => Ok(ops_stack::Next::Advance),

        Opcode::Cons
        | Opcode::Car
        | Opcode::Cdr
        | Opcode::NewPair
        | Opcode::Left
        | Opcode::Right
        | Opcode::LdA
        | Opcode::LdD
        | Opcode::LdLeft
        | Opcode::LdRight
        | Opcode::LdStart
        | Opcode::LdEnd
        | Opcode::LdCount
        | Opcode::LdLength => ops_struct::execute_list_shortcut(&instr.op, closure),

        Opcode::MakeList(_) | Opcode::MakeObject(_) => ops_struct::execute_make(&instr.op, closure),

        Opcode::Brk => Ok(ops_stack::Next::Break),

        Opcode::PushHandler(rel) => Ok(ops_stack::Next::PushHandler(relative_target(pc, *rel))),
        Opcode::PopHandler => Ok(ops_stack::Next::PopHandler),
        Opcode::Throw => {
            let v = closure.pop().map_err(Unwind::Error)?;
            Err(Unwind::Thrown(v))
        }
    }
}

fn relative_target(pc: usize, rel: i32) -> usize {
    (pc as i64 + rel as i64) as usize
}

/// Invoke `callee` with `args`. Shared by
/// `Call`/`Met` opcode handlers and by state-machine natives driving user
/// callbacks.
pub fn call_function(callee: &Value, args: Vec<Value>) -> VmResult<Value> {
    let func = match callee {
        Value::Function(f) => f,
        other => {
            return Err(RuntimeError::TypeError(format!("{} is not callable", other.kind())).into());
        }
    };
    match func.as_ref() {
        Function::Native(native) => call_native(native, args),
        Function::User(user) => call_user(user, args),
    }
}

fn call_native(native: &NativeFunction, args: Vec<Value>) -> VmResult<Value> {
    native.check_argc(args.len()).map_err(Unwind::Error)?;
    native.check_types(&args).map_err(Unwind::Error)?;
    match (native.body)(&args).map_err(Unwind::Error)? {
        crate::value::function::NativeOutcome::Value(v) => Ok(v),
        crate::value::function::NativeOutcome::StateMachine(machine) => {
            builtins::drive_state_machine(machine)
        }
    }
}

fn call_user(user: &UserFunction, args: Vec<Value>) -> VmResult<Value> {
    let closure = Closure::new_local(Rc::clone(&user.info), user.lexical_env.clone(), args);
    run_segment(&user.segment, &closure, 0)
}

/// Resolve `target.sym`, used by `Met` opcodes and by the property-access
/// fast-path opcodes when the target isn't the intrinsic kind they assume
///.
pub fn get_property_with_fallback(target: &Value, sym: Symbol) -> Result<Value, RuntimeError> {
    target.get_property(sym)
}



