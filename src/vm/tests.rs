//! Integration tests for the driving loop (`run_segment`, `eval_run`,
//! `eval_continue`) and the exception/suspension protocol, as opposed to
//! the per-opcode-family unit tests living beside each `ops_*` module.
//! Each test builds a tiny instruction sequence by hand, runs it, and
//! asserts on the resulting stack/value.

use std::rc::Rc;

use crate::bytecode::{ByteCode, ByteCodeSegment, CompiledTables, Opcode};
use crate::closure::{Closure, ClosureInfo};
use crate::value::function::{Arity, NativeOutcome};
use crate::value::{Function, NativeFunction, UserFunction, Value};

use super::{call_function, eval_continue, eval_run, EvalResult};

fn segment_of(ops: Vec<Opcode>) -> Rc<ByteCodeSegment> {
    let tables = Rc::new(CompiledTables::new());
    let code = ops.into_iter().map(|op| ByteCode::new(op, 0)).collect();
    Rc::new(ByteCodeSegment::new(tables, code))
}

fn global_closure(temp_size: u32) -> Rc<Closure> {
    Closure::new_global(ClosureInfo::global(0, temp_size))
}

#[test]
fn runs_straight_line_arithmetic() {
    let segment = segment_of(vec![Opcode::Ld64(2), Opcode::Ld64(3), Opcode::Add, Opcode::Ret]);
    let closure = global_closure(4);
    assert_eq!(eval_run(segment, closure), EvalResult::Value(Value::int64(5)));
}

#[test]
fn falling_off_the_end_yields_null() {
    let segment = segment_of(vec![Opcode::Ld64(1)]);
    let closure = global_closure(4);
    assert_eq!(eval_run(segment, closure), EvalResult::Value(Value::Null));
}

#[test]
fn handler_catches_a_thrown_value() {
    // 0: PushHandler(+3) -> target pc 3
    // 1: Ld64(99)
    // 2: Throw
    // 3: Ret
    let segment = segment_of(vec![
        Opcode::PushHandler(3),
        Opcode::Ld64(99),
        Opcode::Throw,
        Opcode::Ret,
    ]);
    let closure = global_closure(4);
    assert_eq!(eval_run(segment, closure), EvalResult::Value(Value::int64(99)));
}

#[test]
fn unhandled_throw_surfaces_as_exception() {
    let segment = segment_of(vec![Opcode::Ld64(1), Opcode::Throw]);
    let closure = global_closure(4);
    match eval_run(segment, closure) {
        EvalResult::Exception(v) => assert_eq!(v, Value::int64(1)),
        other => panic!("expected Exception, got {:?}", other),
    }
}

#[test]
fn vm_invariant_faults_become_exceptions_carrying_a_kind() {
    // Stack underflow: Add with nothing pushed.
    let segment = segment_of(vec![Opcode::Add]);
    let closure = global_closure(4);
    match eval_run(segment, closure) {
        EvalResult::Exception(Value::UserObject(obj)) => {
            let kind = obj.borrow().get_property(crate::symbol::intern("kind")).unwrap();
            assert_eq!(kind, Value::Symbol(crate::symbol::intern("vm-invariant")));
        }
        other => panic!("expected a UserObject exception, got {:?}", other),
    }
}

#[test]
fn pop_handler_removes_a_live_handler_so_a_later_throw_is_unhandled() {
    // 0: PushHandler(+4) -> target pc 4 (unused)
    // 1: PopHandler
    // 2: Ld64(7)
    // 3: Throw
    // 4: Ret (never reached: handler was popped before the throw)
    let segment = segment_of(vec![
        Opcode::PushHandler(4),
        Opcode::PopHandler,
        Opcode::Ld64(7),
        Opcode::Throw,
        Opcode::Ret,
    ]);
    let closure = global_closure(4);
    match eval_run(segment, closure) {
        EvalResult::Exception(v) => assert_eq!(v, Value::int64(7)),
        other => panic!("expected an unhandled exception, got {:?}", other),
    }
}

#[test]
fn brk_suspends_and_eval_continue_resumes_with_stack_intact() {
    // 0: Ld64(10)
    // 1: Brk
    // 2: Ld64(20)
    // 3: Add
    // 4: Ret
    let segment = segment_of(vec![
        Opcode::Ld64(10),
        Opcode::Brk,
        Opcode::Ld64(20),
        Opcode::Add,
        Opcode::Ret,
    ]);
    let closure = global_closure(4);
    match eval_run(Rc::clone(&segment), Rc::clone(&closure)) {
        EvalResult::Break(pc) => assert_eq!(pc, 1),
        other => panic!("expected Break, got {:?}", other),
    }
    assert_eq!(eval_continue(segment, closure, 2), EvalResult::Value(Value::int64(30)));
}

#[test]
fn call_function_runs_a_user_function_body() {
    let body = segment_of(vec![Opcode::Ld64(42), Opcode::Ret]);
    let info = ClosureInfo::local(ClosureInfo::global(0, 0), ClosureInfo::global(0, 0), 0, 0, 4);
    let user = UserFunction {
        name: Some(crate::symbol::intern("answer")),
        info,
        segment: body,
        lexical_env: None,
    };
    let callee = Value::Function(Rc::new(Function::User(user)));
    assert_eq!(call_function(&callee, vec![]).unwrap(), Value::int64(42));
}

#[test]
fn call_function_rejects_a_native_with_wrong_argument_count() {
    let native = NativeFunction {
        name: crate::symbol::intern("needs-one"),
        arity: Arity::Exact(1),
        checks: Vec::new(),
        body: Rc::new(|args| Ok(NativeOutcome::Value(args[0].clone()))),
    };
    let callee = Value::Function(Rc::new(Function::Native(native)));
    assert!(call_function(&callee, vec![]).is_err());
}

#[test]
fn calling_a_non_function_is_a_type_error() {
    assert!(call_function(&Value::int64(1), vec![]).is_err());
}



