//! # Call and Branch Opcodes
//!
//! `Call`/`Met` dispatch and the `Bt`/`Bf`
//! conditional-jump handlers, grounded in the reference `ops_control.rs`
//! (`handle_call`, `handle_jump_if_false`). Calls bottom out in
//! [`super::call_function`], which recurses through [`super::run_segment`]
//! rather than growing an explicit call-stack vector.

use std::rc::Rc;

use crate::closure::Closure;
use crate::symbol::Symbol;
use crate::value::Value;

use super::ops_stack::Next;
use super::Unwind;

type VmResult<T> = Result<T, Unwind>;

/// Pop `argc` arguments (in source order) plus the callee beneath them,
/// then invoke the callee.
pub fn execute_call(argc: u16, closure: &Rc<Closure>) -> VmResult<Next> {
    let args = pop_args(closure, argc)?;
    let callee = closure.pop().map_err(Unwind::Error)?;
    let result = super::call_function(&callee, args)?;
    closure.push(result).map_err(Unwind::Error)?;
    Ok(Next::Advance)
}

/// Pop `argc` arguments plus the receiver beneath them, resolve `sym` as a
/// property on the receiver, and invoke it.
pub fn execute_method_call(sym: Symbol, argc: u16, closure: &Rc<Closure>) -> VmResult<Next> {
    let args = pop_args(closure, argc)?;
    let receiver = closure.pop().map_err(Unwind::Error)?;
    let callee = super::get_property_with_fallback(&receiver, sym).map_err(Unwind::Error)?;
    let result = super::call_function(&callee, args)?;
    closure.push(result).map_err(Unwind::Error)?;
    Ok(Next::Advance)
}

fn pop_args(closure: &Rc<Closure>, argc: u16) -> VmResult<Vec<Value>> {
    let mut args = Vec::with_capacity(argc as usize);
    for _ in 0..argc {
        args.push(closure.pop().map_err(Unwind::Error)?);
    }
    args.reverse();
    Ok(args)
}

/// `Bt`/`Bf`: pop the top operand and jump to `target` if its truthiness
/// matches `on_true`, otherwise fall through to the next instruction.
pub fn execute_branch(closure: &Rc<Closure>, on_true: bool, target: usize, _pc: usize) -> VmResult<Next> {
    let cond = closure.pop().map_err(Unwind::Error)?;
    if cond.to_bool() == on_true {
        Ok(Next::Jump(target))
    } else {
        Ok(Next::Advance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::ClosureInfo;

    fn closure() -> Rc<Closure> {
        Closure::new_global(ClosureInfo::global(0, 8))
    }

    #[test]
    fn branch_true_jumps_when_truthy() {
        let c = closure();
        c.push(Value::Bool(true)).unwrap();
        let next = execute_branch(&c, true, 42, 0).unwrap();
        assert!(matches!(next, Next::Jump(42)));
    }

    #[test]
    fn branch_true_falls_through_when_falsy() {
        let c = closure();
        c.push(Value::Bool(false)).unwrap();
        let next = execute_branch(&c, true, 42, 0).unwrap();
        assert!(matches!(next, Next::Advance));
    }

    #[test]
    fn call_pops_callee_and_args_in_order() {
        let c = closure();
        let native = crate::value::function::NativeFunction {
            name: crate::symbol::intern("add-two"),
            arity: crate::value::function::Arity::Exact(2),
            checks: Vec::new(),
            body: Rc::new(|args: &[Value]| {
                let a = match &args[0] {
                    Value::Int64(n) => n.0,
                    _ => unreachable!,
                };
                let b = match &args[1] {
                    Value::Int64(n) => n.0,
                    _ => unreachable!,
                };
                Ok(crate::value::function::NativeOutcome::Value(Value::int64(a + b)))
            }),
        };
        let callee = Value::Function(Rc::new(crate::value::Function::Native(native)));
        c.push(callee).unwrap();
        c.push(Value::int64(2)).unwrap();
        c.push(Value::int64(3)).unwrap();
        execute_call(2, &c).unwrap();
        assert_eq!(c.pop().unwrap(), Value::int64(5));
    }
}



