//! # Arithmetic, Bitwise, and Comparison Opcodes
//!
//! Fast-path opcodes for the numeric operators: one pop/push wrapper per
//! opcode around [`super::ops_numeric`]'s per-kind dispatch. Both
//! operands must share the same numeric kind; the compiler is
//! responsible for emitting an explicit conversion where a program mixes
//! widths, matching the strongly-kinded method tables rather than
//! performing implicit promotion.

use crate::bytecode::Opcode;
use crate::closure::Closure;
use crate::error::RuntimeError;
use crate::value::Value;

use super::ops_numeric as num;
use super::ops_stack::Next;

pub fn execute(op: &Opcode, closure: &Closure) -> Result<Next, RuntimeError> {
    match op {
        Opcode::Add => binary(closure, |a, b| num::add(a, b)),
        Opcode::Sub => binary(closure, |a, b| num::sub(a, b)),
        Opcode::Mul => binary(closure, |a, b| num::mul(a, b)),
        Opcode::DivQuiet => binary(closure, |a, b| num::div(a, b, false)),
        Opcode::DivLoud => binary(closure, |a, b| num::div(a, b, true)),
        Opcode::ModOp => binary(closure, |a, b| num::rem_mod(a, b, false)),
        Opcode::RemOp => binary(closure, |a, b| num::rem(a, b, false)),
        Opcode::Neg => unary(closure, num::neg),
        Opcode::BAnd => binary(closure, |a, b| num::band(a, b)),
        Opcode::BOr => binary(closure, |a, b| num::bor(a, b)),
        Opcode::BXor => binary(closure, |a, b| num::bxor(a, b)),
        Opcode::BNotOp => unary(closure, num::bnot),
        Opcode::Shl => binary(closure, |a, b| num::shl(a, b)),
        Opcode::Shr => binary(closure, |a, b| num::shr(a, b)),
        Opcode::Lt => binary(closure, |a, b| compare(a, b, |o| o.is_lt)),
        Opcode::Le => binary(closure, |a, b| compare(a, b, |o| o.is_le)),
        Opcode::Gt => binary(closure, |a, b| compare(a, b, |o| o.is_gt)),
        Opcode::Ge => binary(closure, |a, b| compare(a, b, |o| o.is_ge)),
        other => Err(RuntimeError::VmInvariant(format!(
            "ops_arith::execute called with non-arithmetic opcode {:?}",
            other
        ))),
    }
}

fn binary(
    closure: &Closure,
    f: impl FnOnce(Value, Value) -> Result<Value, RuntimeError>,
) -> Result<Next, RuntimeError> {
    let b = closure.pop()?;
    let a = closure.pop()?;
    let result = f(a, b)?;
    closure.push(result)?;
    Ok(Next::Advance)
}

fn unary(closure: &Closure, f: impl FnOnce(Value) -> Result<Value, RuntimeError>) -> Result<Next, RuntimeError> {
    let a = closure.pop()?;
    let result = f(a)?;
    closure.push(result)?;
    Ok(Next::Advance)
}

fn compare(a: Value, b: Value, accept: impl FnOnce(std::cmp::Ordering) -> bool) -> Result<Value, RuntimeError> {
    let ord = num::compare(&a, &b)?;
    Ok(Value::Bool(accept(ord)))
}
