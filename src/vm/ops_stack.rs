//! # Stack, Constant-Load, and Variable-Access Opcodes
//!
//! Handles the `Dup/Pop/Rep`, `Ld*` constant loads, and `Ld/St/StpLoc`,
//! `Ld/St/StpArg`, `Ld/St/StpX` variable-access opcode families —
//! grouped alongside `ops_arith.rs`, `ops_control.rs`, and
//! `ops_struct.rs` as the fourth per-family split, needed because
//! Smile's opcode set is wider than a single module comfortably holds.

use std::rc::Rc;

use crate::bytecode::{ByteCodeSegment, Opcode, SlotRef};
use crate::closure::Closure;
use crate::error::RuntimeError;
use crate::value::Value;

use super::Unwind;

type VmResult<T> = Result<T, Unwind>;

/// What the driving loop in [`super::run_segment`] should do after one
/// instruction completes.
pub enum Next {
    Advance,
    Jump(usize),
    Return(Value),
    Break,
    PushHandler(usize),
    PopHandler,
}

pub fn execute(op: &Opcode, segment: &Rc<ByteCodeSegment>, closure: &Rc<Closure>) -> VmResult<Next> {
    match op {
        Opcode::Nop => {}
        Opcode::Dup(n) => {
            // `Dup1`/`Dup2`/`DupN` push copies of the top `n` operands,
            // preserving their order (e.g. `Dup2` on `[.. a b]` leaves
            // `[.. a b a b]`).
            let n = *n as usize;
            let top = closure.stack_top.get();
            if n > top {
                return Err(Unwind::Error(RuntimeError::VmInvariant(
                    "Dup depth exceeds operand stack height".to_string(),
                )));
            }
            let copies: Vec<Value> = (0..n).map(|i| closure.peek(n - 1 - i).unwrap()).collect();
            for v in copies {
                closure.push(v).map_err(Unwind::Error)?;
            }
        }
        Opcode::Pop(n) => {
            for _ in 0..*n {
                closure.pop().map_err(Unwind::Error)?;
            }
        }
        Opcode::Rep(n) => {
            let top = closure.pop().map_err(Unwind::Error)?;
            for _ in 0..*n {
                closure.pop().map_err(Unwind::Error)?;
            }
            closure.push(top).map_err(Unwind::Error)?;
        }

        Opcode::LdNull => closure.push(Value::Null).map_err(Unwind::Error)?,
        Opcode::LdBool(b) => closure.push(Value::Bool(*b)).map_err(Unwind::Error)?,
        Opcode::LdStr(idx) => {
            let s = segment
                .tables
                .strings
                .get(*idx as usize)
                .cloned()
                .ok_or_else(|| RuntimeError::VmInvariant(format!("string index {} out of range", idx)))
                .map_err(Unwind::Error)?;
            closure.push(Value::String(s)).map_err(Unwind::Error)?;
        }
        Opcode::LdSym(sym) => closure.push(Value::Symbol(*sym)).map_err(Unwind::Error)?,
        Opcode::LdObj(idx) => {
            let obj = segment
                .tables
                .objects
                .get(*idx as usize)
                .cloned()
                .ok_or_else(|| RuntimeError::VmInvariant(format!("object index {} out of range", idx)))
                .map_err(Unwind::Error)?;
            closure.push(obj).map_err(Unwind::Error)?;
        }
        Opcode::Ld8(v) => closure.push(Value::byte(*v as u8)).map_err(Unwind::Error)?,
        Opcode::Ld16(v) => closure
            .push(Value::Int16(crate::value::numeric::Int16Value::new(*v)))
            .map_err(Unwind::Error)?,
        Opcode::Ld32(v) => closure.push(Value::int32(*v)).map_err(Unwind::Error)?,
        Opcode::Ld64(v) => closure.push(Value::int64(*v)).map_err(Unwind::Error)?,
        Opcode::Ld128(idx) => {
            let big = segment
                .tables
                .big_literals
                .get(*idx as usize)
                .copied()
                .ok_or_else(|| RuntimeError::VmInvariant(format!("big-literal index {} out of range", idx)))
                .map_err(Unwind::Error)?;
            closure
                .push(Value::Int128(crate::value::numeric::Int128Value::new(big)))
                .map_err(Unwind::Error)?;
        }

        Opcode::LdLoc(slot) => {
            let target = closure.ancestor(slot.scope_distance).map_err(Unwind::Error)?;
            let v = target.load_local(slot.slot).map_err(Unwind::Error)?;
            closure.push(v).map_err(Unwind::Error)?;
        }
        Opcode::StLoc(slot) => store_loc(closure, slot, false)?,
        Opcode::StpLoc(slot) => store_loc(closure, slot, true)?,

        Opcode::LdArg(slot) => {
            let target = closure.ancestor(slot.scope_distance).map_err(Unwind::Error)?;
            let v = target.load_arg(slot.slot).map_err(Unwind::Error)?;
            closure.push(v).map_err(Unwind::Error)?;
        }
        Opcode::StArg(slot) => store_arg(closure, slot, false)?,
        Opcode::StpArg(slot) => store_arg(closure, slot, true)?,

        Opcode::LdX(sym) => {
            let v = closure.load_global(*sym).map_err(Unwind::Error)?;
            closure.push(v).map_err(Unwind::Error)?;
        }
        Opcode::StX(sym) => {
            let v = closure.peek(0).map_err(Unwind::Error)?;
            closure.store_global(*sym, v).map_err(Unwind::Error)?;
        }
        Opcode::StpX(sym) => {
            let v = closure.pop().map_err(Unwind::Error)?;
            closure.store_global(*sym, v).map_err(Unwind::Error)?;
        }

        other => {
            return Err(Unwind::Error(RuntimeError::VmInvariant(format!(
                "ops_stack::execute called with non-stack opcode {:?}",
                other
            ))))
        }
    }
    Ok(Next::Advance)
}

fn store_loc(closure: &Rc<Closure>, slot: &SlotRef, pop: bool) -> VmResult<()> {
    let value = if pop {
        closure.pop().map_err(Unwind::Error)?
    } else {
        closure.peek(0).map_err(Unwind::Error)?
    };
    let target = closure.ancestor(slot.scope_distance).map_err(Unwind::Error)?;
    target.store_local(slot.slot, value).map_err(Unwind::Error)
}

fn store_arg(closure: &Rc<Closure>, slot: &SlotRef, pop: bool) -> VmResult<()> {
    let value = if pop {
        closure.pop().map_err(Unwind::Error)?
    } else {
        closure.peek(0).map_err(Unwind::Error)?
    };
    let target = closure.ancestor(slot.scope_distance).map_err(Unwind::Error)?;
    target.store_arg(slot.slot, value).map_err(Unwind::Error)
}



