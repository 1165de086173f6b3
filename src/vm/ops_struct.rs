//! # Property, Equality, and List/Pair Shortcut Opcodes
//!
//! Three opcode families that all share one shape: try an intrinsic
//! fast path keyed off the operand's [`crate::value::Kind`], and fall back
//! to [`super::get_property_with_fallback`] when the operand isn't the kind
//! the opcode assumes. Named
//! after the reference `ops_struct.rs` (its `Instr::GetField`/`SetField`
//! handlers), generalized here to Smile's wider shortcut set.
//!
//! `Cons`/`Car`/`Cdr` always operate on `List`; `NewPair`/`Left`/`Right`
//! always operate on `Pair` — the compiler only emits these when it
//! statically knows the operand's shape (building or destructuring a list
//! or pair literal), so there is no fallback path for them. The property
//! accessors (`LdA`/`LdD`/`LdLeft`/`LdRight`/`LdStart`/`LdEnd`/`LdCount`/
//! `LdLength`) are reached from a generic `.name` access the compiler
//! couldn't resolve statically, so each one does carry a fallback.
//!
//! `Cdr` reads a list's tail, not its head. A reference C implementation
//! of this opcode reads `->a` (the head field) for what it calls `cdr`,
//! which is a bug in that implementation, not an intentional naming
//! choice; this fixes it rather than reproducing it.

use std::rc::Rc;

use crate::bytecode::Opcode;
use crate::closure::Closure;
use crate::error::RuntimeError;
use crate::symbol::intern;
use crate::value::{pair_list, Pair, Value};

use super::ops_stack::Next;
use super::Unwind;

type VmResult<T> = Result<T, Unwind>;

pub fn execute_property(op: &Opcode, closure: &Rc<Closure>) -> VmResult<Next> {
    match op {
        Opcode::LdProp(sym) => {
            let target = closure.pop().map_err(Unwind::Error)?;
            let v = super::get_property_with_fallback(&target, *sym).map_err(Unwind::Error)?;
            closure.push(v).map_err(Unwind::Error)?;
        }
        Opcode::StProp(sym) => {
            // Non-popping variant: the target sits under the value on the
            // operand stack (`[.. target value]`), so leaving "the value"
            // on top per `StLoc`/`StArg`'s convention (ops_stack.rs) means
            // popping both and pushing the value back, since the target
            // can't stay buried under it.
            let value = closure.pop().map_err(Unwind::Error)?;
            let target = closure.pop().map_err(Unwind::Error)?;
            target.set_property(*sym, value.clone()).map_err(Unwind::Error)?;
            closure.push(value).map_err(Unwind::Error)?;
        }
        Opcode::StpProp(sym) => {
            let value = closure.pop().map_err(Unwind::Error)?;
            let target = closure.pop().map_err(Unwind::Error)?;
            target.set_property(*sym, value).map_err(Unwind::Error)?;
        }
        other => {
            return Err(Unwind::Error(RuntimeError::VmInvariant(format!(
                "ops_struct::execute_property called with non-property opcode {:?}",
                other
            ))))
        }
    }
    Ok(Next::Advance)
}

/// `SuperEq`/`SuperNe` (structural `compareEqual`/its negation), `Bool`
/// (truthiness coercion), `Not` (logical negation), `Is` (reference/kind
/// identity — same as `compareEqual` for everything except `UserObject`/
/// `Function`, which already compare by pointer identity in
/// [`Value::compare_equal`], so `Is` and `SuperEq` agree everywhere and
/// `Is` is kept as a distinct opcode only because the parser lowers the
/// `is` keyword to it directly rather than to `$dot.. ===`).
pub fn execute_equality(op: &Opcode, closure: &Rc<Closure>) -> VmResult<Next> {
    match op {
        Opcode::SuperEq => {
            let b = closure.pop().map_err(Unwind::Error)?;
            let a = closure.pop().map_err(Unwind::Error)?;
            closure.push(Value::Bool(a.compare_equal(&b))).map_err(Unwind::Error)?;
        }
        Opcode::SuperNe => {
            let b = closure.pop().map_err(Unwind::Error)?;
            let a = closure.pop().map_err(Unwind::Error)?;
            closure.push(Value::Bool(!a.compare_equal(&b))).map_err(Unwind::Error)?;
        }
        Opcode::Is => {
            let b = closure.pop().map_err(Unwind::Error)?;
            let a = closure.pop().map_err(Unwind::Error)?;
            closure.push(Value::Bool(a.compare_equal(&b))).map_err(Unwind::Error)?;
        }
        Opcode::Bool => {
            let a = closure.pop().map_err(Unwind::Error)?;
            closure.push(Value::Bool(a.to_bool())).map_err(Unwind::Error)?;
        }
        Opcode::Not => {
            let a = closure.pop().map_err(Unwind::Error)?;
            closure.push(Value::Bool(!a.to_bool())).map_err(Unwind::Error)?;
        }
        other => {
            return Err(Unwind::Error(RuntimeError::VmInvariant(format!(
                "ops_struct::execute_equality called with non-equality opcode {:?}",
                other
            ))))
        }
    }
    Ok(Next::Advance)
}

pub fn execute_list_shortcut(op: &Opcode, closure: &Rc<Closure>) -> VmResult<Next> {
    match op {
        Opcode::Cons => {
            let tail = closure.pop().map_err(Unwind::Error)?;
            let head = closure.pop().map_err(Unwind::Error)?;
            closure.push(pair_list::cons(head, tail)).map_err(Unwind::Error)?;
        }
        Opcode::Car => {
            let list = closure.pop().map_err(Unwind::Error)?;
            let head = expect_list(&list)?.head.as_ref().clone();
            closure.push(head).map_err(Unwind::Error)?;
        }
        Opcode::Cdr => {
            let list = closure.pop().map_err(Unwind::Error)?;
            let tail = expect_list(&list)?.tail.as_ref().clone();
            closure.push(tail).map_err(Unwind::Error)?;
        }
        Opcode::NewPair => {
            let right = closure.pop().map_err(Unwind::Error)?;
            let left = closure.pop().map_err(Unwind::Error)?;
            closure
                .push(Value::Pair(Rc::new(Pair::new(left, right))))
                .map_err(Unwind::Error)?;
        }
        Opcode::Left => {
            let pair = closure.pop().map_err(Unwind::Error)?;
            let left = expect_pair(&pair)?.left.as_ref().clone();
            closure.push(left).map_err(Unwind::Error)?;
        }
        Opcode::Right => {
            let pair = closure.pop().map_err(Unwind::Error)?;
            let right = expect_pair(&pair)?.right.as_ref().clone();
            closure.push(right).map_err(Unwind::Error)?;
        }
        Opcode::LdA => property_fallback(closure, &["a"], pair_field_left)?,
        Opcode::LdD => property_fallback(closure, &["d"], pair_field_right)?,
        Opcode::LdLeft => property_fallback(closure, &["left"], pair_field_left)?,
        Opcode::LdRight => property_fallback(closure, &["right"], pair_field_right)?,
        Opcode::LdStart => property_fallback(closure, &["start"], pair_field_left)?,
        Opcode::LdEnd => property_fallback(closure, &["end"], pair_field_right)?,
        Opcode::LdCount => property_fallback(closure, &["count"], collection_length)?,
        Opcode::LdLength => property_fallback(closure, &["length"], collection_length)?,
        other => {
            return Err(Unwind::Error(RuntimeError::VmInvariant(format!(
                "ops_struct::execute_list_shortcut called with non-shortcut opcode {:?}",
                other
            ))))
        }
    }
    Ok(Next::Advance)
}

/// `MakeList`/`MakeObject`: build an aggregate from a fixed number of
/// already-evaluated stack operands, the same "pop a known count, build,
/// push one value" shape as `Call` (`ops_control::pop_args`).
pub fn execute_make(op: &Opcode, closure: &Rc<Closure>) -> VmResult<Next> {
    match op {
        Opcode::MakeList(n) => {
            let mut items = Vec::with_capacity(*n as usize);
            for _ in 0..*n {
                items.push(closure.pop().map_err(Unwind::Error)?);
            }
            items.reverse();
            closure.push(pair_list::list_of(&items)).map_err(Unwind::Error)?;
        }
        Opcode::MakeObject(n) => {
            let mut pairs = Vec::with_capacity(*n as usize);
            for _ in 0..*n {
                let value = closure.pop().map_err(Unwind::Error)?;
                let key = closure.pop().map_err(Unwind::Error)?;
                pairs.push((key, value));
            }
            pairs.reverse();
            let base = closure.pop().map_err(Unwind::Error)?;
            let mut obj = match base {
                Value::UserObject(b) => crate::value::UserObject::with_base(Rc::new(b.borrow().clone())),
                _ => crate::value::UserObject::new(),
            };
            for (key, value) in pairs {
                if let Value::Symbol(sym) = key {
                    obj.define(sym, value);
                } else {
                    return Err(Unwind::Error(RuntimeError::VmInvariant(
                        "MakeObject member key was not a Symbol".to_string(),
                    )));
                }
            }
            closure
                .push(Value::UserObject(Rc::new(std::cell::RefCell::new(obj))))
                .map_err(Unwind::Error)?;
        }
        other => {
            return Err(Unwind::Error(RuntimeError::VmInvariant(format!(
                "ops_struct::execute_make called with non-aggregate opcode {:?}",
                other
            ))))
        }
    }
    Ok(Next::Advance)
}

fn expect_list(v: &Value) -> VmResult<Rc<crate::value::ConsCell>> {
    match v {
        Value::List(cell) => Ok(Rc::clone(cell)),
        other => Err(Unwind::Error(RuntimeError::TypeError(format!(
            "expected a List, got a {}",
            other.kind()
        )))),
    }
}

fn expect_pair(v: &Value) -> VmResult<Rc<Pair>> {
    match v {
        Value::Pair(pair) => Ok(Rc::clone(pair)),
        other => Err(Unwind::Error(RuntimeError::TypeError(format!(
            "expected a Pair, got a {}",
            other.kind()
        )))),
    }
}

/// Try `intrinsic` against the popped operand; if it declines (returns
/// `None`, meaning the operand isn't the kind this opcode fast-paths),
/// fall back to a plain property lookup under the first name in `names`.
fn property_fallback(
    closure: &Rc<Closure>,
    names: &[&str],
    intrinsic: impl FnOnce(&Value) -> Option<Value>,
) -> VmResult<()> {
    let target = closure.pop().map_err(Unwind::Error)?;
    let result = match intrinsic(&target) {
        Some(v) => v,
        None => super::get_property_with_fallback(&target, intern(names[0])).map_err(Unwind::Error)?,
    };
    closure.push(result).map_err(Unwind::Error)
}

fn pair_field_left(v: &Value) -> Option<Value> {
    match v {
        Value::Pair(p) => Some(p.left.as_ref().clone()),
        _ => None,
    }
}

fn pair_field_right(v: &Value) -> Option<Value> {
    match v {
        Value::Pair(p) => Some(p.right.as_ref().clone()),
        _ => None,
    }
}

fn collection_length(v: &Value) -> Option<Value> {
    match v {
        Value::List(_) | Value::Null => Some(Value::int64(pair_list::length(v) as i64)),
        Value::String(s) => Some(Value::int64(s.length() as i64)),
        Value::ByteArray(b) => Some(Value::int64(b.borrow().len() as i64)),
        _ => None,
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
    fn cons_car_cdr_round_trip() {
        let c = closure();
        let tail = pair_list::list_of(&[Value::int64(2), Value::int64(3)]);
        c.push(Value::int64(1)).unwrap();
        c.push(tail.clone()).unwrap();
        execute_list_shortcut(&Opcode::Cons, &c).unwrap();
        let list = c.pop().unwrap();

        c.push(list.clone()).unwrap();
        execute_list_shortcut(&Opcode::Car, &c).unwrap();
        assert_eq!(c.pop().unwrap(), Value::int64(1));

        c.push(list).unwrap();
        execute_list_shortcut(&Opcode::Cdr, &c).unwrap();
        assert_eq!(c.pop().unwrap(), tail);
    }

    #[test]
    fn new_pair_then_left_right() {
        let c = closure();
        c.push(Value::int64(10)).unwrap();
        c.push(Value::int64(20)).unwrap();
        execute_list_shortcut(&Opcode::NewPair, &c).unwrap();
        let pair = c.pop().unwrap();

        c.push(pair.clone()).unwrap();
        execute_list_shortcut(&Opcode::Left, &c).unwrap();
        assert_eq!(c.pop().unwrap(), Value::int64(10));

        c.push(pair).unwrap();
        execute_list_shortcut(&Opcode::Right, &c).unwrap();
        assert_eq!(c.pop().unwrap(), Value::int64(20));
    }

    #[test]
    fn ld_length_fast_paths_list_and_string() {
        let c = closure();
        let list = pair_list::list_of(&[Value::int64(1), Value::int64(2), Value::int64(3)]);
        c.push(list).unwrap();
        execute_list_shortcut(&Opcode::LdLength, &c).unwrap();
        assert_eq!(c.pop().unwrap(), Value::int64(3));

        c.push(Value::from_str("hello")).unwrap();
        execute_list_shortcut(&Opcode::LdLength, &c).unwrap();
        assert_eq!(c.pop().unwrap(), Value::int64(5));
    }

    #[test]
    fn ld_a_falls_back_to_property_on_non_pair() {
        use crate::value::UserObject;
        let c = closure();
        let mut obj = UserObject::new();
        obj.define(intern("a"), Value::from_str("fallback"));
        c.push(Value::UserObject(Rc::new(std::cell::RefCell::new(obj))))
            .unwrap();
        execute_list_shortcut(&Opcode::LdA, &c).unwrap();
        assert_eq!(c.pop().unwrap(), Value::from_str("fallback"));
    }

    #[test]
    fn equality_opcodes_compare_structurally() {
        let c = closure();
        c.push(Value::int64(1)).unwrap();
        c.push(Value::int64(1)).unwrap();
        execute_equality(&Opcode::SuperEq, &c).unwrap();
        assert_eq!(c.pop().unwrap(), Value::Bool(true));
    }

    #[test]
    fn st_prop_leaves_value_on_stack_and_writes_target() {
        use crate::value::UserObject;
        let c = closure();
        let obj = Value::UserObject(Rc::new(std::cell::RefCell::new(UserObject::new())));
        c.push(obj.clone()).unwrap();
        c.push(Value::int64(7)).unwrap();
        execute_property(&Opcode::StProp(intern("x")), &c).unwrap();
        assert_eq!(c.pop().unwrap(), Value::int64(7));
        assert_eq!(obj.get_property(intern("x")).unwrap(), Value::int64(7));
    }
}



