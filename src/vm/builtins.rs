//! # Native Standard Library
//!
//! The natives that back the `List`/`String`/`ByteArray`/`Timestamp`
//! namespaces, plus the state-machine protocol that lets
//! `each`/`map`/`where`/`count` drive a user callback across a collection
//! without growing the native call stack.
//!
//! Registers a flat set of native functions into the global environment,
//! generalized here to per-namespace `UserObject`s (`List.of`,
//! `String.format`, ...) since Smile's method surface is organized by
//! namespace rather than as free functions.
//!
//! Iteration natives are driven by [`NativeStateMachine::step`],
//! returning one item's worth of work at a time; [`drive_state_machine`]
//! loops until it reports [`StepOutcome::Done`]. Because
//! [`super::call_function`] already recurses through the ordinary Rust
//! call stack, the state machine doesn't need to suspend mid-native-call
//! the way a coroutine would — it only needs to
//! remember where it left off in the collection between `step` calls.

use std::rc::Rc;

use crate::error::RuntimeError;
use crate::symbol::intern;
use crate::value::function::{ArgCheck, Arity, NativeFunction, NativeOutcome};
use crate::value::{pair_list, ByteArray, Function, Timestamp, UserObject, Value};

use super::{call_function, Unwind};

type VmResult<T> = Result<T, Unwind>;

/// One step of a state-machine native. `Continue` means more work remains; `Done` carries the
/// machine's final result (an accumulated list for `map`/`where`, a count
/// for `count`, `Null` for `each`).
pub enum StepOutcome {
    Continue,
    Done(Value),
}

pub trait NativeStateMachine {
    fn step(&mut self) -> VmResult<StepOutcome>;
}

/// Run `machine` to completion, one item at a time.
pub fn drive_state_machine(mut machine: Box<dyn NativeStateMachine>) -> VmResult<Value> {
    loop {
        match machine.step()? {
            StepOutcome::Continue => continue,
            StepOutcome::Done(v) => return Ok(v),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum IterMode {
    Each,
    Map,
    Where,
    Count,
}

struct ListIterMachine {
    mode: IterMode,
    items: std::vec::IntoIter<Value>,
    callback: Value,
    collected: Vec<Value>,
    count: i64,
}

impl NativeStateMachine for ListIterMachine {
    fn step(&mut self) -> VmResult<StepOutcome> {
        let Some(item) = self.items.next() else {
            let result = match self.mode {
                IterMode::Each => Value::Null,
                IterMode::Map | IterMode::Where => pair_list::list_of(&self.collected),
                IterMode::Count => Value::int64(self.count),
            };
            return Ok(StepOutcome::Done(result));
        };
        match self.mode {
            IterMode::Each => {
                call_function(&self.callback, vec![item])?;
            }
            IterMode::Map => {
                let mapped = call_function(&self.callback, vec![item])?;
                self.collected.push(mapped);
            }
            IterMode::Where => {
                let keep = call_function(&self.callback, vec![item.clone()])?;
                if keep.to_bool() {
                    self.collected.push(item);
                }
            }
            IterMode::Count => {
                let keep = call_function(&self.callback, vec![item])?;
                if keep.to_bool() {
                    self.count += 1;
                }
            }
        }
        Ok(StepOutcome::Continue)
    }
}

fn iter_native(name: &'static str, mode: IterMode) -> NativeFunction {
    NativeFunction {
        name: intern(name),
        arity: Arity::Exact(2),
        checks: vec![
            ArgCheck {
                kind_mask: 1u64 << (crate::value::Kind::List as u32 & 63)
                | 1u64 << (crate::value::Kind::Null as u32 & 63),
                label: "List",
            },
            ArgCheck {
                kind_mask: 1u64 << (crate::value::Kind::Function as u32 & 63),
                label: "Function",
            },
        ],
        body: Rc::new(move |args: &[Value]| {
            let items = pair_list::to_vec(&args[0]);
            let machine = ListIterMachine {
                mode,
                items: items.into_iter(),
                callback: args[1].clone(),
                collected: Vec::new(),
                count: 0,
            };
            Ok(NativeOutcome::StateMachine(Box::new(machine)))
        }),
    }
}

fn native_value(f: NativeFunction) -> Value {
    Value::Function(Rc::new(Function::Native(f)))
}

fn define_native(obj: &mut UserObject, f: NativeFunction) {
    let name = f.name;
    obj.define(name, native_value(f));
}

/// Build the `List` namespace object.
pub fn list_namespace() -> UserObject {
    let mut obj = UserObject::new();

    define_native(
        &mut obj,
        NativeFunction {
            name: intern("of"),
            arity: Arity::AtLeast(0),
            checks: Vec::new(),
            body: Rc::new(|args| Ok(NativeOutcome::Value(pair_list::list_of(args)))),
        },
    );
    define_native(
        &mut obj,
        NativeFunction {
            name: intern("cons"),
            arity: Arity::Exact(2),
            checks: Vec::new(),
            body: Rc::new(|args| Ok(NativeOutcome::Value(pair_list::cons(args[0].clone(), args[1].clone())))),
        },
    );
    define_native(
        &mut obj,
        NativeFunction {
            name: intern("combine"),
            arity: Arity::AtLeast(0),
            checks: Vec::new(),
            body: Rc::new(|args| Ok(NativeOutcome::Value(pair_list::combine(args)))),
        },
    );
    define_native(
        &mut obj,
        NativeFunction {
            name: intern("length"),
            arity: Arity::Exact(1),
            checks: Vec::new(),
            body: Rc::new(|args| Ok(NativeOutcome::Value(Value::int64(pair_list::length(&args[0]) as i64)))),
        },
    );
    define_native(&mut obj, iter_native("each", IterMode::Each));
    define_native(&mut obj, iter_native("map", IterMode::Map));
    define_native(&mut obj, iter_native("where", IterMode::Where));
    define_native(&mut obj, iter_native("count", IterMode::Count));

    obj
}

fn str_arg(v: &Value) -> Result<Rc<crate::string::SmileString>, RuntimeError> {
    match v {
        Value::String(s) => Ok(Rc::clone(s)),
        other => Err(RuntimeError::NativeMethodError(format!(
            "expected a String, got a {}",
            other.kind()
        ))),
    }
}

fn int_arg(v: &Value) -> Result<i64, RuntimeError> {
    match v {
        Value::Int64(n) => Ok(n.0),
        Value::Int32(n) => Ok(n.0 as i64),
        other => Err(RuntimeError::NativeMethodError(format!(
            "expected an integer, got a {}",
            other.kind()
        ))),
    }
}

/// Build the `String` namespace object. Only a representative
/// subset of [`crate::string::SmileString`]'s method surface is exposed as
/// a global native here; the rest is reachable the same way once a program
/// needs it, following the same `str_arg`/native-wrapper pattern.
pub fn string_namespace() -> UserObject {
    let mut obj = UserObject::new();

    define_native(
        &mut obj,
        NativeFunction {
            name: intern("length"),
            arity: Arity::Exact(1),
            checks: Vec::new(),
            body: Rc::new(|args| Ok(NativeOutcome::Value(Value::int64(str_arg(&args[0])?.length() as i64)))),
        },
    );
    define_native(
        &mut obj,
        NativeFunction {
            name: intern("concat"),
            arity: Arity::Exact(2),
            checks: Vec::new(),
            body: Rc::new(|args| {
                let a = str_arg(&args[0])?;
                let b = str_arg(&args[1])?;
                Ok(NativeOutcome::Value(Value::String(Rc::new(a.concat(&b)))))
            }),
        },
    );
    define_native(
        &mut obj,
        NativeFunction {
            name: intern("upper"),
            arity: Arity::Exact(1),
            checks: Vec::new(),
            body: Rc::new(|args| Ok(NativeOutcome::Value(Value::String(Rc::new(str_arg(&args[0])?.to_upper()))))),
        },
    );
    define_native(
        &mut obj,
        NativeFunction {
            name: intern("lower"),
            arity: Arity::Exact(1),
            checks: Vec::new(),
            body: Rc::new(|args| Ok(NativeOutcome::Value(Value::String(Rc::new(str_arg(&args[0])?.to_lower()))))),
        },
    );
    define_native(
        &mut obj,
        NativeFunction {
            name: intern("split"),
            arity: Arity::Exact(2),
            checks: Vec::new(),
            body: Rc::new(|args| {
                let s = str_arg(&args[0])?;
                let sep = str_arg(&args[1])?;
                let parts = s.split(&sep, true);
                let values: Vec<Value> = parts.into_iter().map(|p| Value::String(Rc::new(p))).collect();
                Ok(NativeOutcome::Value(pair_list::list_of(&values)))
            }),
        },
    );
    define_native(
        &mut obj,
        NativeFunction {
            name: intern("substring"),
            arity: Arity::Exact(3),
            checks: Vec::new(),
            body: Rc::new(|args| {
                let s = str_arg(&args[0])?;
                let start = int_arg(&args[1])?.max(0) as usize;
                let length = int_arg(&args[2])?.max(0) as usize;
                Ok(NativeOutcome::Value(Value::String(Rc::new(s.substring(start, length)))))
            }),
        },
    );
    define_native(
        &mut obj,
        NativeFunction {
            name: intern("contains"),
            arity: Arity::Exact(2),
            checks: Vec::new(),
            body: Rc::new(|args| {
                let s = str_arg(&args[0])?;
                let needle = str_arg(&args[1])?;
                Ok(NativeOutcome::Value(Value::Bool(s.contains(&needle))))
            }),
        },
    );
    define_native(
        &mut obj,
        NativeFunction {
            name: intern("rot13"),
            arity: Arity::Exact(1),
            checks: Vec::new(),
            body: Rc::new(|args| Ok(NativeOutcome::Value(Value::String(Rc::new(str_arg(&args[0])?.rot13()))))),
        },
    );

    obj
}

fn bytearray_arg(v: &Value) -> Result<Rc<std::cell::RefCell<ByteArray>>, RuntimeError> {
    match v {
        Value::ByteArray(b) => Ok(Rc::clone(b)),
        other => Err(RuntimeError::NativeMethodError(format!(
            "expected a ByteArray, got a {}",
            other.kind()
        ))),
    }
}

/// Build the `ByteArray` namespace object.
pub fn bytearray_namespace() -> UserObject {
    let mut obj = UserObject::new();

    define_native(
        &mut obj,
        NativeFunction {
            name: intern("zeroed"),
            arity: Arity::Exact(1),
            checks: Vec::new(),
            body: Rc::new(|args| {
                let len = int_arg(&args[0])?.max(0) as usize;
                Ok(NativeOutcome::Value(Value::ByteArray(Rc::new(std::cell::RefCell::new(
                    ByteArray::zeroed(len),
                )))))
            }),
        },
    );

    macro_rules! digest_native {
        ($name:literal, $method:ident) => {
            define_native(
                &mut obj,
                NativeFunction {
                    name: intern($name),
                    arity: Arity::Exact(1),
                    checks: Vec::new(),
                    body: Rc::new(|args| {
                        let b = bytearray_arg(&args[0])?;
                        let digest = b.borrow().$method();
                        Ok(NativeOutcome::Value(Value::ByteArray(Rc::new(std::cell::RefCell::new(
                            ByteArray::new(digest),
                        )))))
                    }),
                },
            );
        };
    }
    digest_native!("md5", md5);
    digest_native!("sha1", sha1);
    digest_native!("sha256", sha256);
    digest_native!("sha384", sha384);
    digest_native!("sha512", sha512);

    define_native(
        &mut obj,
        NativeFunction {
            name: intern("crc32"),
            arity: Arity::Exact(1),
            checks: Vec::new(),
            body: Rc::new(|args| Ok(NativeOutcome::Value(Value::int64(bytearray_arg(&args[0])?.borrow().crc32() as i64)))),
        },
    );
    define_native(
        &mut obj,
        NativeFunction {
            name: intern("to_hex"),
            arity: Arity::Exact(1),
            checks: Vec::new(),
            body: Rc::new(|args| Ok(NativeOutcome::Value(Value::from_str(&bytearray_arg(&args[0])?.borrow().to_hex())))),
        },
    );

    obj
}

/// Build the `Timestamp` namespace object.
pub fn timestamp_namespace() -> UserObject {
    let mut obj = UserObject::new();

    define_native(
        &mut obj,
        NativeFunction {
            name: intern("parse"),
            arity: Arity::Exact(1),
            checks: Vec::new(),
            body: Rc::new(|args| {
                let s = str_arg(&args[0])?;
                let ts = Timestamp::parse_iso8601(&s.to_string_lossy())?;
                Ok(NativeOutcome::Value(Value::Timestamp(ts)))
            }),
        },
    );
    define_native(
        &mut obj,
        NativeFunction {
            name: intern("from_unix"),
            arity: Arity::Exact(1),
            checks: Vec::new(),
            body: Rc::new(|args| Ok(NativeOutcome::Value(Value::Timestamp(Timestamp::from_unix(int_arg(&args[0])?, 0))))),
        },
    );

    obj
}

/// Populate the root closure's global table with the standard-library
/// namespaces. Called once, right after
/// [`crate::closure::Closure::new_global`] (see `src/lib.rs`).
pub fn install_globals(closure: &Rc<crate::closure::Closure>) {
    let namespaces: [(&str, UserObject); 4] = [
        ("List", list_namespace()),
        ("String", string_namespace()),
        ("ByteArray", bytearray_namespace()),
        ("Timestamp", timestamp_namespace()),
    ];
    for (name, ns) in namespaces {
        let value = Value::UserObject(Rc::new(std::cell::RefCell::new(ns)));
        closure
            .store_global(intern(name), value)
            .expect("root closure must have a global table");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::{Closure, ClosureInfo};

    fn root() -> Rc<Closure> {
        Closure::new_global(ClosureInfo::global(0, 8))
    }

    #[test]
    fn list_of_and_length_round_trip() {
        let ns = list_namespace();
        let of = ns.get_property(intern("of")).unwrap();
        let result = call_function(&of, vec![Value::int64(1), Value::int64(2), Value::int64(3)]).unwrap();
        assert_eq!(pair_list::length(&result), 3);

        let length = ns.get_property(intern("length")).unwrap();
        let n = call_function(&length, vec![result]).unwrap();
        assert_eq!(n, Value::int64(3));
    }

    #[test]
    fn list_map_state_machine_drives_to_completion() {
        let ns = list_namespace();
        let map = ns.get_property(intern("map")).unwrap();
        let list = pair_list::list_of(&[Value::int64(1), Value::int64(2), Value::int64(3)]);

        let double = NativeFunction {
            name: intern("double"),
            arity: Arity::Exact(1),
            checks: Vec::new(),
            body: Rc::new(|args| {
                let n = int_arg(&args[0])?;
                Ok(NativeOutcome::Value(Value::int64(n * 2)))
            }),
        };
        let callback = native_value(double);

        let result = call_function(&map, vec![list, callback]).unwrap();
        assert_eq!(
            pair_list::to_vec(&result),
            vec![Value::int64(2), Value::int64(4), Value::int64(6)]
        );
    }

    #[test]
    fn timestamp_parse_then_string_and_fields() {
        let ns = timestamp_namespace();
        let parse = ns.get_property(intern("parse")).unwrap();
        let ts = call_function(&parse, vec![Value::from_str("2021-06-15T12:34:56.789Z")]).unwrap();
        assert_eq!(ts.get_property(intern("string")).unwrap(), Value::from_str("2021-06-15T12:34:56.789000000Z"));
        assert_eq!(ts.get_property(intern("year")).unwrap(), Value::int64(2021));
        assert_eq!(ts.get_property(intern("day_of_year")).unwrap(), Value::int64(166));
    }

    #[test]
    fn install_globals_registers_namespaces() {
        let c = root();
        install_globals(&c);
        let list_ns = c.load_global(intern("List")).unwrap();
        assert!(matches!(list_ns, Value::UserObject(_)));
    }
}



