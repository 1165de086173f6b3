//! # Closures & Escape Continuations
//!
//! [`ClosureInfo`] describes an activation record's static shape;
//! [`Closure`] is its runtime counterpart — contiguous storage for
//! arguments, locals, and the operand stack, plus a lexical parent link.
//! Non-local exits (`Ret`/`Throw`) are *not* modeled as a captured
//! continuation value here; `src/vm/mod.rs`'s `Unwind`/`Result`
//! propagation through ordinary Rust call returns replaces the source's
//! `setjmp`/`longjmp` escape directly, per spec §9's redesign note.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::symbol::Symbol;
use crate::value::Value;

/// What kind of activation a [`ClosureInfo`] describes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClosureKind {
    /// The root closure of a compilation unit; its variable map backs
    /// globals.
    Global,
    /// An ordinary function-call activation.
    Local,
    /// A transient scope introduced by a block or `let`-like construct
    /// that doesn't allocate its own call frame.
    Pseudo,
}

/// Static shape of an activation record.
#[derive(Debug)]
pub struct ClosureInfo {
    pub parent: Option<Rc<ClosureInfo>>,
    pub global: Option<Rc<ClosureInfo>>,
    pub kind: ClosureKind,
    pub num_variables: u32,
    pub num_arguments: u32,
    /// Maximum operand-stack depth reached by this closure's segment;
    /// checked by invariant 1 (`stackTop` never exceeds `tempSize`).
    pub temp_size: u32,
    /// Optional name→slot dictionary, used by the compiler/debugger to
    /// resolve identifiers to `(scope, slot)` pairs; not required at
    /// runtime once bytecode operands are resolved.
    pub names: Vec<(Symbol, u32)>,
}

impl ClosureInfo {
    pub fn global(num_variables: u32, temp_size: u32) -> Rc<ClosureInfo> {
        Rc::new(ClosureInfo {
            parent: None,
            global: None,
            kind: ClosureKind::Global,
            num_variables,
            num_arguments: 0,
            temp_size,
            names: Vec::new(),
        })
    }

    pub fn local(
        parent: Rc<ClosureInfo>,
        global: Rc<ClosureInfo>,
        num_variables: u32,
        num_arguments: u32,
        temp_size: u32,
    ) -> Rc<ClosureInfo> {
        Rc::new(ClosureInfo {
            parent: Some(parent),
            global: Some(global),
            kind: ClosureKind::Local,
            num_variables,
            num_arguments,
            temp_size,
            names: Vec::new(),
        })
    }

    pub fn slot_of(&self, name: Symbol) -> Option<u32> {
        self.names.iter().find(|(n, _)| *n == name).map(|(_, s)| s)
    }
}

/// The runtime counterpart to [`ClosureInfo`] — contiguous storage for
/// arguments, locals, and the operand stack.
///
/// Each call exclusively owns its `Closure` until the frame returns or is
/// unwound by a thrown exception propagating back up through `vm::Unwind`.
/// `args`/`locals`/`stack` are `RefCell`-guarded because the interpreter
/// holds an `Rc<Closure>` (shared with any nested closures capturing this
/// one as their lexical parent) while mutating its slots in place.
#[derive(Debug)]
pub struct Closure {
    pub info: Rc<ClosureInfo>,
    pub parent: Option<Rc<Closure>>,
    pub args: RefCell<Vec<Value>>,
    pub locals: RefCell<Vec<Value>>,
    pub stack: RefCell<Vec<Value>>,
    pub stack_top: Cell<usize>,
    /// Global variable map, only populated for the root closure
    /// (`info.kind == ClosureKind::Global`); all other closures resolve
    /// globals by walking to the root via `global`.
    pub globals: RefCell<Option<crate::value::UserObject>>,
}

impl Closure {
    pub fn new_global(info: Rc<ClosureInfo>) -> Rc<Closure> {
        Rc::new(Closure {
            args: RefCell::new(Vec::new()),
            locals: RefCell::new(vec![Value::Null; info.num_variables as usize]),
            stack: RefCell::new(vec![Value::Null; info.temp_size as usize]),
            stack_top: Cell::new(0),
            globals: RefCell::new(Some(crate::value::UserObject::new())),
            info,
            parent: None,
        })
    }

    pub fn new_local(info: Rc<ClosureInfo>, parent: Option<Rc<Closure>>, args: Vec<Value>) -> Rc<Closure> {
        let mut padded = args;
        padded.resize(info.num_arguments as usize, Value::Null);
        Rc::new(Closure {
            args: RefCell::new(padded),
            locals: RefCell::new(vec![Value::Null; info.num_variables as usize]),
            stack: RefCell::new(vec![Value::Null; info.temp_size as usize]),
            stack_top: Cell::new(0),
            globals: RefCell::new(None),
            info,
            parent,
        })
    }

    /// Walk `scope_distance` lexical parents up from `self`.
    pub fn ancestor(self: &Rc<Closure>, scope_distance: u32) -> Result<Rc<Closure>, RuntimeError> {
        let mut cur = Rc::clone(self);
        for _ in 0..scope_distance {
            cur = cur
                .parent
                .clone()
                .ok_or_else(|| RuntimeError::VmInvariant("lexical scope underflow".to_string()))?;
        }
        Ok(cur)
    }

    pub fn push(&self, value: Value) -> Result<(), RuntimeError> {
        let top = self.stack_top.get();
        if top >= self.info.temp_size as usize {
            return Err(RuntimeError::VmInvariant(format!(
                "operand stack overflow: top {} exceeds tempSize {}",
                top, self.info.temp_size
            )));
        }
        let mut stack = self.stack.borrow_mut();
        if top == stack.len() {
            stack.push(value);
        } else {
            stack[top] = value;
        }
        self.stack_top.set(top + 1);
        Ok(())
    }

    pub fn pop(&self) -> Result<Value, RuntimeError> {
        let top = self.stack_top.get();
        if top == 0 {
            return Err(RuntimeError::VmInvariant("operand stack underflow".to_string()));
        }
        self.stack_top.set(top - 1);
        Ok(self.stack.borrow()[top - 1].clone())
    }

    pub fn peek(&self, depth_from_top: usize) -> Result<Value, RuntimeError> {
        let top = self.stack_top.get();
        if depth_from_top >= top {
            return Err(RuntimeError::VmInvariant("operand stack underflow on peek".to_string()));
        }
        Ok(self.stack.borrow()[top - 1 - depth_from_top].clone())
    }

    pub fn load_local(&self, slot: u32) -> Result<Value, RuntimeError> {
        self.locals
            .borrow()
            .get(slot as usize)
            .cloned()
            .ok_or_else(|| RuntimeError::VmInvariant(format!("local slot {} out of range", slot)))
    }

    pub fn store_local(&self, slot: u32, value: Value) -> Result<(), RuntimeError> {
        let mut locals = self.locals.borrow_mut();
        let slot_ref = locals
            .get_mut(slot as usize)
            .ok_or_else(|| RuntimeError::VmInvariant(format!("local slot {} out of range", slot)))?;
        *slot_ref = value;
        Ok(())
    }

    pub fn load_arg(&self, slot: u32) -> Result<Value, RuntimeError> {
        self.args
            .borrow()
            .get(slot as usize)
            .cloned()
            .ok_or_else(|| RuntimeError::VmInvariant(format!("argument slot {} out of range", slot)))
    }

    pub fn store_arg(&self, slot: u32, value: Value) -> Result<(), RuntimeError> {
        let mut args = self.args.borrow_mut();
        let slot_ref = args
            .get_mut(slot as usize)
            .ok_or_else(|| RuntimeError::VmInvariant(format!("argument slot {} out of range", slot)))?;
        *slot_ref = value;
        Ok(())
    }

    /// Resolve to the root (global) closure, walking `parent` links.
    pub fn root(self: &Rc<Closure>) -> Rc<Closure> {
        let mut cur = Rc::clone(self);
        while let Some(p) = cur.parent.clone() {
            cur = p;
        }
        cur
    }

    pub fn load_global(self: &Rc<Closure>, name: Symbol) -> Result<Value, RuntimeError> {
        let root = self.root();
        let globals = root.globals.borrow();
        let table = globals
            .as_ref()
            .ok_or_else(|| RuntimeError::VmInvariant("root closure has no global table".to_string()))?;
        table
            .get_property(name)
            .ok_or_else(|| RuntimeError::UndefinedIdentError(name.name()))
    }

    pub fn store_global(self: &Rc<Closure>, name: Symbol, value: Value) -> Result<(), RuntimeError> {
        let root = self.root();
        let mut globals = root.globals.borrow_mut();
        let table = globals
            .as_mut()
            .ok_or_else(|| RuntimeError::VmInvariant("root closure has no global table".to_string()))?;
        table.define(name, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_info() -> Rc<ClosureInfo> {
        ClosureInfo::global(2, 4)
    }

    #[test]
    fn push_pop_respects_temp_size() {
        let closure = Closure::new_global(leaf_info());
        closure.push(Value::int64(1)).unwrap();
        closure.push(Value::int64(2)).unwrap();
        assert_eq!(closure.pop().unwrap(), Value::int64(2));
        assert_eq!(closure.pop().unwrap(), Value::int64(1));
        assert!(closure.pop().is_err());
    }

    #[test]
    fn stack_overflow_is_rejected() {
        let info = ClosureInfo::global(0, 1);
        let closure = Closure::new_global(info);
        closure.push(Value::int64(1)).unwrap();
        assert!(closure.push(Value::int64(2)).is_err());
    }

    #[test]
    fn locals_round_trip() {
        let closure = Closure::new_global(leaf_info());
        closure.store_local(0, Value::int64(42)).unwrap();
        assert_eq!(closure.load_local(0).unwrap(), Value::int64(42));
        assert!(closure.load_local(9).is_err());
    }

    #[test]
    fn globals_resolve_through_root() {
        let root = Closure::new_global(ClosureInfo::global(0, 4));
        let child_info = ClosureInfo::local(Rc::clone(&root.info), Rc::clone(&root.info), 0, 0, 2);
        let child = Closure::new_local(child_info, Some(Rc::clone(&root)), vec![]);

        let name = crate::symbol::intern("x");
        child.store_global(name, Value::int64(7)).unwrap();
        assert_eq!(child.load_global(name).unwrap(), Value::int64(7));
        assert_eq!(root.load_global(name).unwrap(), Value::int64(7));
    }
}



