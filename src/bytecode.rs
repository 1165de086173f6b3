//! # Bytecode Format & Compiled Tables
//!
//! A flat `enum Opcode` with inline operands, decoded with a `match op`
//! table rather than a tagged-union struct: a Rust sum type already
//! gives each instruction its own payload shape, so a `match` in the
//! interpreter's tight loop is both simpler and cheap enough.
//!
//! `CompiledTables`/`ByteCodeSegment`/`UserFunctionInfo`/`SourceLocation`
//! are the per-compilation-unit side tables a compiled function's body
//! references by index; `CompiledUnitImage` plus [`load_image`]
//! implement the on-disk layout a standalone precompiler would emit —
//! producing that file is out of scope here, but loading it is not.

use std::rc::Rc;

use crate::error::{Position, RuntimeError};
use crate::symbol::Symbol;
use crate::value::Value;

/// `(scope_distance, slot_index)` — the operand shape for `Ld/St/StpLoc`
/// and `Ld/St/StpArg`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SlotRef {
    pub scope_distance: u32,
    pub slot: u32,
}

/// One compiled function's source position record: `(filename, line, column)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    pub filename: Rc<str>,
    pub position: Position,
}

/// A fixed bytecode instruction. Each variant carries exactly the operand
/// shape its opcode group needs; there is no separate `operand: union`
/// field because a Rust sum type already gives each variant its own
/// payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Opcode {
    // ---- Stack ------------------------------------------------------
    Nop,
    Dup(u8),
    Pop(u8),
    /// Replace the value `depth` slots down with the current top, then
    /// pop `depth` slots (`Rep1/Rep2/RepN`).
    Rep(u8),

    // ---- Constant loads ----------------------------------------------
    LdNull,
    LdBool(bool),
    LdStr(u32),
    LdSym(Symbol),
    LdObj(u32),
    Ld8(i8),
    Ld16(i16),
    Ld32(i32),
    Ld64(i64),
    Ld128(u32),

    // ---- Variable access ----------------------------------------------
    LdLoc(SlotRef),
    StLoc(SlotRef),
    StpLoc(SlotRef),
    LdArg(SlotRef),
    StArg(SlotRef),
    StpArg(SlotRef),
    LdX(Symbol),
    StX(Symbol),
    StpX(Symbol),

    // ---- Property access ----------------------------------------------
    LdProp(Symbol),
    StProp(Symbol),
    StpProp(Symbol),

    // ---- Type / equality ------------------------------------------------
    SuperEq,
    SuperNe,
    Bool,
    Not,
    Is,

    // ---- Arithmetic / comparison fast paths -----------------------------
    // Operators are tree-shaped as `[$dot a +]` method dispatch at the
    // syntax level, but these get dedicated opcodes rather than going
    // through a generic property-lookup-then-call. The compiler
    // (`compiler.rs`) recognizes `$dot` forms whose operator is one of
    // the built-in numeric symbols and lowers straight to these fast
    // opcodes, falling back to `LdProp`+`Call` for any other `$dot`
    // method name (including user-overridden operators).
    Add,
    Sub,
    Mul,
    DivQuiet,
    DivLoud,
    ModOp,
    RemOp,
    Neg,
    BAnd,
    BOr,
    BXor,
    BNotOp,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,

    // ---- Calls ------------------------------------------------------
    Call(u16),
    Met(Symbol, u16),

    // ---- Control flow --------------------------------------------------
    Jmp(i32),
    Bt(i32),
    Bf(i32),
    Ret,
    Label,

    // ---- List/pair shortcuts --------------------------------------------
    Cons,
    Car,
    Cdr,
    NewPair,
    Left,
    Right,
    LdA,
    LdD,
    LdLeft,
    LdRight,
    LdStart,
    LdEnd,
    LdCount,
    LdLength,

    // ---- Aggregate construction ------------------------------------------
    // `compiler.rs` needs some bytecode shape for a bracket list literal
    // and a `new {..}` block whose element/member values are arbitrary
    // expressions, not compile-time constants. `Cons`-chaining would
    // work for `MakeList` but needs the operands in an awkward stack
    // order for no benefit over a single variadic pop; `MakeObject` has
    // no equivalent pairwise shortcut at all, so both are modeled the
    // same way as `Call`: pop a fixed count and build the aggregate in
    // one step.
    /// Pop `n` values (pushed in source order) and push the list they form.
    MakeList(u16),
    /// Pop `n` `(Symbol, Value)` pairs (each pushed as two values, in
    /// source order) and a base value beneath them, and push a
    /// `UserObject` seeded from `base` (if it is one) with those pairs
    /// defined on top.
    MakeObject(u16),

    // ---- Breakpoint ------------------------------------------------
    Brk,

    // ---- Exception handling -------------------------------------------
    // The compiler needs some bytecode shape for `Throw {..}` and the
    // syntax macros that install exception continuations. Modeled as a
    // handler-stack triad: push a handler, pop it on normal exit, or
    // unwind to the nearest one on a throw.
    PushHandler(i32),
    PopHandler,
    Throw,
}

/// `(opcode, sourceLocationIndex)` — the decoded form already folds the
/// operand into [`Opcode`]; `source_location` is kept as a separate
/// index into [`CompiledTables::source_locations`] so two instructions
/// that share a position don't duplicate storage.
#[derive(Clone, Debug, PartialEq)]
pub struct ByteCode {
    pub op: Opcode,
    pub source_location: u32,
}

impl ByteCode {
    pub fn new(op: Opcode, source_location: u32) -> ByteCode {
        ByteCode { op, source_location }
    }
}

/// Per-compilation-unit side tables.
#[derive(Debug, Default)]
pub struct CompiledTables {
    pub strings: Vec<Rc<crate::string::SmileString>>,
    pub objects: Vec<Value>,
    pub functions: Vec<Rc<UserFunctionInfo>>,
    pub source_locations: Vec<SourceLocation>,
    /// 128-bit literal table (`Ld128`), kept distinct from `objects` so the
    /// common case (a small object table) doesn't carry 16-byte slots for
    /// every entry.
    pub big_literals: Vec<i128>,
}

impl CompiledTables {
    pub fn new() -> CompiledTables {
        CompiledTables::default()
    }

    pub fn source_location_at(&self, index: u32) -> Option<&SourceLocation> {
        self.source_locations.get(index as usize)
    }
}

/// A flat array of [`ByteCode`] forming the body of one
/// [`UserFunctionInfo`]. Owned by reference to a shared
/// [`CompiledTables`]; mutation after load is forbidden.
#[derive(Debug)]
pub struct ByteCodeSegment {
    pub tables: Rc<CompiledTables>,
    pub code: Vec<ByteCode>,
}

impl ByteCodeSegment {
    pub fn new(tables: Rc<CompiledTables>, code: Vec<ByteCode>) -> ByteCodeSegment {
        ByteCodeSegment { tables, code }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn at(&self, pc: usize) -> Result<&ByteCode, RuntimeError> {
        self.code
            .get(pc)
            .ok_or_else(|| RuntimeError::VmInvariant(format!("program counter {} out of range", pc)))
    }
}

/// Pairs a [`crate::closure::ClosureInfo`] with its compiled body and
/// source argument list.
#[derive(Debug)]
pub struct UserFunctionInfo {
    pub name: Option<Symbol>,
    pub closure_info: Rc<crate::closure::ClosureInfo>,
    pub segment: Rc<ByteCodeSegment>,
    /// The function's formal argument list as written in source, encoding
    /// its arity policy (missing args default to `Null`, excess args are
    /// discarded or collected depending on a trailing `rest` parameter).
    pub arg_list: Vec<Symbol>,
    pub rest_arg: bool,
}

// ---------------------------------------------------------------------
// On-disk compiled-unit image
// ---------------------------------------------------------------------

/// One top-level `[$set target value]` entry, applied against a fresh
/// global closure after the image is loaded.
#[derive(Clone, Debug)]
pub struct TopLevelSet {
    pub target: Symbol,
    pub value_index: u32,
}

/// The static-data image emitted by the (out-of-scope) bootstrap
/// precompiler: interned strings, re-interned symbols, literal objects, a
/// user-function-info table with bytecode segments, a source-location
/// table, and the top-level `[$set]` list.
///
/// Symbol ids inside `raw_symbol_names` aren't known until the runtime's
/// symbol table has allocated them, so bytecode operands referencing a
/// symbol are fixed up during [`load_image`] rather than at image build
/// time.
pub struct CompiledUnitImage {
    pub strings: Vec<String>,
    pub raw_symbol_names: Vec<String>,
    pub objects: Vec<Value>,
    pub functions: Vec<Rc<UserFunctionInfo>>,
    pub source_locations: Vec<SourceLocation>,
    pub top_level_sets: Vec<TopLevelSet>,
}

/// Load a [`CompiledUnitImage`] into an executable [`CompiledTables`] plus
/// the list of top-level `[$set]`s, ready to be run against a fresh global
/// closure.
///
/// This implementation assumes `image.functions`' bytecode was already
/// produced with symbols resolved against the *current* process's symbol
/// table (the common case when the image is produced in-process by
/// [`crate::compiler`] rather than loaded from a foreign binary image); a
/// true foreign-image loader would additionally walk `raw_symbol_names`
/// and rewrite every `LdSym`/`LdX`/etc. operand — a fix-up step that
/// requires the on-disk bytecode encoding produced by the bootstrap
/// precompiler, which is treated as an external collaborator here.
pub fn load_image(image: CompiledUnitImage) -> (Rc<CompiledTables>, Vec<TopLevelSet>) {
    for name in &image.raw_symbol_names {
        crate::symbol::intern(name);
    }
    let tables = Rc::new(CompiledTables {
        strings: image
            .strings
            .iter()
            .map(|s| Rc::new(crate::string::SmileString::from_str(s)))
            .collect(),
        objects: image.objects,
        functions: image.functions,
        source_locations: image.source_locations,
        big_literals: Vec::new(),
    });
    (tables, image.top_level_sets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_reports_out_of_range_pc() {
        let tables = Rc::new(CompiledTables::new());
        let segment = ByteCodeSegment::new(tables, vec![ByteCode::new(Opcode::Nop, 0)]);
        assert!(segment.at(0).is_ok());
        assert!(segment.at(1).is_err());
    }

    #[test]
    fn load_image_interns_symbols_and_builds_tables() {
        let image = CompiledUnitImage {
            strings: vec!["hello".to_string()],
            raw_symbol_names: vec!["my-global".to_string()],
            objects: vec![Value::int64(1)],
            functions: vec![],
            source_locations: vec![],
            top_level_sets: vec![TopLevelSet {
                target: crate::symbol::intern("my-global"),
                value_index: 0,
            }],
        };
        let (tables, sets) = load_image(image);
        assert_eq!(tables.strings.len(), 1);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].target.name(), "my-global");
    }
}



