//! # Tree-to-Bytecode Lowering
//!
//! Walks the parser's s-expression tree and emits
//! [`Opcode`]s into a single [`ByteCodeSegment`] against a single global
//! [`crate::closure::Closure`]. The grammar has no `fn`/lambda syntax — its
//! productions bottom out at `new`/list/dot forms, never a binder — so
//! every identifier this module resolves is a global: there is no
//! local-slot allocation to do, and the root closure's
//! [`crate::closure::ClosureInfo`] is built with `num_variables = 0` via
//! [`crate::closure::ClosureInfo::global`].
//!
//! Grounded in the reference `compiler.rs` (tree-walking `match` over a
//! fixed set of node kinds, emitting into a flat `Vec<Instr>`), widened to
//! Smile's richer special-form set and to the `navicore-cem3` compiler's
//! label-patching idiom (`codegen.rs`'s forward-jump placeholder-then-patch
//! pattern) for `$if`/`and`/`or`.
//!
//! Every `compile_expr` call leaves exactly one value on the operand
//! stack; `$progn` is the only form that discards intermediate values,
//! via `Pop(1)` between non-final statements.

use std::rc::Rc;

use crate::bytecode::{ByteCode, ByteCodeSegment, CompiledTables, Opcode, SourceLocation};
use crate::closure::ClosureInfo;
use crate::error::{Position, RuntimeError};
use crate::symbol::{intern, reserved, Symbol};
use crate::value::pair_list::to_vec;
use crate::value::Value;

/// The compiled form of one top-level program or `{ ... }` scope body:
/// a segment ready to run against a fresh global closure.
pub struct CompiledUnit {
    pub segment: Rc<ByteCodeSegment>,
    pub closure_info: Rc<ClosureInfo>,
}

/// Lower `tree` (the `[$progn [stmt..]]` shape [`crate::parser::parse`]
/// returns) into a runnable [`CompiledUnit`].
pub fn compile(tree: &Value, filename: &str) -> Result<CompiledUnit, RuntimeError> {
    let mut c = Compiler::new(filename);
    let items = to_vec(tree);
    let body = items.get(1).cloned().unwrap_or(Value::Null);
    c.compile_progn_body(&body)?;
    c.emit(Opcode::Ret, -1);

    let tables = Rc::new(c.tables);
    let segment = Rc::new(ByteCodeSegment::new(tables, c.code));
    let closure_info = ClosureInfo::global(0, c.max_depth);
    Ok(CompiledUnit { segment, closure_info })
}

struct Compiler {
    tables: CompiledTables,
    code: Vec<ByteCode>,
    /// Location of every instruction this compiler emits: the tree carries
    /// no per-node source position (only the parser's own diagnostics do),
    /// so every instruction shares the one placeholder entry installed in
    /// `new`.
    source_location: u32,
    depth: i64,
    max_depth: u32,
}

impl Compiler {
    fn new(filename: &str) -> Compiler {
        let mut tables = CompiledTables::new();
        tables.source_locations.push(SourceLocation {
            filename: Rc::from(filename),
            position: Position::new(0, 0),
        });
        Compiler {
            tables,
            code: Vec::new(),
            source_location: 0,
            depth: 0,
            max_depth: 0,
        }
    }

    fn here(&self) -> usize {
        self.code.len()
    }

    /// Append `op`, tracking the operand-stack effect (`delta`, positive for
    /// net pushes) so the closure's `tempSize` can be sized exactly —
    /// `stackTop` must never exceed `tempSize`.
    fn emit(&mut self, op: Opcode, delta: i32) -> usize {
        let idx = self.code.len();
        self.code.push(ByteCode::new(op, self.source_location));
        self.depth += delta as i64;
        if self.depth > self.max_depth as i64 {
            self.max_depth = self.depth as u32;
        }
        idx
    }

    /// Patch a forward jump emitted at `idx` to land at `target`, using the
    /// jumping instruction's own index as the relative-offset base — jump
    /// targets are always relative to the jumping instruction.
    fn patch_jump(&mut self, idx: usize, target: usize) {
        let rel = target as i64 - idx as i64;
        let rel = rel as i32;
        match &mut self.code[idx].op {
            Opcode::Jmp(r) | Opcode::Bt(r) | Opcode::Bf(r) | Opcode::PushHandler(r) => *r = rel,
            other => unreachable!("patch_jump called on non-jump opcode {:?}", other),
        }
    }

    fn intern_object(&mut self, v: Value) -> u32 {
        self.tables.objects.push(v);
        (self.tables.objects.len() - 1) as u32
    }

    fn intern_string(&mut self, s: &str) -> u32 {
        self.tables.strings.push(Rc::new(crate::string::SmileString::from_str(s)));
        (self.tables.strings.len() - 1) as u32
    }

    // ------------------------------------------------------------------
    // Literals and the generic expression dispatch
    // ------------------------------------------------------------------

    fn compile_expr(&mut self, v: &Value) -> Result<(), RuntimeError> {
        match v {
            Value::Null => {
                self.emit(Opcode::LdNull, 1);
                Ok(())
            }
            Value::Bool(b) => {
                self.emit(Opcode::LdBool(*b), 1);
                Ok(())
            }
            Value::Int64(n) => {
                self.emit(Opcode::Ld64(n.0), 1);
                Ok(())
            }
            Value::String(s) => {
                let idx = self.intern_string(&s.to_string_lossy());
                self.emit(Opcode::LdStr(idx), 1);
                Ok(())
            }
            Value::Symbol(sym) => {
                // A bare `Symbol` node is indistinguishable, at the tree
                // level, between "this identifier names a global" (the
                // overwhelming common case: every bare word the parser
                // emits from `Ident` tokens) and "this is genuine symbol
                // literal data" (from a `#name` token). Treating it as a
                // variable reference is the only choice that makes ordinary
                // identifiers work at all; literal symbol data that needs
                // to survive unevaluated must go through `$quote`, which
                // `compile_expr` never recurses into for its payload.
                self.emit(Opcode::LdX(*sym), 1);
                Ok(())
            }
            Value::List(_) => self.compile_list(v),
            other => {
                // Everything else (Float/Char/other numeric kinds, or a
                // foreign `Value` the parser never actually produces) has
                // no dedicated fast-load opcode; fall back to the object
                // table, same as `$quote`'s payload.
                let idx = self.intern_object(other.clone());
                self.emit(Opcode::LdObj(idx), 1);
                Ok(())
            }
        }
    }

    fn compile_list(&mut self, v: &Value) -> Result<(), RuntimeError> {
        let items = to_vec(v);
        let head = items[0].clone();
        let args = &items[1..];

        if let Value::Symbol(sym) = &head {
            if *sym == reserved::set() {
                return self.compile_set(args);
            }
            if *sym == reserved::progn() {
                return self.compile_progn(args);
            }
            if *sym == reserved::quote() {
                return self.compile_quote(args);
            }
            if *sym == reserved::dot() {
                return self.compile_dot_access(args);
            }
            if *sym == reserved::if_() {
                return self.compile_if(args);
            }
            if *sym == reserved::list_lit() {
                return self.compile_list_lit(args);
            }
            if *sym == reserved::and_() {
                return self.compile_and(args);
            }
            if *sym == reserved::or_() {
                return self.compile_or(args);
            }
            if *sym == reserved::not_() {
                return self.compile_unary_op(args, Opcode::Not);
            }
            if *sym == reserved::is_() || *sym == reserved::eqeqeq() {
                return self.compile_binary_op(args, Opcode::Is);
            }
            if *sym == reserved::neeqeq() {
                return self.compile_is_not(args);
            }
            if *sym == reserved::eq_() {
                return self.compile_binary_op(args, Opcode::SuperEq);
            }
            if *sym == reserved::ne_() {
                return self.compile_binary_op(args, Opcode::SuperNe);
            }
            if *sym == reserved::lt_() {
                return self.compile_binary_op(args, Opcode::Lt);
            }
            if *sym == reserved::le_() {
                return self.compile_binary_op(args, Opcode::Le);
            }
            if *sym == reserved::gt_() {
                return self.compile_binary_op(args, Opcode::Gt);
            }
            if *sym == reserved::ge_() {
                return self.compile_binary_op(args, Opcode::Ge);
            }
            if *sym == intern("new") {
                return self.compile_new(args);
            }
            if *sym == intern(".") || *sym == intern(":") {
                return self.compile_binary_op(args, Opcode::NewPair);
            }
            if *sym == intern("##") {
                return self.compile_hashhash(args);
            }
        }

        self.compile_call(&head, args)
    }

    // ------------------------------------------------------------------
    // Special forms
    // ------------------------------------------------------------------

    /// `[$set lhs rhs]`: `lhs` is either a bare global name or a standalone
    /// `[$dot base name]` property target. Leaves the
    /// assigned value on the stack either way.
    fn compile_set(&mut self, args: &[Value]) -> Result<(), RuntimeError> {
        let (lhs, rhs) = (&args[0], &args[1]);
        match lhs {
            Value::Symbol(sym) => {
                self.compile_expr(rhs)?;
                self.emit(Opcode::StX(*sym), 0);
                Ok(())
            }
            Value::List(_) => {
                let target = to_vec(lhs);
                if target.len() == 3 && target[0] == Value::Symbol(reserved::dot()) {
                    let name = match &target[2] {
                        Value::Symbol(n) => *n,
                        _ => return Err(syntax_error("$set property target name was not a Symbol")),
                    };
                    self.compile_expr(&target[1])?;
                    self.compile_expr(rhs)?;
                    self.emit(Opcode::StProp(name), -1);
                    Ok(())
                } else {
                    Err(syntax_error("$set target was neither a Symbol nor a [$dot base name]"))
                }
            }
            _ => Err(syntax_error("$set target was neither a Symbol nor a [$dot base name]")),
        }
    }

    /// `[$progn [stmt..]]`: the wrapping shape every scope body and the
    /// whole program use.
    fn compile_progn(&mut self, args: &[Value]) -> Result<(), RuntimeError> {
        self.compile_progn_body(&args[0])
    }

    fn compile_progn_body(&mut self, stmts_tree: &Value) -> Result<(), RuntimeError> {
        let stmts = to_vec(stmts_tree);
        if stmts.is_empty() {
            self.emit(Opcode::LdNull, 1);
            return Ok(());
        }
        for (i, stmt) in stmts.iter().enumerate() {
            self.compile_expr(stmt)?;
            if i + 1 < stmts.len() {
                self.emit(Opcode::Pop(1), -1);
            }
        }
        Ok(())
    }

    /// `[$quote payload]`: push `payload` verbatim, never recursing into
    /// `compile_expr` for it.
    fn compile_quote(&mut self, args: &[Value]) -> Result<(), RuntimeError> {
        let idx = self.intern_object(args[0].clone());
        self.emit(Opcode::LdObj(idx), 1);
        Ok(())
    }

    /// `[$dot base name]` reached directly (not as a call head): a plain
    /// property read.
    fn compile_dot_access(&mut self, args: &[Value]) -> Result<(), RuntimeError> {
        let name = match &args[1] {
            Value::Symbol(n) => *n,
            _ => return Err(syntax_error("$dot property name was not a Symbol")),
        };
        self.compile_expr(&args[0])?;
        self.emit(Opcode::LdProp(name), 0);
        Ok(())
    }

    /// `[$if cond then]` / `[$if cond then else]`. Both arms
    /// compile as genuinely separate code, so `self.depth` is rewound to
    /// the post-condition depth before compiling the else arm — only one
    /// arm ever runs, but both were emitted, and the tracker must reflect
    /// the one true post-`if` depth rather than double-counting both.
    fn compile_if(&mut self, args: &[Value]) -> Result<(), RuntimeError> {
        self.compile_expr(&args[0])?;
        let bf_idx = self.emit(Opcode::Bf(0), -1);
        let branch_depth = self.depth;

        self.compile_expr(&args[1])?;
        let jmp_idx = self.emit(Opcode::Jmp(0), 0);
        self.patch_jump(bf_idx, self.here());

        self.depth = branch_depth;
        if args.len() == 3 {
            self.compile_expr(&args[2])?;
        } else {
            self.emit(Opcode::LdNull, 1);
        }
        self.patch_jump(jmp_idx, self.here());
        Ok(())
    }

    /// `[$list [item..]]`: a bracket literal.
    fn compile_list_lit(&mut self, args: &[Value]) -> Result<(), RuntimeError> {
        let items = to_vec(&args[0]);
        let n = items.len();
        for item in &items {
            self.compile_expr(item)?;
        }
        self.emit(Opcode::MakeList(n as u16), -(n as i32) + 1);
        Ok(())
    }

    /// `[and lhs rhs]`: short-circuit, leaving `lhs` if falsy, else `rhs`
    ///.
    fn compile_and(&mut self, args: &[Value]) -> Result<(), RuntimeError> {
        self.compile_expr(&args[0])?;
        self.emit(Opcode::Dup(1), 1);
        let bf_idx = self.emit(Opcode::Bf(0), -1);
        self.emit(Opcode::Pop(1), -1);
        self.compile_expr(&args[1])?;
        self.patch_jump(bf_idx, self.here());
        Ok(())
    }

    /// `[or lhs rhs]`: short-circuit, leaving `lhs` if truthy, else `rhs`.
    fn compile_or(&mut self, args: &[Value]) -> Result<(), RuntimeError> {
        self.compile_expr(&args[0])?;
        self.emit(Opcode::Dup(1), 1);
        let bt_idx = self.emit(Opcode::Bt(0), -1);
        self.emit(Opcode::Pop(1), -1);
        self.compile_expr(&args[1])?;
        self.patch_jump(bt_idx, self.here());
        Ok(())
    }

    fn compile_unary_op(&mut self, args: &[Value], op: Opcode) -> Result<(), RuntimeError> {
        self.compile_expr(&args[0])?;
        self.emit(op, 0);
        Ok(())
    }

    fn compile_binary_op(&mut self, args: &[Value], op: Opcode) -> Result<(), RuntimeError> {
        self.compile_expr(&args[0])?;
        self.compile_expr(&args[1])?;
        self.emit(op, -1);
        Ok(())
    }

    /// `[!== lhs rhs]`: no dedicated opcode exists for "not identical", so
    /// this lowers to `Is` followed by `Not` (`Is`/`SuperEq` already agree
    /// everywhere per `ops_struct::execute_equality`'s doc comment).
    fn compile_is_not(&mut self, args: &[Value]) -> Result<(), RuntimeError> {
        self.compile_binary_op(args, Opcode::Is)?;
        self.emit(Opcode::Not, 0);
        Ok(())
    }

    /// `[new members]` / `[new base members]`. `members`
    /// is a list of `[name value]` pairs; each compiles to a `LdSym`
    /// (the member name, pushed directly, no object-table round trip) then
    /// the value expression, matching `MakeObject`'s `(key, value)` stack
    /// contract (`ops_struct::execute_make`).
    fn compile_new(&mut self, args: &[Value]) -> Result<(), RuntimeError> {
        let (base, members_tree) = if args.len() == 2 {
            (Some(&args[0]), &args[1])
        } else {
            (None, &args[0])
        };
        match base {
            Some(b) => self.compile_expr(b)?,
            None => {
                self.emit(Opcode::LdNull, 1);
            }
        }
        let members = to_vec(members_tree);
        for member in &members {
            let pair = to_vec(member);
            let name = match &pair[0] {
                Value::Symbol(n) => *n,
                _ => return Err(syntax_error("'new' member name was not a Symbol")),
            };
            self.emit(Opcode::LdSym(name), 1);
            self.compile_expr(&pair[1])?;
        }
        self.emit(Opcode::MakeObject(members.len() as u16), -(2 * members.len() as i32));
        Ok(())
    }

    /// `[## lhs rhs]`: no intrinsic opcode backs
    /// this operator and no namespace registers a `##` method
    /// (`vm::builtins`), so it lowers to the same generic method dispatch
    /// as a user-named infix operator; using it at runtime on a value with
    /// no `##` property raises a property error.
    fn compile_hashhash(&mut self, args: &[Value]) -> Result<(), RuntimeError> {
        self.compile_expr(&args[0])?;
        self.compile_expr(&args[1])?;
        self.emit(Opcode::Met(intern("##"), 1), -1);
        Ok(())
    }

    /// Generic call/method dispatch: if
    /// `callee` is itself a standalone `[$dot base name]`, this is a method
    /// call (`Met`) on `base`; otherwise `callee` is compiled as an
    /// ordinary expression and invoked with `Call`. This one mechanism
    /// covers arithmetic-operator sugar, named-infix operators, namespace
    /// calls (`List.of 1 2 3`), and plain function calls alike, since they
    /// all share this tree shape.
    fn compile_call(&mut self, callee: &Value, args: &[Value]) -> Result<(), RuntimeError> {
        if let Value::List(_) = callee {
            let callee_items = to_vec(callee);
            if callee_items.len() == 3 && callee_items[0] == Value::Symbol(reserved::dot()) {
                let name = match &callee_items[2] {
                    Value::Symbol(n) => *n,
                    _ => return Err(syntax_error("call target's $dot name was not a Symbol")),
                };
                self.compile_expr(&callee_items[1])?;
                for a in args {
                    self.compile_expr(a)?;
                }
                self.emit(Opcode::Met(name, args.len() as u16), -(args.len() as i32));
                return Ok(());
            }
        }
        self.compile_expr(callee)?;
        for a in args {
            self.compile_expr(a)?;
        }
        self.emit(Opcode::Call(args.len() as u16), -(args.len() as i32));
        Ok(())
    }
}

fn syntax_error(msg: &str) -> RuntimeError {
    RuntimeError::SyntaxError(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::Closure;
    use crate::vm::{builtins, eval_run, EvalResult};

    fn run(source: &str) -> EvalResult {
        let parsed = crate::parser::parse(source, "test");
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let unit = compile(&parsed.tree, "test").expect("compile");
        let closure = Closure::new_global(unit.closure_info);
        builtins::install_globals(&closure);
        eval_run(unit.segment, closure)
    }

    #[test]
    fn compiles_integer_literal() {
        assert_eq!(run("42"), EvalResult::Value(Value::int64(42)));
    }

    #[test]
    fn compiles_arithmetic_lowering_from_spec_scenario_1() {
        // 1 + 2 * 3
        assert_eq!(run("1 + 2 * 3"), EvalResult::Value(Value::int64(7)));
    }

    #[test]
    fn compiles_global_set_and_lookup() {
        assert_eq!(run("x = 5\nx + 1"), EvalResult::Value(Value::int64(6)));
    }

    // `$if` has no built-in surface keyword, so
    // these tests build its tree directly rather than parsing source text.
    fn run_tree(tree: Value) -> EvalResult {
        let wrapped = crate::value::pair_list::list_of(&[Value::Symbol(reserved::progn()), crate::value::pair_list::list_of(&[tree])]);
        let unit = compile(&wrapped, "test").expect("compile");
        let closure = Closure::new_global(unit.closure_info);
        builtins::install_globals(&closure);
        eval_run(unit.segment, closure)
    }

    fn if_tree(cond: Value, then: Value, els: Option<Value>) -> Value {
        let mut items = vec![Value::Symbol(reserved::if_()), cond, then];
        if let Some(e) = els {
            items.push(e);
        }
        crate::value::pair_list::list_of(&items)
    }

    #[test]
    fn compiles_if_then_else() {
        assert_eq!(
            run_tree(if_tree(Value::bool(true), Value::int64(1), Some(Value::int64(2)))),
            EvalResult::Value(Value::int64(1))
        );
        assert_eq!(
            run_tree(if_tree(Value::bool(false), Value::int64(1), Some(Value::int64(2)))),
            EvalResult::Value(Value::int64(2))
        );
    }

    #[test]
    fn compiles_if_without_else_to_null() {
        assert_eq!(
            run_tree(if_tree(Value::bool(false), Value::int64(1), None)),
            EvalResult::Value(Value::Null)
        );
    }

    #[test]
    fn compiles_and_or_short_circuit() {
        let and_tree = crate::value::pair_list::list_of(&[Value::Symbol(reserved::and_()), Value::bool(true), Value::bool(false)]);
        assert_eq!(run_tree(and_tree), EvalResult::Value(Value::Bool(false)));
        let or_tree = crate::value::pair_list::list_of(&[Value::Symbol(reserved::or_()), Value::bool(false), Value::int64(9)]);
        assert_eq!(run_tree(or_tree), EvalResult::Value(Value::int64(9)));
    }

    #[test]
    fn compiles_bracket_list_literal() {
        let result = run("[1, 2, 3]");
        match result {
            EvalResult::Value(v) => {
                assert_eq!(to_vec(&v), vec![Value::int64(1), Value::int64(2), Value::int64(3)]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn compiles_juxtaposition_call_matching_spec_scenario_2() {
        let result = run("List.of 1 2 3");
        match result {
            EvalResult::Value(v) => {
                assert_eq!(to_vec(&v), vec![Value::int64(1), Value::int64(2), Value::int64(3)]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn compiles_new_block_with_base() {
        let result = run("a = new { x: 1 }\nb = new a { y: 2 }\nb.x");
        assert_eq!(result, EvalResult::Value(Value::int64(1)));
    }

    #[test]
    fn compiles_comparison_operators() {
        assert_eq!(run("1 < 2"), EvalResult::Value(Value::Bool(true)));
        assert_eq!(run("1 === 1"), EvalResult::Value(Value::Bool(true)));
        assert_eq!(run("1 !== 2"), EvalResult::Value(Value::Bool(true)));
    }
}



