//! Crate-level integration tests for Smile's headline end-to-end
//! scenarios: arithmetic lowering, list construction, custom syntax,
//! syntax-rule ambiguity rejection, exception propagation, and timestamp
//! round-tripping. Scenarios exercised purely through the surface
//! language go through the public embedding API
//! (`smile::run_source`/`smile::compile_source`); the exception
//! propagation scenario (nested calls surfacing a thrown object) is built
//! directly against the `vm`/`closure`/`bytecode`/`value` API since the
//! surface grammar has no `Throw { ... }` literal syntax yet (the
//! custom-syntax engine is how a real Smile program would spell it),
//! matching how `src/vm/tests.rs` already exercises the same opcode.

use std::rc::Rc;

use smile::bytecode::{ByteCode, ByteCodeSegment, CompiledTables, Opcode};
use smile::closure::{Closure, ClosureInfo};
use smile::symbol::intern;
use smile::value::pair_list::to_vec;
use smile::value::{Function, UserFunction, UserObject, Value};
use smile::vm::{eval_run, EvalResult};

fn run(source: &str) -> EvalResult {
    match smile::run_source(source, "test") {
        Ok(result) => result,
        Err(e) => panic!("compile_source failed: {}", e),
    }
}

/// Scenario 1: arithmetic lowering, `1 + 2 * 3` → `Int64(7)`.
#[test]
fn scenario_1_arithmetic_lowering() {
    assert_eq!(run("1 + 2 * 3"), EvalResult::Value(Value::int64(7)));
}

/// Scenario 2: list construction, `List.of 1 2 3` and `List.cons 1 [2, 3]`.
#[test]
fn scenario_2_list_construction() {
    match run("List.of 1 2 3") {
        EvalResult::Value(v) => {
            assert_eq!(to_vec(&v), vec![Value::int64(1), Value::int64(2), Value::int64(3)]);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    match run("List.cons 1 [2, 3]") {
        EvalResult::Value(v) => {
            assert_eq!(to_vec(&v), vec![Value::int64(1), Value::int64(2), Value::int64(3)]);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

/// Scenario 3: a `#syntax STMT` rule declared in one parse is visible
/// within that parse, and the same source parsed fresh (a sibling scope
/// that never saw the rule) is a parse error.
#[test]
fn scenario_3_custom_syntax_scoped_to_its_declaration() {
    let with_rule = "#syntax STMT: [my-if [EXPR c] then [STMT t] else [STMT e]] => [$if c t e]\nmy-if x then 1 else 2";
    let out = smile::parser::parse(with_rule, "test");
    assert!(
        out.diagnostics.iter().all(|d| d.severity < smile::error::Severity::Error),
        "unexpected diagnostics: {:?}",
        out.diagnostics
    );

    let without_rule = smile::parser::parse("my-if x then 1 else 2", "test");
    assert!(without_rule.diagnostics.iter().any(|d| d.severity >= smile::error::Severity::Error));
}

/// Scenario 4: two rules in one class whose second pattern element is a
/// nonterminal in one rule and a terminal in the other is rejected, and
/// the table is left unchanged.
#[test]
fn scenario_4_ambiguous_fork_is_rejected_without_mutation() {
    use smile::syntax::{PatternElem, Repetition, Separator, SyntaxTable};

    let foo = intern("FOO");
    let expr = intern("EXPR");
    let mut table = SyntaxTable::new();

    // First rule: `[bar baz]` — second element a terminal.
    let terminal_second = vec![PatternElem::Terminal(intern("bar")), PatternElem::Terminal(intern("baz"))];
    smile::syntax::insert_rule(&mut table, foo, &terminal_second, Value::Symbol(intern("ok")), vec![])
        .expect("first rule installs cleanly");

    let before = format!("{:?}", table.class(foo));

    // Second rule: `[bar EXPR]` — second element a nonterminal, conflicting
    // with the already-installed terminal sibling.
    let nonterminal_second = vec![
        PatternElem::Terminal(intern("bar")),
        PatternElem::Nonterminal {
            class: expr,
            binding: Some(intern("x")),
            repetition: Repetition::None,
            separator: Separator::None,
        },
    ];
    let err = smile::syntax::insert_rule(&mut table, foo, &nonterminal_second, Value::Symbol(intern("bad")), vec![intern("x")])
        .expect_err("conflicting terminal/nonterminal fork must be rejected");
    assert_eq!(err, smile::syntax::SyntaxError::AmbiguousNonterminalFork);

    let after = format!("{:?}", table.class(foo));
    assert_eq!(before, after, "rejected insertion must not mutate the table");
}

fn leaf_closure_info() -> Rc<ClosureInfo> {
    Rc::new(ClosureInfo {
        parent: None,
        global: None,
        kind: smile::closure::ClosureKind::Local,
        num_variables: 0,
        num_arguments: 0,
        temp_size: 4,
        names: Vec::new(),
    })
}

fn user_function_value(objects: Vec<Value>, code: Vec<ByteCode>) -> Value {
    let mut tables = CompiledTables::new();
    tables.objects = objects;
    let segment = Rc::new(ByteCodeSegment::new(Rc::new(tables), code));
    let function = UserFunction {
        name: None,
        info: leaf_closure_info(),
        segment,
        lexical_env: None,
    };
    Value::Function(Rc::new(Function::User(function)))
}

/// Scenario 5: a function executing `Throw { kind: #err, message: "boom" }`
/// inside two nested calls surfaces as `EvalResult::Exception` with the
/// thrown object's fields intact. Built directly from real `Call`/`Throw`
/// bytecode (two levels of `Call(0)` wrapping the throwing leaf) since the
/// surface grammar has no `Throw {...}` literal yet.
#[test]
fn scenario_5_exception_propagates_through_nested_calls() {
    let mut exc = UserObject::new();
    exc.define(intern("kind"), Value::Symbol(intern("err")));
    exc.define(intern("message"), Value::from_str("boom"));
    let exc_value = Value::UserObject(Rc::new(std::cell::RefCell::new(exc)));

    let innermost = user_function_value(
        vec![exc_value.clone()],
        vec![ByteCode::new(Opcode::LdObj(0), 0), ByteCode::new(Opcode::Throw, 0)],
    );
    let middle = user_function_value(
        vec![innermost],
        vec![
            ByteCode::new(Opcode::LdObj(0), 0),
            ByteCode::new(Opcode::Call(0), 0),
            ByteCode::new(Opcode::Ret, 0),
        ],
    );
    let outer_tables = {
        let mut tables = CompiledTables::new();
        tables.objects = vec![middle];
        tables
    };
    let outer_code = vec![
        ByteCode::new(Opcode::LdObj(0), 0),
        ByteCode::new(Opcode::Call(0), 0),
        ByteCode::new(Opcode::Ret, 0),
    ];
    let outer_segment = Rc::new(ByteCodeSegment::new(Rc::new(outer_tables), outer_code));
    let outer_closure = Closure::new_global(ClosureInfo::global(0, 4));

    match eval_run(outer_segment, outer_closure) {
        EvalResult::Exception(v) => {
            assert_eq!(v.get_property(intern("kind")).unwrap(), Value::Symbol(intern("err")));
            assert_eq!(v.get_property(intern("message")).unwrap(), Value::from_str("boom"));
        }
        other => panic!("expected EvalResult::Exception, got {:?}", other),
    }
}

/// Scenario 6: `Timestamp.parse "2021-06-15T12:34:56.789Z"` then `.string`
/// round-trips exactly; `.year == 2021`, `.day_of_year == 166`.
#[test]
fn scenario_6_timestamp_round_trip() {
    let ts = smile::value::Timestamp::parse_iso8601("2021-06-15T12:34:56.789Z").expect("parses");
    assert_eq!(ts.to_iso8601(), "2021-06-15T12:34:56.789Z");
    let fields = ts.to_fields();
    assert_eq!(fields.year, 2021);
    assert_eq!(fields.day_of_year, 166);
}
