//! Crate-level property-style invariants over strings, integers,
//! timestamps, and custom-syntax tables, expressed as example-based Rust
//! tests — no `proptest`/`quickcheck` dependency is introduced, matching
//! the rest of the retrieval pack.

use smile::string::SmileString;
use smile::value::numeric::{ByteValue, Int16Value, Int64Value};
use smile::value::pair_list::to_vec;
use smile::value::{Timestamp, Value};
use smile::vm::EvalResult;

fn run(source: &str) -> EvalResult {
    smile::run_source(source, "test").expect("compiles")
}

// ---- strings ----------------------------------------------------------

#[test]
fn byte_at_matches_raw_bytes_and_trailing_nul() {
    let s = SmileString::from_str("hello");
    for i in 0..s.length() {
        assert_eq!(s.byte_at(i), s.as_bytes()[i]);
    }
    // Length, not NUL, bounds all operations — the backing buffer still
    // carries a trailing NUL one past `length`.
    assert_eq!(s.as_bytes().len(), s.length());
}

#[test]
fn reverse_bytes_round_trips() {
    let s = SmileString::from_str("hello, world");
    assert_eq!(s.reverse_bytes().reverse_bytes().as_bytes(), s.as_bytes());
}

#[test]
fn reverse_utf8_round_trips_multibyte_sequences() {
    let s = SmileString::from_str("héllo wörld 日本語");
    assert_eq!(s.reverse_utf8().reverse_utf8().to_string_lossy(), s.to_string_lossy());
}

#[test]
fn compare_is_anticommutative_and_reflexive() {
    let a = SmileString::from_str("apple");
    let b = SmileString::from_str("banana");
    assert_eq!(a.compare(&a), std::cmp::Ordering::Equal);
    assert_eq!(a.compare(&b), b.compare(&a).reverse());
}

// ---- integers -----------------------------------------------------------

#[test]
fn int64_round_trips_through_string_and_parse_across_bases() {
    for &base in &[2u32, 8, 10, 16, 36] {
        for &n in &[0i64, 1, -1, 42, -42, 123456789, i64::MIN + 1, i64::MAX] {
            let v = Int64Value(n);
            let s = v.to_string_radix(base).to_string_lossy();
            let parsed = Int64Value::parse(&s, base).unwrap();
            assert_eq!(parsed, v, "base {} round-trip of {}", base, n);
        }
    }
}

#[test]
fn int64_addition_of_negation_is_zero() {
    for &n in &[0i64, 1, -1, 1000, -1000, i64::MIN + 1] {
        let v = Int64Value(n);
        let neg = Int64Value(0).sub(v);
        assert_eq!(v.add(neg), Int64Value(0));
    }
}

#[test]
fn int64_div_mod_identity_and_mod_sign_follows_divisor() {
    for &(x, y) in &[(7i64, 3i64), (-7, 3), (7, -3), (-7, -3), (10, 5), (-10, 3)] {
        let xv = Int64Value(x);
        let yv = Int64Value(y);
        let q = xv.div(yv, true).unwrap();
        let m = xv.op_mod(yv, true).unwrap();
        assert_eq!(q.mul(yv).add(Int64Value(0).sub(xv)), Int64Value(0).sub(m.sub(Int64Value(0))));
        let m_val = xv.op_mod(yv, true).unwrap().0;
        if m_val != 0 {
            assert_eq!(m_val.signum(), y.signum(), "mod result must take the divisor's sign");
        }
    }
}

#[test]
fn int16_and_byte_round_trip_through_string_and_parse() {
    for &n in &[0i16, 1, -1, 32767, -32768] {
        let v = Int16Value(n);
        let s = v.to_string_radix(10).to_string_lossy();
        assert_eq!(Int16Value::parse(&s, 10).unwrap(), v);
    }
    for &n in &[0u8, 1, 255, 128] {
        let v = ByteValue(n);
        let s = v.to_string_radix(10).to_string_lossy();
        assert_eq!(ByteValue::parse(&s, 10).unwrap(), v);
    }
}

// ---- timestamps ---------------------------------------------------------

#[test]
fn timestamp_decomposition_round_trips_for_representative_dates() {
    let cases = [
        (2021i64, 6u32, 15u32, 12u32, 34u32, 56u32),
        (2000, 2, 29, 0, 0, 0),  // leap year, divisible by 400
        (1900, 2, 28, 23, 59, 59), // not a leap year (divisible by 100, not 400)
        (1970, 1, 1, 0, 0, 0),
        (-5, 12, 31, 0, 0, 0),
    ];
    for (y, mo, d, h, mi, s) in cases {
        let ts = Timestamp::from_fields(y, mo, d, h, mi, s, 0).expect("valid date");
        let fields = ts.to_fields();
        assert_eq!((fields.year, fields.month, fields.day, fields.hour, fields.minute, fields.second), (y, mo, d, h, mi, s));
    }
}

// ---- custom syntax ------------------------------------------------------

#[test]
fn syntax_table_extension_is_monotone_for_unrelated_input() {
    use smile::symbol::intern;
    use smile::syntax::{insert_rule, PatternElem, Repetition, Separator, SyntaxTable};

    let mut t1 = SyntaxTable::new();
    // T1 parses plain arithmetic fine with no custom rules installed.
    let baseline = smile::parser::parse("1 + 2", "test");
    assert!(baseline.diagnostics.is_empty());

    insert_rule(
        &mut t1,
        intern("STMT"),
        &[PatternElem::Terminal(intern("loudly")), PatternElem::Nonterminal {
            class: intern("EXPR"),
            binding: Some(intern("x")),
            repetition: Repetition::None,
            separator: Separator::None,
        }],
        Value::Symbol(intern("ok")),
        vec![intern("x")],
    )
    .expect("unrelated rule installs cleanly");

    // Parsing "1 + 2" is unaffected by a sibling rule that never matches
    // its input: every input parseable before a rule insertion stays
    // parseable afterward and yields the same tree, unless the new rule
    // specifically matches.
    let after = smile::parser::parse("1 + 2", "test");
    assert_eq!(after.tree, baseline.tree);
}

#[test]
fn cyclic_left_recursive_nonterminal_is_rejected_without_mutation() {
    use smile::symbol::intern;
    use smile::syntax::{insert_rule, PatternElem, Repetition, Separator, SyntaxTable};

    let mut table = SyntaxTable::new();
    let a = intern("A-CLASS");
    let b = intern("B-CLASS");

    // A -> B ...
    insert_rule(
        &mut table,
        a,
        &[
            PatternElem::Nonterminal { class: b, binding: Some(intern("x")), repetition: Repetition::None, separator: Separator::None },
            PatternElem::Terminal(intern("tail")),
        ],
        Value::Symbol(intern("ok")),
        vec![intern("x")],
    )
    .expect("A -> B installs cleanly");

    let before = format!("{:?}", table.class(b));

    // B -> A ... would close the cycle A -> B -> A.
    let err = insert_rule(
        &mut table,
        b,
        &[
            PatternElem::Nonterminal { class: a, binding: Some(intern("y")), repetition: Repetition::None, separator: Separator::None },
            PatternElem::Terminal(intern("tail2")),
        ],
        Value::Symbol(intern("bad")),
        vec![intern("y")],
    )
    .expect_err("cyclic nonterminal chain must be rejected");
    assert_eq!(err, smile::syntax::SyntaxError::CyclicNonterminal);

    let after = format!("{:?}", table.class(b));
    assert_eq!(before, after, "rejected insertion must not mutate the table");
}

// ---- determinism ---------------------------------------------------------

#[test]
fn running_a_compiled_function_twice_yields_identical_results() {
    let (unit, _) = smile::compile_source("1 + 2 * 3", "test").expect("compiles");
    let first = smile::eval_run(&unit);
    let second = smile::eval_run(&unit);
    assert_eq!(first, second);
}

#[test]
fn list_of_builds_expected_elements_deterministically() {
    match run("List.of 1 2 3") {
        EvalResult::Value(v) => assert_eq!(to_vec(&v), vec![Value::int64(1), Value::int64(2), Value::int64(3)]),
        other => panic!("unexpected: {:?}", other),
    }
}
