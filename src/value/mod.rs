//! # Value — the tagged runtime object
//!
//! Every value flowing through the interpreter is one variant of [`Value`],
//! tagged by a [`Kind`]. Rather than a C-style vtable of function pointers
//! per kind, each variant carries its own payload type and dispatch happens
//! through a single `match` in the methods below — the natural Rust
//! rendition of "one capability set per kind" that a sum type gives for
//! free, in the same spirit as the runtime's own `Value` enum (`value.rs`),
//! just with a much larger variant set.

pub mod bytearray;
pub mod function;
pub mod numeric;
pub mod pair_list;
pub mod timestamp;
pub mod userobject;

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::string::SmileString;
use crate::symbol::Symbol;

pub use bytearray::ByteArray;
pub use function::{Function, NativeFunction, UserFunction};
pub use numeric::{
    BigIntValue, ByteValue, Float32Value, Float64Value, Float128Value, Int16Value, Int32Value,
    Int64Value, Int128Value, Real32Value, Real64Value, Real128Value,
};
pub use pair_list::{ConsCell, Pair};
pub use timestamp::Timestamp;
pub use userobject::UserObject;

/// The tag selecting a [`Value`]'s payload and capability set. `Unboxed*`
/// variants mirror their boxed counterparts and are used only to describe
/// operand-stack slot layout; on the stack itself every slot holds a plain
/// [`Value`], so the interpreter never constructs an `Unboxed*` tag — it
/// exists here purely so [`Value::kind`] can report what the bytecode
/// compiler assumed when a slot was declared unboxed.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Kind {
    Null,
    Bool,
    Byte,
    Int16,
    Int32,
    Int64,
    Int128,
    Real32,
    Real64,
    Real128,
    Float32,
    Float64,
    Float128,
    BigInt,
    BigReal,
    BigFloat,
    Symbol,
    Char,
    Uni,
    String,
    Pair,
    List,
    Function,
    UserObject,
    Syntax,
    Nonterminal,
    ByteArray,
    Timestamp,
    UnboxedByte,
    UnboxedInt16,
    UnboxedInt32,
    UnboxedInt64,
    UnboxedInt128,
    UnboxedReal32,
    UnboxedReal64,
    UnboxedReal128,
    UnboxedFloat32,
    UnboxedFloat64,
    UnboxedFloat128,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "Null",
            Kind::Bool => "Bool",
            Kind::Byte => "Byte",
            Kind::Int16 => "Int16",
            Kind::Int32 => "Int32",
            Kind::Int64 => "Int64",
            Kind::Int128 => "Int128",
            Kind::Real32 => "Real32",
            Kind::Real64 => "Real64",
            Kind::Real128 => "Real128",
            Kind::Float32 => "Float32",
            Kind::Float64 => "Float64",
            Kind::Float128 => "Float128",
            Kind::BigInt => "BigInt",
            Kind::BigReal => "BigReal",
            Kind::BigFloat => "BigFloat",
            Kind::Symbol => "Symbol",
            Kind::Char => "Char",
            Kind::Uni => "Uni",
            Kind::String => "String",
            Kind::Pair => "Pair",
            Kind::List => "List",
            Kind::Function => "Function",
            Kind::UserObject => "UserObject",
            Kind::Syntax => "Syntax",
            Kind::Nonterminal => "Nonterminal",
            Kind::ByteArray => "ByteArray",
            Kind::Timestamp => "Timestamp",
            Kind::UnboxedByte => "UnboxedByte",
            Kind::UnboxedInt16 => "UnboxedInt16",
            Kind::UnboxedInt32 => "UnboxedInt32",
            Kind::UnboxedInt64 => "UnboxedInt64",
            Kind::UnboxedInt128 => "UnboxedInt128",
            Kind::UnboxedReal32 => "UnboxedReal32",
            Kind::UnboxedReal64 => "UnboxedReal64",
            Kind::UnboxedReal128 => "UnboxedReal128",
            Kind::UnboxedFloat32 => "UnboxedFloat32",
            Kind::UnboxedFloat64 => "UnboxedFloat64",
            Kind::UnboxedFloat128 => "UnboxedFloat128",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A syntax-rule pattern element that recursively matches another syntax
/// class and binds a variable for template substitution at parse time.
/// Lightweight enough to live inline on `Value` rather than behind an `Rc`,
/// since nonterminal nodes are small and cloned no more often than any
/// other parse-tree fragment.
#[derive(Clone, Debug, PartialEq)]
pub struct Nonterminal {
    pub class: Symbol,
    pub binding: Option<Symbol>,
}

/// A compiled custom-syntax table, opaque to the VM outside the parser and
/// compiler (which hold it via [`crate::syntax::SyntaxTable`]). Wrapped here
/// only so a `Syntax` value can be passed around and stored in variables
/// like any other first-class object.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntaxHandle(pub Rc<crate::syntax::SyntaxTable>);

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(ByteValue),
    Int16(Int16Value),
    Int32(Int32Value),
    Int64(Int64Value),
    Int128(Int128Value),
    Real32(Real32Value),
    Real64(Real64Value),
    Real128(Real128Value),
    Float32(Float32Value),
    Float64(Float64Value),
    Float128(Float128Value),
    BigInt(BigIntValue),
    Symbol(Symbol),
    Char(u8),
    Uni(u32),
    String(Rc<SmileString>),
    Pair(Rc<Pair>),
    List(Rc<ConsCell>),
    Function(Rc<Function>),
    UserObject(Rc<std::cell::RefCell<UserObject>>),
    Syntax(SyntaxHandle),
    Nonterminal(Rc<Nonterminal>),
    ByteArray(Rc<std::cell::RefCell<ByteArray>>),
    Timestamp(Timestamp),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Byte(_) => Kind::Byte,
            Value::Int16(_) => Kind::Int16,
            Value::Int32(_) => Kind::Int32,
            Value::Int64(_) => Kind::Int64,
            Value::Int128(_) => Kind::Int128,
            Value::Real32(_) => Kind::Real32,
            Value::Real64(_) => Kind::Real64,
            Value::Real128(_) => Kind::Real128,
            Value::Float32(_) => Kind::Float32,
            Value::Float64(_) => Kind::Float64,
            Value::Float128(_) => Kind::Float128,
            Value::BigInt(_) => Kind::BigInt,
            Value::Symbol(_) => Kind::Symbol,
            Value::Char(_) => Kind::Char,
            Value::Uni(_) => Kind::Uni,
            Value::String(_) => Kind::String,
            Value::Pair(_) => Kind::Pair,
            Value::List(_) => Kind::List,
            Value::Function(_) => Kind::Function,
            Value::UserObject(_) => Kind::UserObject,
            Value::Syntax(_) => Kind::Syntax,
            Value::Nonterminal(_) => Kind::Nonterminal,
            Value::ByteArray(_) => Kind::ByteArray,
            Value::Timestamp(_) => Kind::Timestamp,
        }
    }

    // ---- constructors ---------------------------------------------------

    pub fn int64(v: i64) -> Value {
        Value::Int64(Int64Value::new(v))
    }

    pub fn int32(v: i32) -> Value {
        Value::Int32(Int32Value::new(v))
    }

    pub fn byte(v: u8) -> Value {
        Value::Byte(ByteValue(v))
    }

    pub fn bool(v: bool) -> Value {
        Value::Bool(v)
    }

    pub fn from_str(s: &str) -> Value {
        Value::String(Rc::new(SmileString::from_str(s)))
    }

    pub fn symbol(sym: Symbol) -> Value {
        Value::Symbol(sym)
    }

    pub fn list(items: &[Value]) -> Value {
        pair_list::list_of(items)
    }

    // ---- capability dispatch --------------------------------------------

    /// Truthiness, used by every conditional opcode. Only `Null`, `false`,
    /// and numeric zero are falsy; everything else, including the empty
    /// string, is truthy (unlike most scripting languages — matches the
    /// "everything is truthy except explicitly-false things" rule common to
    /// Lisp-family dynamic languages).
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Byte(b) => b.to_bool(),
            Value::Int16(n) => n.to_bool(),
            Value::Int32(n) => n.to_bool(),
            Value::Int64(n) => n.to_bool(),
            Value::Int128(n) => n.to_bool(),
            Value::Real32(n) => n.0 != 0.0,
            Value::Real64(n) => n.0 != 0.0,
            Value::Real128(n) => n.0 != 0.0,
            Value::Float32(n) => n.0 != 0.0,
            Value::Float64(n) => n.0 != 0.0,
            Value::Float128(n) => n.0 != 0.0,
            Value::BigInt(n) => n.0 != 0,
            _ => true,
        }
    }

    /// Textual rendering used by string interpolation and the REPL's
    /// result-echo. Cycle-unsafe for self-referential lists/objects by
    /// design: the compiler and VM never construct a cyclic structure
    /// through ordinary evaluation, and the one place user code could
    /// (mutating a `ByteArray`'s sibling `UserObject` property to point
    /// back at itself) is expected to use `describe` instead, which does
    /// track a seen-set.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Byte(b) => b.0.to_string(),
            Value::Int16(n) => n.0.to_string(),
            Value::Int32(n) => n.0.to_string(),
            Value::Int64(n) => n.0.to_string(),
            Value::Int128(n) => n.0.to_string(),
            Value::Real32(n) => n.0.to_string(),
            Value::Real64(n) => n.0.to_string(),
            Value::Real128(n) => n.0.to_string(),
            Value::Float32(n) => n.0.to_string(),
            Value::Float64(n) => n.0.to_string(),
            Value::Float128(n) => n.0.to_string(),
            Value::BigInt(n) => n.0.to_string(),
            Value::Symbol(s) => s.name(),
            Value::Char(c) => (*c as char).to_string(),
            Value::Uni(c) => char::from_u32(*c).unwrap_or('\u{FFFD}').to_string(),
            Value::String(s) => s.to_string_lossy(),
            Value::Pair(p) => format!(
                "({} . {})",
                p.left.to_display_string(),
                p.right.to_display_string()
            ),
            Value::List(_) => {
                let items = pair_list::to_vec(self);
                let rendered: Vec<String> = items.iter().map(Value::to_display_string).collect();
                format!("[{}]", rendered.join(" "))
            }
            Value::Function(func) => format!("<function {}>", func.name()),
            Value::UserObject(_) => "<object>".to_string(),
            Value::Syntax(_) => "<syntax>".to_string(),
            Value::Nonterminal(n) => format!("<nonterminal {}>", n.class.name()),
            Value::ByteArray(b) => format!("<bytearray {} bytes>", b.borrow().len()),
            Value::Timestamp(t) => t.to_iso8601(),
        }
    }

    /// `compareEqual`: reflexive and symmetric for all kinds, consistent
    /// with [`Value::hash`] (invariant 3). Numeric kinds compare across
    /// width (an `Int16` equals an equal-valued `Int64`); everything else
    /// requires matching kinds.
    pub fn compare_equal(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (Uni(a), Uni(b)) => a == b,
            (Symbol(a), Symbol(b)) => a == b,
            (String(a), String(b)) => a.equals(b),
            (Pair(a), Pair(b)) => a.left.compare_equal(&b.left) && a.right.compare_equal(&b.right),
            (List(_), List(_)) | (List(_), Null) | (Null, List(_)) => {
                let a = pair_list::to_vec(self);
                let b = pair_list::to_vec(other);
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.compare_equal(y))
            }
            (Timestamp(a), Timestamp(b)) => a == b,
            (ByteArray(a), ByteArray(b)) => *a.borrow() == *b.borrow(),
            (UserObject(a), UserObject(b)) => Rc::ptr_eq(a, b),
            (Function(a), Function(b)) => Rc::ptr_eq(a, b),
            _ if self.is_numeric() && other.is_numeric() => {
                self.to_f64_lossy() == other.to_f64_lossy()
            }
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Byte(_)
            | Value::Int16(_)
            | Value::Int32(_)
            | Value::Int64(_)
            | Value::Int128(_)
            | Value::Real32(_)
            | Value::Real64(_)
            | Value::Real128(_)
            | Value::Float32(_)
            | Value::Float64(_)
            | Value::Float128(_)
            | Value::BigInt(_)
        )
    }

    /// Lossy numeric coercion used only by cross-kind `compareEqual` and
    /// default ordering; never used for arithmetic, which always operates
    /// on a single concrete numeric kind decided at compile time.
    fn to_f64_lossy(&self) -> f64 {
        match self {
            Value::Byte(n) => n.0 as f64,
            Value::Int16(n) => n.0 as f64,
            Value::Int32(n) => n.0 as f64,
            Value::Int64(n) => n.0 as f64,
            Value::Int128(n) => n.0 as f64,
            Value::Real32(n) => n.0 as f64,
            Value::Real64(n) => n.0,
            Value::Real128(n) => n.0,
            Value::Float32(n) => n.0 as f64,
            Value::Float64(n) => n.0,
            Value::Float128(n) => n.0,
            Value::BigInt(n) => n.0 as f64,
            _ => 0.0,
        }
    }

    /// `hash`: consistent with [`Value::compare_equal`] (invariant 3).
    pub fn hash(&self) -> u64 {
        match self {
            Value::Null => 0,
            Value::Bool(b) => *b as u64,
            Value::Byte(n) => n.0 as u64,
            Value::Int16(n) => n.hash32() as u64,
            Value::Int32(n) => n.hash32() as u64,
            Value::Int64(n) => n.hash32() as u64,
            Value::Int128(n) => n.hash32() as u64,
            Value::Symbol(s) => s.id() as u64,
            Value::Char(c) => *c as u64,
            Value::Uni(c) => *c as u64,
            Value::String(s) => s.hash64(),
            _ => 0,
        }
    }

    pub fn partial_cmp_numeric(&self, other: &Value) -> Option<Ordering> {
        if self.is_numeric() && other.is_numeric() {
            self.to_f64_lossy().partial_cmp(&other.to_f64_lossy())
        } else {
            None
        }
    }

    /// Property access: only `UserObject` carries properties directly, but
    /// `String`/`List`/`ByteArray` expose a handful of pseudo-properties
    /// (`length`, etc.) resolved by the VM's property-access opcode before
    /// it ever calls this; this method covers the `UserObject` case only.
    pub fn get_property(&self, key: Symbol) -> Result<Value, RuntimeError> {
        match self {
            Value::UserObject(obj) => Ok(obj.borrow().get_property(key).unwrap_or(Value::Null)),
            Value::Timestamp(ts) => {
                let fields = ts.to_fields();
                match key.name().as_str() {
                    "year" => Ok(Value::int64(fields.year)),
                    "month" => Ok(Value::int64(fields.month as i64)),
                    "day" => Ok(Value::int64(fields.day as i64)),
                    "hour" => Ok(Value::int64(fields.hour as i64)),
                    "minute" => Ok(Value::int64(fields.minute as i64)),
                    "second" => Ok(Value::int64(fields.second as i64)),
                    "day_of_year" => Ok(Value::int64(fields.day_of_year as i64)),
                    "leap_year" => Ok(Value::Bool(fields.leap_year)),
                    "string" => Ok(Value::from_str(&ts.to_iso8601())),
                    other => Err(RuntimeError::PropertyError(format!(
                        "Timestamp has no property '{}'",
                        other
                    ))),
                }
            }
            _ => Err(RuntimeError::TypeError(format!(
                "cannot read property '{}' of a {}",
                key.name(),
                self.kind()
            ))),
        }
    }

    pub fn set_property(&self, key: Symbol, value: Value) -> Result<(), RuntimeError> {
        match self {
            Value::UserObject(obj) => obj.borrow_mut().set_property(key, value),
            _ => Err(RuntimeError::TypeError(format!(
                "cannot write property '{}' of a {}",
                key.name(),
                self.kind()
            ))),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.compare_equal(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_rules() {
        assert!(!Value::Null.to_bool());
        assert!(!Value::bool(false).to_bool());
        assert!(!Value::int64(0).to_bool());
        assert!(Value::int64(1).to_bool());
        assert!(Value::from_str("").to_bool());
    }

    #[test]
    fn compare_equal_is_reflexive_and_symmetric() {
        let a = Value::int64(42);
        let b = Value::int32(42);
        assert!(a.compare_equal(&a));
        assert!(a.compare_equal(&b));
        assert!(b.compare_equal(&a));
    }

    #[test]
    fn compare_equal_distinguishes_kinds_for_non_numerics() {
        let s = Value::from_str("x");
        let sym = Value::Symbol(crate::symbol::intern("x"));
        assert!(!s.compare_equal(&sym));
    }

    #[test]
    fn lists_compare_structurally() {
        let a = pair_list::list_of(&[Value::int64(1), Value::int64(2)]);
        let b = pair_list::list_of(&[Value::int64(1), Value::int64(2)]);
        assert!(a.compare_equal(&b));
    }

    #[test]
    fn display_renders_lists_and_pairs() {
        let list = pair_list::list_of(&[Value::int64(1), Value::int64(2)]);
        assert_eq!(list.to_display_string(), "[1 2]");

        let pair = Value::Pair(Rc::new(Pair::new(Value::int64(1), Value::int64(2))));
        assert_eq!(pair.to_display_string(), "(1. 2)");
    }
}



