//! # Per-Kind Numeric Dispatch
//!
//! The same-kind arithmetic/bitwise/comparison table backing the
//! `ops_arith.rs` opcode handlers. Kept separate from
//! `ops_arith.rs` itself so the opcode layer stays a thin pop/push
//! wrapper and the "which numeric kinds does this operator accept, and
//! how do the widths line up" question lives in one place — mirroring
//! how the reference runtime keeps its per-opcode handler (`ops_arith.rs`) thin and
//! pushes shared numeric coercion into its own helpers.

use crate::error::RuntimeError;
use crate::value::numeric::*;
use crate::value::Value;

pub fn type_mismatch(op: &str, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::TypeError(format!("cannot apply '{}' to a {} and a {}", op, a.kind(), b.kind()))
}

fn i_add(a: i128, b: i128) -> i128 {
    a.wrapping_add(b)
}
fn i_sub(a: i128, b: i128) -> i128 {
    a.wrapping_sub(b)
}
fn i_mul(a: i128, b: i128) -> i128 {
    a.wrapping_mul(b)
}
fn f_add(a: f64, b: f64) -> f64 {
    a + b
}
fn f_sub(a: f64, b: f64) -> f64 {
    a - b
}
fn f_mul(a: f64, b: f64) -> f64 {
    a * b
}

/// Dispatch a same-kind binary op across every numeric [`Value`] variant.
fn numeric_op2(
    a: Value,
    b: Value,
    opname: &str,
    int_op: fn(i128, i128) -> i128,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (&a, &b) {
        (Value::Byte(x), Value::Byte(y)) => Ok(Value::Byte(ByteValue(int_op(x.0 as i128, y.0 as i128) as u8))),
        (Value::Int16(x), Value::Int16(y)) => Ok(Value::Int16(Int16Value::new(int_op(x.0 as i128, y.0 as i128) as i16))),
        (Value::Int32(x), Value::Int32(y)) => Ok(Value::Int32(Int32Value::new(int_op(x.0 as i128, y.0 as i128) as i32))),
        (Value::Int64(x), Value::Int64(y)) => Ok(Value::Int64(Int64Value::new(int_op(x.0 as i128, y.0 as i128) as i64))),
        (Value::Int128(x), Value::Int128(y)) => Ok(Value::Int128(Int128Value::new(int_op(x.0, y.0)))),
        (Value::Real64(x), Value::Real64(y)) => Ok(Value::Real64(Real64Value(float_op(x.0, y.0)))),
        (Value::Float64(x), Value::Float64(y)) => Ok(Value::Float64(Float64Value(float_op(x.0, y.0)))),
        (Value::Real32(x), Value::Real32(y)) => Ok(Value::Real32(Real32Value(float_op(x.0 as f64, y.0 as f64) as f32))),
        (Value::Float32(x), Value::Float32(y)) => Ok(Value::Float32(Float32Value(float_op(x.0 as f64, y.0 as f64) as f32))),
        (Value::BigInt(x), Value::BigInt(y)) => Ok(Value::BigInt(BigIntValue(int_op(x.0, y.0)))),
        _ => Err(type_mismatch(opname, &a, &b)),
    }
}

fn int_op2(a: Value, b: Value, opname: &str, op: fn(Int64Value, Int64Value) -> Int64Value) -> Result<Value, RuntimeError> {
    match (&a, &b) {
        (Value::Int64(x), Value::Int64(y)) => Ok(Value::Int64(op(*x, *y))),
        (Value::Int32(x), Value::Int32(y)) => {
            let r = op(Int64Value::new(x.0 as i64), Int64Value::new(y.0 as i64));
            Ok(Value::Int32(Int32Value::new(r.0 as i32)))
        }
        (Value::Int16(x), Value::Int16(y)) => {
            let r = op(Int64Value::new(x.0 as i64), Int64Value::new(y.0 as i64));
            Ok(Value::Int16(Int16Value::new(r.0 as i16)))
        }
        (Value::Byte(x), Value::Byte(y)) => {
            let r = op(Int64Value::new(x.0 as i64), Int64Value::new(y.0 as i64));
            Ok(Value::Byte(ByteValue(r.0 as u8)))
        }
        _ => Err(type_mismatch(opname, &a, &b)),
    }
}

pub fn add(a: Value, b: Value) -> Result<Value, RuntimeError> {
    numeric_op2(a, b, "+", i_add, f_add)
}
pub fn sub(a: Value, b: Value) -> Result<Value, RuntimeError> {
    numeric_op2(a, b, "-", i_sub, f_sub)
}
pub fn mul(a: Value, b: Value) -> Result<Value, RuntimeError> {
    numeric_op2(a, b, "*", i_mul, f_mul)
}

pub fn div(a: Value, b: Value, loud: bool) -> Result<Value, RuntimeError> {
    match (&a, &b) {
        (Value::Int64(x), Value::Int64(y)) => Ok(Value::Int64(x.op_slash(*y, loud)?)),
        (Value::Int32(x), Value::Int32(y)) => Ok(Value::Int32(x.op_slash(*y, loud)?)),
        (Value::Int16(x), Value::Int16(y)) => Ok(Value::Int16(x.op_slash(*y, loud)?)),
        (Value::Byte(x), Value::Byte(y)) => Ok(Value::Byte(x.div(*y, loud)?)),
        (Value::Real64(x), Value::Real64(y)) => Ok(Value::Real64(x.div(*y, loud)?)),
        (Value::Float64(x), Value::Float64(y)) => Ok(Value::Float64(x.div(*y, loud)?)),
        (Value::Real32(x), Value::Real32(y)) => Ok(Value::Real32(x.div(*y, loud)?)),
        (Value::Float32(x), Value::Float32(y)) => Ok(Value::Float32(x.div(*y, loud)?)),
        _ => Err(type_mismatch("/", &a, &b)),
    }
}

pub fn rem_mod(a: Value, b: Value, loud: bool) -> Result<Value, RuntimeError> {
    match (&a, &b) {
        (Value::Int64(x), Value::Int64(y)) => Ok(Value::Int64(x.op_mod(*y, loud)?)),
        (Value::Int32(x), Value::Int32(y)) => Ok(Value::Int32(x.op_mod(*y, loud)?)),
        (Value::Int16(x), Value::Int16(y)) => Ok(Value::Int16(x.op_mod(*y, loud)?)),
        (Value::Byte(x), Value::Byte(y)) => Ok(Value::Byte(x.rem(*y, loud)?)),
        _ => Err(type_mismatch("mod", &a, &b)),
    }
}

pub fn rem(a: Value, b: Value, loud: bool) -> Result<Value, RuntimeError> {
    match (&a, &b) {
        (Value::Int64(x), Value::Int64(y)) => Ok(Value::Int64(x.rem(*y, loud)?)),
        (Value::Int32(x), Value::Int32(y)) => Ok(Value::Int32(x.rem(*y, loud)?)),
        (Value::Int16(x), Value::Int16(y)) => Ok(Value::Int16(x.rem(*y, loud)?)),
        (Value::Byte(x), Value::Byte(y)) => Ok(Value::Byte(x.rem(*y, loud)?)),
        _ => Err(type_mismatch("rem", &a, &b)),
    }
}

pub fn neg(a: Value) -> Result<Value, RuntimeError> {
    match a {
        Value::Int64(x) => Ok(Value::Int64(Int64Value::new(0).sub(x))),
        Value::Int32(x) => Ok(Value::Int32(Int32Value::new(0).sub(x))),
        Value::Int16(x) => Ok(Value::Int16(Int16Value::new(0).sub(x))),
        Value::Real64(x) => Ok(Value::Real64(Real64Value(-x.0))),
        Value::Float64(x) => Ok(Value::Float64(Float64Value(-x.0))),
        Value::Real32(x) => Ok(Value::Real32(Real32Value(-x.0))),
        Value::Float32(x) => Ok(Value::Float32(Float32Value(-x.0))),
        other => Err(RuntimeError::TypeError(format!("cannot negate a {}", other.kind()))),
    }
}

pub fn band(a: Value, b: Value) -> Result<Value, RuntimeError> {
    int_op2(a, b, "band", |x, y| x.band(y))
}
pub fn bor(a: Value, b: Value) -> Result<Value, RuntimeError> {
    int_op2(a, b, "bor", |x, y| x.bor(y))
}
pub fn bxor(a: Value, b: Value) -> Result<Value, RuntimeError> {
    int_op2(a, b, "bxor", |x, y| x.bxor(y))
}

pub fn bnot(a: Value) -> Result<Value, RuntimeError> {
    match a {
        Value::Int64(x) => Ok(Value::Int64(x.bnot())),
        Value::Int32(x) => Ok(Value::Int32(x.bnot())),
        Value::Int16(x) => Ok(Value::Int16(x.bnot())),
        Value::Byte(x) => Ok(Value::Byte(x.bnot())),
        other => Err(RuntimeError::TypeError(format!("cannot bitwise-complement a {}", other.kind()))),
    }
}

fn shift_amount(b: Value) -> Result<u32, RuntimeError> {
    match b {
        Value::Int64(n) => Ok(n.0 as u32),
        Value::Int32(n) => Ok(n.0 as u32),
        Value::Int16(n) => Ok(n.0 as u32),
        Value::Byte(n) => Ok(n.0 as u32),
        other => Err(RuntimeError::TypeError(format!("shift amount must be an integer, got {}", other.kind()))),
    }
}

pub fn shl(a: Value, b: Value) -> Result<Value, RuntimeError> {
    let amount = shift_amount(b)?;
    match a {
        Value::Int64(x) => Ok(Value::Int64(x.shl(amount))),
        Value::Int32(x) => Ok(Value::Int32(x.shl(amount))),
        Value::Int16(x) => Ok(Value::Int16(x.shl(amount))),
        Value::Byte(x) => Ok(Value::Byte(x.shl(amount))),
        other => Err(RuntimeError::TypeError(format!("cannot shift a {}", other.kind()))),
    }
}

pub fn shr(a: Value, b: Value) -> Result<Value, RuntimeError> {
    let amount = shift_amount(b)?;
    match a {
        Value::Int64(x) => Ok(Value::Int64(x.shr(amount))),
        Value::Int32(x) => Ok(Value::Int32(x.shr(amount))),
        Value::Int16(x) => Ok(Value::Int16(x.shr(amount))),
        Value::Byte(x) => Ok(Value::Byte(x.shr(amount))),
        other => Err(RuntimeError::TypeError(format!("cannot shift a {}", other.kind()))),
    }
}

pub fn compare(a: &Value, b: &Value) -> Result<std::cmp::Ordering, RuntimeError> {
    a.partial_cmp_numeric(b).ok_or_else(|| type_mismatch("compare", a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_same_kind() {
        assert_eq!(add(Value::int64(2), Value::int64(3)).unwrap(), Value::int64(5));
    }

    #[test]
    fn add_mismatched_kinds_errors() {
        assert!(add(Value::int64(2), Value::byte(3)).is_err());
    }

    #[test]
    fn div_loud_on_zero_throws() {
        assert!(div(Value::int64(1), Value::int64(0), true).is_err());
    }

    #[test]
    fn shift_widens_through_byte() {
        let shifted = shl(Value::byte(1), Value::byte(3)).unwrap();
        assert_eq!(shifted, Value::byte(8));
    }

    #[test]
    fn compare_orders_cross_width() {
        let ord = compare(&Value::int64(2), &Value::int32(3)).unwrap();
        assert_eq!(ord, std::cmp::Ordering::Less);
    }
}



