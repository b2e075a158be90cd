//! Operator semantics on runtime values.

use std::cmp::Ordering;

use super::{BinaryOp, UnaryOp};
use crate::{
    error::{WyrmError, WyrmResult},
    value::Value,
};

fn unsupported(op: BinaryOp, left: &Value, right: &Value) -> WyrmError {
    WyrmError::UnsupportedOperands {
        op: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

const fn overflow(op: BinaryOp) -> WyrmError {
    WyrmError::Overflow { op: op.symbol() }
}

/// Integer view of a value; booleans count as 0/1.
fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::None
        | Value::Float(_)
        | Value::Str(_)
        | Value::List(_)
        | Value::Tuple(_)
        | Value::Dict(_)
        | Value::Function(_) => None,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Int(_) | Value::Bool(_) => as_int(value).map(|i| i as f64),
        Value::None
        | Value::Str(_)
        | Value::List(_)
        | Value::Tuple(_)
        | Value::Dict(_)
        | Value::Function(_) => None,
    }
}

pub(super) fn unary(op: UnaryOp, operand: Value) -> WyrmResult<Value> {
    let unsupported = |operand: &Value| WyrmError::UnsupportedOperand {
        op: op.symbol(),
        operand: operand.type_name(),
    };
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Pos => match operand {
            Value::Float(f) => Ok(Value::Float(f)),
            other => as_int(&other).map(Value::Int).ok_or_else(|| unsupported(&other)),
        },
        UnaryOp::Neg => match operand {
            Value::Float(f) => Ok(Value::Float(-f)),
            other => match as_int(&other) {
                Some(i) => i
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or(WyrmError::Overflow { op: "-" }),
                None => Err(unsupported(&other)),
            },
        },
        UnaryOp::Invert => as_int(&operand)
            .map(|i| Value::Int(!i))
            .ok_or_else(|| unsupported(&operand)),
    }
}

pub(super) fn binary(op: BinaryOp, left: Value, right: Value) -> WyrmResult<Value> {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => arithmetic(op, &left, &right, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => multiply(left, right),
        BinaryOp::Div => {
            let (Some(a), Some(b)) = (as_float(&left), as_float(&right)) else {
                return Err(unsupported(op, &left, &right));
            };
            if b == 0.0 {
                return Err(WyrmError::DivisionByZero);
            }
            Ok(Value::Float(a / b))
        }
        BinaryOp::FloorDiv => {
            if as_float(&right) == Some(0.0) {
                return Err(WyrmError::DivisionByZero);
            }
            arithmetic(op, &left, &right, floor_div, |a, b| (a / b).floor())
        }
        BinaryOp::Mod => {
            if as_float(&right) == Some(0.0) {
                return Err(WyrmError::DivisionByZero);
            }
            arithmetic(op, &left, &right, floor_mod, |a, b| a - b * (a / b).floor())
        }
        BinaryOp::Pow => power(&left, &right),
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::BitAnd | BinaryOp::BitXor | BinaryOp::BitOr => {
            bitwise(op, &left, &right)
        }
        BinaryOp::Eq => Ok(Value::Bool(equals(&left, &right))),
        BinaryOp::Ne => Ok(Value::Bool(!equals(&left, &right))),
        BinaryOp::Is => Ok(Value::Bool(identical(&left, &right))),
        BinaryOp::IsNot => Ok(Value::Bool(!identical(&left, &right))),
        BinaryOp::In => contains(&right, &left).map(Value::Bool),
        BinaryOp::NotIn => contains(&right, &left).map(|found| Value::Bool(!found)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&left, &right).ok_or_else(|| unsupported(op, &left, &right))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        // Short-circuiting is handled by the evaluator; these only see values.
        BinaryOp::And => Ok(if left.is_truthy() { right } else { left }),
        BinaryOp::Or => Ok(if left.is_truthy() { left } else { right }),
    }
}

fn arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> WyrmResult<Value> {
    if let (Some(a), Some(b)) = (as_int(left), as_int(right)) {
        return int_op(a, b).map(Value::Int).ok_or(overflow(op));
    }
    match (as_float(left), as_float(right)) {
        (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
        _ => Err(unsupported(op, left, right)),
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a.checked_rem(b)? != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        r.checked_add(b)
    } else {
        Some(r)
    }
}

fn add(left: Value, right: Value) -> WyrmResult<Value> {
    match (left, right) {
        (Value::Str(mut a), Value::Str(b)) => {
            a.push_str(&b);
            Ok(Value::Str(a))
        }
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (Value::Tuple(mut a), Value::Tuple(b)) => {
            a.extend(b);
            Ok(Value::Tuple(a))
        }
        (left, right) => arithmetic(BinaryOp::Add, &left, &right, i64::checked_add, |a, b| {
            a + b
        }),
    }
}

fn repeat_count(count: i64) -> usize {
    usize::try_from(count).unwrap_or(0)
}

fn multiply(left: Value, right: Value) -> WyrmResult<Value> {
    match (left, right) {
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            Ok(Value::Str(s.repeat(repeat_count(n))))
        }
        (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
            Ok(Value::List(repeat_items(&items, n)))
        }
        (Value::Tuple(items), Value::Int(n)) | (Value::Int(n), Value::Tuple(items)) => {
            Ok(Value::Tuple(repeat_items(&items, n)))
        }
        (left, right) => arithmetic(BinaryOp::Mul, &left, &right, i64::checked_mul, |a, b| {
            a * b
        }),
    }
}

fn repeat_items(items: &[Value], count: i64) -> Vec<Value> {
    let count = repeat_count(count);
    let mut out = Vec::with_capacity(items.len().saturating_mul(count));
    for _ in 0..count {
        out.extend_from_slice(items);
    }
    out
}

fn power(left: &Value, right: &Value) -> WyrmResult<Value> {
    if let (Some(base), Some(exp)) = (as_int(left), as_int(right)) {
        if let Ok(exp) = u32::try_from(exp) {
            return base
                .checked_pow(exp)
                .map(Value::Int)
                .ok_or(overflow(BinaryOp::Pow));
        }
        if exp < 0 {
            if base == 0 {
                return Err(WyrmError::DivisionByZero);
            }
            return Ok(Value::Float((base as f64).powf(exp as f64)));
        }
        return Err(overflow(BinaryOp::Pow));
    }
    match (as_float(left), as_float(right)) {
        (Some(a), Some(b)) => Ok(Value::Float(a.powf(b))),
        _ => Err(unsupported(BinaryOp::Pow, left, right)),
    }
}

fn bitwise(op: BinaryOp, left: &Value, right: &Value) -> WyrmResult<Value> {
    if let (Value::Bool(a), Value::Bool(b)) = (left, right) {
        match op {
            BinaryOp::BitAnd => return Ok(Value::Bool(*a & *b)),
            BinaryOp::BitOr => return Ok(Value::Bool(*a | *b)),
            BinaryOp::BitXor => return Ok(Value::Bool(*a ^ *b)),
            _ => {}
        }
    }
    let (Some(a), Some(b)) = (as_int(left), as_int(right)) else {
        return Err(unsupported(op, left, right));
    };
    let shift = || u32::try_from(b).ok();
    let result = match op {
        BinaryOp::BitAnd => Some(a & b),
        BinaryOp::BitOr => Some(a | b),
        BinaryOp::BitXor => Some(a ^ b),
        BinaryOp::Shl => shift().and_then(|s| a.checked_shl(s)),
        _ => shift().map(|s| a.checked_shr(s).unwrap_or(if a < 0 { -1 } else { 0 })),
    };
    result.map(Value::Int).ok_or(overflow(op))
}

/// Equality with numeric coercion (`1 == 1.0`).
pub(crate) fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equals(x, y))
        }
        (Value::Dict(a), Value::Dict(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|((ka, va), (kb, vb))| ka == kb && equals(va, vb))
        }
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::None, Value::None) => true,
        (Value::Function(a), Value::Function(b)) => a == b,
        _ => match (as_float(left), as_float(right)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// `is`: same kind of value and equal, without numeric coercion.
fn identical(left: &Value, right: &Value) -> bool {
    std::mem::discriminant(left) == std::mem::discriminant(right) && equals(left, right)
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
            for (x, y) in a.iter().zip(b) {
                if !equals(x, y) {
                    return compare(x, y);
                }
            }
            Some(a.len().cmp(&b.len()))
        }
        _ => {
            if let (Some(a), Some(b)) = (as_int(left), as_int(right)) {
                return Some(a.cmp(&b));
            }
            as_float(left)?.partial_cmp(&as_float(right)?)
        }
    }
}

fn contains(container: &Value, item: &Value) -> WyrmResult<bool> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(unsupported(BinaryOp::In, other, container)),
        },
        Value::List(items) | Value::Tuple(items) => Ok(items.iter().any(|x| equals(x, item))),
        Value::Dict(map) => Ok(match item {
            Value::Str(key) => map.contains_key(key),
            _ => false,
        }),
        Value::None
        | Value::Bool(_)
        | Value::Int(_)
        | Value::Float(_)
        | Value::Function(_) => Err(unsupported(BinaryOp::In, item, container)),
    }
}

/// Resolve a possibly negative index against `length`.
fn resolve_index(index: i64, length: usize) -> WyrmResult<usize> {
    let out_of_range = || WyrmError::IndexOutOfRange { index, length };
    let len = i64::try_from(length).map_err(|_| out_of_range())?;
    let resolved = if index < 0 { len.checked_add(index) } else { Some(index) };
    resolved
        .filter(|i| (0..len).contains(i))
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(out_of_range)
}

pub(super) fn subscript(target: Value, index: Value) -> WyrmResult<Value> {
    match target {
        Value::List(items) | Value::Tuple(items) => {
            let Some(i) = as_int(&index) else {
                return Err(unsupported_index(&index));
            };
            let i = resolve_index(i, items.len())?;
            Ok(items.into_iter().nth(i).unwrap_or_default())
        }
        Value::Str(s) => {
            let Some(i) = as_int(&index) else {
                return Err(unsupported_index(&index));
            };
            let chars: Vec<char> = s.chars().collect();
            let i = resolve_index(i, chars.len())?;
            Ok(chars
                .get(i)
                .map(|c| Value::Str(c.to_string()))
                .unwrap_or_default())
        }
        Value::Dict(mut map) => {
            let key = match index {
                Value::Str(key) => key,
                other => other.to_string(),
            };
            map.remove(&key).ok_or(WyrmError::MissingKey { key })
        }
        other @ (Value::None
        | Value::Bool(_)
        | Value::Int(_)
        | Value::Float(_)
        | Value::Function(_)) => Err(WyrmError::NotSubscriptable {
            found: other.type_name(),
        }),
    }
}

fn unsupported_index(index: &Value) -> WyrmError {
    WyrmError::UnsupportedOperand {
        op: "[]",
        operand: index.type_name(),
    }
}

pub(super) fn attribute(target: Value, name: &str) -> WyrmResult<Value> {
    match target {
        Value::Dict(mut map) => map.remove(name).ok_or(WyrmError::MissingAttribute {
            attribute: name.to_string(),
            found: "dict",
        }),
        other => Err(WyrmError::MissingAttribute {
            attribute: name.to_string(),
            found: other.type_name(),
        }),
    }
}
