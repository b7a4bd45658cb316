//! A slow, direct selector evaluator.
//!
//! Walks the raw JSON selector on every call instead of compiling it. Used
//! by property tests as the oracle for [`offkit_selector::Selector`]. Only
//! `$regex` is left out.

use serde_json::Value;
use std::cmp::Ordering;

/// Evaluates `selector` against `document` without compiling it.
///
/// Unknown operators evaluate to false.
pub fn reference_satisfy(selector: &Value, document: &Value) -> bool {
    let Some(node) = selector.as_object() else {
        return false;
    };
    node.iter().all(|(key, operand)| match key.as_str() {
        "$and" => terms(operand).iter().all(|t| reference_satisfy(t, document)),
        "$or" => terms(operand).iter().any(|t| reference_satisfy(t, document)),
        field => {
            let value = lookup(document, field);
            match operand.as_object() {
                Some(ops) if ops.keys().any(|k| k.starts_with('$')) => ops
                    .iter()
                    .all(|(op, arg)| check(op, value, arg)),
                _ => check("$eq", value, operand),
            }
        }
    })
}

fn terms(operand: &Value) -> &[Value] {
    operand.as_array().map(Vec::as_slice).unwrap_or(&[])
}

fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

fn check(op: &str, value: Option<&Value>, arg: &Value) -> bool {
    match op {
        "$eq" => equals(value, arg),
        "$ne" => !equals(value, arg),
        "$lt" => relation(value, arg).is_some_and(Ordering::is_lt),
        "$lte" => relation(value, arg).is_some_and(Ordering::is_le),
        "$gt" => relation(value, arg).is_some_and(Ordering::is_gt),
        "$gte" => relation(value, arg).is_some_and(Ordering::is_ge),
        "$in" => {
            let choices = terms(arg);
            match value {
                None => false,
                Some(Value::Array(items)) => items.iter().any(|i| choices.iter().any(|c| same(i, c))),
                Some(v) => choices.iter().any(|c| same(v, c)),
            }
        }
        "$exists" => value.is_some() == arg.as_bool().unwrap_or(true),
        _ => false,
    }
}

/// A missing field equals only `null`.
fn equals(value: Option<&Value>, arg: &Value) -> bool {
    value.map_or(arg.is_null(), |v| same(v, arg))
}

fn same(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| same(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| same(v, w)))
        }
        _ => a == b,
    }
}

/// Projects a comparable pair onto a common key: numbers as `f64`, strings
/// (with `null` as the empty string when facing a string), booleans.
enum Key<'a> {
    Num(f64),
    Text(&'a str),
    Flag(bool),
}

fn keys<'a>(value: Option<&'a Value>, arg: &'a Value) -> Option<(Key<'a>, Key<'a>)> {
    Some(match (value?, arg) {
        (Value::Number(a), Value::Number(b)) => (Key::Num(a.as_f64()?), Key::Num(b.as_f64()?)),
        (Value::String(a), Value::String(b)) => (Key::Text(a), Key::Text(b)),
        (Value::String(a), Value::Null) => (Key::Text(a), Key::Text("")),
        (Value::Null, Value::String(b)) => (Key::Text(""), Key::Text(b)),
        (Value::Bool(a), Value::Bool(b)) => (Key::Flag(*a), Key::Flag(*b)),
        _ => return None,
    })
}

fn relation(value: Option<&Value>, arg: &Value) -> Option<Ordering> {
    match keys(value, arg)? {
        (Key::Num(a), Key::Num(b)) => a.partial_cmp(&b),
        (Key::Text(a), Key::Text(b)) => Some(a.cmp(b)),
        (Key::Flag(a), Key::Flag(b)) => Some(a.cmp(&b)),
        _ => None,
    }
}
