//! Presence, size, inclusion and equality predicates.
use serde_json::Value;

use super::{PredicateRegistry, size_of};

pub(super) fn register(registry: &mut PredicateRegistry) {
    registry
        .register_fn("filled?", 0, |v, _| !is_empty(v))
        .register_fn("empty?", 0, |v, _| is_empty(v))
        .register_fn("size?", 1, |v, a| size_matches(v, &a[0]))
        .register_fn("min_size?", 1, |v, a| bound(v, &a[0], |len, n| len >= n))
        .register_fn("max_size?", 1, |v, a| bound(v, &a[0], |len, n| len <= n))
        .register_fn("includes?", 1, |v, a| includes(v, &a[0]) == Some(true))
        .register_fn("excludes?", 1, |v, a| includes(v, &a[0]) == Some(false))
        .register_fn("included_in?", 1, |v, a| member_of(v, &a[0]) == Some(true))
        .register_fn("excluded_from?", 1, |v, a| member_of(v, &a[0]) == Some(false))
        .register_fn("eql?", 1, |v, a| *v == a[0])
        .register_fn("not_eql?", 1, |v, a| *v != a[0]);
}

/// nil and empty strings/collections are empty; other scalars never are.
fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(xs) => xs.is_empty(),
        Value::Object(m) => m.is_empty(),
        _ => false,
    }
}

/// `size?` takes either an exact size or an inclusive `[min, max]` range.
fn size_matches(v: &Value, arg: &Value) -> bool {
    let Some(len) = size_of(v) else { return false };
    match arg {
        Value::Array(range) if range.len() == 2 => {
            match (range[0].as_u64(), range[1].as_u64()) {
                (Some(lo), Some(hi)) => (lo..=hi).contains(&(len as u64)),
                _ => false,
            }
        }
        other => other.as_u64() == Some(len as u64),
    }
}

fn bound(v: &Value, arg: &Value, ok: impl Fn(u64, u64) -> bool) -> bool {
    match (size_of(v), arg.as_u64()) {
        (Some(len), Some(n)) => ok(len as u64, n),
        _ => false,
    }
}

/// `None` when the value is not a collection at all.
fn includes(v: &Value, needle: &Value) -> Option<bool> {
    match v {
        Value::String(s) => needle.as_str().map(|n| s.contains(n)),
        Value::Array(xs) => Some(xs.contains(needle)),
        Value::Object(m) => needle.as_str().map(|k| m.contains_key(k)),
        _ => None,
    }
}

fn member_of(v: &Value, list: &Value) -> Option<bool> {
    list.as_array().map(|xs| xs.contains(v))
}
