use std::cmp::Ordering;

use ordered_float::OrderedFloat;
use serde_json::Value;

use super::PredicateRegistry;

pub(super) fn register(registry: &mut PredicateRegistry) {
    registry
        .register_fn("even?", 0, |v, _| int_of(v).is_some_and(|i| i % 2 == 0))
        .register_fn("odd?", 0, |v, _| int_of(v).is_some_and(|i| i % 2 != 0))
        .register_fn("gt?", 1, |v, a| compare(v, &a[0]) == Some(Ordering::Greater))
        .register_fn("gteq?", 1, |v, a| matches!(compare(v, &a[0]), Some(Ordering::Greater | Ordering::Equal)))
        .register_fn("lt?", 1, |v, a| compare(v, &a[0]) == Some(Ordering::Less))
        .register_fn("lteq?", 1, |v, a| matches!(compare(v, &a[0]), Some(Ordering::Less | Ordering::Equal)));
}

fn int_of(v: &Value) -> Option<i128> {
    v.as_i64().map(i128::from).or_else(|| v.as_u64().map(i128::from))
}

/// Numbers compare numerically regardless of representation; anything else
/// is incomparable.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (int_of(left), int_of(right)) {
        return Some(l.cmp(&r));
    }
    let l = OrderedFloat(left.as_f64()?);
    let r = OrderedFloat(right.as_f64()?);
    Some(l.cmp(&r))
}
