//! Type predicates. These are also what a type guard reports when
//! coercion fails.
use serde_json::Value;

use super::PredicateRegistry;
use crate::coercion::{parse_date, parse_date_time};

pub(super) fn register(registry: &mut PredicateRegistry) {
    registry
        .register_fn("nil?", 0, |v, _| v.is_null())
        .register_fn("bool?", 0, |v, _| v.is_boolean())
        .register_fn("true?", 0, |v, _| *v == Value::Bool(true))
        .register_fn("false?", 0, |v, _| *v == Value::Bool(false))
        .register_fn("int?", 0, |v, _| v.is_i64() || v.is_u64())
        .register_fn("float?", 0, |v, _| v.is_f64())
        .register_fn("number?", 0, |v, _| v.is_number())
        .register_fn("str?", 0, |v, _| v.is_string())
        .register_fn("array?", 0, |v, _| v.is_array())
        .register_fn("hash?", 0, |v, _| v.is_object())
        .register_fn("date?", 0, |v, _| v.as_str().and_then(parse_date).is_some())
        .register_fn("date_time?", 0, |v, _| v.as_str().and_then(parse_date_time).is_some());
}

#[cfg(test)]
mod tests {
    use crate::predicates::PredicateRegistry;
    use rstest::rstest;
    use serde_json::{Value, json};

    #[rstest]
    #[case("int?", json!(3), true)]
    #[case("int?", json!(3.5), false)]
    #[case("int?", json!("3"), false)]
    #[case("float?", json!(3.5), true)]
    #[case("number?", json!(3), true)]
    #[case("str?", json!(""), true)]
    #[case("nil?", json!(null), true)]
    #[case("hash?", json!({}), true)]
    #[case("array?", json!({}), false)]
    #[case("true?", json!("true"), false)]
    #[case("date?", json!("2020-01-31"), true)]
    #[case("date?", json!("31/01/2020"), false)]
    fn type_checks(#[case] name: &str, #[case] value: Value, #[case] expected: bool) {
        let registry = PredicateRegistry::builtin();
        assert_eq!(registry.check(name, &value, &[]), expected);
    }
}
