use serde_json::Value;

use super::{CoercionError, TypeCoercer, TypeId, float_value, parse_date, parse_date_time};

const TRUE_WORDS: &[&str] = &["1", "on", "t", "true", "y", "yes"];
const FALSE_WORDS: &[&str] = &["0", "off", "f", "false", "n", "no"];

/// Lenient coercion for request parameters, where scalars arrive as strings
/// and an empty string stands for "nothing".
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamsCoercer;

impl TypeCoercer for ParamsCoercer {
    fn coerce(&self, ty: &TypeId, value: &Value) -> Result<Value, CoercionError> {
        let fail = || CoercionError::new(ty, value);
        match ty {
            TypeId::Any => Ok(value.clone()),
            TypeId::Nil => match value {
                Value::Null => Ok(Value::Null),
                Value::String(s) if s.is_empty() => Ok(Value::Null),
                _ => Err(fail()),
            },
            TypeId::Maybe(inner) => match value {
                Value::Null => Ok(Value::Null),
                Value::String(s) if s.is_empty() => Ok(Value::Null),
                _ => self.coerce(inner, value).map_err(|_| fail()),
            },
            TypeId::Bool => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) => {
                    let word = s.trim().to_ascii_lowercase();
                    if TRUE_WORDS.contains(&word.as_str()) {
                        Ok(Value::Bool(true))
                    } else if FALSE_WORDS.contains(&word.as_str()) {
                        Ok(Value::Bool(false))
                    } else {
                        Err(fail())
                    }
                }
                _ => Err(fail()),
            },
            TypeId::Integer => to_int(value).ok_or_else(fail),
            TypeId::Float => to_float(value).ok_or_else(fail),
            TypeId::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(fail()),
            },
            TypeId::Date => value.as_str().and_then(parse_date).ok_or_else(fail),
            TypeId::DateTime => value.as_str().and_then(parse_date_time).ok_or_else(fail),
            TypeId::Hash => match value {
                Value::Object(_) => Ok(value.clone()),
                Value::String(s) if s.is_empty() => Ok(Value::Object(Default::default())),
                _ => Err(fail()),
            },
            TypeId::Array(member) => match value {
                Value::Array(xs) => Ok(Value::Array(match member {
                    // members that refuse coercion are kept as-is for `each` to report
                    Some(m) => xs.iter().map(|x| self.coerce(m, x).unwrap_or_else(|_| x.clone())).collect(),
                    None => xs.clone(),
                })),
                Value::String(s) if s.is_empty() => Ok(Value::Array(Vec::new())),
                _ => Err(fail()),
            },
        }
    }
}

fn to_int(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                return Some(value.clone());
            }
            let f = n.as_f64()?;
            // `i64::MAX as f64` rounds up to 2^63, which does not fit
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Some(Value::from(f as i64))
            } else {
                None
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => n.as_f64().and_then(float_value),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .and_then(float_value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(TypeId::Integer, json!("2"), Some(json!(2)))]
    #[case(TypeId::Integer, json!(" -7 "), Some(json!(-7)))]
    #[case(TypeId::Integer, json!(4.0), Some(json!(4)))]
    #[case(TypeId::Integer, json!(9223372036854775808.0), None)]
    #[case(TypeId::Integer, json!(-9223372036854775808.0), Some(json!(i64::MIN)))]
    #[case(TypeId::Integer, json!(""), None)]
    #[case(TypeId::Integer, json!(null), None)]
    #[case(TypeId::Integer, json!([]), None)]
    #[case(TypeId::Integer, json!("1.5"), None)]
    #[case(TypeId::Float, json!("1.5"), Some(json!(1.5)))]
    #[case(TypeId::Float, json!("NaN"), None)]
    #[case(TypeId::Bool, json!("On"), Some(json!(true)))]
    #[case(TypeId::Bool, json!("no"), Some(json!(false)))]
    #[case(TypeId::Bool, json!("maybe"), None)]
    #[case(TypeId::String, json!(12), None)]
    #[case(TypeId::Date, json!("2024-02-29"), Some(json!("2024-02-29")))]
    #[case(TypeId::Date, json!("2023-02-29"), None)]
    #[case(TypeId::Hash, json!(""), Some(json!({})))]
    #[case(TypeId::Array(None), json!(""), Some(json!([])))]
    #[case(TypeId::Array(None), json!(null), None)]
    #[case(TypeId::Integer.maybe(), json!(""), Some(json!(null)))]
    #[case(TypeId::Integer.maybe(), json!([]), None)]
    #[case(TypeId::String.maybe(), json!("x"), Some(json!("x")))]
    fn coerces_params(#[case] ty: TypeId, #[case] input: Value, #[case] expected: Option<Value>) {
        assert_eq!(ParamsCoercer.coerce(&ty, &input).ok(), expected);
    }

    #[test]
    fn array_members_coerce_leniently() {
        let ty = TypeId::array_of(TypeId::Integer);
        let out = ParamsCoercer.coerce(&ty, &json!(["1", "x", 3])).unwrap();
        assert_eq!(out, json!([1, "x", 3]));
    }

    #[test]
    fn failure_names_the_input_kind() {
        let err = ParamsCoercer.coerce(&TypeId::Integer, &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "cannot coerce object to integer");
    }
}
