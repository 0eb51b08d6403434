use serde_json::Value;

use super::{CoercionError, TypeCoercer, TypeId, float_value, parse_date, parse_date_time};

/// Strict coercion for typed JSON documents. Only conversions that cannot
/// lose information are made (integers widen to floats, date strings are
/// canonicalized).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCoercer;

impl TypeCoercer for JsonCoercer {
    fn coerce(&self, ty: &TypeId, value: &Value) -> Result<Value, CoercionError> {
        let fail = || CoercionError::new(ty, value);
        let ok = match (ty, value) {
            (TypeId::Any, _) => true,
            (TypeId::Nil, Value::Null) => true,
            (TypeId::Maybe(_), Value::Null) => true,
            (TypeId::Maybe(inner), _) => return self.coerce(inner, value).map_err(|_| fail()),
            (TypeId::Bool, Value::Bool(_)) => true,
            (TypeId::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (TypeId::Float, Value::Number(n)) => {
                return n.as_f64().and_then(float_value).ok_or_else(fail);
            }
            (TypeId::String, Value::String(_)) => true,
            (TypeId::Date, Value::String(s)) => return parse_date(s).ok_or_else(fail),
            (TypeId::DateTime, Value::String(s)) => return parse_date_time(s).ok_or_else(fail),
            (TypeId::Hash, Value::Object(_)) => true,
            (TypeId::Array(Some(member)), Value::Array(xs)) => {
                let xs = xs
                    .iter()
                    .map(|x| self.coerce(member, x).unwrap_or_else(|_| x.clone()))
                    .collect();
                return Ok(Value::Array(xs));
            }
            (TypeId::Array(None), Value::Array(_)) => true,
            _ => false,
        };
        if ok { Ok(value.clone()) } else { Err(fail()) }
    }
}
