//! Type identifiers and the coercion capability used by type guards.
//!
//! A coercer turns a raw input value into a value of the requested type or
//! reports that it cannot. Two processors ship with the crate:
//! - `params`: lenient, for form/query parameters where everything arrives
//!   as a string.
//! - `json`: strict, for already-typed JSON documents.
pub mod json;
pub mod params;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::DefinitionError;

pub use json::JsonCoercer;
pub use params::ParamsCoercer;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeId {
    Any,
    Nil,
    Bool,
    Integer,
    Float,
    String,
    Date,
    DateTime,
    Hash,
    Array(Option<Box<TypeId>>), // member type, coerced leniently
    Maybe(Box<TypeId>),         // nil, or the inner type
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot coerce {found} to {ty}")]
pub struct CoercionError {
    pub ty: TypeId,
    pub found: &'static str,
}

impl CoercionError {
    pub fn new(ty: &TypeId, value: &Value) -> Self {
        Self { ty: ty.clone(), found: kind_name(value) }
    }
}

pub trait TypeCoercer: Send + Sync {
    fn coerce(&self, ty: &TypeId, value: &Value) -> Result<Value, CoercionError>;
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeId {
    pub fn array_of(member: TypeId) -> Self { TypeId::Array(Some(Box::new(member))) }

    /// Widen to accept nil. Idempotent.
    pub fn maybe(self) -> Self {
        match self {
            TypeId::Maybe(_) | TypeId::Nil | TypeId::Any => self,
            other => TypeId::Maybe(Box::new(other)),
        }
    }

    /// The type with any `Maybe` wrapper removed.
    pub fn base(&self) -> &TypeId {
        match self {
            TypeId::Maybe(inner) => inner.base(),
            other => other,
        }
    }

    /// Predicate that checks a value already has this type.
    pub fn predicate(&self) -> Option<&'static str> {
        match self {
            TypeId::Any => None,
            TypeId::Nil => Some("nil?"),
            TypeId::Bool => Some("bool?"),
            TypeId::Integer => Some("int?"),
            TypeId::Float => Some("float?"),
            TypeId::String => Some("str?"),
            TypeId::Date => Some("date?"),
            TypeId::DateTime => Some("date_time?"),
            TypeId::Hash => Some("hash?"),
            TypeId::Array(_) => Some("array?"),
            TypeId::Maybe(inner) => inner.predicate(),
        }
    }

    /// Types whose values can be empty, so `filled?` still means something.
    pub fn is_fillable(&self) -> bool {
        matches!(self.base(), TypeId::Any | TypeId::String | TypeId::Array(_) | TypeId::Hash)
    }

    pub fn is_array(&self) -> bool { matches!(self.base(), TypeId::Array(_)) }
    pub fn is_hash(&self) -> bool { matches!(self.base(), TypeId::Hash) }

    /// Whether `other` may be declared again on top of `self`: identical,
    /// or a bare `array` meeting a member-typed one.
    pub fn accepts_redeclaration(&self, other: &TypeId) -> bool {
        self == other
            || matches!((self, other), (TypeId::Array(None), TypeId::Array(_)) | (TypeId::Array(_), TypeId::Array(None)))
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeId::Any => f.write_str("any"),
            TypeId::Nil => f.write_str("nil"),
            TypeId::Bool => f.write_str("bool"),
            TypeId::Integer => f.write_str("integer"),
            TypeId::Float => f.write_str("float"),
            TypeId::String => f.write_str("string"),
            TypeId::Date => f.write_str("date"),
            TypeId::DateTime => f.write_str("date_time"),
            TypeId::Hash => f.write_str("hash"),
            TypeId::Array(None) => f.write_str("array"),
            TypeId::Array(Some(member)) => write!(f, "array[{member}]"),
            TypeId::Maybe(inner) => write!(f, "maybe[{inner}]"),
        }
    }
}

/// Accepts `integer`, `:integer`, `array[integer]`, `maybe[string]`, ...
impl FromStr for TypeId {
    type Err = DefinitionError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let s = src.trim();
        let s = s.strip_prefix(':').unwrap_or(s);
        if let Some(rest) = s.strip_suffix(']') {
            let (head, inner) = rest
                .split_once('[')
                .ok_or_else(|| DefinitionError::UnknownType(src.to_string()))?;
            let inner = inner.parse::<TypeId>()?;
            return match head {
                "array" => Ok(TypeId::array_of(inner)),
                "maybe" => Ok(inner.maybe()),
                _ => Err(DefinitionError::UnknownType(src.to_string())),
            };
        }
        match s {
            "any" => Ok(TypeId::Any),
            "nil" => Ok(TypeId::Nil),
            "bool" => Ok(TypeId::Bool),
            "integer" => Ok(TypeId::Integer),
            "float" => Ok(TypeId::Float),
            "string" => Ok(TypeId::String),
            "date" => Ok(TypeId::Date),
            "date_time" => Ok(TypeId::DateTime),
            "hash" => Ok(TypeId::Hash),
            "array" => Ok(TypeId::Array(None)),
            _ => Err(DefinitionError::UnknownType(src.to_string())),
        }
    }
}

impl TryFrom<String> for TypeId {
    type Error = DefinitionError;
    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<TypeId> for String {
    fn from(ty: TypeId) -> Self { ty.to_string() }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

pub(crate) fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `%Y-%m-%d`, re-emitted in canonical form.
pub(crate) fn parse_date(s: &str) -> Option<Value> {
    chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
}

/// RFC 3339, re-emitted in canonical form.
pub(crate) fn parse_date_time(s: &str) -> Option<Value> {
    chrono::DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| Value::String(dt.to_rfc3339()))
}

pub(crate) fn float_value(f: f64) -> Option<Value> {
    serde_json::Number::from_f64(f).map(Value::Number)
}
