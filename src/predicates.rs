//! Named boolean tests over a (possibly coerced) value.
//!
//! Predicates live in a registry keyed by name, e.g. `even?` or
//! `includes?`. The builder consults the registry for arity and argument
//! validation; the evaluator for the actual check.
pub mod coll;
pub mod kind;
pub mod num;
pub mod text;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::DefinitionError;

pub trait Predicate: Send + Sync {
    fn arity(&self) -> usize;
    fn check(&self, value: &Value, args: &[Value]) -> bool;

    /// Reject literal arguments at definition time (e.g. a malformed regex).
    fn validate_args(&self, _args: &[Value]) -> Result<(), String> { Ok(()) }
}

/// Adapter so plain closures can be registered.
pub struct FnPredicate<F> {
    arity: usize,
    check: F,
}

impl<F> FnPredicate<F>
where
    F: Fn(&Value, &[Value]) -> bool + Send + Sync,
{
    pub fn new(arity: usize, check: F) -> Self { Self { arity, check } }
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&Value, &[Value]) -> bool + Send + Sync,
{
    fn arity(&self) -> usize { self.arity }
    fn check(&self, value: &Value, args: &[Value]) -> bool { (self.check)(value, args) }
}

#[derive(Clone, Default)]
pub struct PredicateRegistry {
    entries: IndexMap<String, Arc<dyn Predicate>>,
}

static BUILTIN: Lazy<Arc<PredicateRegistry>> = Lazy::new(|| Arc::new(PredicateRegistry::builtin()));

impl PredicateRegistry {
    pub fn empty() -> Self { Self::default() }

    /// Registry populated with every built-in predicate.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        kind::register(&mut registry);
        num::register(&mut registry);
        coll::register(&mut registry);
        text::register(&mut registry);
        registry
    }

    /// Process-wide copy of the built-in registry.
    pub fn shared() -> Arc<Self> { BUILTIN.clone() }

    /// Later registrations replace earlier ones with the same name.
    pub fn register(&mut self, name: impl Into<String>, predicate: impl Predicate + 'static) -> &mut Self {
        self.entries.insert(name.into(), Arc::new(predicate));
        self
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, arity: usize, check: F) -> &mut Self
    where
        F: Fn(&Value, &[Value]) -> bool + Send + Sync + 'static,
    {
        self.register(name, FnPredicate::new(arity, check))
    }

    pub fn contains(&self, name: &str) -> bool { self.entries.contains_key(name) }

    pub fn arity(&self, name: &str) -> Option<usize> {
        self.entries.get(name).map(|p| p.arity())
    }

    /// Unknown names and wrong argument counts never pass; the builder
    /// rejects both before evaluation.
    pub fn check(&self, name: &str, value: &Value, args: &[Value]) -> bool {
        match self.entries.get(name) {
            Some(p) if p.arity() == args.len() => p.check(value, args),
            _ => false,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub(crate) fn validate(&self, name: &str, args: &[Value]) -> Result<(), DefinitionError> {
        let predicate = self.entries.get(name).ok_or_else(|| DefinitionError::UnknownPredicate {
            name: name.to_string(),
        })?;
        if predicate.arity() != args.len() {
            return Err(DefinitionError::ArityMismatch {
                name: name.to_string(),
                expected: predicate.arity(),
                found: args.len(),
            });
        }
        predicate.validate_args(args).map_err(|reason| DefinitionError::InvalidArguments {
            name: name.to_string(),
            reason,
        })
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Length of a sized value: chars of a string, entries of an array or hash.
pub(crate) fn size_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(xs) => Some(xs.len()),
        Value::Object(m) => Some(m.len()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_registry_knows_the_core_set() {
        let registry = PredicateRegistry::shared();
        for name in ["int?", "even?", "includes?", "filled?", "format?", "nil?"] {
            assert!(registry.contains(name), "{name} missing");
        }
        assert_eq!(registry.arity("gt?"), Some(1));
        assert_eq!(registry.arity("odd?"), Some(0));
        assert_eq!(registry.arity("nope?"), None);
    }

    #[test]
    fn validate_checks_arity_and_arguments() {
        let registry = PredicateRegistry::builtin();
        assert_eq!(
            registry.validate("gt?", &[]),
            Err(DefinitionError::ArityMismatch { name: "gt?".into(), expected: 1, found: 0 })
        );
        assert!(matches!(registry.validate("missing?", &[]), Err(DefinitionError::UnknownPredicate { .. })));
        assert!(matches!(
            registry.validate("format?", &[json!("(unclosed")]),
            Err(DefinitionError::InvalidArguments { .. })
        ));
        assert!(registry.validate("format?", &[json!("^a+$")]).is_ok());
    }

    #[test]
    fn custom_predicates_via_closures() {
        let mut registry = PredicateRegistry::builtin();
        registry.register_fn("divisible_by?", 1, |v, args| {
            match (v.as_i64(), args[0].as_i64()) {
                (Some(x), Some(d)) if d != 0 => x % d == 0,
                _ => false,
            }
        });
        assert!(registry.check("divisible_by?", &json!(9), &[json!(3)]));
        assert!(!registry.check("divisible_by?", &json!(9), &[json!(0)]));
        assert!(!registry.check("unknown?", &json!(9), &[]));
    }

    #[test]
    fn wrong_argument_count_fails_the_check() {
        let registry = PredicateRegistry::builtin();
        assert!(!registry.check("gt?", &json!(1), &[]));
        assert!(!registry.check("format?", &json!("a"), &[]));
        assert!(!registry.check("size?", &json!("ab"), &[]));
        assert!(!registry.check("even?", &json!(2), &[json!(1)]));
        assert!(registry.check("gt?", &json!(1), &[json!(0)]));
    }
}
