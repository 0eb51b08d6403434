use std::sync::RwLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use super::{Predicate, PredicateRegistry};

pub(super) fn register(registry: &mut PredicateRegistry) {
    registry.register("format?", Format::default());
}

/// `format?(pattern)`: the string value matches the regex `pattern`.
///
/// Patterns are compiled once, when the rule is defined, and reused by
/// every check after that.
#[derive(Default)]
struct Format {
    compiled: RwLock<IndexMap<String, Regex>>,
}

impl Format {
    fn regex(&self, pattern: &str) -> Result<Regex, regex::Error> {
        if let Some(rx) = self.compiled.read().ok().and_then(|cache| cache.get(pattern).cloned()) {
            return Ok(rx);
        }
        let rx = Regex::new(pattern)?;
        if let Ok(mut cache) = self.compiled.write() {
            cache.insert(pattern.to_string(), rx.clone());
        }
        Ok(rx)
    }

    #[cfg(test)]
    fn cached(&self) -> usize {
        self.compiled.read().map_or(0, |cache| cache.len())
    }
}

impl Predicate for Format {
    fn arity(&self) -> usize { 1 }

    fn check(&self, value: &Value, args: &[Value]) -> bool {
        let (Some(s), Some(pattern)) = (value.as_str(), args.first().and_then(Value::as_str)) else {
            return false;
        };
        self.regex(pattern).is_ok_and(|rx| rx.is_match(s))
    }

    fn validate_args(&self, args: &[Value]) -> Result<(), String> {
        let pattern = args.first().and_then(Value::as_str).ok_or("pattern must be a string")?;
        self.regex(pattern).map(|_| ()).map_err(|e| e.to_string())
    }
}
