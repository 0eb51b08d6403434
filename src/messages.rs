//! Failure text. A failed predicate (or a hint for one that never ran) is
//! rendered from a template keyed by predicate name; `%{0}`, `%{1}`, ...
//! interpolate the predicate arguments and `%{input}` the value seen.
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::path::Path;

pub struct MessageInput<'a> {
    pub path: &'a Path,
    pub predicate: &'a str,
    pub args: &'a [Value],
    pub value: Option<&'a Value>,
    pub negated: bool,
}

pub trait MessageCompiler: Send + Sync {
    fn render(&self, input: &MessageInput<'_>) -> String;
}

const EN: &[(&str, &str)] = &[
    ("key?", "is missing"),
    ("nil?", "must be nil"),
    ("filled?", "must be filled"),
    ("empty?", "must be empty"),
    ("bool?", "must be boolean"),
    ("true?", "must be true"),
    ("false?", "must be false"),
    ("int?", "must be an integer"),
    ("float?", "must be a float"),
    ("number?", "must be a number"),
    ("str?", "must be a string"),
    ("array?", "must be an array"),
    ("hash?", "must be a hash"),
    ("date?", "must be a date"),
    ("date_time?", "must be a date time"),
    ("even?", "must be even"),
    ("odd?", "must be odd"),
    ("gt?", "must be greater than %{0}"),
    ("gteq?", "must be greater than or equal to %{0}"),
    ("lt?", "must be less than %{0}"),
    ("lteq?", "must be less than or equal to %{0}"),
    ("size?", "size must be %{0}"),
    ("min_size?", "size cannot be less than %{0}"),
    ("max_size?", "size cannot be greater than %{0}"),
    ("includes?", "must include %{0}"),
    ("excludes?", "must not include %{0}"),
    ("included_in?", "must be one of: %{0}"),
    ("excluded_from?", "must not be one of: %{0}"),
    ("eql?", "must be equal to %{0}"),
    ("not_eql?", "must not be equal to %{0}"),
    ("format?", "is in invalid format"),
];

const EN_NOT: &[(&str, &str)] = &[
    ("key?", "must not be present"),
    ("nil?", "cannot be nil"),
    ("filled?", "must be blank"),
    ("empty?", "cannot be empty"),
    ("format?", "must not match %{0}"),
];

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"%\{(\w+)\}").expect("static regex"));

/// Template-driven English messages.
#[derive(Debug, Clone)]
pub struct DefaultMessages {
    templates: IndexMap<String, String>,
    negated: IndexMap<String, String>,
    full: bool,
}

impl Default for DefaultMessages {
    fn default() -> Self { Self::english() }
}

impl DefaultMessages {
    pub fn english() -> Self {
        let own = |table: &[(&str, &str)]| -> IndexMap<String, String> {
            table.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        Self { templates: own(EN), negated: own(EN_NOT), full: false }
    }

    pub fn with_template(mut self, predicate: impl Into<String>, text: impl Into<String>) -> Self {
        self.templates.insert(predicate.into(), text.into());
        self
    }

    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in overrides {
            self.templates.insert(k.into(), v.into());
        }
        self
    }

    /// Prefix every message with its dotted path: `foo.0 must be an integer`.
    pub fn full(mut self, full: bool) -> Self {
        self.full = full;
        self
    }

    fn template(&self, predicate: &str, negated: bool) -> String {
        if negated {
            if let Some(t) = self.negated.get(predicate) {
                return t.clone();
            }
            return match self.templates.get(predicate) {
                Some(t) => negate(t),
                None => format!("must not satisfy {predicate}"),
            };
        }
        match self.templates.get(predicate) {
            Some(t) => t.clone(),
            None => "is invalid".to_string(),
        }
    }
}

impl MessageCompiler for DefaultMessages {
    fn render(&self, input: &MessageInput<'_>) -> String {
        let template = self.template(input.predicate, input.negated);
        let text = interpolate(&template, input.args, input.value);
        if self.full && !input.path.is_root() {
            format!("{} {text}", input.path)
        } else {
            text
        }
    }
}

/// "must be even" → "must not be even"; "is x" → "is not x".
fn negate(text: &str) -> String {
    if let Some(rest) = text.strip_prefix("must not ") {
        return format!("must {rest}");
    }
    if let Some(rest) = text.strip_prefix("must ") {
        return format!("must not {rest}");
    }
    if let Some(rest) = text.strip_prefix("is ") {
        return format!("is not {rest}");
    }
    format!("not: {text}")
}

fn interpolate(template: &str, args: &[Value], value: Option<&Value>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            if name == "input" {
                // no value at all (a missing key) reads as nil
                return value.map_or_else(|| "nil".to_string(), display_value);
            }
            match name.parse::<usize>().ok().and_then(|i| args.get(i)) {
                Some(v) => display_value(v),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn display_value(v: &Value) -> String {
    match v {
        Value::Null => "nil".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(xs) => xs.iter().map(display_value).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}
