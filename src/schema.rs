//! A compiled schema: the root rule tree plus the collaborators needed to
//! run it. Immutable and `Send + Sync`, so one instance can validate many
//! documents concurrently.
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ast::NodeRef;
use crate::builder::SchemaBuilder;
use crate::coercion::{JsonCoercer, ParamsCoercer, TypeCoercer};
use crate::error::DefinitionError;
use crate::eval::{Evaluator, ResultNode};
use crate::messages::{DefaultMessages, MessageCompiler};
use crate::path::Path;
use crate::predicates::PredicateRegistry;
use crate::report::{Aggregator, ValidationReport};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// How raw values are coerced before predicates see them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Processor {
    #[default]
    Params,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    pub processor: Processor,
    /// Report predicates that never ran behind a failed guard or key.
    pub hints: bool,
    /// Prefix messages with the dotted path.
    pub full_messages: bool,
    /// Per-predicate template overrides, e.g. `"even?": "needs to be even"`.
    pub messages: IndexMap<String, String>,
}

#[derive(Clone)]
pub struct Schema {
    root: NodeRef,
    registry: Arc<PredicateRegistry>,
    coercer: Arc<dyn TypeCoercer>,
    messages: Arc<dyn MessageCompiler>,
    hints: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            processor: Processor::default(),
            hints: true,
            full_messages: false,
            messages: IndexMap::new(),
        }
    }
}

impl Processor {
    pub fn coercer(self) -> Arc<dyn TypeCoercer> {
        match self {
            Processor::Params => Arc::new(ParamsCoercer),
            Processor::Json => Arc::new(JsonCoercer),
        }
    }
}

impl Schema {
    /// Declare the root scope with `f` and compile it against the built-in
    /// predicates.
    pub fn define<F>(config: &SchemaConfig, f: F) -> Result<Self, DefinitionError>
    where
        F: FnOnce(&mut SchemaBuilder) -> Result<(), DefinitionError>,
    {
        Self::define_with(config, PredicateRegistry::shared(), f)
    }

    pub fn define_with<F>(config: &SchemaConfig, registry: Arc<PredicateRegistry>, f: F) -> Result<Self, DefinitionError>
    where
        F: FnOnce(&mut SchemaBuilder) -> Result<(), DefinitionError>,
    {
        let mut builder = SchemaBuilder::with_registry(registry.clone());
        f(&mut builder)?;
        let keys = builder.len();
        let root = builder.build()?;
        tracing::debug!(keys, processor = ?config.processor, hints = config.hints, "compiled schema");
        Ok(Self::from_root(root, registry, config))
    }

    /// Params processor with default settings.
    pub fn params<F>(f: F) -> Result<Self, DefinitionError>
    where
        F: FnOnce(&mut SchemaBuilder) -> Result<(), DefinitionError>,
    {
        Self::define(&SchemaConfig::default(), f)
    }

    /// JSON processor with default settings.
    pub fn json<F>(f: F) -> Result<Self, DefinitionError>
    where
        F: FnOnce(&mut SchemaBuilder) -> Result<(), DefinitionError>,
    {
        let config = SchemaConfig { processor: Processor::Json, ..SchemaConfig::default() };
        Self::define(&config, f)
    }

    pub fn from_root(root: NodeRef, registry: Arc<PredicateRegistry>, config: &SchemaConfig) -> Self {
        let messages = DefaultMessages::english()
            .with_overrides(config.messages.clone())
            .full(config.full_messages);
        Self {
            root,
            registry,
            coercer: config.processor.coercer(),
            messages: Arc::new(messages),
            hints: config.hints,
        }
    }

    pub fn with_coercer(mut self, coercer: Arc<dyn TypeCoercer>) -> Self {
        self.coercer = coercer;
        self
    }

    pub fn with_messages(mut self, messages: Arc<dyn MessageCompiler>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_hints(mut self, hints: bool) -> Self {
        self.hints = hints;
        self
    }

    pub fn root(&self) -> &NodeRef { &self.root }

    pub fn evaluate(&self, input: &Value) -> ResultNode {
        Evaluator::new(&self.registry, self.coercer.as_ref()).evaluate(&self.root, input, &Path::root())
    }

    pub fn aggregate(&self, result: &ResultNode) -> ValidationReport {
        Aggregator::new(self.messages.as_ref()).hints(self.hints).aggregate(result)
    }

    /// Validate `input`: evaluate, aggregate, and attach the coerced output.
    pub fn call(&self, input: &Value) -> ValidationReport {
        let result = self.evaluate(input);
        let mut report = self.aggregate(&result);
        report.output = Some(result.output(input));
        tracing::trace!(success = report.success, failures = report.failures.len(), "validated document");
        report
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("root", &self.root)
            .field("registry", &self.registry)
            .field("hints", &self.hints)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Pred, pred};
    use crate::coercion::TypeId;
    use rayon::prelude::*;
    use serde_json::json;

    fn even_schema() -> Schema {
        Schema::params(|s| {
            s.required("foo")?.value_of(TypeId::Integer, &[pred("even?")])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn schema_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema>();
    }

    #[test]
    fn even_integer_scenario() {
        let schema = even_schema();
        assert_eq!(schema.call(&json!({})).messages(), vec!["is missing", "must be an integer", "must be even"]);
        assert!(schema.call(&json!({ "foo": "2" })).is_success());
        assert_eq!(schema.call(&json!({ "foo": "1" })).messages(), vec!["must be even"]);
    }

    #[test]
    fn includes_on_a_typed_array() {
        let schema = Schema::params(|s| {
            s.required("foo")?
                .value_of(TypeId::array_of(TypeId::Integer), &[])?
                .each(&[pred("int?")])?
                .value(&[Pred::new("includes?").arg(1)])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(schema.call(&json!({ "foo": ["2", "3", "4"] })).messages(), vec!["must include 1"]);
        assert_eq!(schema.call(&json!({ "foo": "" })).messages(), vec!["must include 1"]);
        assert_eq!(schema.call(&json!({ "foo": null })).messages(), vec!["must be an array", "must include 1"]);
        assert_eq!(
            schema.call(&json!({})).messages(),
            vec!["is missing", "must be an array", "must include 1"]
        );
        let ok = schema.call(&json!({ "foo": ["3", "1"] }));
        assert!(ok.is_success());
        assert_eq!(ok.output, Some(json!({ "foo": [3, 1] })));
    }

    #[test]
    fn optional_maybe_accepts_nil() {
        let schema = Schema::params(|s| {
            s.optional("foo")?.maybe_of(TypeId::Integer, &[pred("even?")])?;
            Ok(())
        })
        .unwrap();
        assert!(schema.call(&json!({ "foo": null })).is_success());
        assert!(schema.call(&json!({})).is_success());
        assert_eq!(schema.call(&json!({ "foo": [] })).messages(), vec!["must be an integer", "must be even"]);
    }

    #[test]
    fn output_drops_undeclared_keys() {
        let report = even_schema().call(&json!({ "foo": "4", "bar": 1 }));
        assert_eq!(report.output, Some(json!({ "foo": 4 })));
    }

    #[test]
    fn json_processor_does_not_parse_strings() {
        let schema = Schema::json(|s| {
            s.required("foo")?.value_of(TypeId::Integer, &[pred("even?")])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(schema.call(&json!({ "foo": "2" })).messages(), vec!["must be an integer", "must be even"]);
        assert!(schema.call(&json!({ "foo": 2 })).is_success());
    }

    #[test]
    fn config_drives_messages() {
        let config: SchemaConfig = serde_json::from_value(json!({
            "hints": false,
            "full_messages": true,
            "messages": { "even?": "needs to be even" }
        }))
        .unwrap();
        assert_eq!(config.processor, Processor::Params);
        let schema = Schema::define(&config, |s| {
            s.required("foo")?.value_of(TypeId::Integer, &[pred("even?")])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(schema.call(&json!({ "foo": "3" })).messages(), vec!["foo needs to be even"]);
        assert_eq!(schema.call(&json!({})).messages(), vec!["foo is missing"]);
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let parsed = serde_json::from_value::<SchemaConfig>(json!({ "hint": true }));
        assert!(parsed.is_err());
    }

    #[test]
    fn definition_errors_abort_compilation() {
        let err = Schema::params(|s| {
            s.required("foo")?.value(&[pred("even?")])?;
            s.required("foo")?;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(err, DefinitionError::DuplicateKey { name: "foo".into() });
    }

    #[test]
    fn parallel_validation_matches_sequential() {
        let schema = even_schema();
        let inputs: Vec<Value> = (0..64).map(|i| json!({ "foo": i.to_string() })).collect();
        let sequential: Vec<_> = inputs.iter().map(|v| schema.call(v)).collect();
        let parallel: Vec<_> = inputs.par_iter().map(|v| schema.call(v)).collect();
        assert_eq!(sequential, parallel);
        assert_eq!(parallel.iter().filter(|r| r.is_success()).count(), 32);
    }
}
