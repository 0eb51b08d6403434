//! Declarative schema rules: build a rule tree with `SchemaBuilder`,
//! evaluate it against a `serde_json::Value`, and aggregate the result into
//! ordered per-field messages.
//!
//! ```no_run
//! use schema_rules::{Schema, TypeId, pred};
//! use serde_json::json;
//!
//! let schema = Schema::params(|s| {
//!     s.required("foo")?.value_of(TypeId::Integer, &[pred("even?")])?;
//!     Ok(())
//! })?;
//! let report = schema.call(&json!({ "foo": "1" }));
//! assert_eq!(report.messages(), vec!["must be even"]);
//! # Ok::<(), schema_rules::DefinitionError>(())
//! ```
pub mod ast;
pub mod builder;
pub mod cli;
pub mod coercion;
pub mod declaration;
pub mod error;
pub mod eval;
pub mod messages;
pub mod path;
pub mod predicates;
pub mod report;
pub mod scenario;
pub mod schema;

pub use ast::{Node, NodeRef};
pub use builder::{KeyBuilder, Pred, RuleBuilder, SchemaBuilder, pred};
pub use coercion::{CoercionError, JsonCoercer, ParamsCoercer, TypeCoercer, TypeId};
pub use declaration::{Declaration, DeclarationError};
pub use error::DefinitionError;
pub use eval::{Evaluator, Outcome, ResultKind, ResultNode};
pub use messages::{DefaultMessages, MessageCompiler, MessageInput};
pub use path::{Path, Segment};
pub use predicates::{Predicate, PredicateRegistry};
pub use report::{Aggregator, Failure, FailureKind, ValidationReport};
pub use schema::{Processor, Schema, SchemaConfig};
