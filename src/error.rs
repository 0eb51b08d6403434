//! Definition-time errors. Raised while a schema is being declared, never
//! while one is being evaluated.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("key `{name}` is already defined in this scope")]
    DuplicateKey { name: String },

    #[error("unknown predicate `{name}`")]
    UnknownPredicate { name: String },

    #[error("predicate `{name}` expects {expected} argument(s), got {found}")]
    ArityMismatch { name: String, expected: usize, found: usize },

    #[error("invalid arguments for `{name}`: {reason}")]
    InvalidArguments { name: String, reason: String },

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("schema definition error: {0}")]
    SchemaDefinition(String),
}
