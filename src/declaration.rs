//! Schema declarations as data: a recorded sequence of builder calls that
//! can be stored in a JSON file and replayed into a `SchemaBuilder`.
//!
//! ```json
//! {
//!   "config": { "processor": "params" },
//!   "keys": [
//!     { "name": "age", "macros": [{ "value": { "type": "integer", "predicates": [{ "gt?": 17 }] } }] },
//!     { "name": "nick", "required": false, "macros": [{ "maybe": { "type": "string" } }] },
//!     { "name": "tags", "macros": [{ "each": { "type": "string", "predicates": ["filled?"] } }] }
//!   ]
//! }
//! ```
//!
//! A predicate is either a bare name or a single-entry map from name to
//! arguments; an array value is the argument list, anything else is the
//! only argument (so a `size?` range is written `{ "size?": [[1, 3]] }`).
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::builder::{Pred, RuleBuilder, SchemaBuilder};
use crate::coercion::TypeId;
use crate::error::DefinitionError;
use crate::predicates::PredicateRegistry;
use crate::schema::{Schema, SchemaConfig};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("invalid declaration at {path}: {reason}")]
    Parse { path: String, reason: String },
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declaration {
    #[serde(default)]
    pub config: SchemaConfig,
    pub keys: Vec<KeyDecl>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyDecl {
    pub name: String,
    #[serde(default = "required_by_default")]
    pub required: bool,
    pub macros: Vec<MacroCall>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroCall {
    Value(MacroArgs),
    Filled(MacroArgs),
    Maybe(MacroArgs),
    Each(MacroArgs),    // `keys` makes every element a nested hash
    Hash(Vec<KeyDecl>),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MacroArgs {
    #[serde(rename = "type")]
    pub ty: Option<TypeId>,
    pub predicates: Vec<PredDecl>,
    pub keys: Option<Vec<KeyDecl>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PredDecl {
    Name(String),
    WithArgs(IndexMap<String, Value>),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Declaration {
    pub fn parse(src: &str) -> Result<Self, DeclarationError> { from_str_with_path(src) }

    pub fn compile(&self) -> Result<Schema, DeclarationError> {
        self.compile_with(PredicateRegistry::shared())
    }

    pub fn compile_with(&self, registry: Arc<PredicateRegistry>) -> Result<Schema, DeclarationError> {
        Ok(Schema::define_with(&self.config, registry, |builder| self.apply(builder))?)
    }

    /// Replay the recorded calls into `builder`.
    pub fn apply(&self, builder: &mut SchemaBuilder) -> Result<(), DefinitionError> {
        apply_keys(&self.keys, builder)
    }
}

impl MacroCall {
    fn apply(&self, rule: &mut RuleBuilder) -> Result<(), DefinitionError> {
        match self {
            MacroCall::Value(args) => {
                let preds = args.preds();
                match &args.ty {
                    Some(ty) => rule.value_of(ty.clone(), &preds)?,
                    None => rule.value(&preds)?,
                };
            }
            MacroCall::Filled(args) => {
                let preds = args.preds();
                match &args.ty {
                    Some(ty) => rule.filled_of(ty.clone(), &preds)?,
                    None => rule.filled(&preds)?,
                };
            }
            MacroCall::Maybe(args) => {
                let preds = args.preds();
                match &args.ty {
                    Some(ty) => rule.maybe_of(ty.clone(), &preds)?,
                    None => rule.maybe(&preds)?,
                };
            }
            MacroCall::Each(args) => {
                rule.each_with(|element| {
                    if let Some(ty) = &args.ty {
                        element.require_type(ty.clone())?;
                    }
                    element.value(&args.preds())?;
                    if let Some(keys) = &args.keys {
                        element.hash(|members| apply_keys(keys, members))?;
                    }
                    Ok(())
                })?;
            }
            MacroCall::Hash(keys) => {
                rule.hash(|members| apply_keys(keys, members))?;
            }
        }
        Ok(())
    }
}

impl MacroArgs {
    fn preds(&self) -> Vec<Pred> {
        self.predicates.iter().flat_map(PredDecl::to_preds).collect()
    }
}

impl PredDecl {
    fn to_preds(&self) -> Vec<Pred> {
        match self {
            PredDecl::Name(name) => vec![Pred::new(name.as_str())],
            PredDecl::WithArgs(map) => map
                .iter()
                .map(|(name, args)| Pred {
                    name: name.clone(),
                    args: match args {
                        Value::Array(xs) => xs.clone(),
                        other => vec![other.clone()],
                    },
                })
                .collect(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn required_by_default() -> bool { true }

fn apply_keys(keys: &[KeyDecl], builder: &mut SchemaBuilder) -> Result<(), DefinitionError> {
    for decl in keys {
        let key = builder.add_key(&decl.name, decl.required)?;
        for call in &decl.macros {
            call.apply(key)?;
        }
    }
    Ok(())
}

/// Deserialize with the JSON path of the offending field in the error.
pub(crate) fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, DeclarationError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| DeclarationError::Parse {
        path: err.path().to_string(),
        reason: err.into_inner().to_string(),
    })
}
