//! Incremental construction of rule trees.
//!
//! A `SchemaBuilder` is one scope (it compiles to a `Set`); each key gets a
//! `KeyBuilder`, which is a `RuleBuilder` plus the key's name and
//! requiredness. The low-level operations live here; the `value` /
//! `filled` / `maybe` / `each` / `hash` macros in `macros` are fixed
//! sequences of them.
//!
//! Type guards and nil allowance are recorded on the scope and applied
//! outermost when the rule is built, so predicates declared after the type
//! still run against the coerced value:
//!
//! ```text
//! Key(name, required, TypeGuard(maybe[T], Or(nil?, And(p1, p2, ...))))
//! ```
pub mod macros;

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::ast::{Node, NodeRef};
use crate::coercion::TypeId;
use crate::error::DefinitionError;
use crate::predicates::PredicateRegistry;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// A predicate call as declared: name plus literal arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Pred {
    pub name: String,
    pub args: Vec<Value>,
}

/// Rule for a single value (a key's value or an array element).
#[derive(Debug)]
pub struct RuleBuilder {
    registry: Arc<PredicateRegistry>,
    ty: Option<TypeId>,
    nullable: bool,
    parts: Vec<NodeRef>,
}

#[derive(Debug)]
pub struct KeyBuilder {
    name: String,
    required: bool,
    rule: RuleBuilder,
}

#[derive(Debug)]
pub struct SchemaBuilder {
    registry: Arc<PredicateRegistry>,
    keys: IndexMap<String, KeyBuilder>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

pub fn pred(name: &str) -> Pred { Pred::new(name) }

impl Pred {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), args: Vec::new() }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }
}

impl From<&str> for Pred {
    fn from(name: &str) -> Self { Pred::new(name) }
}

impl RuleBuilder {
    pub fn new(registry: Arc<PredicateRegistry>) -> Self {
        Self { registry, ty: None, nullable: false, parts: Vec::new() }
    }

    pub fn declared_type(&self) -> Option<&TypeId> { self.ty.as_ref() }

    /// Guard the rule with a coercion to `ty`; `maybe[T]` also allows nil.
    /// The type predicate joins the fragment so it is reported like any
    /// other predicate.
    pub fn require_type(&mut self, ty: TypeId) -> Result<&mut Self, DefinitionError> {
        let ty = match ty {
            TypeId::Maybe(inner) => {
                self.allow_nil();
                *inner
            }
            other => other,
        };
        if let Some(existing) = &self.ty {
            if !existing.accepts_redeclaration(&ty) {
                return Err(DefinitionError::SchemaDefinition(format!(
                    "type already declared as `{existing}`, cannot redeclare as `{ty}`"
                )));
            }
        }
        let keeps_member = matches!(self.ty, Some(TypeId::Array(Some(_)))) && ty == TypeId::Array(None);
        if !keeps_member {
            self.ty = Some(ty.clone());
        }
        if let Some(name) = ty.predicate() {
            self.push_predicate(name, Vec::new())?;
        }
        Ok(self)
    }

    pub fn add_predicate(&mut self, name: &str, args: Vec<Value>) -> Result<&mut Self, DefinitionError> {
        self.push_predicate(name, args)?;
        Ok(self)
    }

    /// Apply `element`'s rule to every element. Implies an array type.
    pub fn nest_array(&mut self, element: RuleBuilder) -> Result<&mut Self, DefinitionError> {
        match self.ty.clone() {
            Some(ty) if !ty.is_array() => {
                return Err(DefinitionError::SchemaDefinition(format!(
                    "`each` needs an array, but the type is `{ty}`"
                )));
            }
            Some(_) => {}
            None => {
                self.require_type(TypeId::Array(None))?;
            }
        }
        let inner = element.build()?.ok_or_else(|| {
            DefinitionError::SchemaDefinition("`each` declares no element rules".to_string())
        })?;
        self.push(Node::each(inner));
        Ok(self)
    }

    /// Apply a nested scope to the value. Implies a hash type.
    pub fn nest_hash(&mut self, members: SchemaBuilder) -> Result<&mut Self, DefinitionError> {
        match self.ty.clone() {
            Some(ty) if !ty.is_hash() => {
                return Err(DefinitionError::SchemaDefinition(format!(
                    "nested keys need a hash, but the type is `{ty}`"
                )));
            }
            Some(_) => {}
            None => {
                self.require_type(TypeId::Hash)?;
            }
        }
        let set = members.build()?;
        self.push(set);
        Ok(self)
    }

    /// nil (and, for params, the empty string) passes before anything else runs.
    pub fn allow_nil(&mut self) -> &mut Self {
        self.nullable = true;
        self
    }

    /// Fresh builder for an array element, sharing this scope's registry.
    pub fn element(&self) -> RuleBuilder { RuleBuilder::new(self.registry.clone()) }

    /// Fresh nested scope, sharing this scope's registry.
    pub fn members(&self) -> SchemaBuilder { SchemaBuilder::with_registry(self.registry.clone()) }

    /// `None` when nothing was declared.
    pub fn build(self) -> Result<Option<NodeRef>, DefinitionError> {
        let RuleBuilder { registry, ty, nullable, parts } = self;
        let mut body = Node::conjunction(parts);
        if nullable {
            let rest = match body {
                Some(b) => b,
                None => {
                    registry.validate("filled?", &[])?;
                    Node::predicate("filled?", Vec::new())
                }
            };
            registry.validate("nil?", &[])?;
            body = Some(Node::or(Node::predicate("nil?", Vec::new()), rest));
        }
        match ty {
            None | Some(TypeId::Any) => Ok(body),
            Some(ty) => {
                let ty = if nullable { ty.maybe() } else { ty };
                Ok(body.map(|b| Node::guard(ty, b)))
            }
        }
    }

    fn push_predicate(&mut self, name: &str, args: Vec<Value>) -> Result<(), DefinitionError> {
        self.registry.validate(name, &args)?;
        self.push(Node::predicate(name, args));
        Ok(())
    }

    /// Structurally identical parts are kept once.
    fn push(&mut self, node: NodeRef) {
        if !self.parts.contains(&node) {
            self.parts.push(node);
        }
    }
}

impl KeyBuilder {
    pub fn name(&self) -> &str { &self.name }
    pub fn is_required(&self) -> bool { self.required }

    /// An absent key passes without running its rule.
    pub fn allow_missing(&mut self) -> &mut Self {
        self.required = false;
        self
    }

    fn build(self) -> Result<NodeRef, DefinitionError> {
        let inner = self.rule.build()?.ok_or_else(|| {
            DefinitionError::SchemaDefinition(format!("key `{}` declares no rules", self.name))
        })?;
        tracing::debug!(key = %self.name, required = self.required, "compiled key rule");
        Ok(Node::key(self.name, self.required, inner))
    }
}

impl Deref for KeyBuilder {
    type Target = RuleBuilder;
    fn deref(&self) -> &RuleBuilder { &self.rule }
}

impl DerefMut for KeyBuilder {
    fn deref_mut(&mut self) -> &mut RuleBuilder { &mut self.rule }
}

impl Default for SchemaBuilder {
    fn default() -> Self { Self::new() }
}

impl SchemaBuilder {
    pub fn new() -> Self { Self::with_registry(PredicateRegistry::shared()) }

    pub fn with_registry(registry: Arc<PredicateRegistry>) -> Self {
        Self { registry, keys: IndexMap::new() }
    }

    pub fn registry(&self) -> &Arc<PredicateRegistry> { &self.registry }

    pub fn add_key(&mut self, name: &str, required: bool) -> Result<&mut KeyBuilder, DefinitionError> {
        if self.keys.contains_key(name) {
            return Err(DefinitionError::DuplicateKey { name: name.to_string() });
        }
        let key = KeyBuilder {
            name: name.to_string(),
            required,
            rule: RuleBuilder::new(self.registry.clone()),
        };
        Ok(self.keys.entry(name.to_string()).or_insert(key))
    }

    pub fn required(&mut self, name: &str) -> Result<&mut KeyBuilder, DefinitionError> {
        self.add_key(name, true)
    }

    pub fn optional(&mut self, name: &str) -> Result<&mut KeyBuilder, DefinitionError> {
        self.add_key(name, false)
    }

    pub fn len(&self) -> usize { self.keys.len() }
    pub fn is_empty(&self) -> bool { self.keys.is_empty() }

    /// Compile the scope into a `Set` of `Key` nodes, in declaration order.
    pub fn build(self) -> Result<NodeRef, DefinitionError> {
        let members = self
            .keys
            .into_values()
            .map(KeyBuilder::build)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node::set(members))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
