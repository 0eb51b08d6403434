//! The declaration macros. Each one is a fixed sequence of the low-level
//! `RuleBuilder` operations, so a key may chain several of them.
use crate::coercion::TypeId;
use crate::error::DefinitionError;

use super::{Pred, RuleBuilder, SchemaBuilder};

impl RuleBuilder {
    /// Predicates only; a type, if any, comes from another macro.
    pub fn value(&mut self, preds: &[Pred]) -> Result<&mut Self, DefinitionError> {
        self.add_all(preds)
    }

    pub fn value_of(&mut self, ty: TypeId, preds: &[Pred]) -> Result<&mut Self, DefinitionError> {
        self.require_type(ty)?;
        self.add_all(preds)
    }

    /// `filled?` first, then `preds`.
    pub fn filled(&mut self, preds: &[Pred]) -> Result<&mut Self, DefinitionError> {
        self.add_predicate("filled?", Vec::new())?;
        self.add_all(preds)
    }

    /// Like `filled`, but `filled?` is left out for types that are never
    /// empty once coerced (`filled(:integer)` is just `int?`).
    pub fn filled_of(&mut self, ty: TypeId, preds: &[Pred]) -> Result<&mut Self, DefinitionError> {
        let fillable = ty.is_fillable();
        self.require_type(ty)?;
        if fillable {
            self.add_predicate("filled?", Vec::new())?;
        }
        self.add_all(preds)
    }

    /// nil passes; anything else must satisfy `preds` (or `filled?` when
    /// nothing else is declared).
    pub fn maybe(&mut self, preds: &[Pred]) -> Result<&mut Self, DefinitionError> {
        self.allow_nil();
        self.add_all(preds)
    }

    pub fn maybe_of(&mut self, ty: TypeId, preds: &[Pred]) -> Result<&mut Self, DefinitionError> {
        self.allow_nil();
        self.require_type(ty)?;
        self.add_all(preds)
    }

    /// Every element satisfies `preds`.
    pub fn each(&mut self, preds: &[Pred]) -> Result<&mut Self, DefinitionError> {
        let mut element = self.element();
        element.add_all(preds)?;
        self.nest_array(element)
    }

    /// Every element coerces to `ty` and satisfies `preds`.
    pub fn each_of(&mut self, ty: TypeId, preds: &[Pred]) -> Result<&mut Self, DefinitionError> {
        let mut element = self.element();
        element.require_type(ty)?;
        element.add_all(preds)?;
        self.nest_array(element)
    }

    /// Element rule built by `f`, for elements that need their own macros
    /// (an array of hashes, for instance).
    pub fn each_with<F>(&mut self, f: F) -> Result<&mut Self, DefinitionError>
    where
        F: FnOnce(&mut RuleBuilder) -> Result<(), DefinitionError>,
    {
        let mut element = self.element();
        f(&mut element)?;
        self.nest_array(element)
    }

    /// Nested keys declared by `f`.
    pub fn hash<F>(&mut self, f: F) -> Result<&mut Self, DefinitionError>
    where
        F: FnOnce(&mut SchemaBuilder) -> Result<(), DefinitionError>,
    {
        let mut members = self.members();
        f(&mut members)?;
        self.nest_hash(members)
    }

    fn add_all(&mut self, preds: &[Pred]) -> Result<&mut Self, DefinitionError> {
        for p in preds {
            self.add_predicate(&p.name, p.args.clone())?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::Node;
    use crate::builder::{SchemaBuilder, pred};
    use crate::coercion::TypeId;

    #[test]
    fn empty_maybe_means_nil_or_filled() {
        let mut schema = SchemaBuilder::new();
        schema.required("name").unwrap().maybe(&[]).unwrap();
        let set = schema.build().unwrap();
        let expected = Node::set(vec![Node::key(
            "name",
            true,
            Node::or(Node::predicate("nil?", vec![]), Node::predicate("filled?", vec![])),
        )]);
        assert_eq!(set, expected);
    }

    #[test]
    fn untyped_filled_keeps_declared_order() {
        let mut schema = SchemaBuilder::new();
        schema.required("x").unwrap().filled(&[pred("str?")]).unwrap();
        let expected = Node::set(vec![Node::key(
            "x",
            true,
            Node::and(Node::predicate("filled?", vec![]), Node::predicate("str?", vec![])),
        )]);
        assert_eq!(schema.build().unwrap(), expected);
    }

    #[test]
    fn each_with_nests_hashes() {
        let mut schema = SchemaBuilder::new();
        schema
            .required("people")
            .unwrap()
            .each_with(|el| {
                el.hash(|m| {
                    m.required("name")?.filled_of(TypeId::String, &[])?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();
        let set = schema.build().unwrap();
        let Node::Set(keys) = set.as_ref() else { panic!("expected set") };
        let Node::Key { inner, .. } = keys[0].as_ref() else { panic!("expected key") };
        let Node::TypeGuard { ty, inner } = inner.as_ref() else { panic!("expected guard") };
        assert_eq!(ty, &TypeId::Array(None));
        let Node::And(_, each) = inner.as_ref() else { panic!("expected and") };
        assert!(matches!(each.as_ref(), Node::Each(_)));
    }
}
