//! Walks a rule tree against an input value.
//!
//! The result tree mirrors the rule tree. Subtrees that were not evaluated
//! because of a short-circuit are kept as `Skipped` nodes holding the
//! unevaluated rule, which the aggregator turns into hints.
use serde_json::{Map, Value};

use crate::ast::{Node, NodeRef};
use crate::coercion::{TypeCoercer, TypeId};
use crate::path::Path;
use crate::predicates::PredicateRegistry;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultNode {
    pub path: Path,
    pub outcome: Outcome,
    /// Value checked by a predicate leaf; for a type guard the coerced
    /// value, or the raw one when coercion failed. A skipped node keeps the
    /// value it would have been checked against (none for a missing key).
    pub value: Option<Value>,
    pub kind: ResultKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultKind {
    Predicate { name: String, args: Vec<Value> },
    TypeGuard { ty: TypeId, coerced: bool, inner: Box<ResultNode> },
    And(Box<ResultNode>, Box<ResultNode>),
    Or(Box<ResultNode>, Box<ResultNode>),
    Not(Box<ResultNode>),
    Key { name: String, required: bool, present: bool, inner: Box<ResultNode> },
    Each(Vec<ResultNode>),
    Set(Vec<ResultNode>),
    Skipped(NodeRef),
}

/// Borrowing evaluator; cheap to build per call.
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    registry: &'a PredicateRegistry,
    coercer: &'a dyn TypeCoercer,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a PredicateRegistry, coercer: &'a dyn TypeCoercer) -> Self {
        Self { registry, coercer }
    }

    pub fn evaluate(&self, node: &NodeRef, value: &Value, path: &Path) -> ResultNode {
        match node.as_ref() {
            Node::Predicate { name, args } => {
                let passed = self.registry.check(name, value, args);
                tracing::trace!(%path, predicate = %name, passed, "predicate");
                ResultNode::leaf(path, name, args, value, passed)
            }
            Node::TypeGuard { ty, inner } => match self.coercer.coerce(ty, value) {
                Ok(coerced) => {
                    let inner = self.evaluate(inner, &coerced, path);
                    ResultNode {
                        path: path.clone(),
                        outcome: inner.outcome,
                        value: Some(coerced),
                        kind: ResultKind::TypeGuard { ty: ty.clone(), coerced: true, inner: Box::new(inner) },
                    }
                }
                Err(err) => {
                    tracing::trace!(%path, %err, "coercion failed");
                    ResultNode {
                        path: path.clone(),
                        outcome: Outcome::Failed,
                        value: Some(value.clone()),
                        kind: ResultKind::TypeGuard {
                            ty: ty.clone(),
                            coerced: false,
                            inner: Box::new(ResultNode::skipped(inner, path, Some(value))),
                        },
                    }
                }
            },
            Node::And(l, r) => {
                let left = self.evaluate(l, value, path);
                let right = if left.halts() {
                    ResultNode::skipped(r, path, Some(value))
                } else {
                    self.evaluate(r, value, path)
                };
                let outcome = if left.failed() || right.failed() { Outcome::Failed } else { Outcome::Passed };
                ResultNode::branch(path, outcome, ResultKind::And(Box::new(left), Box::new(right)))
            }
            Node::Or(l, r) => {
                let left = self.evaluate(l, value, path);
                let (right, outcome) = if left.passed() {
                    (ResultNode::skipped(r, path, Some(value)), Outcome::Passed)
                } else {
                    let right = self.evaluate(r, value, path);
                    let outcome = right.outcome;
                    (right, outcome)
                };
                ResultNode::branch(path, outcome, ResultKind::Or(Box::new(left), Box::new(right)))
            }
            Node::Not(inner) => {
                let inner = self.evaluate(inner, value, path);
                let outcome = if inner.passed() { Outcome::Failed } else { Outcome::Passed };
                ResultNode::branch(path, outcome, ResultKind::Not(Box::new(inner)))
            }
            Node::Key { name, required, inner } => {
                let Some(map) = value.as_object() else {
                    return ResultNode::leaf(path, "hash?", &[], value, false);
                };
                let child = path.child_key(name);
                let (inner, present, outcome) = match map.get(name) {
                    Some(found) => {
                        let inner = self.evaluate(inner, found, &child);
                        let outcome = inner.outcome;
                        (inner, true, outcome)
                    }
                    None => {
                        let outcome = if *required { Outcome::Failed } else { Outcome::Passed };
                        (ResultNode::skipped(inner, &child, None), false, outcome)
                    }
                };
                let kind = ResultKind::Key { name: name.clone(), required: *required, present, inner: Box::new(inner) };
                ResultNode::branch(&child, outcome, kind)
            }
            Node::Each(inner) => {
                let Some(items) = value.as_array() else {
                    return ResultNode::leaf(path, "array?", &[], value, false);
                };
                let results = items
                    .iter()
                    .enumerate()
                    .map(|(ix, item)| self.evaluate(inner, item, &path.child_index(ix)))
                    .collect::<Vec<_>>();
                ResultNode::branch(path, all_passed(&results), ResultKind::Each(results))
            }
            Node::Set(members) => {
                if !value.is_object() {
                    return ResultNode::leaf(path, "hash?", &[], value, false);
                }
                let results = members
                    .iter()
                    .map(|member| self.evaluate(member, value, path))
                    .collect::<Vec<_>>();
                ResultNode::branch(path, all_passed(&results), ResultKind::Set(results))
            }
        }
    }
}

impl ResultNode {
    pub fn passed(&self) -> bool { self.outcome == Outcome::Passed }
    pub fn failed(&self) -> bool { self.outcome == Outcome::Failed }

    /// A failure that must stop the rest of an `And` chain: the value could
    /// not be coerced, or the key is not there at all.
    pub fn halts(&self) -> bool {
        self.failed()
            && matches!(
                self.kind,
                ResultKind::TypeGuard { coerced: false, .. } | ResultKind::Key { present: false, .. }
            )
    }

    /// The document as the rules saw it: coerced values in place of raw ones,
    /// and only declared keys kept in validated mappings. `input` must be the
    /// value this node was evaluated against.
    pub fn output(&self, input: &Value) -> Value {
        match &self.kind {
            ResultKind::TypeGuard { coerced: true, inner, .. } => match &self.value {
                Some(coerced) => inner.output(coerced),
                None => input.clone(),
            },
            ResultKind::And(left, right) => {
                let left = left.output(input);
                right.output(&left)
            }
            ResultKind::Or(left, right) => match right.outcome {
                Outcome::Skipped => left.output(input),
                _ => right.output(input),
            },
            ResultKind::Each(items) => match input.as_array() {
                Some(values) => Value::Array(
                    items.iter().zip(values).map(|(item, value)| item.output(value)).collect(),
                ),
                None => input.clone(),
            },
            ResultKind::Set(members) => match input.as_object() {
                Some(map) => {
                    let mut out = Map::new();
                    for member in members {
                        let ResultKind::Key { name, present: true, inner, .. } = &member.kind else {
                            continue;
                        };
                        if let Some(found) = map.get(name) {
                            out.insert(name.clone(), inner.output(found));
                        }
                    }
                    Value::Object(out)
                }
                None => input.clone(),
            },
            _ => input.clone(),
        }
    }

    fn leaf(path: &Path, name: &str, args: &[Value], value: &Value, passed: bool) -> Self {
        Self {
            path: path.clone(),
            outcome: if passed { Outcome::Passed } else { Outcome::Failed },
            value: Some(value.clone()),
            kind: ResultKind::Predicate { name: name.to_string(), args: args.to_vec() },
        }
    }

    fn skipped(node: &NodeRef, path: &Path, value: Option<&Value>) -> Self {
        Self {
            path: path.clone(),
            outcome: Outcome::Skipped,
            value: value.cloned(),
            kind: ResultKind::Skipped(node.clone()),
        }
    }

    fn branch(path: &Path, outcome: Outcome, kind: ResultKind) -> Self {
        Self { path: path.clone(), outcome, value: None, kind }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn all_passed(results: &[ResultNode]) -> Outcome {
    if results.iter().any(ResultNode::failed) { Outcome::Failed } else { Outcome::Passed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coercion::{JsonCoercer, ParamsCoercer};
    use serde_json::json;

    fn p(name: &str) -> NodeRef { Node::predicate(name, vec![]) }

    fn run(node: &NodeRef, input: Value) -> ResultNode {
        let registry = PredicateRegistry::builtin();
        Evaluator::new(&registry, &ParamsCoercer).evaluate(node, &input, &Path::root())
    }

    fn even_schema() -> NodeRef {
        Node::set(vec![Node::key("foo", true, Node::guard(TypeId::Integer, Node::and(p("int?"), p("even?"))))])
    }

    #[test]
    fn missing_required_key_skips_its_rule() {
        let result = run(&even_schema(), json!({}));
        assert!(result.failed());
        let ResultKind::Set(members) = &result.kind else { panic!("expected set") };
        let ResultKind::Key { present, inner, .. } = &members[0].kind else { panic!("expected key") };
        assert!(!present);
        assert_eq!(members[0].path, Path::from("foo"));
        assert_eq!(inner.outcome, Outcome::Skipped);
        assert_eq!(inner.value, None);
    }

    #[test]
    fn missing_optional_key_passes() {
        let schema = Node::set(vec![Node::key("foo", false, p("int?"))]);
        assert!(run(&schema, json!({})).passed());
    }

    #[test]
    fn coercion_failure_never_reaches_the_inner_rule() {
        let result = run(&even_schema(), json!({ "foo": [] }));
        let ResultKind::Set(members) = &result.kind else { panic!("expected set") };
        let ResultKind::Key { inner, .. } = &members[0].kind else { panic!("expected key") };
        let ResultKind::TypeGuard { coerced, inner, .. } = &inner.kind else { panic!("expected guard") };
        assert!(!coerced);
        assert!(matches!(inner.kind, ResultKind::Skipped(_)));
        assert_eq!(inner.value, Some(json!([])));
    }

    #[test]
    fn coerced_value_reaches_predicates() {
        assert!(run(&even_schema(), json!({ "foo": "2" })).passed());
        assert!(run(&even_schema(), json!({ "foo": "1" })).failed());
    }

    #[test]
    fn and_keeps_going_after_plain_predicate_failures() {
        let rule = Node::and(p("filled?"), Node::predicate("includes?", vec![json!("Hello")]));
        let result = run(&rule, json!(null));
        let ResultKind::And(left, right) = &result.kind else { panic!("expected and") };
        assert!(left.failed());
        assert!(right.failed());
    }

    #[test]
    fn or_skips_right_when_left_passes() {
        let rule = Node::or(p("nil?"), p("int?"));
        let result = run(&rule, json!(null));
        assert!(result.passed());
        let ResultKind::Or(_, right) = &result.kind else { panic!("expected or") };
        assert_eq!(right.outcome, Outcome::Skipped);
        assert!(run(&rule, json!("x")).failed());
    }

    #[test]
    fn not_inverts() {
        let rule = Node::not(p("even?"));
        assert!(run(&rule, json!(3)).passed());
        assert!(run(&rule, json!(4)).failed());
    }

    #[test]
    fn each_indexes_paths_and_accepts_empty_sequences() {
        let rule = Node::each(Node::guard(TypeId::Integer, p("int?")));
        let result = run(&rule, json!(["1", "x", 3]));
        let ResultKind::Each(items) = &result.kind else { panic!("expected each") };
        assert_eq!(items.len(), 3);
        assert!(items[1].failed());
        assert_eq!(items[1].path, Path::root().index(1));
        assert!(run(&rule, json!([])).passed());
    }

    #[test]
    fn structural_mismatches_fail_as_leaves() {
        for (rule, input, expected) in [
            (Node::each(p("int?")), json!("nope"), "array?"),
            (even_schema(), json!(5), "hash?"),
            (Node::key("foo", true, p("int?")), json!([1]), "hash?"),
        ] {
            let result = run(&rule, input);
            assert!(result.failed());
            assert!(matches!(&result.kind, ResultKind::Predicate { name, .. } if name == expected));
        }
    }

    #[test]
    fn evaluation_is_deterministic() {
        let schema = even_schema();
        assert_eq!(run(&schema, json!({ "foo": "x" })), run(&schema, json!({ "foo": "x" })));
    }

    #[test]
    fn output_carries_coerced_values_for_declared_keys() {
        let schema = Node::set(vec![
            Node::key("age", true, Node::guard(TypeId::Integer, p("int?"))),
            Node::key(
                "tags",
                false,
                Node::guard(TypeId::Array(None), Node::and(p("array?"), Node::each(Node::guard(TypeId::Integer, p("int?"))))),
            ),
        ]);
        let input = json!({ "age": "42", "tags": ["1", "2"], "extra": true });
        let result = run(&schema, input.clone());
        assert_eq!(result.output(&input), json!({ "age": 42, "tags": [1, 2] }));
    }

    #[test]
    fn json_processor_is_strict() {
        let registry = PredicateRegistry::builtin();
        let eval = Evaluator::new(&registry, &JsonCoercer);
        let result = eval.evaluate(&even_schema(), &json!({ "foo": "2" }), &Path::root());
        assert!(result.failed());
    }
}
