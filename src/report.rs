//! Flattens a result tree into ordered, de-duplicated messages.
//!
//! Only failed nodes are descended into. A `Skipped` child of a failed node
//! did not run because a guard or key in front of it failed; its predicates
//! are reported as hints so the caller learns every requirement of the
//! field at once (`is missing`, `must be an integer`, `must be even`).
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::Value;

use crate::ast::Node;
use crate::eval::{Outcome, ResultKind, ResultNode};
use crate::messages::{MessageCompiler, MessageInput};
use crate::path::Path;

/// Never hinted: they describe presence, which the error already covers.
const NO_HINT: &[&str] = &["key?", "nil?", "filled?", "none?"];

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Error, // a rule that ran and failed
    Hint,  // a rule that never ran
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub path: Path,
    pub message: String,
    pub predicate: String,
    pub kind: FailureKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub success: bool,
    pub failures: Vec<Failure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

pub struct Aggregator<'a> {
    messages: &'a dyn MessageCompiler,
    hints: bool,
}

struct Collector<'a> {
    messages: &'a dyn MessageCompiler,
    hints: bool,
    seen: IndexSet<(Path, String)>,
    failures: Vec<Failure>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<'a> Aggregator<'a> {
    pub fn new(messages: &'a dyn MessageCompiler) -> Self {
        Self { messages, hints: true }
    }

    pub fn hints(mut self, enabled: bool) -> Self {
        self.hints = enabled;
        self
    }

    pub fn aggregate(&self, root: &ResultNode) -> ValidationReport {
        let mut collector = Collector {
            messages: self.messages,
            hints: self.hints,
            seen: IndexSet::new(),
            failures: Vec::new(),
        };
        collector.walk(root);
        ValidationReport {
            success: !root.failed(),
            failures: collector.failures,
            output: None,
        }
    }
}

impl ValidationReport {
    pub fn is_success(&self) -> bool { self.success }

    pub fn errors(&self) -> impl Iterator<Item = &Failure> {
        self.failures.iter().filter(|f| f.kind == FailureKind::Error)
    }

    pub fn hints(&self) -> impl Iterator<Item = &Failure> {
        self.failures.iter().filter(|f| f.kind == FailureKind::Hint)
    }

    /// Every message in report order.
    pub fn messages(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.message.as_str()).collect()
    }

    pub fn messages_at(&self, path: &Path) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|f| &f.path == path)
            .map(|f| f.message.as_str())
            .collect()
    }

    /// Messages grouped by dotted path, in first-seen order.
    pub fn by_path(&self) -> IndexMap<String, Vec<&str>> {
        let mut grouped: IndexMap<String, Vec<&str>> = IndexMap::new();
        for f in &self.failures {
            grouped.entry(f.path.to_string()).or_default().push(f.message.as_str());
        }
        grouped
    }
}

impl Collector<'_> {
    fn walk(&mut self, node: &ResultNode) {
        if !node.failed() {
            return;
        }
        match &node.kind {
            ResultKind::Predicate { name, args } => {
                self.push(&node.path, name, args, node.value.as_ref(), false, FailureKind::Error);
            }
            ResultKind::TypeGuard { ty, coerced, inner } => {
                if !coerced {
                    if let Some(name) = ty.predicate() {
                        self.push(&node.path, name, &[], node.value.as_ref(), false, FailureKind::Error);
                    }
                }
                self.child(inner);
            }
            ResultKind::And(left, right) => {
                self.child(left);
                self.child(right);
            }
            // the left branch is the escape hatch (`nil?` for maybe)
            ResultKind::Or(_, right) => self.child(right),
            ResultKind::Not(inner) => self.negation(&node.path, inner),
            ResultKind::Key { present, inner, .. } => {
                if !present {
                    self.push(&node.path, "key?", &[], None, false, FailureKind::Error);
                }
                self.child(inner);
            }
            ResultKind::Each(items) | ResultKind::Set(items) => {
                for item in items {
                    self.walk(item);
                }
            }
            ResultKind::Skipped(_) => {}
        }
    }

    fn child(&mut self, node: &ResultNode) {
        match node.outcome {
            Outcome::Failed => self.walk(node),
            Outcome::Skipped => self.hint(node),
            Outcome::Passed => {}
        }
    }

    fn hint(&mut self, node: &ResultNode) {
        if !self.hints {
            return;
        }
        let ResultKind::Skipped(rule) = &node.kind else { return };
        let mut found = Vec::new();
        hinted_predicates(rule, &mut found);
        for (name, args) in found {
            self.push(&node.path, name, args, node.value.as_ref(), false, FailureKind::Hint);
        }
    }

    /// A failed `Not` means its inner rule passed: report what passed,
    /// negated.
    fn negation(&mut self, path: &Path, inner: &ResultNode) {
        let mut leaves = Vec::new();
        passing_leaves(inner, &mut leaves);
        if leaves.is_empty() {
            self.push(path, "not?", &[], None, false, FailureKind::Error);
            return;
        }
        for leaf in leaves {
            if let ResultKind::Predicate { name, args } = &leaf.kind {
                self.push(&leaf.path, name, args, leaf.value.as_ref(), true, FailureKind::Error);
            }
        }
    }

    fn push(
        &mut self,
        path: &Path,
        predicate: &str,
        args: &[Value],
        value: Option<&Value>,
        negated: bool,
        kind: FailureKind,
    ) {
        let message = self.messages.render(&MessageInput { path, predicate, args, value, negated });
        if self.seen.insert((path.clone(), message.clone())) {
            self.failures.push(Failure { path: path.clone(), message, predicate: predicate.to_string(), kind });
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Predicates a skipped rule would have checked at its own path. Nested
/// scopes (`Key`, `Set`, `Each`) and negations are left out.
fn hinted_predicates<'n>(rule: &'n Node, out: &mut Vec<(&'n str, &'n [Value])>) {
    match rule {
        Node::Predicate { name, args } => {
            if !NO_HINT.contains(&name.as_str()) {
                out.push((name.as_str(), args.as_slice()));
            }
        }
        Node::TypeGuard { inner, .. } => hinted_predicates(inner, out),
        Node::And(left, right) => {
            hinted_predicates(left, out);
            hinted_predicates(right, out);
        }
        Node::Or(_, right) => hinted_predicates(right, out),
        Node::Not(_) | Node::Key { .. } | Node::Each(_) | Node::Set(_) => {}
    }
}

fn passing_leaves<'r>(node: &'r ResultNode, out: &mut Vec<&'r ResultNode>) {
    if !node.passed() {
        return;
    }
    match &node.kind {
        ResultKind::Predicate { .. } => out.push(node),
        ResultKind::TypeGuard { inner, .. } | ResultKind::Key { inner, .. } => passing_leaves(inner, out),
        ResultKind::And(left, right) | ResultKind::Or(left, right) => {
            passing_leaves(left, out);
            passing_leaves(right, out);
        }
        ResultKind::Each(items) | ResultKind::Set(items) => {
            for item in items {
                passing_leaves(item, out);
            }
        }
        ResultKind::Not(_) | ResultKind::Skipped(_) => {}
    }
}
