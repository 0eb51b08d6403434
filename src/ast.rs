//! Compiled rule tree. Immutable once built; children are shared through
//! `Arc` so a nested schema can be referenced from several keys.
use std::sync::Arc;

use serde_json::Value;

use crate::coercion::TypeId;

pub type NodeRef = Arc<Node>;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Predicate { name: String, args: Vec<Value> },
    TypeGuard { ty: TypeId, inner: NodeRef },   // inner only runs on a coerced value
    And(NodeRef, NodeRef),
    Or(NodeRef, NodeRef),
    Not(NodeRef),
    Key { name: String, required: bool, inner: NodeRef },
    Each(NodeRef),                              // per element, index joins the path
    Set(Vec<NodeRef>),                          // members are `Key`s, all evaluated
}

impl Node {
    pub fn predicate(name: impl Into<String>, args: Vec<Value>) -> NodeRef {
        Arc::new(Node::Predicate { name: name.into(), args })
    }

    pub fn and(left: NodeRef, right: NodeRef) -> NodeRef { Arc::new(Node::And(left, right)) }
    pub fn or(left: NodeRef, right: NodeRef) -> NodeRef { Arc::new(Node::Or(left, right)) }
    pub fn not(inner: NodeRef) -> NodeRef { Arc::new(Node::Not(inner)) }
    pub fn each(inner: NodeRef) -> NodeRef { Arc::new(Node::Each(inner)) }

    pub fn guard(ty: TypeId, inner: NodeRef) -> NodeRef {
        Arc::new(Node::TypeGuard { ty, inner })
    }

    pub fn key(name: impl Into<String>, required: bool, inner: NodeRef) -> NodeRef {
        Arc::new(Node::Key { name: name.into(), required, inner })
    }

    pub fn set(members: Vec<NodeRef>) -> NodeRef { Arc::new(Node::Set(members)) }

    /// Left fold with `And`, preserving declaration order. `None` when empty.
    pub fn conjunction<I>(parts: I) -> Option<NodeRef>
    where
        I: IntoIterator<Item = NodeRef>,
    {
        parts.into_iter().reduce(Node::and)
    }

    /// Names of the `Key` members of a `Set`, in declaration order.
    pub fn key_names(&self) -> Vec<&str> {
        match self {
            Node::Set(members) => members.iter().filter_map(|m| match m.as_ref() {
                Node::Key { name, .. } => Some(name.as_str()),
                _ => None,
            }).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conjunction_folds_left() {
        let a = Node::predicate("int?", vec![]);
        let b = Node::predicate("even?", vec![]);
        let c = Node::predicate("gt?", vec![json!(1)]);
        let folded = Node::conjunction([a.clone(), b.clone(), c.clone()]).unwrap();
        assert_eq!(folded, Node::and(Node::and(a, b), c));
        assert!(Node::conjunction(Vec::new()).is_none());
    }

    #[test]
    fn structural_identity() {
        let one = Node::key("foo", true, Node::predicate("filled?", vec![]));
        let two = Node::key("foo", true, Node::predicate("filled?", vec![]));
        assert_eq!(one, two);
        assert_ne!(one, Node::key("foo", false, Node::predicate("filled?", vec![])));
    }

    #[test]
    fn shared_templates_are_read_only_clones() {
        let address = Node::set(vec![Node::key("city", true, Node::predicate("str?", vec![]))]);
        let root = Node::set(vec![
            Node::key("home", true, address.clone()),
            Node::key("work", false, address.clone()),
        ]);
        assert_eq!(Arc::strong_count(&address), 3);
        assert_eq!(root.key_names(), vec!["home", "work"]);
    }
}
