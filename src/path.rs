//! Locations inside an input document.
use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Ordered sequence of key / index segments; the root is the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Self { Self::default() }

    /// Consuming builder, handy in tests: `Path::root().key("foo").index(0)`.
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.0.push(Segment::Key(name.into()));
        self
    }
    pub fn index(mut self, ix: usize) -> Self {
        self.0.push(Segment::Index(ix));
        self
    }

    pub fn child_key(&self, name: &str) -> Self {
        self.clone().key(name)
    }
    pub fn child_index(&self, ix: usize) -> Self {
        self.clone().index(ix)
    }

    pub fn segments(&self) -> &[Segment] { &self.0 }
    pub fn is_root(&self) -> bool { self.0.is_empty() }
    pub fn last(&self) -> Option<&Segment> { self.0.last() }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Dotted form: `foo.0.bar`.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 { f.write_str(".")?; }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

impl From<&str> for Path {
    fn from(name: &str) -> Self { Path::root().key(name) }
}

impl FromIterator<Segment> for Path {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_display_and_json_form() {
        let p = Path::root().key("items").index(2).key("sku");
        assert_eq!(p.to_string(), "items.2.sku");
        assert_eq!(serde_json::to_string(&p).unwrap(), r#"["items",2,"sku"]"#);
        assert_eq!(Path::root().to_string(), "");
    }

    #[test]
    fn children_do_not_mutate_parent() {
        let parent = Path::from("foo");
        let child = parent.child_index(0);
        assert_eq!(parent.segments().len(), 1);
        assert_eq!(child.last(), Some(&Segment::Index(0)));
    }
}
