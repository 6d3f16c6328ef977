//! Woven form: the intermediate representation produced by weaving
//!
//! A woven tree holds only closed, representable shapes: scalars, lists,
//! maps, [`WovenNode`]s, [`ArtefactId`] references and [`CycleMarker`]s.
//! Node identities are call-scoped indices, never stable across runs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::artefact_id::ArtefactId;
use crate::type_tag::{TypeDescriptor, TypeTag};

/// Per-call identity of a woven node ("pointer" in document form)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Back-reference to a node emitted earlier in the same weave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CycleMarker {
    pub target: NodeId,
}

impl CycleMarker {
    pub fn new(target: NodeId) -> Self {
        Self { target }
    }
}

/// Documentation captured for a type, inline or externalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Documentation {
    Inline(String),
    Artefact(ArtefactId),
}

/// The IR unit for one non-scalar object
#[derive(Debug, Clone, PartialEq)]
pub struct WovenNode {
    pub identity: NodeId,
    pub descriptor: TypeDescriptor,
    /// Artefacts reachable from this node
    pub artefacts: BTreeSet<ArtefactId>,
    pub documentation: BTreeMap<TypeTag, Documentation>,
    /// Best-effort captured method source text
    pub method_sources: BTreeMap<String, String>,
    pub fields: BTreeMap<String, Woven>,
}

impl WovenNode {
    /// Create an empty node
    pub fn new(identity: NodeId, descriptor: TypeDescriptor) -> Self {
        Self {
            identity,
            descriptor,
            artefacts: BTreeSet::new(),
            documentation: BTreeMap::new(),
            method_sources: BTreeMap::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field, returning the node for chaining
    pub fn with_field(mut self, name: impl Into<String>, value: Woven) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Woven> {
        self.fields.get(name)
    }

    pub fn tag(&self) -> &TypeTag {
        &self.descriptor.tag
    }

    /// Fold artefacts referenced by fields and documentation into `artefacts`
    pub fn absorb_artefacts(&mut self) {
        let mut found = BTreeSet::new();
        for doc in self.documentation.values() {
            if let Documentation::Artefact(id) = doc {
                found.insert(*id);
            }
        }
        for value in self.fields.values() {
            value.collect_artefacts(&mut found);
        }
        self.artefacts.extend(found);
    }
}

/// Any value that can appear in a woven tree
#[derive(Debug, Clone, PartialEq)]
pub enum Woven {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Woven>),
    Map(BTreeMap<String, Woven>),
    Node(Box<WovenNode>),
    Artefact(ArtefactId),
    Marker(CycleMarker),
}

impl Woven {
    pub fn node(node: WovenNode) -> Self {
        Woven::Node(Box::new(node))
    }

    pub fn as_node(&self) -> Option<&WovenNode> {
        match self {
            Woven::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Woven::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Woven]> {
        match self {
            Woven::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_artefact(&self) -> Option<ArtefactId> {
        match self {
            Woven::Artefact(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_marker(&self) -> Option<CycleMarker> {
        match self {
            Woven::Marker(marker) => Some(*marker),
            _ => None,
        }
    }

    /// Descend through node fields and maps without unweaving
    ///
    /// Numeric path segments index into lists.
    pub fn lookup(&self, path: &[&str]) -> Option<&Woven> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self);
        };
        let next = match self {
            Woven::Node(node) => node.fields.get(*head),
            Woven::Map(map) => map.get(*head),
            Woven::List(items) => head.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }?;
        next.lookup(rest)
    }

    /// Collect artefact ids referenced by this value
    ///
    /// Nested nodes contribute their own `artefacts` set; markers are not
    /// followed.
    pub fn collect_artefacts(&self, out: &mut BTreeSet<ArtefactId>) {
        match self {
            Woven::Artefact(id) => {
                out.insert(*id);
            }
            Woven::Node(node) => out.extend(node.artefacts.iter().copied()),
            Woven::List(items) => items.iter().for_each(|item| item.collect_artefacts(out)),
            Woven::Map(map) => map.values().for_each(|item| item.collect_artefacts(out)),
            _ => {}
        }
    }

    /// Shape counts of the tree, for diagnostics
    pub fn census(&self) -> Census {
        let mut census = Census::default();
        self.tally(&mut census);
        census
    }

    fn tally(&self, census: &mut Census) {
        match self {
            Woven::Node(node) => {
                census.nodes += 1;
                node.fields.values().for_each(|v| v.tally(census));
            }
            Woven::Marker(_) => census.markers += 1,
            Woven::Artefact(_) => census.artefacts += 1,
            Woven::List(items) => items.iter().for_each(|v| v.tally(census)),
            Woven::Map(map) => map.values().for_each(|v| v.tally(census)),
            _ => {}
        }
    }
}

/// Shape summary of a woven tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Census {
    pub nodes: usize,
    pub markers: usize,
    pub artefacts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Woven {
        let mut inner = WovenNode::new(NodeId(2), TypeDescriptor::builtin("dict"))
            .with_field("a", Woven::Marker(CycleMarker::new(NodeId(1))))
            .with_field("blob", Woven::Artefact(ArtefactId::of(b"blob")));
        inner.absorb_artefacts();
        let mut outer = WovenNode::new(NodeId(1), TypeDescriptor::builtin("dict"))
            .with_field("b", Woven::node(inner))
            .with_field("xs", Woven::List(vec![Woven::Int(1), Woven::Int(2)]));
        outer.absorb_artefacts();
        Woven::node(outer)
    }

    #[test]
    fn test_lookup() {
        let tree = sample();
        assert_eq!(tree.lookup(&["xs", "1"]), Some(&Woven::Int(2)));
        assert_eq!(
            tree.lookup(&["b", "a"]).and_then(Woven::as_marker),
            Some(CycleMarker::new(NodeId(1)))
        );
        assert!(tree.lookup(&["b", "missing"]).is_none());
    }

    #[test]
    fn test_artefacts_propagate_to_parent() {
        let tree = sample();
        let outer = tree.as_node().unwrap();
        assert!(outer.artefacts.contains(&ArtefactId::of(b"blob")));
    }

    #[test]
    fn test_census() {
        let census = sample().census();
        assert_eq!(
            census,
            Census {
                nodes: 2,
                markers: 1,
                artefacts: 1
            }
        );
    }
}
