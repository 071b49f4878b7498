//! # Tree Document
//!
//! The in-memory hierarchical representation that the wire format
//! serializes to and from. A [`Document`] is an arena of [`Node`]s: each
//! node has an element name, an ordered attribute table, and an ordered
//! child list. Exactly one node is the root, every other node has exactly
//! one parent, and the tree itself is acyclic — cycles in the *object
//! graph* are expressed through `ref` attributes, never through tree
//! structure.
//!
//! A document is created fresh for every export or import and discarded
//! afterwards, so no state leaks between operations.

use indexmap::IndexMap;

/// Handle to a node inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A single element: name, attributes (insertion-ordered, keys unique),
/// and ordered children.
#[derive(Debug)]
struct Node {
    name: String,
    attrs: IndexMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An ordered, mutable element tree with a single root.
#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Document {
    /// Create an empty document with no root.
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_owned(),
            attrs: IndexMap::new(),
            parent,
            children: Vec::new(),
        });
        id
    }

    /// Create the root element. Panics in debug builds if a root already
    /// exists; documents are single-rooted by construction.
    pub fn create_root(&mut self, name: &str) -> NodeId {
        debug_assert!(self.root.is_none(), "document already has a root");
        let id = self.alloc(name, None);
        self.root = Some(id);
        id
    }

    /// Append a new child element under `parent` and return its handle.
    pub fn append_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = self.alloc(name, Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// The root element, if one has been created.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Element name of `id`.
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// Parent of `id`, `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Ordered children of `id`.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// First child of `id`, if any.
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.first().copied()
    }

    /// Next sibling of `id` in its parent's child order.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// First child of `id` with the given element name.
    pub fn find_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.name(c) == name)
    }

    /// Set (or replace) an attribute on `id`. Values are stored raw;
    /// escaping happens at the serialization boundary only.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        self.nodes[id.0]
            .attrs
            .insert(name.to_owned(), value.to_owned());
    }

    /// Attribute value on `id`, or `None` if absent.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0].attrs.get(name).map(String::as_str)
    }

    /// Iterate attributes of `id` in insertion order.
    pub fn attrs(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.nodes[id.0]
            .attrs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Total node count (including the root).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the document holds no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
