//! The in-memory tree shared by the decoder and encoder.
//!
//! Nodes live in an arena owned by the [`Document`] and refer to each other through [`NodeId`]s.
//! A node owns its children (in order) and keeps a non-owning id of its parent for upward
//! navigation. Leaf nodes are regular nodes that carry a `__type` pseudo-attribute, with
//! `__size` and `__count` added when the value spans more than one element.

use serde::{Deserialize, Serialize};

use crate::encoding::TextEncoding;
use crate::types::{TypeCode, ValueKind};
use crate::walker::TreeWalker;

pub const TYPE_ATTR: &str = "__type";
pub const SIZE_ATTR: &str = "__size";
pub const COUNT_ATTR: &str = "__count";

/// True for the pseudo-attributes that describe a leaf's binary layout.
pub fn is_pseudo_attr(key: &str) -> bool {
    key == TYPE_ATTR || key == SIZE_ATTR || key == COUNT_ATTR
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    fn new(tag: String, parent: Option<NodeId>) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
            parent,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// First attribute with the given key.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace the value of an existing attribute in place, or append a new one.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Append an attribute without checking for an existing key.
    pub fn push_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    /// All attributes in insertion order, pseudo-attributes included.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Attributes in insertion order, without the leaf pseudo-attributes.
    pub fn user_attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes().filter(|(k, _)| !is_pseudo_attr(k))
    }

    /// The raw `__type` value, if this is a leaf.
    pub fn leaf_type(&self) -> Option<&str> {
        self.attr(TYPE_ATTR)
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf_type().is_some()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// A kbin document: an arena of nodes, the root among them, and the text encoding used for its
/// strings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "DocumentSerde")]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    encoding: TextEncoding,
}

// Struct used solely for deserialization, checked before it becomes a Document
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentSerde {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    encoding: TextEncoding,
}

impl TryFrom<DocumentSerde> for Document {
    type Error = &'static str;
    fn try_from(value: DocumentSerde) -> Result<Self, Self::Error> {
        let DocumentSerde {
            nodes,
            root,
            encoding,
        } = value;
        let len = nodes.len();
        let in_range = |id: NodeId| id.0 < len;
        // Every node is listed by at most one parent, and that parent is the one it points to
        let mut listed = vec![false; len];
        for (index, node) in nodes.iter().enumerate() {
            for &child in &node.children {
                if !in_range(child) {
                    return Err("child id out of range");
                }
                if std::mem::replace(&mut listed[child.0], true) {
                    return Err("node listed as a child more than once");
                }
                if nodes[child.0].parent != Some(NodeId(index)) {
                    return Err("child's parent doesn't list it");
                }
            }
        }
        for (index, node) in nodes.iter().enumerate() {
            match node.parent {
                Some(parent) if !in_range(parent) => return Err("parent id out of range"),
                Some(_) if !listed[index] => return Err("parent doesn't list its child"),
                _ => (),
            }
        }
        if let Some(root) = root {
            if !in_range(root) {
                return Err("root id out of range");
            }
            if nodes[root.0].parent.is_some() {
                return Err("root has a parent");
            }
        }
        // Links are now single and consistent, so any node not reachable from a parentless
        // node sits on a cycle
        let mut stack: Vec<NodeId> = (0..len)
            .filter(|&i| nodes[i].parent.is_none())
            .map(NodeId)
            .collect();
        let mut reached = 0;
        while let Some(id) = stack.pop() {
            reached += 1;
            stack.extend(nodes[id.0].children.iter().copied());
        }
        if reached != len {
            return Err("cycle in node tree");
        }
        Ok(Self {
            nodes,
            root,
            encoding,
        })
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoding(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            ..Self::default()
        }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: TextEncoding) {
        self.encoding = encoding;
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of nodes in the arena, including any that aren't reachable from the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node by id. Panics if the id came from another document.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Allocate a node, appending it to `parent`'s children if there is one.
    pub(crate) fn new_node(&mut self, tag: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(tag.into(), parent));
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    /// Create a fresh node and make it the root.
    pub fn create_root(&mut self, tag: impl Into<String>) -> NodeId {
        let id = self.new_node(tag, None);
        self.root = Some(id);
        id
    }

    /// Make an existing node the root, detaching it from its parent first.
    pub fn set_root(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
        self.root = Some(id);
    }

    pub fn add_child(&mut self, parent: NodeId, tag: impl Into<String>) -> NodeId {
        self.new_node(tag, Some(parent))
    }

    /// Add a leaf holding `text` as a value of type `ty`, filling in the pseudo-attributes the
    /// same way the decoder does.
    pub fn add_leaf(
        &mut self,
        parent: NodeId,
        tag: impl Into<String>,
        ty: TypeCode,
        text: impl Into<String>,
    ) -> NodeId {
        let text = text.into();
        let desc = ty.descriptor();
        let (size, count) = match desc.kind {
            ValueKind::Str => (text.len(), 0),
            ValueKind::Bin => (text.trim().len() / 2, 0),
            _ => {
                let elements = text.split_whitespace().count();
                (elements * desc.width, elements)
            }
        };
        let id = self.add_child(parent, tag);
        set_leaf_attrs(self.node_mut(id), ty, size, count);
        self.node_mut(id).set_text(text);
        id
    }

    /// Walk the tree from the root. Returns `None` for an empty document.
    pub fn walk(&self) -> Option<TreeWalker<'_>> {
        self.root.map(|root| TreeWalker::new(self, root))
    }

    /// Find the first child of `id` with the given tag.
    pub fn child_by_tag(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.node(*c).tag() == tag)
    }

    fn subtree_eq(&self, a: NodeId, other: &Document, b: NodeId) -> bool {
        let mut pending = vec![(a, b)];
        while let Some((a, b)) = pending.pop() {
            let (na, nb) = (self.node(a), other.node(b));
            if na.tag != nb.tag
                || na.attributes != nb.attributes
                || na.text().unwrap_or("") != nb.text().unwrap_or("")
                || na.children.len() != nb.children.len()
            {
                return false;
            }
            pending.extend(na.children.iter().copied().zip(nb.children.iter().copied()));
        }
        true
    }
}

/// Structural equality: tags, attributes, text and child order, starting from the roots. A
/// missing text equals an empty one. Arena layout and the text encoding aren't compared.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        match (self.root, other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => self.subtree_eq(a, other, b),
            _ => false,
        }
    }
}

/// Attach `__type`, and `__size`/`__count` when the payload spans more than one element.
pub(crate) fn set_leaf_attrs(node: &mut Node, ty: TypeCode, size: usize, count: usize) {
    let desc = ty.descriptor();
    node.set_attr(TYPE_ATTR, desc.name);
    if size > desc.width {
        node.set_attr(SIZE_ATTR, size.to_string());
    }
    if count > 1 {
        node.set_attr(COUNT_ATTR, count.to_string());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::new();
        let root = doc.create_root("root");
        doc.node_mut(root).set_attr("ver", "1");
        let info = doc.add_child(root, "info");
        doc.add_leaf(info, "id", TypeCode::U32, "12345");
        doc.add_leaf(info, "name", TypeCode::Str, "hello");
        doc.add_child(root, "empty");
        doc
    }

    #[test]
    fn build_and_navigate() {
        let doc = sample();
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).tag(), "root");
        assert_eq!(doc.node(root).attr("ver"), Some("1"));
        assert_eq!(doc.children(root).len(), 2);
        let info = doc.child_by_tag(root, "info").unwrap();
        assert_eq!(doc.parent(info), Some(root));
        let id = doc.child_by_tag(info, "id").unwrap();
        let id_node = doc.node(id);
        assert!(id_node.is_leaf());
        assert_eq!(id_node.leaf_type(), Some("u32"));
        assert_eq!(id_node.text(), Some("12345"));
        assert_eq!(id_node.attr(SIZE_ATTR), None);
        assert_eq!(id_node.attr(COUNT_ATTR), None);
        assert!(!doc.node(info).is_leaf());
        assert_eq!(doc.len(), 5);
    }

    #[test]
    fn leaf_pseudo_attrs() {
        let mut doc = Document::new();
        let root = doc.create_root("root");
        let arr = doc.add_leaf(root, "arr", TypeCode::U16, "1 2 3");
        assert_eq!(doc.node(arr).attr(SIZE_ATTR), Some("6"));
        assert_eq!(doc.node(arr).attr(COUNT_ATTR), Some("3"));
        let vec = doc.add_leaf(root, "pos", TypeCode::S32x3, "1 2 3");
        assert_eq!(doc.node(vec).attr(SIZE_ATTR), Some("12"));
        assert_eq!(doc.node(vec).attr(COUNT_ATTR), Some("3"));
        let s = doc.add_leaf(root, "s", TypeCode::Str, "a b c");
        assert_eq!(doc.node(s).attr(COUNT_ATTR), None);
        assert_eq!(doc.node(s).attr(SIZE_ATTR), Some("5"));
        // Sized by its UTF-8 text, whether or not the document encoding can hold it
        let j = doc.add_leaf(root, "j", TypeCode::Str, "日本");
        assert_eq!(doc.node(j).attr(SIZE_ATTR), Some("6"));
        let one = doc.add_leaf(root, "one", TypeCode::Str, "x");
        assert_eq!(doc.node(one).attr(SIZE_ATTR), None);
        let b = doc.add_leaf(root, "b", TypeCode::Bin, "00");
        assert_eq!(doc.node(b).attr(SIZE_ATTR), None);
    }

    #[test]
    fn attributes_keep_order() {
        let mut doc = Document::new();
        let root = doc.create_root("root");
        let node = doc.node_mut(root);
        node.set_attr("b", "1");
        node.set_attr("a", "2");
        node.set_attr("b", "3");
        node.push_attr("a", "4");
        let attrs: Vec<_> = node.attributes().collect();
        assert_eq!(attrs, vec![("b", "3"), ("a", "2"), ("a", "4")]);
        assert_eq!(node.attr("a"), Some("2"));
    }

    #[test]
    fn user_attributes_skip_pseudo() {
        let mut doc = Document::new();
        let root = doc.create_root("root");
        let leaf = doc.add_leaf(root, "v", TypeCode::U8, "1 2");
        doc.node_mut(leaf).set_attr("note", "x");
        let attrs: Vec<_> = doc.node(leaf).user_attributes().collect();
        assert_eq!(attrs, vec![("note", "x")]);
    }

    #[test]
    fn set_root_detaches() {
        let mut doc = sample();
        let root = doc.root().unwrap();
        let info = doc.child_by_tag(root, "info").unwrap();
        doc.set_root(info);
        assert_eq!(doc.root(), Some(info));
        assert_eq!(doc.parent(info), None);
        assert!(doc.child_by_tag(root, "info").is_none());
    }

    #[test]
    fn structural_equality() {
        let a = sample();
        let mut b = sample();
        assert_eq!(a, b);

        // Built in a different arena order but with the same shape
        let mut c = Document::with_encoding(TextEncoding::ShiftJis);
        let root = c.create_root("root");
        let info = c.add_child(root, "info");
        c.add_child(root, "empty");
        c.node_mut(root).set_attr("ver", "1");
        c.add_leaf(info, "id", TypeCode::U32, "12345");
        c.add_leaf(info, "name", TypeCode::Str, "hello");
        assert_eq!(a, c);

        let root = b.root().unwrap();
        let empty = b.child_by_tag(root, "empty").unwrap();
        b.node_mut(empty).set_text("");
        assert_eq!(a, b);
        b.node_mut(empty).set_text("x");
        assert_ne!(a, b);

        assert_ne!(a, Document::new());
        assert_eq!(Document::new(), Document::new());
    }

    #[test]
    fn serde_rejects_broken_trees() {
        let bad = [
            // Child id past the end of the arena
            r#"{"nodes":[{"tag":"r","attributes":[],"text":null,"children":[7],"parent":null}],"root":0,"encoding":"None"}"#,
            // Root past the end of the arena
            r#"{"nodes":[{"tag":"r","attributes":[],"text":null,"children":[],"parent":null}],"root":3,"encoding":"None"}"#,
            // Child whose parent link points elsewhere
            r#"{"nodes":[{"tag":"r","attributes":[],"text":null,"children":[1],"parent":null},{"tag":"c","attributes":[],"text":null,"children":[],"parent":null}],"root":0,"encoding":"None"}"#,
            // Parent link without a matching child entry
            r#"{"nodes":[{"tag":"r","attributes":[],"text":null,"children":[],"parent":null},{"tag":"c","attributes":[],"text":null,"children":[],"parent":0}],"root":0,"encoding":"None"}"#,
            // Node listed under two parents
            r#"{"nodes":[{"tag":"r","attributes":[],"text":null,"children":[1,2],"parent":null},{"tag":"a","attributes":[],"text":null,"children":[2],"parent":0},{"tag":"b","attributes":[],"text":null,"children":[],"parent":0}],"root":0,"encoding":"None"}"#,
            // Two nodes that are each other's parent
            r#"{"nodes":[{"tag":"a","attributes":[],"text":null,"children":[1],"parent":1},{"tag":"b","attributes":[],"text":null,"children":[0],"parent":0}],"root":0,"encoding":"None"}"#,
            // Root that is its own child
            r#"{"nodes":[{"tag":"r","attributes":[],"text":null,"children":[0],"parent":0}],"root":0,"encoding":"None"}"#,
            // Detached pair pointing at each other
            r#"{"nodes":[{"tag":"r","attributes":[],"text":null,"children":[],"parent":null},{"tag":"a","attributes":[],"text":null,"children":[2],"parent":2},{"tag":"b","attributes":[],"text":null,"children":[1],"parent":1}],"root":0,"encoding":"None"}"#,
        ];
        for json in bad.iter() {
            assert!(serde_json::from_str::<Document>(json).is_err(), "accepted {}", json);
        }
    }

    #[test]
    fn serde_accepts_detached_nodes() {
        let json = r#"{"nodes":[{"tag":"r","attributes":[],"text":null,"children":[],"parent":null},{"tag":"x","attributes":[],"text":"1","children":[],"parent":null}],"root":0,"encoding":"None"}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.node(doc.root().unwrap()).tag(), "r");
    }

    #[test]
    fn serde_roundtrip() {
        let doc = sample();
        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
        assert_eq!(back.len(), doc.len());
        assert_eq!(back.encoding(), doc.encoding());
    }
}
